use grid_authz_cache::GroupRoleCache;
use grid_data::GridRepositories;
use r2e_core::guards::Identity;
use r2e_core::http::extract::FromRef;
use r2e_core::HttpError;
use r2e_data::Repository;
use r2e_security::ClaimsIdentity;
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    ServiceAccount,
}

impl PrincipalKind {
    fn from_claims(claims: &serde_json::Value) -> Self {
        if claims.get("client_id").is_some() {
            PrincipalKind::ServiceAccount
        } else {
            PrincipalKind::User
        }
    }
}

/// Resolved caller: identity, kind, and the union of directly-assigned and
/// group-mapped role names. Implements [`Identity`] so it can be injected
/// into controllers and guards as the request's identity type.
#[derive(Debug, Clone)]
pub struct GridPrincipal {
    pub principal_id: Uuid,
    pub kind: PrincipalKind,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub claims: serde_json::Value,
}

impl Identity for GridPrincipal {
    fn sub(&self) -> &str {
        // `Identity::sub` must return a borrowed str; the claims' "sub" is
        // the stable textual form, principal_id is the resolved internal id.
        self.claims.get("sub").and_then(|v| v.as_str()).unwrap_or("")
    }
    fn roles(&self) -> &[String] {
        &self.roles
    }
    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
    fn claims(&self) -> Option<&serde_json::Value> {
        Some(&self.claims)
    }
}

/// Where to read IdP group names from in the validated claims — configurable
/// because providers disagree on the claim path (`groups`, `realm_access.roles`, …).
#[derive(Debug, Clone)]
pub struct GroupClaimPath(pub &'static str);

impl Default for GroupClaimPath {
    fn default() -> Self {
        Self("groups")
    }
}

fn extract_groups(claims: &serde_json::Value, path: &GroupClaimPath) -> Vec<String> {
    claims
        .get(path.0)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_internal_id(claims: &serde_json::Value, kind: PrincipalKind) -> Option<Uuid> {
    let key = match kind {
        PrincipalKind::User => "internal_user_id",
        PrincipalKind::ServiceAccount => "internal_sa_id",
    };
    claims.get(key).and_then(|v| v.as_str()).and_then(|s| Uuid::parse_str(s).ok())
}

impl<S> ClaimsIdentity<S> for GridPrincipal
where
    S: Send + Sync,
    GridRepositories: FromRef<S>,
    GroupRoleCache: FromRef<S>,
    GroupClaimPath: FromRef<S>,
{
    async fn from_jwt_claims(claims: serde_json::Value, state: &S) -> Result<Self, HttpError> {
        let kind = PrincipalKind::from_claims(&claims);
        let principal_id = extract_internal_id(&claims, kind)
            .ok_or_else(|| HttpError::Unauthorized("claims missing internal principal id".into()))?;

        let repos = GridRepositories::from_ref(state);
        let group_cache = GroupRoleCache::from_ref(state);
        let claim_path = GroupClaimPath::from_ref(state);

        if let Some(session_id) = claims.get("sid").and_then(|v| v.as_str()) {
            if let Ok(sid) = Uuid::parse_str(session_id) {
                match repos.sessions.find_by_id(sid).await {
                    Ok(Some(session)) => {
                        let expired = session
                            .expires_at
                            .map(|exp| exp < chrono::Utc::now())
                            .unwrap_or(false);
                        if session.revoked || expired {
                            return Err(HttpError::Unauthorized("session revoked or expired".into()));
                        }
                        let _ = repos.sessions.touch(sid).await;
                    }
                    Ok(None) => {
                        return Err(HttpError::Unauthorized("unknown session".into()));
                    }
                    Err(e) => return Err(HttpError::Internal(e.to_string())),
                }
            }
        }

        let direct = repos
            .user_roles
            .find_by_user(principal_id)
            .await
            .map_err(|e| HttpError::Internal(e.to_string()))?;

        let mut role_names: BTreeSet<String> = BTreeSet::new();
        for assignment in direct {
            if let Some(role) = repos
                .roles
                .find_by_id(&assignment.role_id)
                .await
                .map_err(|e| HttpError::Internal(e.to_string()))?
            {
                role_names.insert(role.name);
            }
        }

        let groups = extract_groups(&claims, &claim_path);
        let snapshot = group_cache.snapshot();
        for role in snapshot.roles_for_groups(&groups) {
            role_names.insert(role.name.clone());
        }

        let email = claims.get("email").and_then(|v| v.as_str()).map(String::from);

        Ok(GridPrincipal {
            principal_id,
            kind,
            email,
            roles: role_names.into_iter().collect(),
            claims,
        })
    }
}

r2e_security::impl_claims_identity_extractor!(GridPrincipal);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn principal_kind_detects_service_account_via_client_id() {
        let user_claims = json!({"sub": "u1"});
        assert_eq!(PrincipalKind::from_claims(&user_claims), PrincipalKind::User);

        let sa_claims = json!({"client_id": "svc-ci"});
        assert_eq!(
            PrincipalKind::from_claims(&sa_claims),
            PrincipalKind::ServiceAccount
        );
    }

    #[test]
    fn extract_groups_reads_default_claim_path() {
        let claims = json!({"groups": ["platform", "sre"]});
        let path = GroupClaimPath::default();
        assert_eq!(extract_groups(&claims, &path), vec!["platform", "sre"]);
    }

    #[test]
    fn extract_groups_missing_claim_is_empty() {
        let claims = json!({"sub": "u1"});
        let path = GroupClaimPath::default();
        assert!(extract_groups(&claims, &path).is_empty());
    }

    #[test]
    fn extract_groups_respects_configured_path() {
        let claims = json!({"realm_access": {"roles": []}, "custom_groups": ["a"]});
        let path = GroupClaimPath("custom_groups");
        assert_eq!(extract_groups(&claims, &path), vec!["a"]);
    }

    #[test]
    fn extract_groups_ignores_non_string_entries() {
        let claims = json!({"groups": ["ok", 1, null, "also-ok"]});
        let path = GroupClaimPath::default();
        assert_eq!(extract_groups(&claims, &path), vec!["ok", "also-ok"]);
    }

    #[test]
    fn extract_internal_id_picks_key_by_kind() {
        let uid = Uuid::new_v4();
        let user_claims = json!({"internal_user_id": uid.to_string()});
        assert_eq!(
            extract_internal_id(&user_claims, PrincipalKind::User),
            Some(uid)
        );
        assert_eq!(
            extract_internal_id(&user_claims, PrincipalKind::ServiceAccount),
            None
        );

        let sa_claims = json!({"internal_sa_id": uid.to_string()});
        assert_eq!(
            extract_internal_id(&sa_claims, PrincipalKind::ServiceAccount),
            Some(uid)
        );
    }

    #[test]
    fn extract_internal_id_rejects_malformed_uuid() {
        let claims = json!({"internal_user_id": "not-a-uuid"});
        assert_eq!(extract_internal_id(&claims, PrincipalKind::User), None);
    }

    #[test]
    fn group_claim_path_default_is_groups() {
        assert_eq!(GroupClaimPath::default().0, "groups");
    }
}
