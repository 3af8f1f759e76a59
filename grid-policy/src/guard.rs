//! HTTP guard performing the unscoped, action-only authorization gate.
//!
//! This runs before the target resource is loaded, so it can only check
//! `(object_type, action)` against the principal's roles — per-resource
//! label-scope filtering happens downstream, once a service layer has the
//! resource's labels in hand (see [`crate::PolicyEngine::authorize`] with
//! `Some(labels)`, and [`crate::PolicyEngine::is_visible`] for list
//! filtering).

use crate::engine::{PolicyDecision, PolicyEngine};
use crate::role::RoleCatalog;
use r2e_core::guards::{Guard, GuardContext, Identity};
use r2e_core::http::extract::FromRef;
use r2e_core::http::response::IntoResponse;
use std::sync::Arc;

/// Start building a declarative route guard: `PolicyCheck::action("read").on("tfstate")`.
pub struct PolicyCheck;

impl PolicyCheck {
    pub fn action(action: &'static str) -> PolicyCheckBuilder {
        PolicyCheckBuilder { action }
    }
}

pub struct PolicyCheckBuilder {
    action: &'static str,
}

impl PolicyCheckBuilder {
    pub fn on(self, object_type: &'static str) -> PolicyGuard {
        PolicyGuard {
            object_type,
            action: self.action,
        }
    }
}

/// Declarative guard checking `object_type:action` against the caller's
/// roles, with no label scope applied (unscoped gate).
pub struct PolicyGuard {
    pub object_type: &'static str,
    pub action: &'static str,
}

impl<S: Send + Sync, I: Identity> Guard<S, I> for PolicyGuard
where
    PolicyEngine: FromRef<S>,
    Arc<dyn RoleCatalog>: FromRef<S>,
{
    fn check(
        &self,
        state: &S,
        ctx: &GuardContext<'_, I>,
    ) -> impl std::future::Future<Output = Result<(), r2e_core::http::Response>> + Send {
        let engine = <PolicyEngine as FromRef<S>>::from_ref(state);
        let catalog = <Arc<dyn RoleCatalog> as FromRef<S>>::from_ref(state);
        let role_names: Option<Vec<String>> = ctx.identity.map(|i| i.roles().to_vec());
        let object_type = self.object_type;
        let action = self.action;

        async move {
            let Some(role_names) = role_names else {
                return Err((
                    r2e_core::http::StatusCode::UNAUTHORIZED,
                    r2e_core::http::Json(serde_json::json!({
                        "error": "authentication required"
                    })),
                )
                    .into_response());
            };

            let roles = catalog.roles_for(&role_names);
            match engine.authorize(&roles, object_type, action, None) {
                PolicyDecision::Allow => Ok(()),
                PolicyDecision::Deny => {
                    tracing::debug!(object_type, action, "policy denied");
                    Err((
                        r2e_core::http::StatusCode::FORBIDDEN,
                        r2e_core::http::Json(serde_json::json!({
                            "error": "access denied"
                        })),
                    )
                        .into_response())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{Grant, Role};
    use r2e_core::guards::PathParams;
    use r2e_core::http::{HeaderMap, Uri};
    use std::collections::{BTreeMap, BTreeSet};

    struct TestIdentity {
        roles: Vec<String>,
    }

    impl Identity for TestIdentity {
        fn sub(&self) -> &str {
            "alice"
        }
        fn roles(&self) -> &[String] {
            &self.roles
        }
    }

    struct TestState {
        engine: PolicyEngine,
        catalog: Arc<dyn RoleCatalog>,
    }

    struct StaticCatalog(Vec<Arc<Role>>);
    impl RoleCatalog for StaticCatalog {
        fn roles_for(&self, names: &[String]) -> Vec<Arc<Role>> {
            self.0
                .iter()
                .filter(|r| names.contains(&r.name))
                .cloned()
                .collect()
        }
    }

    impl FromRef<TestState> for PolicyEngine {
        fn from_ref(state: &TestState) -> Self {
            state.engine.clone()
        }
    }
    impl FromRef<TestState> for Arc<dyn RoleCatalog> {
        fn from_ref(state: &TestState) -> Self {
            state.catalog.clone()
        }
    }

    #[tokio::test]
    async fn allows_when_role_grants_action() {
        let role = Arc::new(Role {
            name: "reader".into(),
            description: String::new(),
            scope_expr: String::new(),
            create_constraints: BTreeMap::new(),
            immutable_keys: BTreeSet::new(),
            actions: vec![Grant::new("tfstate", "read")],
            version: 1,
        });
        let state = TestState {
            engine: PolicyEngine::new(),
            catalog: Arc::new(StaticCatalog(vec![role])),
        };
        let guard = PolicyGuard {
            object_type: "tfstate",
            action: "read",
        };
        let uri: Uri = "/tfstate/abc".parse().unwrap();
        let headers = HeaderMap::new();
        let identity = TestIdentity {
            roles: vec!["reader".to_string()],
        };
        let ctx = GuardContext {
            method_name: "get",
            controller_name: "TfStateController",
            headers: &headers,
            uri: &uri,
            path_params: PathParams::EMPTY,
            identity: Some(&identity),
        };
        assert!(guard.check(&state, &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn denies_without_matching_grant() {
        let state = TestState {
            engine: PolicyEngine::new(),
            catalog: Arc::new(StaticCatalog(vec![])),
        };
        let guard = PolicyGuard {
            object_type: "tfstate",
            action: "write",
        };
        let uri: Uri = "/tfstate/abc".parse().unwrap();
        let headers = HeaderMap::new();
        let identity = TestIdentity { roles: vec![] };
        let ctx = GuardContext {
            method_name: "post",
            controller_name: "TfStateController",
            headers: &headers,
            uri: &uri,
            path_params: PathParams::EMPTY,
            identity: Some(&identity),
        };
        assert!(guard.check(&state, &ctx).await.is_err());
    }
}
