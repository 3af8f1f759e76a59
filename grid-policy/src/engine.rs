use crate::error::PolicyError;
use crate::role::Role;
use grid_labels::{LabelMap, ScopeCache};
use std::sync::Arc;

/// Outcome of an authorization check. Decisions are deny-by-default: the
/// absence of any matching, scope-satisfying grant is `Deny`, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny,
}

impl PolicyDecision {
    pub fn is_allow(self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// Evaluates `(principal, object_type, action, labels?)` against a set of
/// roles. The decision is the union (logical OR) across the principal's
/// roles: any one role granting the tuple yields `Allow`.
///
/// Holds a [`ScopeCache`] so that a role's `scope_expr` is parsed once and
/// reused across every request that carries that role, regardless of how
/// many distinct `PolicyEngine` call sites exist in a process — share one
/// `PolicyEngine` (it is cheap to clone) across the application.
#[derive(Clone)]
pub struct PolicyEngine {
    scopes: Arc<ScopeCache>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            scopes: Arc::new(ScopeCache::new()),
        }
    }

    /// Invalidate the cached compiled scope for a role whose `scope_expr`
    /// was just edited.
    pub fn invalidate_scope(&self, scope_expr: &str) {
        self.scopes.invalidate(scope_expr);
    }

    /// Authorize `(object_type, action)` for a principal holding `roles`.
    ///
    /// `labels` is `None` for an unscoped, action-only gate (e.g. the HTTP
    /// guard run before the target resource is loaded); `Some(labels)` for a
    /// per-resource check once the resource's labels are known. A role with a
    /// non-empty `scope_expr` only grants access when `labels` is supplied
    /// and the expression evaluates `true` against them — an unscoped check
    /// against a scoped role is the caller's responsibility to avoid for
    /// resource-sensitive actions.
    pub fn authorize(
        &self,
        roles: &[Arc<Role>],
        object_type: &str,
        action: &str,
        labels: Option<&LabelMap>,
    ) -> PolicyDecision {
        for role in roles {
            if !role.grants(object_type, action) {
                continue;
            }
            if role.scope_expr.is_empty() {
                return PolicyDecision::Allow;
            }
            let Some(labels) = labels else {
                // No labels to test the scope against; unscoped callers only
                // get through unscoped roles.
                continue;
            };
            match self.scopes.compile(&role.scope_expr) {
                Ok(evaluator) if evaluator.evaluate(labels) => return PolicyDecision::Allow,
                Ok(_) => continue,
                Err(err) => {
                    tracing::warn!(role = %role.name, error = %err, "scope expression failed to compile; treating as non-match");
                    continue;
                }
            }
        }
        PolicyDecision::Deny
    }

    /// Like [`authorize`](Self::authorize), but for a write that also
    /// mutates the given label keys: a role only authorizes the mutation if
    /// none of `mutated_keys` appears in its `immutable_keys`.
    pub fn authorize_label_mutation(
        &self,
        roles: &[Arc<Role>],
        object_type: &str,
        action: &str,
        labels: &LabelMap,
        mutated_keys: &[String],
    ) -> PolicyDecision {
        for role in roles {
            if !role.grants(object_type, action) {
                continue;
            }
            if mutated_keys.iter().any(|k| role.immutable_keys.contains(k)) {
                continue;
            }
            if role.scope_expr.is_empty() {
                return PolicyDecision::Allow;
            }
            match self.scopes.compile(&role.scope_expr) {
                Ok(evaluator) if evaluator.evaluate(labels) => return PolicyDecision::Allow,
                _ => continue,
            }
        }
        PolicyDecision::Deny
    }

    /// A resource is visible to the principal if any held role's scope
    /// expression evaluates `true` against its labels (an empty scope is
    /// unconstrained and always visible). Used for list filtering; does not
    /// check any particular action.
    pub fn is_visible(&self, roles: &[Arc<Role>], labels: &LabelMap) -> bool {
        roles.iter().any(|role| {
            if role.scope_expr.is_empty() {
                return true;
            }
            self.scopes
                .compile(&role.scope_expr)
                .map(|evaluator| evaluator.evaluate(labels))
                .unwrap_or(false)
        })
    }

    /// Validate label values supplied at `state:create` time against every
    /// held role's `create_constraints` — required keys must be present, and
    /// supplied values must fall within any declared allowed set.
    pub fn validate_create_constraints(
        &self,
        roles: &[Arc<Role>],
        labels: &LabelMap,
    ) -> Result<(), PolicyError> {
        for role in roles {
            for (key, constraint) in &role.create_constraints {
                let actual = labels.get(key);
                if constraint.required && actual.is_none() {
                    return Err(PolicyError::CreateConstraintViolation(format!(
                        "role '{}' requires label '{}'",
                        role.name, key
                    )));
                }
                if let Some(actual) = actual {
                    if !constraint.allowed_values.is_empty()
                        && !constraint.allowed_values.contains(actual)
                    {
                        return Err(PolicyError::CreateConstraintViolation(format!(
                            "role '{}' does not permit value of label '{}'",
                            role.name, key
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Grant;
    use std::collections::{BTreeMap, BTreeSet};

    fn role(name: &str, scope: &str, grants: &[(&str, &str)]) -> Arc<Role> {
        Arc::new(Role {
            name: name.to_string(),
            description: String::new(),
            scope_expr: scope.to_string(),
            create_constraints: BTreeMap::new(),
            immutable_keys: BTreeSet::new(),
            actions: grants.iter().map(|(o, a)| Grant::new(*o, *a)).collect(),
            version: 1,
        })
    }

    #[test]
    fn union_across_roles_any_allows() {
        let engine = PolicyEngine::new();
        let roles = vec![
            role("viewer", "", &[("tfstate", "read")]),
            role("writer", "", &[("tfstate", "write")]),
        ];
        assert_eq!(
            engine.authorize(&roles, "tfstate", "write", None),
            PolicyDecision::Allow
        );
        assert_eq!(
            engine.authorize(&roles, "tfstate", "lock", None),
            PolicyDecision::Deny
        );
    }

    #[test]
    fn scoped_role_requires_labels_and_match() {
        let engine = PolicyEngine::new();
        let roles = vec![role("dev-only", "env == \"dev\"", &[("tfstate", "read")])];
        assert_eq!(
            engine.authorize(&roles, "tfstate", "read", None),
            PolicyDecision::Deny
        );
        let mut dev_labels = LabelMap::new();
        dev_labels.insert("env".into(), grid_labels::LabelValue::Str("dev".into()));
        assert_eq!(
            engine.authorize(&roles, "tfstate", "read", Some(&dev_labels)),
            PolicyDecision::Allow
        );
        let mut prod_labels = LabelMap::new();
        prod_labels.insert("env".into(), grid_labels::LabelValue::Str("prod".into()));
        assert_eq!(
            engine.authorize(&roles, "tfstate", "read", Some(&prod_labels)),
            PolicyDecision::Deny
        );
    }

    #[test]
    fn immutable_keys_block_mutation() {
        let engine = PolicyEngine::new();
        let mut immutable = BTreeSet::new();
        immutable.insert("env".to_string());
        let r = Arc::new(Role {
            name: "labeler".into(),
            description: String::new(),
            scope_expr: String::new(),
            create_constraints: BTreeMap::new(),
            immutable_keys: immutable,
            actions: vec![Grant::new("tfstate", "update_labels")],
            version: 1,
        });
        let labels = LabelMap::new();
        assert_eq!(
            engine.authorize_label_mutation(
                &[r.clone()],
                "tfstate",
                "update_labels",
                &labels,
                &["team".to_string()]
            ),
            PolicyDecision::Allow
        );
        assert_eq!(
            engine.authorize_label_mutation(
                &[r],
                "tfstate",
                "update_labels",
                &labels,
                &["env".to_string()]
            ),
            PolicyDecision::Deny
        );
    }

    #[test]
    fn create_constraints_required_key_missing() {
        let engine = PolicyEngine::new();
        let mut constraints = BTreeMap::new();
        constraints.insert(
            "env".to_string(),
            crate::role::CreateConstraint {
                required: true,
                allowed_values: vec![],
            },
        );
        let r = Arc::new(Role {
            name: "creator".into(),
            description: String::new(),
            scope_expr: String::new(),
            create_constraints: constraints,
            immutable_keys: BTreeSet::new(),
            actions: vec![Grant::new("state", "create")],
            version: 1,
        });
        let labels = LabelMap::new();
        assert!(engine.validate_create_constraints(&[r], &labels).is_err());
    }
}
