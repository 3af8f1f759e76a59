//! Shared helpers the RPC controllers use for the per-resource label-scope
//! checks a declarative `#[guard]` can't express (the guard runs before the
//! resource is loaded; these run once the handler has it in hand).

use grid_labels::LabelMap;
use grid_policy::{PolicyEngine, Role, RoleCatalog};
use serde_json::Value;
use std::sync::Arc;

use crate::error::RpcError;

pub fn roles_for(catalog: &Arc<dyn RoleCatalog>, role_names: &[String]) -> Vec<Arc<Role>> {
    catalog.roles_for(role_names)
}

pub fn labels_from_json(value: &Value) -> LabelMap {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// Runs a per-resource `PolicyEngine::authorize` check, turning a denial into
/// the same `PermissionDenied` response the RPC error table maps to 403.
pub fn require_authorized(
    policy: &PolicyEngine,
    roles: &[Arc<Role>],
    object_type: &str,
    action: &str,
    labels: &LabelMap,
) -> Result<(), RpcError> {
    if policy.authorize(roles, object_type, action, Some(labels)).is_allow() {
        Ok(())
    } else {
        Err(RpcError(grid_data::GridError::PermissionDenied(format!(
            "role grants do not permit {action} on this {object_type}"
        ))))
    }
}
