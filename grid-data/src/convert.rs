//! Conversions between stored rows and the in-memory domain types
//! `grid-policy` and `grid-labels` operate on.

use crate::entities::RoleRow;
use grid_policy::{CreateConstraint, Grant, Role};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, thiserror::Error)]
pub enum RoleConversionError {
    #[error("malformed create_constraints JSON on role {0}: {1}")]
    CreateConstraints(String, serde_json::Error),
}

#[derive(Deserialize)]
struct RawCreateConstraint {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    allowed_values: Vec<grid_labels::LabelValue>,
}

impl TryFrom<&RoleRow> for Role {
    type Error = RoleConversionError;

    fn try_from(row: &RoleRow) -> Result<Self, Self::Error> {
        let raw: BTreeMap<String, RawCreateConstraint> =
            serde_json::from_value(row.create_constraints.clone())
                .map_err(|e| RoleConversionError::CreateConstraints(row.name.clone(), e))?;
        let create_constraints = raw
            .into_iter()
            .map(|(key, c)| {
                (
                    key,
                    CreateConstraint {
                        required: c.required,
                        allowed_values: c.allowed_values,
                    },
                )
            })
            .collect();

        Ok(Role {
            name: row.name.clone(),
            description: row.description.clone(),
            scope_expr: row.scope_expr.clone(),
            create_constraints,
            immutable_keys: row.immutable_keys.iter().cloned().collect::<BTreeSet<_>>(),
            actions: row.actions.iter().filter_map(|s| Grant::parse(s)).collect(),
            version: row.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role_row(create_constraints: serde_json::Value) -> RoleRow {
        RoleRow {
            id: uuid::Uuid::nil(),
            name: "writer".into(),
            description: "writes states".into(),
            scope_expr: "env == \"dev\"".into(),
            create_constraints,
            immutable_keys: vec!["env".into()],
            actions: vec!["tfstate:write".into(), "tfstate:read".into(), "not-a-grant".into()],
            version: 3,
        }
    }

    #[test]
    fn converts_row_fields_and_skips_unparseable_grants() {
        let row = role_row(json!({}));
        let role = Role::try_from(&row).unwrap();
        assert_eq!(role.name, "writer");
        assert_eq!(role.scope_expr, "env == \"dev\"");
        assert_eq!(role.version, 3);
        assert!(role.immutable_keys.contains("env"));
        assert_eq!(role.actions.len(), 2);
    }

    #[test]
    fn parses_create_constraints_required_and_allowed_values() {
        let row = role_row(json!({
            "env": { "required": true, "allowed_values": ["dev", "staging"] }
        }));
        let role = Role::try_from(&row).unwrap();
        let constraint = role.create_constraints.get("env").unwrap();
        assert!(constraint.required);
        assert_eq!(constraint.allowed_values.len(), 2);
    }

    #[test]
    fn malformed_create_constraints_surface_as_error() {
        let row = role_row(json!("not-an-object"));
        assert!(Role::try_from(&row).is_err());
    }
}
