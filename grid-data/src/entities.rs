use chrono::{DateTime, Utc};
use r2e_data::Entity;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Row for the `states` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StateRow {
    pub guid: Uuid,
    pub logic_id: String,
    pub labels: Value,
    pub content: Option<Value>,
    pub serial: i64,
    pub locked: bool,
    pub lock_id: Option<String>,
    pub lock_operation: Option<String>,
    pub lock_who: Option<String>,
    pub lock_version: Option<String>,
    pub lock_created: Option<DateTime<Utc>>,
    pub lock_path: Option<String>,
    pub lock_owner_principal_id: Option<Uuid>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for StateRow {
    type Id = Uuid;
    fn table_name() -> &'static str {
        "states"
    }
    fn id_column() -> &'static str {
        "guid"
    }
    fn columns() -> &'static [&'static str] {
        &[
            "guid",
            "logic_id",
            "labels",
            "content",
            "serial",
            "locked",
            "lock_id",
            "lock_operation",
            "lock_who",
            "lock_version",
            "lock_created",
            "lock_path",
            "lock_owner_principal_id",
            "deleted",
            "created_at",
            "updated_at",
        ]
    }
    fn id(&self) -> &Uuid {
        &self.guid
    }
}

/// Row for the `state_outputs` cache table.
///
/// Carries a per-output `value_digest` so `AddDependency` and the
/// Edge-Update Job can seed/compare fingerprints without re-parsing
/// `content` (see the digest-column design decision recorded in DESIGN.md).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StateOutputRow {
    pub state_guid: Uuid,
    pub output_key: String,
    pub sensitive: bool,
    pub state_serial: i64,
    pub value_digest: String,
    pub validation_status: String,
}

/// Row for the `edges` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EdgeRow {
    pub id: i64,
    pub from_state: Uuid,
    pub from_output: String,
    pub to_state: Uuid,
    pub to_input_name: String,
    pub status: String,
    pub in_digest: String,
    pub out_digest: String,
    pub last_in_at: Option<DateTime<Utc>>,
    pub last_out_at: Option<DateTime<Utc>>,
    pub mock_value: Option<Value>,
    pub validation_status: String,
}

impl Entity for EdgeRow {
    type Id = i64;
    fn table_name() -> &'static str {
        "edges"
    }
    fn id_column() -> &'static str {
        "id"
    }
    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "from_state",
            "from_output",
            "to_state",
            "to_input_name",
            "status",
            "in_digest",
            "out_digest",
            "last_in_at",
            "last_out_at",
            "mock_value",
            "validation_status",
        ]
    }
    fn id(&self) -> &i64 {
        &self.id
    }
}

/// Row for the `roles` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub scope_expr: String,
    /// JSON map: `{"<key>": {"required": bool, "allowed_values": [..]}}`
    pub create_constraints: Value,
    pub immutable_keys: Vec<String>,
    /// `"objectType:action"` strings.
    pub actions: Vec<String>,
    pub version: i64,
}

impl Entity for RoleRow {
    type Id = Uuid;
    fn table_name() -> &'static str {
        "roles"
    }
    fn id_column() -> &'static str {
        "id"
    }
    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "name",
            "description",
            "scope_expr",
            "create_constraints",
            "immutable_keys",
            "actions",
            "version",
        ]
    }
    fn id(&self) -> &Uuid {
        &self.id
    }
}

/// Row for the `user_roles` direct-assignment table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRoleRow {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub scope_override: Option<String>,
}

/// Row for the `group_roles` mapping table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupRoleRow {
    pub group_name: String,
    pub role_id: Uuid,
    pub assigned_by: String,
}

/// Row for the `sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub principal_kind: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub revoked: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Entity for SessionRow {
    type Id = Uuid;
    fn table_name() -> &'static str {
        "sessions"
    }
    fn id_column() -> &'static str {
        "id"
    }
    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "principal_id",
            "principal_kind",
            "created_at",
            "last_used_at",
            "revoked",
            "expires_at",
        ]
    }
    fn id(&self) -> &Uuid {
        &self.id
    }
}

/// Row for the singular current `label_policies` row (the latest version is
/// authoritative; historical versions are retained for audit).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LabelPolicyRow {
    pub version: i64,
    pub max_keys: i32,
    pub max_value_len: i32,
    /// `{"<key>": {"allowed_values": [..], "required": bool}}`
    pub allowed_keys: Value,
}
