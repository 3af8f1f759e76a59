use grid_authn::GridPrincipal;
use grid_data::{GridRepositories, RoleRow};
use grid_policy::PolicyCheck;
use r2e_core::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::RpcError;
use crate::role_catalog::RoleNameCache;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertRoleRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub scope_expr: String,
    #[serde(default)]
    pub create_constraints: Value,
    #[serde(default)]
    pub immutable_keys: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(flatten)]
    pub fields: UpsertRoleRequest,
    pub expected_version: i64,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: Uuid,
    pub role_name: String,
    #[serde(default)]
    pub scope_override: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnassignRoleRequest {
    pub user_id: Uuid,
    pub role_name: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupRoleMappingRequest {
    pub group_name: String,
    pub role_name: String,
    #[serde(default)]
    pub assigned_by: String,
}

/// Role, role-assignment, and group-role-mapping administration. Labels
/// don't apply to these resources, so every gate here is the unscoped
/// declarative `#[guard]`; `RoleNameCache::refresh` is invoked after any
/// mutation so readers through `Arc<dyn RoleCatalog>` see the change
/// immediately rather than waiting for the next scheduled tick.
#[derive(Controller)]
#[controller(path = "/api/v1", state = AppState)]
pub struct RolesController {
    #[inject]
    repos: GridRepositories,
    #[inject]
    role_cache: RoleNameCache,
}

async fn find_role_by_name(repos: &GridRepositories, name: &str) -> Result<RoleRow, RpcError> {
    repos
        .roles
        .find_by_name(name)
        .await
        .map_err(grid_data::GridError::from)?
        .ok_or_else(|| RpcError(grid_data::GridError::NotFound(format!("role '{name}' not found"))))
}

#[routes]
impl RolesController {
    #[post("/roles")]
    #[guard(PolicyCheck::action("create").on("role"))]
    async fn create_role(
        &self,
        #[inject(identity)] _identity: GridPrincipal,
        Json(body): Json<UpsertRoleRequest>,
    ) -> Result<Json<RoleRow>, RpcError> {
        let name = body.name;
        if self.repos.roles.find_by_name(&name).await.map_err(grid_data::GridError::from)?.is_some() {
            return Err(RpcError(grid_data::GridError::AlreadyExists(format!(
                "role '{name}' already exists"
            ))));
        }
        let row = RoleRow {
            id: Uuid::new_v4(),
            name,
            description: body.description,
            scope_expr: body.scope_expr,
            create_constraints: body.create_constraints,
            immutable_keys: body.immutable_keys,
            actions: body.actions,
            version: 1,
        };
        let inserted = self.repos.roles.insert(&row).await.map_err(grid_data::GridError::from)?;
        self.role_cache
            .refresh(&self.repos)
            .await
            .map_err(|e| RpcError(grid_data::GridError::Internal(e.to_string())))?;
        Ok(Json(inserted))
    }

    #[get("/roles/{name}")]
    #[guard(PolicyCheck::action("read").on("role"))]
    async fn get_role(
        &self,
        Path(name): Path<String>,
        #[inject(identity)] _identity: GridPrincipal,
    ) -> Result<Json<RoleRow>, RpcError> {
        Ok(Json(find_role_by_name(&self.repos, &name).await?))
    }

    #[put("/roles/{name}")]
    #[guard(PolicyCheck::action("update").on("role"))]
    async fn update_role(
        &self,
        Path(name): Path<String>,
        #[inject(identity)] _identity: GridPrincipal,
        Json(body): Json<UpdateRoleRequest>,
    ) -> Result<Json<RoleRow>, RpcError> {
        let existing = find_role_by_name(&self.repos, &name).await?;
        let row = RoleRow {
            id: existing.id,
            name: existing.name,
            description: body.fields.description,
            scope_expr: body.fields.scope_expr,
            create_constraints: body.fields.create_constraints,
            immutable_keys: body.fields.immutable_keys,
            actions: body.fields.actions,
            version: existing.version,
        };
        let updated = self
            .repos
            .roles
            .update(&row, body.expected_version)
            .await
            .map_err(grid_data::GridError::from)?
            .ok_or_else(|| {
                RpcError(grid_data::GridError::FailedPrecondition(
                    "role version mismatch: it was updated concurrently".into(),
                ))
            })?;
        self.role_cache
            .refresh(&self.repos)
            .await
            .map_err(|e| RpcError(grid_data::GridError::Internal(e.to_string())))?;
        Ok(Json(updated))
    }

    #[delete("/roles/{name}")]
    #[guard(PolicyCheck::action("delete").on("role"))]
    async fn delete_role(
        &self,
        Path(name): Path<String>,
        #[inject(identity)] _identity: GridPrincipal,
    ) -> Result<StatusCode, RpcError> {
        let existing = find_role_by_name(&self.repos, &name).await?;
        if self.repos.roles.has_assignments(existing.id).await.map_err(grid_data::GridError::from)? {
            return Err(RpcError(grid_data::GridError::FailedPrecondition(
                "role has active assignments and cannot be deleted".into(),
            )));
        }
        self.repos
            .roles
            .delete(&existing.id)
            .await
            .map_err(grid_data::GridError::from)?;
        self.role_cache
            .refresh(&self.repos)
            .await
            .map_err(|e| RpcError(grid_data::GridError::Internal(e.to_string())))?;
        Ok(StatusCode::NO_CONTENT)
    }

    #[post("/role-assignments")]
    #[guard(PolicyCheck::action("create").on("role_assignment"))]
    async fn assign_role(
        &self,
        #[inject(identity)] _identity: GridPrincipal,
        Json(body): Json<AssignRoleRequest>,
    ) -> Result<StatusCode, RpcError> {
        let role = find_role_by_name(&self.repos, &body.role_name).await?;
        self.repos
            .user_roles
            .insert(&grid_data::UserRoleRow {
                user_id: body.user_id,
                role_id: role.id,
                scope_override: body.scope_override,
            })
            .await
            .map_err(grid_data::GridError::from)?;
        Ok(StatusCode::CREATED)
    }

    #[delete("/role-assignments")]
    #[guard(PolicyCheck::action("delete").on("role_assignment"))]
    async fn unassign_role(
        &self,
        #[inject(identity)] _identity: GridPrincipal,
        Json(body): Json<UnassignRoleRequest>,
    ) -> Result<StatusCode, RpcError> {
        let role = find_role_by_name(&self.repos, &body.role_name).await?;
        let removed = self
            .repos
            .user_roles
            .delete(body.user_id, role.id)
            .await
            .map_err(grid_data::GridError::from)?;
        if !removed {
            return Err(RpcError(grid_data::GridError::NotFound(
                "role assignment not found".into(),
            )));
        }
        Ok(StatusCode::NO_CONTENT)
    }

    #[post("/group-role-mappings")]
    #[guard(PolicyCheck::action("create").on("group_role_mapping"))]
    async fn add_group_mapping(
        &self,
        #[inject(identity)] _identity: GridPrincipal,
        Json(body): Json<GroupRoleMappingRequest>,
    ) -> Result<StatusCode, RpcError> {
        let role = find_role_by_name(&self.repos, &body.role_name).await?;
        self.repos
            .group_roles
            .insert(&grid_data::GroupRoleRow {
                group_name: body.group_name,
                role_id: role.id,
                assigned_by: body.assigned_by,
            })
            .await
            .map_err(grid_data::GridError::from)?;
        Ok(StatusCode::CREATED)
    }

    #[delete("/group-role-mappings")]
    #[guard(PolicyCheck::action("delete").on("group_role_mapping"))]
    async fn remove_group_mapping(
        &self,
        #[inject(identity)] _identity: GridPrincipal,
        Json(body): Json<GroupRoleMappingRequest>,
    ) -> Result<StatusCode, RpcError> {
        let role = find_role_by_name(&self.repos, &body.role_name).await?;
        let removed = self
            .repos
            .group_roles
            .delete(&body.group_name, role.id)
            .await
            .map_err(grid_data::GridError::from)?;
        if !removed {
            return Err(RpcError(grid_data::GridError::NotFound(
                "group role mapping not found".into(),
            )));
        }
        Ok(StatusCode::NO_CONTENT)
    }
}
