use grid_authn::GridPrincipal;
use grid_data::GridRepositories;
use grid_labels::LabelMap;
use grid_policy::{PolicyCheck, PolicyEngine, RoleCatalog};
use grid_state::{StateRef, StateService};
use r2e_core::prelude::*;
use r2e_data::Repository;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::authz::{labels_from_json, require_authorized, roles_for};
use crate::error::RpcError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateStateRequest {
    pub guid: Option<Uuid>,
    pub logic_id: String,
    #[serde(default)]
    pub labels: LabelMap,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLabelsRequest {
    #[serde(default)]
    pub add: LabelMap,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// State CRUD, label management, and the composite info/config views.
///
/// Unscoped `tfstate:*` gates run declaratively; checks that need a
/// resource's labels (read, update_labels) run inline once the state row is
/// loaded, via [`PolicyEngine::authorize`] with `Some(labels)`.
#[derive(Controller)]
#[controller(path = "/api/v1/states", state = AppState)]
pub struct StatesController {
    #[inject]
    state_service: StateService,
    #[inject]
    policy: PolicyEngine,
    #[inject]
    role_catalog: Arc<dyn RoleCatalog>,
    #[inject]
    repos: GridRepositories,
}

#[routes]
impl StatesController {
    #[post("")]
    #[guard(PolicyCheck::action("create").on("tfstate"))]
    async fn create(
        &self,
        #[inject(identity)] identity: GridPrincipal,
        Json(body): Json<CreateStateRequest>,
    ) -> Result<Json<grid_state::CreateStateResponse>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let guid = body.guid.unwrap_or_else(Uuid::new_v4);
        let response = self
            .state_service
            .create_state(guid, body.logic_id, body.labels, &roles)
            .await?;
        Ok(Json(response))
    }

    #[get("/{guid}")]
    async fn get_by_guid(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<grid_data::StateRow>, RpcError> {
        let state = self.state_service.get_by_guid(guid).await?;
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = labels_from_json(&state.labels);
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        Ok(Json(state))
    }

    #[get("/by-logic-id/{logic_id}")]
    async fn get_by_logic_id(
        &self,
        Path(logic_id): Path<String>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<grid_data::StateRow>, RpcError> {
        let state = self.state_service.get_by_logic_id(&logic_id).await?;
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = labels_from_json(&state.labels);
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        Ok(Json(state))
    }

    #[get("/{guid}/config")]
    async fn get_config(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<grid_state::StateConfig>, RpcError> {
        let state = self.state_service.get_by_guid(guid).await?;
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = labels_from_json(&state.labels);
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        let config = self.state_service.get_state_config(&state.logic_id).await?;
        Ok(Json(config))
    }

    #[get("")]
    async fn list(
        &self,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<Vec<grid_data::StateRow>>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let all = self.repos.states.find_all().await.map_err(grid_data::GridError::from)?;
        let visible = all
            .into_iter()
            .filter(|row| self.policy.is_visible(&roles, &labels_from_json(&row.labels)))
            .collect();
        Ok(Json(visible))
    }

    #[post("/{guid}/labels")]
    async fn update_labels(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
        Json(body): Json<UpdateLabelsRequest>,
    ) -> Result<StatusCode, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        self.state_service
            .update_labels(guid, body.add, body.remove, &roles)
            .await?;
        Ok(StatusCode::OK)
    }

    #[get("/{guid}/outputs")]
    async fn outputs(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<Vec<String>>, RpcError> {
        let state = self.state_service.get_by_guid(guid).await?;
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = labels_from_json(&state.labels);
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        let keys = self.state_service.get_output_keys(guid).await?;
        Ok(Json(keys))
    }

    #[get("/{guid}/info")]
    async fn info(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<grid_state::StateInfo>, RpcError> {
        let info = self.state_service.get_state_info(StateRef::Guid(guid)).await?;
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = labels_from_json(&info.state.labels);
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        Ok(Json(info))
    }
}
