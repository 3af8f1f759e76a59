use grid_authn::GridPrincipal;
use grid_data::{EdgeRow, GridRepositories};
use grid_dependency::{AddDependencyRequest, DependencyService, StateRef};
use grid_policy::{PolicyCheck, PolicyEngine, RoleCatalog};
use r2e_core::prelude::*;
use r2e_data::Repository;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::authz::{labels_from_json, require_authorized, roles_for};
use crate::error::RpcError;
use crate::state::AppState;

fn parse_ref(raw: &str) -> StateRef {
    match Uuid::parse_str(raw) {
        Ok(guid) => StateRef::Guid(guid),
        Err(_) => StateRef::LogicId(raw.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct AddDependencyBody {
    pub from: String,
    pub from_output: String,
    pub to: String,
    #[serde(default)]
    pub to_input_name: Option<String>,
    #[serde(default)]
    pub mock_value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub output_key: String,
}

#[derive(Debug, Deserialize)]
pub struct TopologyQuery {
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "downstream".to_string()
}

/// Dependency-graph CRUD and read projections. `DependencyService` has no
/// policy dependency of its own (edges carry no labels), so every
/// authorization decision — including the both-endpoints-visible rule for
/// list/search/graph endpoints — happens here, against the producer/consumer
/// states' labels.
#[derive(Controller)]
#[controller(path = "/api/v1", state = AppState)]
pub struct DependenciesController {
    #[inject]
    dependency_service: DependencyService,
    #[inject]
    policy: PolicyEngine,
    #[inject]
    role_catalog: Arc<dyn RoleCatalog>,
    #[inject]
    repos: GridRepositories,
}

impl DependenciesController {
    async fn state_labels(&self, guid: Uuid) -> Result<grid_labels::LabelMap, RpcError> {
        let row = self
            .repos
            .states
            .find_by_id(&guid)
            .await
            .map_err(grid_data::GridError::from)?
            .ok_or_else(|| grid_data::GridError::NotFound(format!("state {guid} not found")))?;
        Ok(labels_from_json(&row.labels))
    }

    async fn edge_visible(&self, roles: &[Arc<grid_policy::Role>], edge: &EdgeRow) -> bool {
        let from_labels = self
            .repos
            .states
            .find_by_id(&edge.from_state)
            .await
            .ok()
            .flatten()
            .map(|r| labels_from_json(&r.labels))
            .unwrap_or_default();
        let to_labels = self
            .repos
            .states
            .find_by_id(&edge.to_state)
            .await
            .ok()
            .flatten()
            .map(|r| labels_from_json(&r.labels))
            .unwrap_or_default();
        self.policy.is_visible(roles, &from_labels) && self.policy.is_visible(roles, &to_labels)
    }
}

#[routes]
impl DependenciesController {
    #[post("/dependencies")]
    #[guard(PolicyCheck::action("create").on("dependency"))]
    async fn add(
        &self,
        #[inject(identity)] identity: GridPrincipal,
        Json(body): Json<AddDependencyBody>,
    ) -> Result<Json<grid_dependency::AddDependencyResponse>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let from = parse_ref(&body.from);
        let to = parse_ref(&body.to);

        if let StateRef::Guid(guid) = &from {
            let labels = self.state_labels(*guid).await?;
            require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        }
        if let StateRef::Guid(guid) = &to {
            let labels = self.state_labels(*guid).await?;
            require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        }

        let response = self
            .dependency_service
            .add_dependency(AddDependencyRequest {
                from,
                from_output: body.from_output,
                to,
                to_input_name: body.to_input_name,
                mock_value: body.mock_value,
            })
            .await?;
        Ok(Json(response))
    }

    #[delete("/dependencies/{id}")]
    #[guard(PolicyCheck::action("delete").on("dependency"))]
    async fn remove(
        &self,
        Path(id): Path<i64>,
        #[inject(identity)] _identity: GridPrincipal,
    ) -> Result<StatusCode, RpcError> {
        self.dependency_service.remove_dependency(id).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    #[get("/states/{guid}/dependencies")]
    async fn dependencies(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<Vec<EdgeRow>>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let edges = self.dependency_service.list_dependencies(guid).await?;
        let mut visible = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.edge_visible(&roles, &edge).await {
                visible.push(edge);
            }
        }
        Ok(Json(visible))
    }

    #[get("/states/{guid}/dependents")]
    async fn dependents(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<Vec<EdgeRow>>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let edges = self.dependency_service.list_dependents(guid).await?;
        let mut visible = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.edge_visible(&roles, &edge).await {
                visible.push(edge);
            }
        }
        Ok(Json(visible))
    }

    #[get("/dependencies/search")]
    async fn search(
        &self,
        Query(query): Query<SearchQuery>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<Vec<EdgeRow>>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let edges = self.dependency_service.search_by_output(&query.output_key).await?;
        let mut visible = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.edge_visible(&roles, &edge).await {
                visible.push(edge);
            }
        }
        Ok(Json(visible))
    }

    #[get("/dependencies")]
    async fn list_all(
        &self,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<Vec<EdgeRow>>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let edges = self.dependency_service.list_all_edges().await?;
        let mut visible = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.edge_visible(&roles, &edge).await {
                visible.push(edge);
            }
        }
        Ok(Json(visible))
    }

    #[get("/states/{guid}/topology")]
    async fn topology(
        &self,
        Path(guid): Path<Uuid>,
        Query(query): Query<TopologyQuery>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<Vec<Vec<Uuid>>>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = self.state_labels(guid).await?;
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        let layers = self
            .dependency_service
            .get_topological_order(guid, &query.direction)
            .await?;
        Ok(Json(layers))
    }

    #[get("/states/{guid}/status")]
    async fn status(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<grid_dependency::EdgeStatusSummary>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = self.state_labels(guid).await?;
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        let summary = self.dependency_service.get_state_status(guid).await?;
        Ok(Json(summary))
    }

    #[get("/states/{guid}/graph")]
    async fn graph(
        &self,
        Path(guid): Path<Uuid>,
        #[inject(identity)] identity: GridPrincipal,
    ) -> Result<Json<grid_dependency::DependencyGraph>, RpcError> {
        let roles = roles_for(&self.role_catalog, &identity.roles);
        let labels = self.state_labels(guid).await?;
        require_authorized(&self.policy, &roles, "tfstate", "read", &labels)?;
        let mut graph = self.dependency_service.get_dependency_graph(guid).await?;
        let mut visible_producers = Vec::with_capacity(graph.producers.len());
        let mut visible_edges = Vec::with_capacity(graph.edges.len());
        for edge in graph.edges.drain(..) {
            if self.edge_visible(&roles, &edge).await {
                visible_edges.push(edge);
            }
        }
        for producer in graph.producers.drain(..) {
            let labels = self.state_labels(producer.guid).await.unwrap_or_default();
            if self.policy.is_visible(&roles, &labels) {
                visible_producers.push(producer);
            }
        }
        graph.producers = visible_producers;
        graph.edges = visible_edges;
        Ok(Json(graph))
    }
}
