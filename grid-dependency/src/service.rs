use crate::backend::{backend_config_for, BackendConfig};
use crate::graph::{topological_layers, would_cycle, Direction};
use crate::status::{derive_status, EdgeStatus};
use chrono::Utc;
use grid_data::{EdgeRow, GridError, GridRepositories};
use r2e_data::Repository;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Either a state's guid or its `logic_id`, as accepted by `AddDependency`'s
/// `from`/`to` fields.
#[derive(Debug, Clone)]
pub enum StateRef {
    Guid(Uuid),
    LogicId(String),
}

#[derive(Debug, Clone)]
pub struct AddDependencyRequest {
    pub from: StateRef,
    pub from_output: String,
    pub to: StateRef,
    /// Defaults to `"{from_logic_id}_{from_output}"` when absent.
    pub to_input_name: Option<String>,
    /// Pre-deployment placeholder value; when the producer has no cached
    /// output yet, a supplied mock seeds the edge as `mock` instead of
    /// `pending` (§4.5 step 3).
    pub mock_value: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddDependencyResponse {
    pub edge: EdgeRow,
    pub already_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeStatusSummary {
    pub incoming_clean: u32,
    pub incoming_dirty: u32,
    pub incoming_pending: u32,
    pub incoming_unknown: u32,
    pub terminal_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    pub producers: Vec<DependencyGraphProducer>,
    pub edges: Vec<EdgeRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraphProducer {
    pub guid: Uuid,
    pub logic_id: String,
    pub backend_config: BackendConfig,
}

/// Edge lifecycle, cycle prevention, topological layering, and status
/// rollup over Grid's dependency graph (the producer/consumer edges between
/// states).
#[derive(Clone)]
pub struct DependencyService {
    repos: GridRepositories,
    backend_base_url: String,
}

impl DependencyService {
    pub fn new(repos: GridRepositories, backend_base_url: impl Into<String>) -> Self {
        Self {
            repos,
            backend_base_url: backend_base_url.into(),
        }
    }

    async fn resolve(&self, r: &StateRef) -> Result<grid_data::StateRow, GridError> {
        let found = match r {
            StateRef::Guid(guid) => self.repos.states.find_by_id(guid).await?,
            StateRef::LogicId(logic_id) => self.repos.states.find_by_logic_id(logic_id).await?,
        };
        found.ok_or_else(|| GridError::NotFound("state not found".into()))
    }

    pub async fn add_dependency(
        &self,
        req: AddDependencyRequest,
    ) -> Result<AddDependencyResponse, GridError> {
        let from_state = self.resolve(&req.from).await?;
        let to_state = self.resolve(&req.to).await?;

        let to_input_name = req
            .to_input_name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", from_state.logic_id, req.from_output));

        if let Some(existing) = self
            .repos
            .edges
            .find_by_from_output_and_to(from_state.guid, &req.from_output, to_state.guid)
            .await?
        {
            return Ok(AddDependencyResponse {
                edge: existing,
                already_exists: true,
            });
        }

        let adjacency = self.repos.edges.all_adjacency().await?;
        if would_cycle(&adjacency, from_state.guid, to_state.guid) {
            return Err(GridError::FailedPrecondition(
                "adding this edge would create a cycle in the dependency graph".into(),
            ));
        }

        let cached_output = self
            .repos
            .state_outputs
            .find_one(from_state.guid, &req.from_output)
            .await?;
        let (in_digest, validation_status) = match &cached_output {
            Some(row) => (row.value_digest.clone(), row.validation_status.clone()),
            None => (String::new(), "valid".to_string()),
        };

        let row = if cached_output.is_none() && req.mock_value.is_some() {
            EdgeRow {
                id: 0,
                from_state: from_state.guid,
                from_output: req.from_output,
                to_state: to_state.guid,
                to_input_name,
                status: EdgeStatus::Mock.as_str().to_string(),
                in_digest,
                out_digest: String::new(),
                last_in_at: None,
                last_out_at: None,
                mock_value: req.mock_value,
                validation_status,
            }
        } else {
            let status = derive_status(&in_digest, "", &validation_status, cached_output.is_some());
            EdgeRow {
                id: 0,
                from_state: from_state.guid,
                from_output: req.from_output,
                to_state: to_state.guid,
                to_input_name,
                status: status.as_str().to_string(),
                in_digest,
                out_digest: String::new(),
                last_in_at: cached_output.as_ref().map(|_| Utc::now()),
                last_out_at: None,
                mock_value: None,
                validation_status,
            }
        };

        let inserted = match self.repos.edges.insert(&row).await {
            Ok(inserted) => inserted,
            Err(err) if is_unique_violation(&err) => {
                // Lost a race against a concurrent AddDependency for the same
                // (to_state, to_input_name) slot.
                return Err(GridError::FailedPrecondition(
                    "conflicting edge already targets this input".into(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(AddDependencyResponse {
            edge: inserted,
            already_exists: false,
        })
    }

    pub async fn remove_dependency(&self, edge_id: i64) -> Result<(), GridError> {
        let removed = self.repos.edges.delete(&edge_id).await?;
        if !removed {
            return Err(GridError::NotFound(format!("edge {edge_id} not found")));
        }
        Ok(())
    }

    pub async fn list_dependencies(&self, state: Uuid) -> Result<Vec<EdgeRow>, GridError> {
        Ok(self.repos.edges.find_incoming(state).await?)
    }

    pub async fn list_dependents(&self, state: Uuid) -> Result<Vec<EdgeRow>, GridError> {
        Ok(self.repos.edges.find_outgoing(state).await?)
    }

    pub async fn search_by_output(&self, key: &str) -> Result<Vec<EdgeRow>, GridError> {
        Ok(self.repos.edges.search_by_output(key).await?)
    }

    pub async fn list_all_edges(&self) -> Result<Vec<EdgeRow>, GridError> {
        Ok(self.repos.edges.find_all_edges().await?)
    }

    pub async fn get_topological_order(
        &self,
        state: Uuid,
        direction: &str,
    ) -> Result<Vec<Vec<Uuid>>, GridError> {
        let direction = Direction::parse(direction).ok_or_else(|| {
            GridError::InvalidArgument(format!("unknown direction: {direction}"))
        })?;
        let adjacency = self.repos.edges.all_adjacency().await?;
        topological_layers(&adjacency, state, direction)
            .map_err(|e| GridError::Internal(e.to_string()))
    }

    pub async fn get_state_status(&self, state: Uuid) -> Result<EdgeStatusSummary, GridError> {
        let incoming = self.repos.edges.find_incoming(state).await?;

        let mut clean = 0u32;
        let mut dirty = 0u32;
        let mut pending = 0u32;
        let mut unknown = 0u32;

        for edge in &incoming {
            match EdgeStatus::parse(&edge.status) {
                Some(s) if s.is_clean() => clean += 1,
                Some(s) if s.is_dirty() => dirty += 1,
                Some(EdgeStatus::Pending) | Some(EdgeStatus::Mock) => pending += 1,
                Some(EdgeStatus::MissingOutput) | None => unknown += 1,
                _ => unreachable!(),
            }
        }

        // "clean if all clean" is vacuously true with no incoming edges.
        let terminal_status = if dirty > 0 {
            "stale"
        } else if clean as usize == incoming.len() {
            "clean"
        } else {
            "pending"
        };

        Ok(EdgeStatusSummary {
            incoming_clean: clean,
            incoming_dirty: dirty,
            incoming_pending: pending,
            incoming_unknown: unknown,
            terminal_status: terminal_status.to_string(),
        })
    }

    pub async fn get_dependency_graph(&self, consumer: Uuid) -> Result<DependencyGraph, GridError> {
        let edges = self.repos.edges.find_incoming(consumer).await?;

        let mut producer_guids: Vec<Uuid> = edges.iter().map(|e| e.from_state).collect();
        producer_guids.sort();
        producer_guids.dedup();

        let producer_rows = self.repos.states.find_by_guids(&producer_guids).await?;
        let producers = producer_rows
            .into_iter()
            .map(|row| DependencyGraphProducer {
                backend_config: backend_config_for(&self.backend_base_url, row.guid),
                guid: row.guid,
                logic_id: row.logic_id,
            })
            .collect();

        Ok(DependencyGraph { producers, edges })
    }
}

fn is_unique_violation(err: &r2e_data::DataError) -> bool {
    match err {
        r2e_data::DataError::Database(e) => e
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|e| e.is_unique_violation())
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_to_input_name_matches_spec_convention() {
        let from_logic_id = "svc-a";
        let output = "vpc_id";
        assert_eq!(format!("{from_logic_id}_{output}"), "svc-a_vpc_id");
    }
}
