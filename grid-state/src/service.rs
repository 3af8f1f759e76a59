use crate::labels::validate_labels;
use crate::trigger::EdgeUpdateTrigger;
use chrono::Utc;
use grid_data::{EdgeRow, GridError, GridRepositories, StateOutputRow, StateRow};
use grid_dependency::{backend_config_for, BackendConfig};
use grid_labels::LabelMap;
use grid_policy::{PolicyEngine, Role};
use r2e_data::Repository;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Default soft-warning threshold for state document size (10 MiB) — large
/// enough that ordinary Terraform states never trip it, small enough to
/// flag runaway state bloat before it becomes a real operational problem.
pub const DEFAULT_SIZE_WARNING_THRESHOLD_BYTES: usize = 10 * 1024 * 1024;

/// Either a state's guid or its `logic_id`.
#[derive(Debug, Clone)]
pub enum StateRef {
    Guid(Uuid),
    LogicId(String),
}

#[derive(Debug, Clone)]
pub struct LockInfo {
    pub id: String,
    pub operation: String,
    pub who: String,
    pub version: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStateResponse {
    pub guid: Uuid,
    pub backend_config: BackendConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateConfig {
    pub guid: Uuid,
    pub backend_config: BackendConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateStateContentResponse {
    pub serial: i64,
    pub size_bytes: usize,
    pub size_warning: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateInfo {
    pub state: StateRow,
    pub outputs: Vec<StateOutputRow>,
    pub incoming_edges: Vec<EdgeRow>,
    pub outgoing_edges: Vec<EdgeRow>,
}

/// Business rules over Terraform state: creation, lock/unlock, the atomic
/// content+outputs write, and label management.
#[derive(Clone)]
pub struct StateService {
    repos: GridRepositories,
    policy: PolicyEngine,
    edge_trigger: Arc<dyn EdgeUpdateTrigger>,
    backend_base_url: String,
    size_warning_threshold_bytes: usize,
}

impl StateService {
    pub fn new(
        repos: GridRepositories,
        policy: PolicyEngine,
        edge_trigger: Arc<dyn EdgeUpdateTrigger>,
        backend_base_url: impl Into<String>,
    ) -> Self {
        Self {
            repos,
            policy,
            edge_trigger,
            backend_base_url: backend_base_url.into(),
            size_warning_threshold_bytes: DEFAULT_SIZE_WARNING_THRESHOLD_BYTES,
        }
    }

    pub fn with_size_warning_threshold_bytes(mut self, bytes: usize) -> Self {
        self.size_warning_threshold_bytes = bytes;
        self
    }

    async fn resolve(&self, r: &StateRef) -> Result<StateRow, GridError> {
        let found = match r {
            StateRef::Guid(guid) => self.repos.states.find_by_id(guid).await?,
            StateRef::LogicId(logic_id) => self.repos.states.find_by_logic_id(logic_id).await?,
        };
        found.ok_or_else(|| GridError::NotFound("state not found".into()))
    }

    pub async fn create_state(
        &self,
        guid: Uuid,
        logic_id: String,
        labels: LabelMap,
        roles: &[Arc<Role>],
    ) -> Result<CreateStateResponse, GridError> {
        if self.repos.states.find_by_logic_id(&logic_id).await?.is_some() {
            return Err(GridError::AlreadyExists(format!(
                "state with logic_id '{logic_id}' already exists"
            )));
        }

        if let Some(policy_row) = self.repos.label_policies.get_current().await? {
            validate_labels(&policy_row, &labels)?;
        }
        self.policy.validate_create_constraints(roles, &labels)?;

        let labels_json = labels_to_json(&labels);
        let row = StateRow {
            guid,
            logic_id,
            labels: labels_json,
            content: None,
            serial: 0,
            locked: false,
            lock_id: None,
            lock_operation: None,
            lock_who: None,
            lock_version: None,
            lock_created: None,
            lock_path: None,
            lock_owner_principal_id: None,
            deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let inserted = self.repos.states.insert(&row).await?;

        Ok(CreateStateResponse {
            guid: inserted.guid,
            backend_config: backend_config_for(&self.backend_base_url, inserted.guid),
        })
    }

    pub async fn get_by_guid(&self, guid: Uuid) -> Result<StateRow, GridError> {
        self.resolve(&StateRef::Guid(guid)).await
    }

    pub async fn get_by_logic_id(&self, logic_id: &str) -> Result<StateRow, GridError> {
        self.resolve(&StateRef::LogicId(logic_id.to_string())).await
    }

    pub async fn get_batch(&self, guids: &[Uuid]) -> Result<Vec<StateRow>, GridError> {
        Ok(self.repos.states.find_by_guids(guids).await?)
    }

    pub async fn get_state_config(&self, logic_id: &str) -> Result<StateConfig, GridError> {
        let state = self.get_by_logic_id(logic_id).await?;
        Ok(StateConfig {
            guid: state.guid,
            backend_config: backend_config_for(&self.backend_base_url, state.guid),
        })
    }

    pub async fn lock_state(
        &self,
        guid: Uuid,
        lock_info: LockInfo,
        owner_principal_id: Uuid,
    ) -> Result<(), GridError> {
        let state = self.get_by_guid(guid).await?;
        if state.locked {
            return Err(GridError::FailedPrecondition("locked".into()));
        }
        self.repos
            .states
            .set_lock(
                guid,
                &lock_info.id,
                &lock_info.operation,
                &lock_info.who,
                &lock_info.version,
                &lock_info.path,
                owner_principal_id,
            )
            .await?;
        Ok(())
    }

    pub async fn unlock_state(&self, guid: Uuid, lock_id: &str) -> Result<(), GridError> {
        let state = self.get_by_guid(guid).await?;
        if !state.locked {
            return Err(GridError::FailedPrecondition("not locked".into()));
        }
        if state.lock_id.as_deref() != Some(lock_id) {
            return Err(GridError::Conflict(
                "lock id does not match the current lock".into(),
            ));
        }
        self.repos.states.clear_lock(guid).await?;
        Ok(())
    }

    /// The hardest path: validate, gate on the lock, and atomically replace
    /// `content` plus the output cache, then best-effort kick the
    /// Edge-Update Job.
    pub async fn update_state_content(
        &self,
        guid: Uuid,
        bytes: &[u8],
        lock_id: Option<&str>,
    ) -> Result<UpdateStateContentResponse, GridError> {
        if !grid_fingerprint::is_well_formed_json(bytes) {
            return Err(GridError::InvalidArgument(
                "state content is not well-formed JSON".into(),
            ));
        }

        let state = self.get_by_guid(guid).await?;
        if state.locked {
            let matches = state.lock_id.as_deref() == lock_id;
            if !matches {
                return Err(GridError::FailedPrecondition("locked".into()));
            }
        }

        let parsed = grid_fingerprint::parse_outputs(bytes)
            .map_err(|e| GridError::InvalidArgument(e.to_string()))?;
        let content: Value = serde_json::from_slice(bytes)
            .map_err(|e| GridError::InvalidArgument(format!("invalid state JSON: {e}")))?;

        let mut tx = self
            .repos
            .states
            .pool()
            .begin()
            .await
            .map_err(|e| GridError::Internal(e.to_string()))?;

        sqlx::query(
            "UPDATE states SET content = $2, serial = $3, updated_at = now() WHERE guid = $1",
        )
        .bind(guid)
        .bind(&content)
        .bind(parsed.serial)
        .execute(&mut *tx)
        .await
        .map_err(|e| GridError::Internal(e.to_string()))?;

        grid_data::repositories::state_output::StateOutputRepository::delete_stale(
            &mut *tx,
            guid,
            parsed.serial,
        )
        .await?;

        for (key, value) in &parsed.values {
            let digest = grid_fingerprint::fingerprint(value);
            let meta = parsed.meta.get(key);
            let row = StateOutputRow {
                state_guid: guid,
                output_key: key.clone(),
                sensitive: meta.map(|m| m.sensitive).unwrap_or(false),
                state_serial: parsed.serial,
                value_digest: digest,
                validation_status: "valid".to_string(),
            };
            grid_data::repositories::state_output::StateOutputRepository::upsert(&mut *tx, &row)
                .await?;
        }

        tx.commit().await.map_err(|e| GridError::Internal(e.to_string()))?;

        let size_bytes = bytes.len();
        let size_warning = size_bytes > self.size_warning_threshold_bytes;

        self.edge_trigger.trigger(guid);

        Ok(UpdateStateContentResponse {
            serial: parsed.serial,
            size_bytes,
            size_warning,
        })
    }

    pub async fn update_labels(
        &self,
        guid: Uuid,
        adds: LabelMap,
        removals: Vec<String>,
        roles: &[Arc<Role>],
    ) -> Result<(), GridError> {
        let state = self.get_by_guid(guid).await?;
        let mut current = json_to_labels(&state.labels);

        let mut mutated_keys: Vec<String> = adds.keys().cloned().collect();
        mutated_keys.extend(removals.iter().cloned());

        let decision =
            self.policy
                .authorize_label_mutation(roles, "tfstate", "update_labels", &current, &mutated_keys);
        if !decision.is_allow() {
            return Err(GridError::PermissionDenied(
                "one or more labels are immutable under the caller's roles".into(),
            ));
        }

        for key in &removals {
            current.remove(key);
        }
        for (key, value) in adds {
            current.insert(key, value);
        }

        if let Some(policy_row) = self.repos.label_policies.get_current().await? {
            validate_labels(&policy_row, &current)?;
        }

        self.repos
            .states
            .update_labels(guid, &labels_to_json(&current))
            .await?;
        Ok(())
    }

    pub async fn get_output_keys(&self, guid: Uuid) -> Result<Vec<String>, GridError> {
        let rows = self.repos.state_outputs.find_by_state(guid).await?;
        Ok(rows.into_iter().map(|r| r.output_key).collect())
    }

    pub async fn get_state_info(&self, state_ref: StateRef) -> Result<StateInfo, GridError> {
        let state = self.resolve(&state_ref).await?;
        let outputs = self.repos.state_outputs.find_by_state(state.guid).await?;
        let incoming_edges = self.repos.edges.find_incoming(state.guid).await?;
        let outgoing_edges = self.repos.edges.find_outgoing(state.guid).await?;
        Ok(StateInfo {
            state,
            outputs,
            incoming_edges,
            outgoing_edges,
        })
    }
}

fn labels_to_json(labels: &LabelMap) -> Value {
    serde_json::to_value(labels).unwrap_or(Value::Object(Default::default()))
}

fn json_to_labels(value: &Value) -> LabelMap {
    serde_json::from_value(value.clone()).unwrap_or_default()
}
