//! Asynchronous re-derivation of edge statuses after a state write.
//!
//! Runs on an unbounded pool of spawned tasks, serialized per producer guid
//! via a per-guid mutex held in a [`DashMap`] — parallel across different
//! producers, strictly serial for the same one, so two writes to the same
//! state never interleave their edge updates.

use chrono::Utc;
use dashmap::DashMap;
use grid_data::{GridError, GridRepositories, StateOutputRow};
use grid_dependency::{derive_status, EdgeStatus};
use grid_state::EdgeUpdateTrigger;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone)]
pub struct EdgeUpdateJob {
    repos: GridRepositories,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl EdgeUpdateJob {
    pub fn new(repos: GridRepositories) -> Self {
        Self {
            repos,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Run the full update (outgoing then incoming edges) for producer `P`,
    /// serialized against any other in-flight run for the same `P`.
    pub async fn run_for(&self, producer_guid: Uuid) -> Result<(), GridError> {
        let lock = self
            .locks
            .entry(producer_guid)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        self.update_outgoing_edges(producer_guid).await?;
        self.update_incoming_edges(producer_guid).await?;
        Ok(())
    }

    /// Re-derive status for every edge this producer feeds, from the cached
    /// output digests written by `UpdateStateContent` — no need to re-parse
    /// state content here.
    async fn update_outgoing_edges(&self, producer_guid: Uuid) -> Result<(), GridError> {
        let outputs = self.repos.state_outputs.find_by_state(producer_guid).await?;
        let by_key: HashMap<&str, &StateOutputRow> =
            outputs.iter().map(|o| (o.output_key.as_str(), o)).collect();

        let edges = self.repos.edges.find_outgoing(producer_guid).await?;
        for edge in edges {
            let Some(cached) = by_key.get(edge.from_output.as_str()) else {
                if edge.status != EdgeStatus::MissingOutput.as_str() {
                    self.repos
                        .edges
                        .update_status(
                            edge.id,
                            EdgeStatus::MissingOutput.as_str(),
                            &edge.in_digest,
                            &edge.out_digest,
                            edge.last_in_at,
                            edge.last_out_at,
                            None,
                        )
                        .await?;
                }
                continue;
            };

            let digest = cached.value_digest.as_str();
            if digest.is_empty() {
                continue;
            }

            if edge.status == EdgeStatus::Mock.as_str() {
                self.repos
                    .edges
                    .update_status(
                        edge.id,
                        EdgeStatus::Pending.as_str(),
                        digest,
                        &edge.out_digest,
                        Some(Utc::now()),
                        edge.last_out_at,
                        None,
                    )
                    .await?;
                continue;
            }

            let new_status = derive_status(digest, &edge.out_digest, &cached.validation_status, true);
            let digest_changed = digest != edge.in_digest;
            let status_changed = new_status.as_str() != edge.status;
            if digest_changed || status_changed {
                let last_in_at = if digest_changed {
                    Some(Utc::now())
                } else {
                    edge.last_in_at
                };
                self.repos
                    .edges
                    .update_status(
                        edge.id,
                        new_status.as_str(),
                        digest,
                        &edge.out_digest,
                        last_in_at,
                        edge.last_out_at,
                        edge.mock_value.as_ref(),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// The producer just wrote new content, so it is also a consumer of
    /// whatever feeds it — converge any edge that had drifted.
    async fn update_incoming_edges(&self, producer_guid: Uuid) -> Result<(), GridError> {
        let edges = self.repos.edges.find_incoming(producer_guid).await?;
        for edge in edges {
            if edge.in_digest.is_empty() || edge.out_digest == edge.in_digest {
                continue;
            }
            let new_status = match EdgeStatus::parse(&edge.status) {
                Some(EdgeStatus::Dirty) => EdgeStatus::Clean,
                Some(EdgeStatus::DirtyInvalid) => EdgeStatus::CleanInvalid,
                _ => continue,
            };
            self.repos
                .edges
                .update_status(
                    edge.id,
                    new_status.as_str(),
                    &edge.in_digest,
                    &edge.in_digest,
                    edge.last_in_at,
                    Some(Utc::now()),
                    edge.mock_value.as_ref(),
                )
                .await?;
        }
        Ok(())
    }
}

impl EdgeUpdateTrigger for EdgeUpdateJob {
    /// Fire-and-forget: spawn the run and log failure. A state write must
    /// never block on or fail because of edge-status convergence.
    fn trigger(&self, producer_guid: Uuid) {
        let job = self.clone();
        tokio::spawn(async move {
            if let Err(err) = job.run_for(producer_guid).await {
                tracing::error!(%producer_guid, error = %err, "edge update job failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_convergence_preserves_validation_dimension() {
        assert_eq!(
            match EdgeStatus::Dirty {
                EdgeStatus::Dirty => EdgeStatus::Clean,
                EdgeStatus::DirtyInvalid => EdgeStatus::CleanInvalid,
                other => other,
            },
            EdgeStatus::Clean
        );
        assert_eq!(
            match EdgeStatus::DirtyInvalid {
                EdgeStatus::Dirty => EdgeStatus::Clean,
                EdgeStatus::DirtyInvalid => EdgeStatus::CleanInvalid,
                other => other,
            },
            EdgeStatus::CleanInvalid
        );
    }
}
