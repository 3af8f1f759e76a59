//! Immutable `(group_name -> [role]*)` snapshot, refreshed on an interval and
//! on demand, swapped into place atomically so readers never see a partial
//! update.
//!
//! The producer (a scheduled task or the `admin:cache-refresh` RPC) holds the
//! only writer handle; every other consumer reads through
//! [`GroupRoleCache::snapshot`], which is lock-free.

use arc_swap::ArcSwap;
use grid_data::{GridRepositories, RoleRow};
use grid_policy::Role;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// One immutable view of the group-to-role mapping.
pub struct RoleSnapshot {
    pub version: u64,
    pub created_at: SystemTime,
    by_group: HashMap<String, Vec<Arc<Role>>>,
}

impl RoleSnapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            created_at: SystemTime::now(),
            by_group: HashMap::new(),
        }
    }

    pub fn group_count(&self) -> usize {
        self.by_group.len()
    }

    pub fn roles_for_groups(&self, groups: &[String]) -> Vec<Arc<Role>> {
        let mut out = Vec::new();
        for g in groups {
            if let Some(roles) = self.by_group.get(g) {
                for r in roles {
                    if !out.iter().any(|existing: &Arc<Role>| existing.name == r.name) {
                        out.push(r.clone());
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("data error loading group roles: {0}")]
    Data(#[from] r2e_data::DataError),
    #[error("role conversion error: {0}")]
    Convert(#[from] grid_data::RoleConversionError),
}

/// Holds the current snapshot behind an atomic pointer swap.
#[derive(Clone)]
pub struct GroupRoleCache {
    current: Arc<ArcSwap<RoleSnapshot>>,
}

impl Default for GroupRoleCache {
    fn default() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(RoleSnapshot::empty())),
        }
    }
}

impl GroupRoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Lock-free; holds no reference to the producer.
    pub fn snapshot(&self) -> Arc<RoleSnapshot> {
        self.current.load_full()
    }

    /// Reload the full mapping from storage and swap it in. Builds the new
    /// snapshot off to the side so readers never observe a partially built
    /// map; the compare-and-swap only becomes visible once construction
    /// finishes.
    pub async fn refresh(&self, repos: &GridRepositories) -> Result<Arc<RoleSnapshot>, RefreshError> {
        let mappings = repos.group_roles.find_all().await?;
        let role_ids: Vec<_> = {
            let mut ids: Vec<_> = mappings.iter().map(|m| m.role_id).collect();
            ids.sort();
            ids.dedup();
            ids
        };

        let mut roles_by_id: HashMap<uuid::Uuid, Arc<Role>> = HashMap::new();
        for id in role_ids {
            if let Some(row) = repos.roles.find_by_id(&id).await? {
                let role: Role = Role::try_from(&row as &RoleRow)?;
                roles_by_id.insert(id, Arc::new(role));
            }
        }

        let mut by_group: HashMap<String, Vec<Arc<Role>>> = HashMap::new();
        for mapping in mappings {
            if let Some(role) = roles_by_id.get(&mapping.role_id) {
                by_group
                    .entry(mapping.group_name)
                    .or_default()
                    .push(role.clone());
            }
        }

        let previous_version = self.current.load().version;
        let snapshot = Arc::new(RoleSnapshot {
            version: previous_version + 1,
            created_at: SystemTime::now(),
            by_group,
        });
        self.current.store(snapshot.clone());
        tracing::info!(version = snapshot.version, groups = snapshot.by_group.len(), "group-role snapshot refreshed");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_resolves_nothing() {
        let cache = GroupRoleCache::new();
        let snap = cache.snapshot();
        assert_eq!(snap.version, 0);
        assert!(snap.roles_for_groups(&["engineers".to_string()]).is_empty());
    }

    #[test]
    fn roles_for_groups_dedupes_by_name() {
        let role = Arc::new(Role {
            name: "viewer".into(),
            description: String::new(),
            scope_expr: String::new(),
            create_constraints: Default::default(),
            immutable_keys: Default::default(),
            actions: vec![],
            version: 1,
        });
        let mut by_group = HashMap::new();
        by_group.insert("team-a".to_string(), vec![role.clone()]);
        by_group.insert("team-b".to_string(), vec![role.clone()]);
        let snapshot = RoleSnapshot {
            version: 1,
            created_at: SystemTime::now(),
            by_group,
        };
        let roles = snapshot.roles_for_groups(&["team-a".to_string(), "team-b".to_string()]);
        assert_eq!(roles.len(), 1);
    }
}
