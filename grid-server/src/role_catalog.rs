//! `Arc<dyn RoleCatalog>` bean backing `PolicyGuard` and every inline
//! `PolicyEngine::authorize` call: an immutable `(role name -> Role)`
//! snapshot, refreshed on the same cadence and by the same admin endpoint as
//! [`grid_authz_cache::GroupRoleCache`], since `RoleCatalog::roles_for` is a
//! synchronous trait method and can't hit the database per-request.

use arc_swap::ArcSwap;
use grid_data::{GridRepositories, RoleRow};
use grid_policy::{Role, RoleCatalog};
use r2e_data::Repository;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RoleCatalogRefreshError {
    #[error("data error loading roles: {0}")]
    Data(#[from] r2e_data::DataError),
    #[error("role conversion error: {0}")]
    Convert(#[from] grid_data::RoleConversionError),
}

struct RoleCatalogSnapshot {
    version: u64,
    by_name: HashMap<String, Arc<Role>>,
}

impl RoleCatalogSnapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            by_name: HashMap::new(),
        }
    }
}

/// Holds the current snapshot behind an atomic pointer swap and doubles as
/// the `RoleCatalog` implementation every `Arc<dyn RoleCatalog>` bean uses.
#[derive(Clone)]
pub struct RoleNameCache {
    current: Arc<ArcSwap<RoleCatalogSnapshot>>,
}

impl Default for RoleNameCache {
    fn default() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(RoleCatalogSnapshot::empty())),
        }
    }
}

impl RoleNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Reload every role row and swap the lookup map in atomically.
    pub async fn refresh(
        &self,
        repos: &GridRepositories,
    ) -> Result<u64, RoleCatalogRefreshError> {
        let rows = repos.roles.find_all().await?;

        let mut by_name = HashMap::new();
        for row in rows {
            let role: Role = Role::try_from(&row as &RoleRow)?;
            by_name.insert(role.name.clone(), Arc::new(role));
        }

        let previous_version = self.current.load().version;
        let version = previous_version + 1;
        self.current.store(Arc::new(RoleCatalogSnapshot { version, by_name }));
        tracing::info!(version, roles = self.current.load().by_name.len(), "role catalog refreshed");
        Ok(version)
    }
}

impl RoleCatalog for RoleNameCache {
    fn roles_for(&self, names: &[String]) -> Vec<Arc<Role>> {
        let snapshot = self.current.load();
        names
            .iter()
            .filter_map(|name| snapshot.by_name.get(name))
            .cloned()
            .collect()
    }
}
