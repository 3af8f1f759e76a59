use std::sync::Arc;

use grid_authn::GroupClaimPath;
use grid_authz_cache::GroupRoleCache;
use grid_data::GridRepositories;
use grid_dependency::DependencyService;
use grid_policy::{PolicyEngine, RoleCatalog};
use grid_state::{EdgeUpdateTrigger, StateService};
use r2e_core::prelude::*;
use r2e_data_sqlx::HasPool;
use r2e_security::JwtClaimsValidator;
use sqlx::{Pool, Postgres};

use crate::role_catalog::RoleNameCache;

/// Every bean the RPC controllers, the Terraform backend handler, and
/// `GridPrincipal`'s claims-to-identity resolution need.
#[derive(Clone, BeanState)]
pub struct AppState {
    pub repos: GridRepositories,
    pub policy: PolicyEngine,
    /// Same snapshot as `role_cache`, exposed as a trait object for callers
    /// that only need lookups and shouldn't depend on the refresh API.
    pub role_catalog: Arc<dyn RoleCatalog>,
    pub role_cache: RoleNameCache,
    pub group_role_cache: GroupRoleCache,
    pub group_claim_path: GroupClaimPath,
    pub state_service: StateService,
    pub dependency_service: DependencyService,
    pub edge_trigger: Arc<dyn EdgeUpdateTrigger>,
    pub jwt_validator: Arc<JwtClaimsValidator>,
    pub pool: sqlx::PgPool,
    pub config: R2eConfig,
}

impl HasPool<Postgres> for AppState {
    fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}
