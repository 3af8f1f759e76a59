//! Typed repositories over Grid's relational entities.
//!
//! Each repository wraps a `sqlx::PgPool` directly, or (for `states`) the
//! generic `SqlxRepository` from `r2e-data-sqlx`, and adds the hand-written
//! queries the generic CRUD surface can't express — lock transitions, batch
//! lookups, optimistic-version updates, cross-transaction upserts.

pub mod convert;
pub mod entities;
pub mod repositories;
pub mod service_error;

pub use convert::RoleConversionError;
pub use service_error::GridError;
pub use entities::{
    EdgeRow, GroupRoleRow, LabelPolicyRow, RoleRow, SessionRow, StateOutputRow, StateRow,
    UserRoleRow,
};
pub use repositories::edge::EdgeRepository;
pub use repositories::group_role::GroupRoleRepository;
pub use repositories::label_policy::LabelPolicyRepository;
pub use repositories::role::RoleRepository;
pub use repositories::session::SessionRepository;
pub use repositories::state::StateRepository;
pub use repositories::state_output::StateOutputRepository;
pub use repositories::user_role::UserRoleRepository;

/// Every repository bundled together, constructed once from a shared pool
/// and cloned into each service's `AppState`.
#[derive(Clone)]
pub struct GridRepositories {
    pub states: StateRepository,
    pub state_outputs: StateOutputRepository,
    pub edges: EdgeRepository,
    pub roles: RoleRepository,
    pub user_roles: UserRoleRepository,
    pub group_roles: GroupRoleRepository,
    pub sessions: SessionRepository,
    pub label_policies: LabelPolicyRepository,
}

impl GridRepositories {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            states: StateRepository::new(pool.clone()),
            state_outputs: StateOutputRepository::new(pool.clone()),
            edges: EdgeRepository::new(pool.clone()),
            roles: RoleRepository::new(pool.clone()),
            user_roles: UserRoleRepository::new(pool.clone()),
            group_roles: GroupRoleRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            label_policies: LabelPolicyRepository::new(pool),
        }
    }
}

pub mod prelude {
    pub use crate::{
        EdgeRepository, EdgeRow, GridError, GridRepositories, GroupRoleRepository, GroupRoleRow,
        LabelPolicyRepository, LabelPolicyRow, RoleRepository, RoleRow, SessionRepository,
        SessionRow, StateOutputRepository, StateOutputRow, StateRepository, StateRow,
        UserRoleRepository, UserRoleRow,
    };
}
