//! Role-based authorization for Grid.
//!
//! Combines role-based action grants with per-resource label-scope
//! expressions (see [`grid_labels`]). The decision for a given
//! `(principal, object_type, action, labels?)` tuple is the union across the
//! principal's roles: any one role granting the tuple yields `allow`.
//! Default is deny.
//!
//! # Declarative route gating
//!
//! ```ignore
//! use grid_policy::PolicyCheck;
//!
//! #[routes]
//! impl TfStateController {
//!     #[get("/{guid}")]
//!     #[guard(PolicyCheck::action("read").on("tfstate"))]
//!     async fn get(&self, Path(guid): Path<String>) -> Json<StateDoc> { ... }
//! }
//! ```
//!
//! This only checks the unscoped `(object_type, action)` grant — the guard
//! runs before the target resource's labels are known. Once a service layer
//! loads the resource, call [`PolicyEngine::authorize`] again with
//! `Some(labels)` to apply the role's scope expression.

mod engine;
mod error;
mod guard;
mod role;

pub use engine::{PolicyDecision, PolicyEngine};
pub use error::PolicyError;
pub use guard::{PolicyCheck, PolicyCheckBuilder, PolicyGuard};
pub use role::{CreateConstraint, Grant, Role, RoleCatalog};

pub mod prelude {
    pub use crate::{PolicyCheck, PolicyDecision, PolicyEngine, PolicyError, Role, RoleCatalog};
}
