//! Business rules over Terraform/OpenTofu state: creation, lock/unlock, the
//! atomic content+outputs write, and label management.

mod labels;
mod service;
mod trigger;

pub use service::{
    CreateStateResponse, LockInfo, StateConfig, StateInfo, StateRef, StateService,
    UpdateStateContentResponse, DEFAULT_SIZE_WARNING_THRESHOLD_BYTES,
};
pub use trigger::{EdgeUpdateTrigger, NoopEdgeUpdateTrigger};
