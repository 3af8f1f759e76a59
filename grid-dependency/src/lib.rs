//! Edge lifecycle, drift-status derivation, cycle prevention, and
//! topological layering over Grid's dependency graph.
//!
//! This crate intentionally depends on nothing above `grid-data` and
//! `grid-fingerprint`: the Edge-Update Job (which re-derives edge statuses
//! after a state write) depends on this crate rather than the reverse, so
//! that `grid-state` can trigger it through a small local trait without a
//! circular crate dependency.

pub mod backend;
pub mod graph;
pub mod service;
pub mod status;

pub use backend::{backend_config_for, BackendConfig};
pub use graph::{topological_layers, would_cycle, CycleError, Direction};
pub use service::{
    AddDependencyRequest, AddDependencyResponse, DependencyGraph, DependencyGraphProducer,
    DependencyService, EdgeStatusSummary, StateRef,
};
pub use status::{derive_status, EdgeStatus};
