//! Thin wrapper around `axum` so the rest of the workspace can evolve the
//! HTTP stack (alternate body types, a different router) without every
//! crate taking a direct `axum` dependency.
//!
//! `r2e-core` re-exports the pieces it needs under `r2e_core::http`; most
//! consumers should go through that module rather than depending on this
//! crate directly.

pub use axum;
pub use bytes;
pub use http;
