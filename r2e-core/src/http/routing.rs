pub use axum::routing::{any, delete, get, head, options, patch, post, put, trace, Route};
