//! The stable error taxonomy services built on these repositories return.
//! The RPC and HTTP layers are the only places that translate a `GridError`
//! into a transport-specific status code (see the Terraform backend's and
//! the RPC layer's mapping tables).

use r2e_data::DataError;

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    /// A conflict distinct from a plain failed-precondition lock: the
    /// caller's supplied lock id doesn't match the one on record (Terraform's
    /// `UNLOCK` returns 409 here, vs. 423 for a precondition-failed lock
    /// acquisition). RPC clients still see `FailedPrecondition`.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DataError> for GridError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(msg) => GridError::NotFound(msg),
            DataError::Database(e) => GridError::Internal(e.to_string()),
            DataError::Other(msg) => GridError::Internal(msg),
        }
    }
}

impl From<grid_policy::PolicyError> for GridError {
    fn from(err: grid_policy::PolicyError) -> Self {
        GridError::InvalidArgument(err.to_string())
    }
}
