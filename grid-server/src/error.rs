//! Maps `GridError` onto the RPC code table from `spec.md` §4.9 for the RPC
//! handler layer. The Terraform backend handler does not use this — it
//! needs the protocol's exact status codes (423, 409) rather than the
//! generic RPC mapping, and builds its own responses inline.

use grid_data::GridError;
use r2e_core::http::{Json, StatusCode};
use r2e_core::prelude::{IntoResponse, Response};

/// Newtype so the RPC layer can implement `IntoResponse` for `GridError`
/// without orphan-rule trouble (`GridError` lives in `grid-data`).
pub struct RpcError(pub GridError);

impl From<GridError> for RpcError {
    fn from(err: GridError) -> Self {
        RpcError(err)
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            GridError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            GridError::AlreadyExists(_) => (StatusCode::CONFLICT, "AlreadyExists"),
            GridError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "InvalidArgument"),
            GridError::FailedPrecondition(_) => (StatusCode::PRECONDITION_FAILED, "FailedPrecondition"),
            GridError::Conflict(_) => (StatusCode::PRECONDITION_FAILED, "FailedPrecondition"),
            GridError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Unauthenticated"),
            GridError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PermissionDenied"),
            GridError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        };
        let body = serde_json::json!({
            "code": code,
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
