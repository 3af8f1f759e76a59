//! Terraform's HTTP remote-state backend protocol.
//!
//! `axum` has no first-class support for the `LOCK`/`UNLOCK` extension
//! methods Terraform's protocol defines, so these routes are registered as
//! raw Axum handlers via `AppBuilder::merge_router` — the escape hatch for
//! wire shapes the `#[routes]` DSL can't express — dispatching on the
//! request's `Method` inside the handler rather than at the router level.
//! Authentication still runs through `GridPrincipal`'s ordinary
//! `FromRequestParts` impl; authorization is a direct `PolicyEngine::authorize`
//! call against the addressed state's labels, since there is no declarative
//! guard layer on a raw route.

use chrono::{DateTime, Utc};
use grid_authn::GridPrincipal;
use grid_data::{GridError, StateRow};
use grid_state::LockInfo;
use r2e_core::http::{
    Bytes, HeaderName, HeaderValue, Json, Method, Path, Query, Response, State, StatusCode, Uri,
};
use r2e_core::prelude::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::state::AppState;

pub fn router() -> r2e_core::http::Router<AppState> {
    r2e_core::http::Router::new()
        .route(
            "/tfstate/{guid}",
            r2e_core::http::routing::get(get_state).post(post_state),
        )
        .route("/tfstate/{guid}/lock", r2e_core::http::routing::any(lock_unlock))
        .route("/tfstate/{guid}/unlock", r2e_core::http::routing::any(lock_unlock))
}

#[derive(Debug, Deserialize)]
struct PostQuery {
    #[serde(rename = "ID")]
    id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LockDocument {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Operation", default)]
    operation: String,
    #[serde(rename = "Info", default)]
    info: String,
    #[serde(rename = "Who", default)]
    who: String,
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "Created", default)]
    created: String,
    #[serde(rename = "Path", default)]
    path: String,
}

fn lock_document_from_row(state: &StateRow) -> LockDocument {
    LockDocument {
        id: state.lock_id.clone().unwrap_or_default(),
        operation: state.lock_operation.clone().unwrap_or_default(),
        info: String::new(),
        who: state.lock_who.clone().unwrap_or_default(),
        version: state.lock_version.clone().unwrap_or_default(),
        created: state
            .lock_created
            .map(|c: DateTime<Utc>| c.to_rfc3339())
            .unwrap_or_default(),
        path: state.lock_path.clone().unwrap_or_default(),
    }
}

async fn authorize(
    app: &AppState,
    identity: &GridPrincipal,
    action: &str,
    state: &StateRow,
) -> Result<(), Response> {
    let labels: grid_labels::LabelMap =
        serde_json::from_value(state.labels.clone()).unwrap_or_default();
    let roles = app.role_catalog.roles_for(&identity.roles);
    let decision = app.policy.authorize(&roles, "tfstate", action, Some(&labels));
    if decision.is_allow() {
        Ok(())
    } else {
        Err(text_response(
            StatusCode::FORBIDDEN,
            "access denied for this state",
        ))
    }
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

/// Maps a `GridError` to the exact status codes `GET`/`POST /tfstate/{guid}`
/// use; `423` only applies to lock acquisition, so the lock/unlock handlers
/// map their own failures separately.
fn tf_error_response(err: GridError) -> Response {
    match err {
        GridError::NotFound(msg) => text_response(StatusCode::NOT_FOUND, msg),
        GridError::FailedPrecondition(msg) if msg.contains("locked") => {
            text_response(StatusCode::LOCKED, msg)
        }
        GridError::FailedPrecondition(msg) => text_response(StatusCode::CONFLICT, msg),
        GridError::Conflict(msg) => text_response(StatusCode::CONFLICT, msg),
        GridError::InvalidArgument(msg) => text_response(StatusCode::BAD_REQUEST, msg),
        GridError::Unauthenticated(msg) => text_response(StatusCode::UNAUTHORIZED, msg),
        GridError::PermissionDenied(msg) => text_response(StatusCode::FORBIDDEN, msg),
        GridError::AlreadyExists(msg) => text_response(StatusCode::CONFLICT, msg),
        GridError::Internal(msg) => text_response(StatusCode::INTERNAL_SERVER_ERROR, msg),
    }
}

async fn get_state(
    State(app): State<AppState>,
    Path(guid): Path<Uuid>,
    identity: GridPrincipal,
) -> Response {
    let state = match app.state_service.get_by_guid(guid).await {
        Ok(state) => state,
        Err(err) => return tf_error_response(err),
    };
    if let Err(resp) = authorize(&app, &identity, "read", &state).await {
        return resp;
    }
    match state.content {
        Some(content) => Json(content).into_response(),
        None => Json(json!({
            "version": 4,
            "terraform_version": "",
            "serial": 0,
            "lineage": "",
            "outputs": Value::Null,
            "resources": Value::Null,
        }))
        .into_response(),
    }
}

async fn post_state(
    State(app): State<AppState>,
    Path(guid): Path<Uuid>,
    Query(query): Query<PostQuery>,
    identity: GridPrincipal,
    body: Bytes,
) -> Response {
    let state = match app.state_service.get_by_guid(guid).await {
        Ok(state) => state,
        Err(err) => return tf_error_response(err),
    };
    if let Err(resp) = authorize(&app, &identity, "write", &state).await {
        return resp;
    }

    match app
        .state_service
        .update_state_content(guid, &body, query.id.as_deref())
        .await
    {
        Ok(result) => {
            let mut response = StatusCode::OK.into_response();
            if result.size_warning {
                let threshold: usize = app
                    .config
                    .get_or("state.size_warning_threshold_bytes", 10 * 1024 * 1024);
                let value = format!(
                    "State size ({} bytes) exceeds recommended threshold ({} bytes)",
                    result.size_bytes, threshold
                );
                if let Ok(header_value) = HeaderValue::from_str(&value) {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static("x-grid-state-size-warning"), header_value);
                }
            }
            response
        }
        Err(err) => tf_error_response(err),
    }
}

async fn lock_unlock(
    State(app): State<AppState>,
    Path(guid): Path<Uuid>,
    method: Method,
    uri: Uri,
    identity: GridPrincipal,
    Json(doc): Json<LockDocument>,
) -> Response {
    let is_lock_path = uri.path().ends_with("/lock");
    let method_ok = match method.as_str() {
        "LOCK" | "UNLOCK" | "PUT" => true,
        _ => false,
    };
    if !method_ok {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let state = match app.state_service.get_by_guid(guid).await {
        Ok(state) => state,
        Err(err) => return tf_error_response(err),
    };

    if is_lock_path {
        if let Err(resp) = authorize(&app, &identity, "lock", &state).await {
            return resp;
        }
        let lock_info = LockInfo {
            id: doc.id,
            operation: doc.operation,
            who: doc.who,
            version: doc.version,
            path: doc.path,
        };
        match app
            .state_service
            .lock_state(guid, lock_info, identity.principal_id)
            .await
        {
            Ok(()) => Json(json!({})).into_response(),
            Err(GridError::FailedPrecondition(_)) => {
                (StatusCode::LOCKED, Json(lock_document_from_row(&state))).into_response()
            }
            Err(err) => tf_error_response(err),
        }
    } else {
        if let Err(resp) = authorize(&app, &identity, "unlock", &state).await {
            return resp;
        }
        match app.state_service.unlock_state(guid, &doc.id).await {
            Ok(()) => Json(json!({})).into_response(),
            Err(GridError::Conflict(msg)) => text_response(StatusCode::CONFLICT, msg),
            Err(GridError::FailedPrecondition(msg)) => text_response(StatusCode::CONFLICT, msg),
            Err(err) => tf_error_response(err),
        }
    }
}
