//! Extractor re-exports from Axum, plus the optional-extractor contract used
//! by identity types that support both authenticated and anonymous routes.

pub use axum::extract::rejection as extract_rejection;
pub use axum::extract::{
    ConnectInfo, DefaultBodyLimit, Form, FromRef, FromRequest, FromRequestParts, MatchedPath,
    OriginalUri, Path, Query, RawPathParams, Request, State,
};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use std::future::Future;

/// An extractor that may legitimately be absent from a request.
///
/// Mirrors [`FromRequestParts`] but returns `Ok(None)` when the data the
/// extractor looks for simply isn't present (e.g. no `Authorization` header),
/// reserving `Err` for the case where the data is present but invalid.
///
/// A blanket [`FromRequestParts`] impl for `Option<T>` lets any
/// `OptionalFromRequestParts` implementor be used directly as
/// `Option<T>` in a handler signature.
pub trait OptionalFromRequestParts<S>: Sized {
    type Rejection: IntoResponse;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl Future<Output = Result<Option<Self>, Self::Rejection>> + Send;
}

impl<S, T> FromRequestParts<S> for Option<T>
where
    T: OptionalFromRequestParts<S>,
    S: Send + Sync,
{
    type Rejection = T::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        T::from_request_parts(parts, state).await
    }
}
