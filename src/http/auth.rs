//! Bearer token authentication for relay endpoints.

use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::datastore::TabularStore;
use crate::error::Failure;
use crate::http::response::{failure_message, Cors};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively and any run of whitespace may follow it.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..6)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let rest = &value[6..];
    let token = rest.trim_start();
    if token.len() == rest.len() {
        // no separator after the scheme
        return None;
    }
    Some(token)
}

/// `Ok` when the request carries the configured key.
pub fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), Failure> {
    match (bearer_token(headers), expected) {
        (Some(token), Some(expected)) if token == expected => Ok(()),
        _ => Err(Failure::unauthorized()),
    }
}

/// Reject requests without a valid bearer token with 401.
pub async fn require_bearer<S: TabularStore>(
    State(state): State<AppState<S>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authorize(request.headers(), state.config.auth.api_key.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(failure) => {
            tracing::warn!(path = %request.uri().path(), "Bearer authentication failed");
            metrics::record_failure(failure.kind());
            failure_message(&failure, Cors::Omit)
        }
    }
}
