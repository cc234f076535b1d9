//! Response construction.
//!
//! # Responsibilities
//! - JSON bodies with the `application/json;charset=UTF-8` content type
//! - Permissive CORS header on browser-facing endpoints
//! - `"1"` / `"0"` flag bodies for access checks
//! - Map a [`Failure`] to its status code

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use crate::error::{Failure, FailureKind};

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Whether to add `access-control-allow-origin: *`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cors {
    Allow,
    Omit,
}

/// Serialize `body` as JSON with the given status.
pub fn json<T: Serialize>(status: StatusCode, body: &T, cors: Cors) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response = (status, Body::from(bytes)).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    with_cors(response, cors)
}

/// Plain `"1"` when `hit`, `"0"` otherwise. Always 200 with CORS.
pub fn flag(hit: bool) -> Response {
    let body = if hit { "1" } else { "0" };
    with_cors((StatusCode::OK, body).into_response(), Cors::Allow)
}

fn with_cors(mut response: Response, cors: Cors) -> Response {
    if cors == Cors::Allow {
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
    }
    response
}

/// Status code for a failure reaching the client.
pub fn status_for(failure: &Failure) -> StatusCode {
    match failure.kind() {
        FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// `{ "message": ... }` response for `failure`.
pub fn failure_message(failure: &Failure, cors: Cors) -> Response {
    json(status_for(failure), &json!({ "message": failure.message() }), cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_json_headers() {
        let response = json(StatusCode::OK, &json!({ "message": "success" }), Cors::Allow);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_text(response).await, r#"{"message":"success"}"#);
    }

    #[tokio::test]
    async fn test_json_without_cors() {
        let response = json(StatusCode::OK, &json!({}), Cors::Omit);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_flag() {
        let hit = flag(true);
        assert_eq!(hit.status(), StatusCode::OK);
        assert_eq!(hit.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_text(hit).await, "1");
        assert_eq!(body_text(flag(false)).await, "0");
    }

    #[tokio::test]
    async fn test_failure_status() {
        let response = failure_message(&Failure::unauthorized(), Cors::Omit);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, r#"{"message":"authentication failed"}"#);

        assert_eq!(status_for(&Failure::rule("x")), StatusCode::BAD_REQUEST);
    }
}
