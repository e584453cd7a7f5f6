//! Response rendering.
//!
//! # Responsibilities
//! - Pass backend payloads through untouched as JSON bodies
//! - Answer `OPTIONS` with the methods an endpoint accepts
//!
//! Error bodies are rendered by `GatewayError`'s `IntoResponse`.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

/// Raw backend payload with `status`.
pub fn passthrough(status: StatusCode, payload: Bytes) -> Response {
    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// `204 No Content` listing the allowed methods.
pub fn allow(methods: &'static str) -> Response {
    (StatusCode::NO_CONTENT, [(header::ALLOW, methods)]).into_response()
}
