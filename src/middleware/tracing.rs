//! Request tracing middleware
//!
//! Each request runs inside a `request` span carrying its id, so service
//! events (logins, rotations, revocations) can be tied back to the call.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// Accept a caller-supplied id only if it is short and header-safe
fn incoming_request_id(request: &Request) -> Option<HeaderValue> {
    let value = request.headers().get(&REQUEST_ID)?;
    let text = value.to_str().ok()?;
    (!text.is_empty() && text.len() <= MAX_REQUEST_ID_LEN).then(|| value.clone())
}

pub async fn request_tracing(mut request: Request, next: Next) -> Response {
    let request_id = incoming_request_id(&request).unwrap_or_else(|| {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
    });
    request
        .headers_mut()
        .insert(REQUEST_ID.clone(), request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = request_id.to_str().unwrap_or_default(),
        method = %request.method(),
        path = %request.uri().path(),
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    span.in_scope(|| {
        if response.status().is_server_error() {
            tracing::error!(status, elapsed_ms, "Request failed");
        } else if response.status().is_client_error() {
            tracing::warn!(status, elapsed_ms, "Request rejected");
        } else {
            tracing::info!(status, elapsed_ms, "Request completed");
        }
    });

    response.headers_mut().insert(REQUEST_ID.clone(), request_id);
    response
}
