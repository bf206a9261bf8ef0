//! Authentication routes

use axum::{
    http::{header, HeaderValue},
    routing::post,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
///
/// Responses carry tokens, so none of them may be cached.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/request-code", post(auth::request_code))
        .route("/auth/verify", post(auth::verify_code))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/validate", post(auth::validate_token))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}
