//! Route definitions for the auth API

mod auth;
mod user;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::db;
use crate::middleware::auth_guard;
use crate::state::AppState;

pub use auth::auth_routes;
pub use user::user_routes;

/// Full application router with the access-token guard in front of every route
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(user_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.auth_guard.clone(),
            auth_guard,
        ))
        .with_state(state)
}

async fn root() -> &'static str {
    "Auth API Server"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'static str>,
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.db_pool {
        Some(pool) => match db::check_health(pool).await {
            Ok(()) => Some("up"),
            Err(e) => {
                tracing::warn!(error = %e, "Health check: database unreachable");
                Some("down")
            }
        },
        None => None,
    };

    let (code, status) = if database == Some("down") {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}
