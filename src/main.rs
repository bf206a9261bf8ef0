//! Auth API server
//!
//! Phone-number login via OTP, token refresh and session revocation.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use phoneauth_server::auth::{AuthService, TokenManager};
use phoneauth_server::config::Config;
use phoneauth_server::otp::TwilioVerifyClient;
use phoneauth_server::repository::{PgDeviceSessionStore, PgUserDirectory};
use phoneauth_server::state::AppState;
use phoneauth_server::{db, middleware, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    init_tracing(&config);
    tracing::info!(
        environment = config.environment.as_str(),
        port = config.port,
        "Starting auth server"
    );

    let app = build_app(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Stopped");
    Ok(())
}

/// `RUST_LOG` wins over `config.log_level`
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Wire stores, OTP client and token manager into the router
async fn build_app(config: &Config) -> anyhow::Result<Router> {
    let tokens =
        TokenManager::from_config(&config.auth).context("invalid token configuration")?;

    let pool = db::create_pool(config).await?;
    db::run_migrations(&pool).await?;

    let otp = TwilioVerifyClient::new(&config.twilio).context("failed to build OTP client")?;

    let auth_service = AuthService::new(
        Arc::new(tokens),
        Arc::new(PgUserDirectory::new(pool.clone())),
        Arc::new(PgDeviceSessionStore::new(pool.clone())),
        Arc::new(otp),
    );

    let state = AppState::new(Arc::new(auth_service)).with_database(pool);

    Ok(routes::build_router(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(cors_layer(config)))
}

/// Browser access for the configured origins; any origin outside production
/// when none are configured
fn cors_layer(config: &Config) -> CorsLayer {
    let request_id = HeaderName::from_static("x-request-id");

    let Some(allowed) = config.cors_allowed_origins.as_deref() else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, accepting any origin");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, request_id.clone()])
        .expose_headers([request_id])
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::{signal as unix_signal, SignalKind};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => tracing::info!("Ctrl+C received, shutting down"),
                    _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "SIGTERM handler unavailable, Ctrl+C only"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("Ctrl+C received, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
