//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::middleware::AuthGuard;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub auth_guard: Arc<AuthGuard>,
    /// Probed by the health check when present
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// State whose guard validates with the service's own token manager
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        let auth_guard = Arc::new(AuthGuard::new(auth_service.token_manager().clone()));
        Self {
            auth_service,
            auth_guard,
            db_pool: None,
        }
    }

    pub fn with_database(mut self, db_pool: PgPool) -> Self {
        self.db_pool = Some(db_pool);
        self
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<AuthGuard> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_guard.clone()
    }
}
