//! Postgres pool, schema migrations and liveness check

use std::time::Duration;

use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Failed to apply migrations: {0}")]
    Migrate(#[from] MigrateError),

    #[error("Database unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),
}

/// Pool sized from `DB_MAX_CONNECTIONS`; a saturated pool fails the request
/// after a short acquire wait instead of queueing it.
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        url = %config.database_url_masked(),
        max_connections = config.db_max_connections,
        "Connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(300))
        .connect(&config.database_url)
        .await
        .map_err(DbError::Connect)
}

/// Apply `migrations/` (users and device sessions)
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Schema up to date");
    Ok(())
}

pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DbError::Unreachable)?;

    Ok(())
}
