//! Storage contracts for users and device sessions
//!
//! The auth service only talks to these traits. `postgres` backs them with
//! sqlx in production; `memory` backs them with in-process maps for tests and
//! local runs.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DeviceSession, NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryDeviceSessionStore, InMemoryUserDirectory};
pub use postgres::{PgDeviceSessionStore, PgUserDirectory};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint refused the write
    #[error("Duplicate record")]
    Duplicate,

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Stored rows contradict what a previous call reported
    #[error("Inconsistent store state: {0}")]
    Inconsistent(&'static str),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(e)
    }
}

/// Resolves and creates users by phone number
///
/// Implementations must enforce phone-number uniqueness and report a
/// conflicting `create` as [`StoreError::Duplicate`].
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user, assigning its id and timestamps
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
}

/// Durable ledger of refresh-token hashes per user
#[async_trait]
pub trait DeviceSessionStore: Send + Sync {
    /// Insert a session; on a `(user_id, refresh_token_hash)` conflict only
    /// `last_login_at` is updated. Never clears `revoked_at`.
    async fn upsert(&self, session: &DeviceSession) -> Result<(), StoreError>;

    /// The session for this hash, if it exists and is not revoked
    async fn find_active(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
    ) -> Result<Option<DeviceSession>, StoreError>;

    /// Revoke a session if still active.
    ///
    /// Returns `true` only when this call moved the row from active to
    /// revoked. Unknown or already revoked ids return `Ok(false)`.
    async fn revoke_by_id(&self, session_id: Uuid) -> Result<bool, StoreError>;

    /// Revoke every active session of a user, returning how many were revoked
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_database_error_keeps_its_source() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);

        assert!(matches!(err, StoreError::Database(sqlx::Error::PoolTimedOut)));
        let source = err.source().unwrap();
        assert!(matches!(
            source.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::PoolTimedOut)
        ));
        assert!(err
            .to_string()
            .ends_with(&sqlx::Error::PoolTimedOut.to_string()));
    }

    #[test]
    fn test_non_constraint_failures_are_not_duplicates() {
        let err = StoreError::from(sqlx::Error::RowNotFound);

        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
