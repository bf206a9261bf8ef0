//! PostgreSQL-backed users and device sessions

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DeviceSessionStore, StoreError, UserDirectory};
use crate::models::{DeviceSession, NewUser, User};

#[derive(Clone)]
pub struct PgUserDirectory {
    db_pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, StoreError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, phone_number, display_name, profile_picture_url, about_text, last_seen_at, created_at, updated_at
            FROM users
            WHERE phone_number = $1
            "#,
        )
        .bind(phone_number)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();

        // Unique violation on phone_number surfaces as StoreError::Duplicate
        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (id, phone_number, display_name, last_seen_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4, $4)
            RETURNING id, phone_number, display_name, profile_picture_url, about_text, last_seen_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.phone_number)
        .bind(&new_user.display_name)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, phone_number, display_name, profile_picture_url, about_text, last_seen_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(user)
    }
}

#[derive(Clone)]
pub struct PgDeviceSessionStore {
    db_pool: PgPool,
}

impl PgDeviceSessionStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl DeviceSessionStore for PgDeviceSessionStore {
    async fn upsert(&self, session: &DeviceSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_devices (id, user_id, refresh_token_hash, device_name, device_type, push_notification_token, last_login_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, refresh_token_hash)
            DO UPDATE SET last_login_at = EXCLUDED.last_login_at
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(&session.device_name)
        .bind(&session.device_type)
        .bind(&session.push_notification_token)
        .bind(session.last_login_at)
        .bind(session.created_at)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn find_active(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
    ) -> Result<Option<DeviceSession>, StoreError> {
        let session: Option<DeviceSession> = sqlx::query_as(
            r#"
            SELECT id, user_id, refresh_token_hash, device_name, device_type, push_notification_token, last_login_at, created_at, revoked_at
            FROM user_devices
            WHERE user_id = $1 AND refresh_token_hash = $2 AND revoked_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(refresh_token_hash)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(session)
    }

    async fn revoke_by_id(&self, session_id: Uuid) -> Result<bool, StoreError> {
        // Conditional update: only one concurrent caller can see a row change
        let rows_affected = sqlx::query(
            r#"
            UPDATE user_devices
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(session_id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE user_devices
            SET revoked_at = NOW()
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}
