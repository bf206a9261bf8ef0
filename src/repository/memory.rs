//! In-memory users and device sessions
//!
//! Same contracts as the Postgres stores, including phone uniqueness and the
//! conditional revoke. Each operation holds the write lock for its whole
//! read-modify-write, which gives it the atomicity of a single SQL statement.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeviceSessionStore, StoreError, UserDirectory};
use crate::models::{DeviceSession, NewUser, User};

#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.phone_number == phone_number)
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.phone_number == new_user.phone_number) {
            return Err(StoreError::Duplicate);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            phone_number: new_user.phone_number,
            display_name: new_user.display_name,
            profile_picture_url: None,
            about_text: None,
            last_seen_at: now,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDeviceSessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, DeviceSession>>>,
}

impl InMemoryDeviceSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every session recorded for a user, revoked ones included
    pub async fn sessions_for_user(&self, user_id: Uuid) -> Vec<DeviceSession> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<DeviceSession> = sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.created_at);
        found
    }
}

#[async_trait]
impl DeviceSessionStore for InMemoryDeviceSessionStore {
    async fn upsert(&self, session: &DeviceSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;

        let existing = sessions.values_mut().find(|s| {
            s.user_id == session.user_id && s.refresh_token_hash == session.refresh_token_hash
        });

        match existing {
            Some(existing) => existing.last_login_at = session.last_login_at,
            None => {
                sessions.insert(session.id, session.clone());
            }
        }

        Ok(())
    }

    async fn find_active(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
    ) -> Result<Option<DeviceSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|s| {
                s.user_id == user_id && s.refresh_token_hash == refresh_token_hash && s.is_active()
            })
            .cloned())
    }

    async fn revoke_by_id(&self, session_id: Uuid) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(session) if session.is_active() => {
                session.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let mut revoked = 0;

        for session in sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.is_active())
        {
            session.revoked_at = Some(now);
            revoked += 1;
        }

        Ok(revoked)
    }
}
