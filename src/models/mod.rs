//! Data models for the auth service

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// Display name given to users created by their first login
pub const DEFAULT_DISPLAY_NAME: &str = "New User";

/// Device metadata recorded when the client does not send any
pub const UNKNOWN_DEVICE: &str = "unknown";

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub display_name: String,
    pub profile_picture_url: Option<String>,
    pub about_text: Option<String>,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when creating a user; the directory assigns the rest
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone_number: String,
    pub display_name: String,
}

impl NewUser {
    pub fn with_phone(phone_number: &str) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
        }
    }
}

/// Device metadata attached to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_name: String,
    pub device_type: String,
    pub push_notification_token: Option<String>,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            device_name: UNKNOWN_DEVICE.to_string(),
            device_type: UNKNOWN_DEVICE.to_string(),
            push_notification_token: None,
        }
    }
}

/// A device session backing one refresh token
///
/// Storage-only; never serialized into a response.
#[derive(Debug, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub device_name: String,
    pub device_type: String,
    pub push_notification_token: Option<String>,
    pub last_login_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl DeviceSession {
    /// A new, active session for a refresh token hash
    pub fn new(user_id: Uuid, refresh_token_hash: String, device: DeviceInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash,
            device_name: device.device_name,
            device_type: device.device_type,
            push_notification_token: device.push_notification_token,
            last_login_at: now,
            created_at: now,
            revoked_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Metadata to carry over to the session that replaces this one
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            device_name: self.device_name.clone(),
            device_type: self.device_type.clone(),
            push_notification_token: self.push_notification_token.clone(),
        }
    }
}
