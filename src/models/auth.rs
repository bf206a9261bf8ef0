//! Authentication request/response DTOs

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{DeviceInfo, User};

/// E.164: '+', then 8 to 15 digits, no leading zero
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let digits = match phone.strip_prefix('+') {
        Some(rest) => rest,
        None => return Err(ValidationError::new("phone_number_format")),
    };

    let well_formed = (8..=15).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0');

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("phone_number_format"))
    }
}

fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if (4..=10).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("otp_code_format"))
    }
}

/// Request for an OTP to be sent
#[derive(Debug, Deserialize, Validate)]
pub struct RequestCodeRequest {
    #[validate(custom = "validate_phone_number")]
    pub phone_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestCodeResponse {
    pub status: String,
}

/// Request to verify an OTP and log in
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(custom = "validate_phone_number")]
    pub phone_number: String,
    #[validate(custom = "validate_otp_code")]
    pub code: String,
    #[validate(length(max = 128))]
    pub device_name: Option<String>,
    #[validate(length(max = 64))]
    pub device_type: Option<String>,
    #[validate(length(max = 512))]
    pub push_notification_token: Option<String>,
}

impl VerifyCodeRequest {
    pub fn device_info(&self) -> DeviceInfo {
        let defaults = DeviceInfo::default();
        DeviceInfo {
            device_name: self.device_name.clone().unwrap_or(defaults.device_name),
            device_type: self.device_type.clone().unwrap_or(defaults.device_type),
            push_notification_token: self.push_notification_token.clone(),
        }
    }
}

/// Auth tokens response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokensResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Refresh token request, also used to log out the current device
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Access token carried in a body rather than a header
#[derive(Debug, Deserialize)]
pub struct AccessTokenRequest {
    pub access_token: String,
}

/// Token validation result; never an error
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub is_valid: bool,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    pub revoked_sessions: u64,
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub phone_number: String,
    pub display_name: String,
    pub profile_picture_url: Option<String>,
    pub about_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            phone_number: user.phone_number,
            display_name: user.display_name,
            profile_picture_url: user.profile_picture_url,
            about_text: user.about_text,
            created_at: user.created_at,
        }
    }
}
