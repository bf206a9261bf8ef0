//! Authentication service
//!
//! Login by phone OTP, refresh-token rotation and session revocation.
//! Access tokens are checked cryptographically only; the refresh chain is
//! what the device-session ledger makes revocable.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DeviceInfo, DeviceSession, NewUser, User};
use crate::otp::{OtpError, OtpProvider};
use crate::repository::{DeviceSessionStore, StoreError, UserDirectory};

use super::jwt::{Claims, TokenError, TokenManager, TokenPair, TokenType};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Any token or session failure, without detail
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("OTP verification rejected")]
    UpstreamRejected,

    #[error("OTP provider error: {0}")]
    Upstream(#[from] OtpError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("User not found")]
    UserNotFound,
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidToken => AuthError::InvalidToken,
            TokenError::EncodingFailed(msg) => AuthError::Signing(msg),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    tokens: Arc<TokenManager>,
    users: Arc<dyn UserDirectory>,
    sessions: Arc<dyn DeviceSessionStore>,
    otp: Arc<dyn OtpProvider>,
}

impl AuthService {
    pub fn new(
        tokens: Arc<TokenManager>,
        users: Arc<dyn UserDirectory>,
        sessions: Arc<dyn DeviceSessionStore>,
        otp: Arc<dyn OtpProvider>,
    ) -> Self {
        Self {
            tokens,
            users,
            sessions,
            otp,
        }
    }

    /// Token manager (for the request guard)
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Ask the OTP provider to send a code
    pub async fn request_code(&self, phone_number: &str) -> Result<String, AuthError> {
        let status = self.otp.send_code(phone_number).await.map_err(|e| {
            tracing::error!(phone = %mask_phone(phone_number), error = %e, "Failed to send OTP");
            e
        })?;

        tracing::info!(phone = %mask_phone(phone_number), status = %status, "OTP sent");
        Ok(status)
    }

    /// Confirm an OTP, resolve or create the user and issue a token pair
    pub async fn complete_login(
        &self,
        phone_number: &str,
        code: &str,
        device: DeviceInfo,
    ) -> Result<TokenPair, AuthError> {
        let approved = self.otp.check_code(phone_number, code).await.map_err(|e| {
            tracing::error!(phone = %mask_phone(phone_number), error = %e, "Failed to verify OTP");
            e
        })?;

        if !approved {
            tracing::info!(phone = %mask_phone(phone_number), "OTP not approved");
            return Err(AuthError::UpstreamRejected);
        }

        let user = self.resolve_user(phone_number).await?;
        let pair = self.tokens.issue_pair(&user.id.to_string())?;

        // Bookkeeping only: the pair is valid whether or not this lands
        let session = DeviceSession::new(user.id, hash_token(&pair.refresh_token), device);
        if let Err(e) = self.sessions.upsert(&session).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to record device session");
        }

        tracing::info!(user_id = %user.id, "Login completed");
        Ok(pair)
    }

    /// Find the user for a phone number, creating one on first login
    async fn resolve_user(&self, phone_number: &str) -> Result<User, AuthError> {
        if let Some(user) = self.users.find_by_phone(phone_number).await? {
            return Ok(user);
        }

        match self.users.create(NewUser::with_phone(phone_number)).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Created user on first login");
                Ok(user)
            }
            Err(StoreError::Duplicate) => {
                // A concurrent first login won the insert
                tracing::debug!(phone = %mask_phone(phone_number), "User created concurrently, re-fetching");
                self.users.find_by_phone(phone_number).await?.ok_or(AuthError::Store(
                    StoreError::Inconsistent("user missing after duplicate insert"),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Exchange a refresh token for a new pair, consuming its session
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let user_id = self.refresh_subject(refresh_token)?;

        let session = self
            .sessions
            .find_active(user_id, &hash_token(refresh_token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        // Only the caller that flips the row gets a new pair
        if !self.sessions.revoke_by_id(session.id).await? {
            tracing::warn!(user_id = %user.id, session_id = %session.id, "Refresh token replayed concurrently");
            return Err(AuthError::InvalidToken);
        }

        let pair = self.tokens.issue_pair(&user.id.to_string())?;

        let rotated = DeviceSession::new(user.id, hash_token(&pair.refresh_token), session.device_info());
        self.sessions.upsert(&rotated).await?;

        tracing::info!(user_id = %user.id, old_session = %session.id, new_session = %rotated.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Subject of a valid access token, or `None`. Never touches the store.
    pub fn validate_access_token(&self, access_token: &str) -> Option<Uuid> {
        let claims = self
            .tokens
            .validate_as(access_token, TokenType::Access)
            .ok()?;
        Uuid::parse_str(&claims.sub).ok()
    }

    /// Revoke the session behind a refresh token (logout of this device)
    pub async fn revoke_session(&self, refresh_token: &str) -> Result<(), AuthError> {
        let user_id = self.refresh_subject(refresh_token)?;

        let session = self
            .sessions
            .find_active(user_id, &hash_token(refresh_token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !self.sessions.revoke_by_id(session.id).await? {
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(user_id = %user_id, session_id = %session.id, "Session revoked");
        Ok(())
    }

    /// Revoke every session of the access token's subject
    pub async fn revoke_all_sessions(&self, access_token: &str) -> Result<u64, AuthError> {
        let claims = self.tokens.validate_as(access_token, TokenType::Access)?;
        let user_id = parse_subject(&claims)?;

        let revoked = self.sessions.revoke_all_for_user(user_id).await?;

        tracing::info!(user_id = %user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn refresh_subject(&self, refresh_token: &str) -> Result<Uuid, AuthError> {
        let claims = self.tokens.validate_as(refresh_token, TokenType::Refresh)?;
        parse_subject(&claims)
    }
}

fn parse_subject(claims: &Claims) -> Result<Uuid, AuthError> {
    Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)
}

/// Hex SHA-256 of a token, the only form in which refresh tokens are stored
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Keep the country prefix and last four digits for logs
fn mask_phone(phone_number: &str) -> String {
    let len = phone_number.len();
    if len <= 8 || !phone_number.is_ascii() {
        return "****".to_string();
    }
    format!("{}***{}", &phone_number[..5], &phone_number[len - 4..])
}
