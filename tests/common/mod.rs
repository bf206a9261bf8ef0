//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::Mutex;

use phoneauth_server::auth::{AuthService, TokenManager};
use phoneauth_server::otp::{OtpError, OtpProvider};
use phoneauth_server::repository::{
    DeviceSessionStore, InMemoryDeviceSessionStore, InMemoryUserDirectory, UserDirectory,
};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// OTP double: approves exactly the configured code
pub struct ScriptedOtp {
    approved_code: String,
    fail_requests: bool,
    pub sent_to: Mutex<Vec<String>>,
    pub checks: AtomicUsize,
}

impl ScriptedOtp {
    pub fn approving(code: &str) -> Self {
        Self {
            approved_code: code.to_string(),
            fail_requests: false,
            sent_to: Mutex::new(Vec::new()),
            checks: AtomicUsize::new(0),
        }
    }

    /// Every call fails as if the provider were unreachable
    pub fn unreachable() -> Self {
        Self {
            fail_requests: true,
            ..Self::approving("000000")
        }
    }
}

#[async_trait]
impl OtpProvider for ScriptedOtp {
    async fn send_code(&self, phone_number: &str) -> Result<String, OtpError> {
        if self.fail_requests {
            return Err(OtpError::Request("connection refused".to_string()));
        }
        self.sent_to.lock().await.push(phone_number.to_string());
        Ok("pending".to_string())
    }

    async fn check_code(&self, _phone_number: &str, code: &str) -> Result<bool, OtpError> {
        if self.fail_requests {
            return Err(OtpError::Request("connection refused".to_string()));
        }
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(code == self.approved_code)
    }
}

pub fn token_manager() -> Arc<TokenManager> {
    Arc::new(TokenManager::new(TEST_SECRET, Duration::minutes(15), Duration::days(7)).unwrap())
}

/// Service over in-memory stores, with handles on the stores for assertions
pub struct Harness {
    pub service: AuthService,
    pub tokens: Arc<TokenManager>,
    pub users: InMemoryUserDirectory,
    pub sessions: InMemoryDeviceSessionStore,
    pub otp: Arc<ScriptedOtp>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_otp(ScriptedOtp::approving("000000"))
    }

    pub fn with_otp(otp: ScriptedOtp) -> Self {
        let users = InMemoryUserDirectory::new();
        let sessions = InMemoryDeviceSessionStore::new();
        Self::build(otp, Arc::new(users.clone()), Arc::new(sessions.clone()), users, sessions)
    }

    /// Harness whose service talks to custom store wrappers
    pub fn with_stores(
        users_impl: Arc<dyn UserDirectory>,
        sessions_impl: Arc<dyn DeviceSessionStore>,
        users: InMemoryUserDirectory,
        sessions: InMemoryDeviceSessionStore,
    ) -> Self {
        Self::build(ScriptedOtp::approving("000000"), users_impl, sessions_impl, users, sessions)
    }

    fn build(
        otp: ScriptedOtp,
        users_impl: Arc<dyn UserDirectory>,
        sessions_impl: Arc<dyn DeviceSessionStore>,
        users: InMemoryUserDirectory,
        sessions: InMemoryDeviceSessionStore,
    ) -> Self {
        let tokens = token_manager();
        let otp = Arc::new(otp);
        let service = AuthService::new(tokens.clone(), users_impl, sessions_impl, otp.clone());

        Self {
            service,
            tokens,
            users,
            sessions,
            otp,
        }
    }
}
