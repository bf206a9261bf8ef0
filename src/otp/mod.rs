//! One-time code delivery and verification
//!
//! The auth service depends only on a coarse pass/fail contract; provider
//! status detail is logged, never interpreted.

use async_trait::async_trait;
use thiserror::Error;

mod twilio;

pub use twilio::TwilioVerifyClient;

/// OTP provider errors (transport or decoding, never "wrong code")
#[derive(Error, Debug)]
pub enum OtpError {
    #[error("OTP provider request failed: {0}")]
    Request(String),

    #[error("OTP provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Unexpected OTP provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for OtpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            OtpError::Decode(e.to_string())
        } else {
            OtpError::Request(e.to_string())
        }
    }
}

#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Start a verification; returns the provider's delivery status
    async fn send_code(&self, phone_number: &str) -> Result<String, OtpError>;

    /// Whether the provider approved `code` for this phone number
    async fn check_code(&self, phone_number: &str, code: &str) -> Result<bool, OtpError>;
}
