//! Twilio Verify v2 client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{OtpError, OtpProvider};
use crate::config::TwilioConfig;

const TWILIO_VERIFY_BASE_URL: &str = "https://verify.twilio.com/v2";
const APPROVED: &str = "approved";

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    status: String,
    #[serde(default)]
    sid: Option<String>,
}

#[derive(Clone)]
pub struct TwilioVerifyClient {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    service_sid: String,
}

impl TwilioVerifyClient {
    pub fn new(config: &TwilioConfig) -> Result<Self, OtpError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            base_url: TWILIO_VERIFY_BASE_URL.to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            service_sid: config.verify_service_sid.clone(),
        })
    }

    /// Point the client at another host (a Twilio-compatible mock in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, resource: &str) -> String {
        format!(
            "{}/Services/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.service_sid,
            resource
        )
    }

    async fn post(&self, resource: &str, form: &[(&str, &str)]) -> Result<reqwest::Response, OtpError> {
        let response = self
            .client
            .post(self.url(resource))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl OtpProvider for TwilioVerifyClient {
    async fn send_code(&self, phone_number: &str) -> Result<String, OtpError> {
        let response = self
            .post("Verifications", &[("To", phone_number), ("Channel", "sms")])
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OtpError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let verification: VerificationResponse = response.json().await?;
        tracing::info!(
            status = %verification.status,
            sid = ?verification.sid,
            "OTP verification started"
        );

        Ok(verification.status)
    }

    async fn check_code(&self, phone_number: &str, code: &str) -> Result<bool, OtpError> {
        let response = self
            .post("VerificationCheck", &[("To", phone_number), ("Code", code)])
            .await?;

        let status = response.status();
        // Twilio answers 404 once a verification has expired, been approved or
        // run out of attempts; for the caller that is simply a refused code.
        if status == StatusCode::NOT_FOUND {
            tracing::info!("OTP verification not found or expired");
            return Ok(false);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OtpError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let verification: VerificationResponse = response.json().await?;
        tracing::info!(status = %verification.status, "OTP verification checked");

        Ok(is_approved(&verification))
    }
}

fn is_approved(verification: &VerificationResponse) -> bool {
    verification.status == APPROVED
}
