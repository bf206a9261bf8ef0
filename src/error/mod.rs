//! HTTP boundary errors
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}`.
//! Token and OTP denials share one 401 shape; store, signing and provider
//! faults are logged in full and answered with a fixed message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body failed validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    /// OTP provider unreachable or misbehaving
    #[error("OTP provider failure: {0}")]
    Upstream(String),

    #[error("Internal failure: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Upstream(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to send to the client
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        } else {
            tracing::debug!(error = %self, code, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => ApiError::Unauthorized("invalid or expired token"),
            AuthError::UpstreamRejected => ApiError::Unauthorized("verification code rejected"),
            AuthError::UserNotFound => ApiError::NotFound("user"),
            AuthError::Upstream(e) => ApiError::Upstream(e.to_string()),
            AuthError::Store(e) => ApiError::Internal(e.to_string()),
            AuthError::Signing(e) => ApiError::Internal(e),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::OtpError;
    use crate::repository::StoreError;

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::NotFound("user").error_code(), "NOT_FOUND");
        assert_eq!(ApiError::Unauthorized("x").error_code(), "UNAUTHORIZED");
        assert_eq!(
            ApiError::ValidationError("phone_number".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(ApiError::Upstream("x".to_string()).error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_token_failures_are_unauthorized() {
        let err = ApiError::from(AuthError::InvalidToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = ApiError::from(AuthError::UpstreamRejected);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let cause = sqlx::Error::Protocol("relation user_devices does not exist".to_string());
        let store = ApiError::from(AuthError::Store(StoreError::Database(cause)));
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.public_message(), "Internal server error");
        // Logged, not sent
        assert!(store.to_string().contains("relation user_devices does not exist"));

        let upstream = ApiError::from(AuthError::Upstream(OtpError::Provider {
            status: 401,
            body: "Authenticate".to_string(),
        }));
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!upstream.public_message().contains("Authenticate"));
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = ApiError::from(AuthError::UserNotFound);

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Not found: user");
    }
}
