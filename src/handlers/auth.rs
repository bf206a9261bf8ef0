//! Authentication HTTP handlers
//!
//! Endpoints for phone-number login and session management.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::auth::TokenPair;
use crate::error::ApiResult;
use crate::models::{
    AccessTokenRequest, AuthTokensResponse, LogoutAllResponse, RefreshTokenRequest,
    RequestCodeRequest, RequestCodeResponse, ValidateTokenResponse, VerifyCodeRequest,
};
use crate::state::AppState;

fn tokens_response(state: &AppState, pair: TokenPair) -> AuthTokensResponse {
    AuthTokensResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth_service.token_manager().access_ttl().num_seconds(),
    }
}

/// POST /auth/request-code - Send an OTP to a phone number
pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<RequestCodeRequest>,
) -> ApiResult<Json<RequestCodeResponse>> {
    req.validate()?;

    let status = state.auth_service.request_code(&req.phone_number).await?;

    Ok(Json(RequestCodeResponse { status }))
}

/// POST /auth/verify - Verify an OTP and issue tokens
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> ApiResult<Json<AuthTokensResponse>> {
    req.validate()?;

    let pair = state
        .auth_service
        .complete_login(&req.phone_number, &req.code, req.device_info())
        .await?;

    Ok(Json(tokens_response(&state, pair)))
}

/// POST /auth/refresh - Rotate a refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<AuthTokensResponse>> {
    let pair = state.auth_service.refresh_tokens(&req.refresh_token).await?;

    Ok(Json(tokens_response(&state, pair)))
}

/// POST /auth/validate - Check an access token; invalid tokens are not errors
pub async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<AccessTokenRequest>,
) -> Json<ValidateTokenResponse> {
    let response = match state.auth_service.validate_access_token(&req.access_token) {
        Some(user_id) => ValidateTokenResponse {
            is_valid: true,
            user_id: user_id.to_string(),
        },
        None => ValidateTokenResponse {
            is_valid: false,
            user_id: String::new(),
        },
    };

    Json(response)
}

/// POST /auth/logout - Revoke the session behind a refresh token
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<StatusCode> {
    state.auth_service.revoke_session(&req.refresh_token).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout-all - Revoke all sessions of the access token's user
pub async fn logout_all(
    State(state): State<AppState>,
    Json(req): Json<AccessTokenRequest>,
) -> ApiResult<Json<LogoutAllResponse>> {
    let revoked_sessions = state
        .auth_service
        .revoke_all_sessions(&req.access_token)
        .await?;

    Ok(Json(LogoutAllResponse { revoked_sessions }))
}
