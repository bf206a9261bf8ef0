//! User-related API handlers

use axum::{extract::State, Json};

use crate::error::ApiResult;
use crate::middleware::AuthenticatedUser;
use crate::models::UserResponse;
use crate::state::AppState;

/// GET /users/me - Profile of the authenticated caller
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<UserResponse>> {
    let user = state.auth_service.get_user(user.user_id).await?;

    Ok(Json(user.into()))
}
