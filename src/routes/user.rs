//! User route definitions

use axum::{routing::get, Router};

use crate::handlers::user::get_current_user;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_current_user))
}
