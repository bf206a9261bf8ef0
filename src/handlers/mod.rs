//! API handlers

pub mod auth;
pub mod user;

pub use auth::*;
pub use user::get_current_user;
