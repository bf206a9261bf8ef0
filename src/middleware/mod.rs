//! Middleware for the auth API
//!
//! Request tracing and the access-token guard.

pub mod auth;
mod tracing;

pub use auth::{auth_guard, AuthGuard, AuthenticatedUser, Unauthenticated, PUBLIC_PATHS};
pub use tracing::request_tracing;
