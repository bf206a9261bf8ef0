//! Authentication module
//!
//! Phone-number authentication on top of an external OTP provider.
//! - Signed, stateless access and refresh tokens
//! - Refresh-token rotation backed by a device-session ledger
//! - Per-device and all-device logout

mod jwt;
mod service;

pub use jwt::{
    Claims, TokenError, TokenManager, TokenPair, TokenType, MAX_TTL_DAYS, MIN_SECRET_LEN,
};
pub use service::{hash_token, AuthError, AuthService};
