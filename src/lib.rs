//! Phone-number authentication service
//!
//! OTP login, signed access/refresh tokens with single-use refresh rotation,
//! and device-session revocation.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod otp;
pub mod repository;
pub mod routes;
pub mod state;
