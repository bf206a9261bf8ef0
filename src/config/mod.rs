//! Service configuration
//!
//! Read from the environment (plus an optional `.env`) once at startup and
//! validated there. Everything downstream receives the resulting values
//! explicitly; nothing re-reads the environment later.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::auth::{MAX_TTL_DAYS, MIN_SECRET_LEN};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("JWT secret must be at least {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },

    #[error("{0} must be a positive duration")]
    NonPositiveTtl(&'static str),

    #[error("{0} exceeds {max} days", max = MAX_TTL_DAYS)]
    TtlTooLong(&'static str),
}

/// Deployment tier; production tightens CORS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

/// Token signing settings
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 key, at least `MIN_SECRET_LEN` bytes
    pub jwt_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_days: i64,
    /// `iss` of every token, and `aud` of refresh tokens
    pub issuer: String,
    /// `aud` of access tokens
    pub client_audience: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"****")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("issuer", &self.issuer)
            .field("client_audience", &self.client_audience)
            .finish()
    }
}

/// Twilio Verify credentials
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub verify_service_sid: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"****")
            .field("verify_service_sid", &self.verify_service_sid)
            .finish()
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Lifetimes are positive and bounded, in their configured unit
fn check_ttl(name: &'static str, value: i64, max: i64) -> Result<(), ConfigError> {
    if value <= 0 {
        Err(ConfigError::NonPositiveTtl(name))
    } else if value > max {
        Err(ConfigError::TtlTooLong(name))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Comma-separated; required in production
    pub cors_allowed_origins: Option<String>,
    /// Fallback filter when `RUST_LOG` is unset or unparseable
    pub log_level: String,
    pub auth: AuthConfig,
    pub twilio: TwilioConfig,
}

/// Typed access to a key/value source
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Present and non-empty
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingEnvVar(key))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Defaulted when absent, an error when present but unparseable
    fn parsed<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        }
    }
}

impl Config {
    /// Process environment, after loading `.env` if there is one
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same rules as `from_env` over any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let environment = vars.parsed("ENVIRONMENT", Environment::Development)?;

        let cors_allowed_origins = vars.get("CORS_ALLOWED_ORIGINS");
        if environment.is_production() && cors_allowed_origins.is_none() {
            return Err(ConfigError::MissingEnvVar("CORS_ALLOWED_ORIGINS"));
        }

        let auth = AuthConfig {
            jwt_secret: vars.required("JWT_SECRET")?,
            access_token_ttl_seconds: vars.parsed("JWT_ACCESS_TOKEN_TTL_SECONDS", 900)?,
            refresh_token_ttl_days: vars.parsed("JWT_REFRESH_TOKEN_TTL_DAYS", 7)?,
            issuer: vars.or("JWT_ISSUER", "auth-service"),
            client_audience: vars.or("JWT_CLIENT_AUDIENCE", "app-client"),
        };
        check_ttl(
            "access token TTL",
            auth.access_token_ttl_seconds,
            MAX_TTL_DAYS * SECONDS_PER_DAY,
        )?;
        check_ttl("refresh token TTL", auth.refresh_token_ttl_days, MAX_TTL_DAYS)?;
        if auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort {
                min: MIN_SECRET_LEN,
                actual: auth.jwt_secret.len(),
            });
        }

        let twilio = TwilioConfig {
            account_sid: vars.required("TWILIO_ACCOUNT_SID")?,
            auth_token: vars.required("TWILIO_AUTH_TOKEN")?,
            verify_service_sid: vars.required("TWILIO_VERIFY_SERVICE_SID")?,
        };

        Ok(Config {
            environment,
            port: vars.parsed("PORT", 3001)?,
            database_url: vars.required("DATABASE_URL")?,
            db_max_connections: vars.parsed("DB_MAX_CONNECTIONS", 5)?,
            cors_allowed_origins,
            log_level: vars.or("RUST_LOG", "info"),
            auth,
            twilio,
        })
    }

    /// `DATABASE_URL` with the password replaced, for logs
    pub fn database_url_masked(&self) -> String {
        let url = &self.database_url;
        let Some(at) = url.rfind('@') else {
            return url.clone();
        };
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);

        match url[scheme_end..at].find(':') {
            Some(colon) => {
                let password_start = scheme_end + colon + 1;
                format!("{}****{}", &url[..password_start], &url[at..])
            }
            None => url.clone(),
        }
    }
}
