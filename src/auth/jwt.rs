//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens. The
//! manager is immutable after construction and shared behind an `Arc`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AuthConfig, ConfigError};

/// Minimum HMAC secret length in bytes (HS256 key size)
pub const MIN_SECRET_LEN: usize = 32;

/// Upper bound for either token lifetime
pub const MAX_TTL_DAYS: i64 = 3650;

const DEFAULT_ISSUER: &str = "auth-service";
const DEFAULT_CLIENT_AUDIENCE: &str = "app-client";

/// JWT-related errors
///
/// Validation never says why a token was refused.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims carried by both token types
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Token type (access or refresh)
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Subject (user ID)
    pub sub: String,
    pub iss: String,
    /// Client application for access tokens, the auth service for refresh tokens
    pub aud: String,
    /// JWT ID, unique per issuance
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and validates HMAC-signed access and refresh tokens
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: String,
    client_audience: String,
}

impl TokenManager {
    /// Create a manager, rejecting short secrets and non-positive lifetimes
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        if access_ttl <= Duration::zero() {
            return Err(ConfigError::NonPositiveTtl("access token TTL"));
        }
        if refresh_ttl <= Duration::zero() {
            return Err(ConfigError::NonPositiveTtl("refresh token TTL"));
        }
        let max_ttl = Duration::days(MAX_TTL_DAYS);
        if access_ttl > max_ttl {
            return Err(ConfigError::TtlTooLong("access token TTL"));
        }
        if refresh_ttl > max_ttl {
            return Err(ConfigError::TtlTooLong("refresh token TTL"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            issuer: DEFAULT_ISSUER.to_string(),
            client_audience: DEFAULT_CLIENT_AUDIENCE.to_string(),
        })
    }

    /// Build from the startup configuration
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let access_ttl = Duration::try_seconds(config.access_token_ttl_seconds)
            .ok_or(ConfigError::TtlTooLong("access token TTL"))?;
        let refresh_ttl = Duration::try_days(config.refresh_token_ttl_days)
            .ok_or(ConfigError::TtlTooLong("refresh token TTL"))?;

        Ok(Self::new(&config.jwt_secret, access_ttl, refresh_ttl)?
            .with_identity(config.issuer.clone(), config.client_audience.clone()))
    }

    /// Override the issuer (also the refresh audience) and the client audience
    pub fn with_identity(mut self, issuer: impl Into<String>, client_audience: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self.client_audience = client_audience.into();
        self
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Expected `aud` for a token type
    pub fn audience_for(&self, token_type: TokenType) -> &str {
        match token_type {
            TokenType::Access => &self.client_audience,
            TokenType::Refresh => &self.issuer,
        }
    }

    /// Issue a new access/refresh pair for a subject
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        let now = Utc::now();

        let access_token = self.sign(subject, TokenType::Access, now, self.access_ttl)?;
        let refresh_token = self.sign(subject, TokenType::Refresh, now, self.refresh_ttl)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn sign(
        &self,
        subject: &str,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::EncodingFailed("expiry out of range".to_string()))?;

        let claims = Claims {
            token_type,
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience_for(token_type).to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify and decode a token of either type
    ///
    /// Only the HMAC family is accepted; a header naming any other algorithm
    /// (including `none`) is refused before the signature is considered.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| {
                tracing::debug!(reason = %e, "Token rejected");
                TokenError::InvalidToken
            })?;

        let claims = token_data.claims;
        if claims.aud != self.audience_for(claims.token_type) {
            tracing::debug!("Token rejected: audience does not match token type");
            return Err(TokenError::InvalidToken);
        }

        Ok(claims)
    }

    /// Validate and additionally require a token type
    pub fn validate_as(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.validate(token)?;
        if claims.token_type != expected {
            return Err(TokenError::InvalidToken);
        }
        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = true;
        // Expired means expired: no clock-skew grace
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.client_audience.as_str(), self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    const SECRET: &str = "test-secret-key-that-is-long-enough!";

    fn manager() -> TokenManager {
        TokenManager::new(SECRET, Duration::minutes(15), Duration::days(7)).unwrap()
    }

    fn claims_for(token_type: TokenType, exp: i64) -> Claims {
        Claims {
            token_type,
            sub: "user-1".to_string(),
            iss: DEFAULT_ISSUER.to_string(),
            aud: match token_type {
                TokenType::Access => DEFAULT_CLIENT_AUDIENCE.to_string(),
                TokenType::Refresh => DEFAULT_ISSUER.to_string(),
            },
            jti: Uuid::new_v4().to_string(),
            iat: Utc::now().timestamp(),
            exp,
        }
    }

    fn sign_raw(claims: &Claims, alg: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_bounds() {
        assert!(TokenManager::new(&"x".repeat(32), Duration::seconds(1), Duration::seconds(1)).is_ok());

        assert_eq!(
            TokenManager::new(&"x".repeat(31), Duration::seconds(1), Duration::seconds(1))
                .err()
                .unwrap(),
            ConfigError::SecretTooShort { min: 32, actual: 31 }
        );
        assert!(TokenManager::new(SECRET, Duration::zero(), Duration::days(1)).is_err());
        assert!(TokenManager::new(SECRET, Duration::minutes(1), Duration::seconds(-5)).is_err());
    }

    #[test]
    fn test_issue_pair_claims() {
        let tm = manager();
        let before = Utc::now().timestamp();
        let pair = tm.issue_pair("user-42").unwrap();

        let access = tm.validate(&pair.access_token).unwrap();
        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(access.sub, "user-42");
        assert_eq!(access.aud, "app-client");
        assert!((access.exp - (before + 15 * 60)).abs() <= 2);

        let refresh = tm.validate(&pair.refresh_token).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_eq!(refresh.sub, "user-42");
        assert_eq!(refresh.aud, "auth-service");
        assert!((refresh.exp - (before + 7 * 24 * 3600)).abs() <= 2);

        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn test_pairs_are_unique() {
        let tm = manager();
        let first = tm.issue_pair("user-1").unwrap();
        let second = tm.issue_pair("user-1").unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_wrong_secret() {
        let other = TokenManager::new(
            "another-secret-that-is-also-long-enough",
            Duration::minutes(15),
            Duration::days(7),
        )
        .unwrap();
        let pair = other.issue_pair("user-1").unwrap();

        assert_eq!(manager().validate(&pair.access_token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let claims = claims_for(TokenType::Access, Utc::now().timestamp() + 600);
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{}.{}.", header, payload);

        assert_eq!(manager().validate(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        // Valid HS256 signature bytes under an RS256 header
        let claims = claims_for(TokenType::Access, Utc::now().timestamp() + 600);
        let genuine = sign_raw(&claims, Algorithm::HS256, SECRET);
        let mut parts = genuine.split('.');
        let _ = parts.next();
        let payload = parts.next().unwrap();
        let signature = parts.next().unwrap();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let token = format!("{}.{}.{}", header, payload, signature);

        assert_eq!(manager().validate(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_other_hmac_variants_accepted() {
        let claims = claims_for(TokenType::Access, Utc::now().timestamp() + 600);
        let token = sign_raw(&claims, Algorithm::HS512, SECRET);

        assert!(manager().validate(&token).is_ok());
    }

    #[test]
    fn test_expired_token() {
        let claims = claims_for(TokenType::Access, Utc::now().timestamp() - 3600);
        let token = sign_raw(&claims, Algorithm::HS256, SECRET);

        assert_eq!(manager().validate(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_just_expired_token() {
        let claims = claims_for(TokenType::Access, Utc::now().timestamp() - 5);
        let token = sign_raw(&claims, Algorithm::HS256, SECRET);

        assert_eq!(manager().validate(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_ttl_upper_bound() {
        let max = Duration::days(MAX_TTL_DAYS);
        assert!(TokenManager::new(SECRET, max, max).is_ok());

        assert_eq!(
            TokenManager::new(SECRET, Duration::minutes(15), max + Duration::days(1))
                .err()
                .unwrap(),
            ConfigError::TtlTooLong("refresh token TTL")
        );
        assert_eq!(
            TokenManager::new(SECRET, max + Duration::seconds(1), Duration::days(7))
                .err()
                .unwrap(),
            ConfigError::TtlTooLong("access token TTL")
        );
    }

    #[test]
    fn test_from_config_rejects_unrepresentable_ttl() {
        let mut config = AuthConfig {
            jwt_secret: SECRET.to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_days: 999_999_999_999_999,
            issuer: DEFAULT_ISSUER.to_string(),
            client_audience: DEFAULT_CLIENT_AUDIENCE.to_string(),
        };
        assert_eq!(
            TokenManager::from_config(&config).err().unwrap(),
            ConfigError::TtlTooLong("refresh token TTL")
        );

        config.refresh_token_ttl_days = 100_000_000;
        assert_eq!(
            TokenManager::from_config(&config).err().unwrap(),
            ConfigError::TtlTooLong("refresh token TTL")
        );

        config.refresh_token_ttl_days = 7;
        config.access_token_ttl_seconds = i64::MAX;
        assert_eq!(
            TokenManager::from_config(&config).err().unwrap(),
            ConfigError::TtlTooLong("access token TTL")
        );
    }

    #[test]
    fn test_malformed_token() {
        let tm = manager();
        assert_eq!(tm.validate("invalid.token.here"), Err(TokenError::InvalidToken));
        assert_eq!(tm.validate(""), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_audience_must_match_type() {
        let mut claims = claims_for(TokenType::Refresh, Utc::now().timestamp() + 600);
        claims.aud = DEFAULT_CLIENT_AUDIENCE.to_string();
        let token = sign_raw(&claims, Algorithm::HS256, SECRET);

        assert_eq!(manager().validate(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = claims_for(TokenType::Access, Utc::now().timestamp() + 600);
        claims.iss = "someone-else".to_string();
        let token = sign_raw(&claims, Algorithm::HS256, SECRET);

        assert_eq!(manager().validate(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_validate_as_checks_type() {
        let tm = manager();
        let pair = tm.issue_pair("user-1").unwrap();

        assert!(tm.validate_as(&pair.access_token, TokenType::Access).is_ok());
        assert_eq!(
            tm.validate_as(&pair.refresh_token, TokenType::Access),
            Err(TokenError::InvalidToken)
        );
        assert_eq!(
            tm.validate_as(&pair.access_token, TokenType::Refresh),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn test_custom_identity() {
        let tm = manager().with_identity("chat-auth", "chat-mobile");
        let pair = tm.issue_pair("user-1").unwrap();

        assert_eq!(tm.validate(&pair.access_token).unwrap().aud, "chat-mobile");
        assert_eq!(tm.validate(&pair.refresh_token).unwrap().iss, "chat-auth");
        // Tokens from the default identity are foreign here
        assert!(tm.validate(&manager().issue_pair("user-1").unwrap().access_token).is_err());
    }
}
