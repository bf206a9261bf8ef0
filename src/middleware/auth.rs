//! Authentication middleware
//!
//! `auth_guard` runs ahead of every route. Paths on the public allow-list pass
//! through; everything else, unknown paths included, needs a valid access
//! token. The resolved identity travels in request extensions and reaches
//! handlers as an explicit `AuthenticatedUser` argument.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{TokenManager, TokenType};

/// Entry points reachable without an access token
pub const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/health",
    "/auth/request-code",
    "/auth/verify",
    "/auth/refresh",
    "/auth/validate",
    "/auth/logout",
    "/auth/logout-all",
];

/// Authenticated user extracted from an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    /// `jti` of the presented access token
    pub token_id: String,
}

/// The single rejection the guard produces, whatever went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthenticated;

#[derive(Debug, Serialize)]
struct UnauthenticatedBody {
    error: UnauthenticatedDetails,
}

#[derive(Debug, Serialize)]
struct UnauthenticatedDetails {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        let body = UnauthenticatedBody {
            error: UnauthenticatedDetails {
                code: "UNAUTHENTICATED",
                message: "Valid access token required",
            },
        };

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
            Json(body),
        )
            .into_response()
    }
}

/// Request-time gate for protected routes
pub struct AuthGuard {
    tokens: Arc<TokenManager>,
    public_paths: HashSet<&'static str>,
}

impl AuthGuard {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self {
            tokens,
            public_paths: PUBLIC_PATHS.iter().copied().collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(path)
    }

    /// Resolve the caller from an `Authorization: Bearer` header
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, Unauthenticated> {
        let Authorization(bearer) = headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(Unauthenticated)?;

        let claims = self
            .tokens
            .validate_as(bearer.token().trim(), TokenType::Access)
            .map_err(|_| Unauthenticated)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| Unauthenticated)?;

        Ok(AuthenticatedUser {
            user_id,
            token_id: claims.jti,
        })
    }
}

/// Guard middleware, installed with `from_fn_with_state`
pub async fn auth_guard(
    State(guard): State<Arc<AuthGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    if guard.is_public(request.uri().path()) {
        return next.run(request).await;
    }

    match guard.authenticate(request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(rejection) => {
            tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
            rejection.into_response()
        }
    }
}

/// Extractor for the identity the guard resolved
///
/// Rejects when the guard did not run for this route, so a handler can never
/// observe a missing identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.user_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Unauthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn guard() -> (AuthGuard, Arc<TokenManager>) {
        let tokens = Arc::new(
            TokenManager::new(
                "guard-test-secret-with-enough-bytes!",
                Duration::minutes(15),
                Duration::days(7),
            )
            .unwrap(),
        );
        (AuthGuard::new(tokens.clone()), tokens)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_allow_list_is_exact() {
        let (guard, _) = guard();

        assert!(guard.is_public("/auth/verify"));
        assert!(guard.is_public("/health"));
        assert!(!guard.is_public("/users/me"));
        assert!(!guard.is_public("/auth/verify/extra"));
        assert!(!guard.is_public("/does-not-exist"));
    }

    #[test]
    fn test_valid_access_token() {
        let (guard, tokens) = guard();
        let user_id = Uuid::new_v4();
        let pair = tokens.issue_pair(&user_id.to_string()).unwrap();

        let user = guard
            .authenticate(&headers_with(&format!("Bearer {}", pair.access_token)))
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert!(!user.token_id.is_empty());
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let (guard, tokens) = guard();
        let pair = tokens.issue_pair(&Uuid::new_v4().to_string()).unwrap();

        assert!(guard
            .authenticate(&headers_with(&format!("bearer {}", pair.access_token)))
            .is_ok());
    }

    #[test]
    fn test_rejections_are_uniform() {
        let (guard, tokens) = guard();
        let pair = tokens.issue_pair(&Uuid::new_v4().to_string()).unwrap();

        assert_eq!(guard.authenticate(&HeaderMap::new()), Err(Unauthenticated));
        assert_eq!(
            guard.authenticate(&headers_with(&format!("Basic {}", pair.access_token))),
            Err(Unauthenticated)
        );
        assert_eq!(
            guard.authenticate(&headers_with("Bearer not-a-token")),
            Err(Unauthenticated)
        );
        assert_eq!(
            guard.authenticate(&headers_with(&format!("Bearer {}", pair.refresh_token))),
            Err(Unauthenticated)
        );
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let (guard, tokens) = guard();
        let pair = tokens.issue_pair("not-a-uuid").unwrap();

        assert_eq!(
            guard.authenticate(&headers_with(&format!("Bearer {}", pair.access_token))),
            Err(Unauthenticated)
        );
    }
}
