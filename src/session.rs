/**
 * Session Resolver
 * Verifies the signed access token on a request and yields the admin identity
 */
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::ApiError;

pub const ADMIN_ROLE: &str = "admin";

/// Access token claims as issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

/// Server-controlled claims. Users cannot edit these.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// A verified caller holding the admin role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub user_id: String,
    pub email: Option<String>,
    pub role: String,
}

#[derive(Clone)]
pub struct SessionResolver {
    key: DecodingKey,
    validation: Validation,
    cookie: String,
}

impl SessionResolver {
    pub fn new(secret: &str, audience: &str, cookie: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie: cookie.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_audience, &config.session_cookie)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }

    /// `None` when the request carries no token, the token does not verify,
    /// or the caller is not an admin.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<AdminSession> {
        let token = extract_bearer_token(headers).or_else(|| self.cookie_token(headers))?;

        let claims = match self.verify(&token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "rejected session token");
                return None;
            }
        };

        if claims.app_metadata.role.as_deref() != Some(ADMIN_ROLE) {
            tracing::warn!(user_id = %claims.sub, "non-admin session on admin route");
            return None;
        }

        Some(AdminSession {
            user_id: claims.sub,
            email: claims.email,
            role: ADMIN_ROLE.to_string(),
        })
    }

    fn cookie_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie)
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    SessionResolver: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        SessionResolver::from_ref(state)
            .resolve(&parts.headers)
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mint_token, TEST_SECRET};
    use axum::http::HeaderValue;

    fn resolver() -> SessionResolver {
        SessionResolver::new(TEST_SECRET, "authenticated", "sb-access-token")
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_admin_bearer_token_resolves() {
        let session = resolver()
            .resolve(&bearer(&mint_token("user-1", Some("admin"))))
            .unwrap();
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.role, "admin");
    }

    #[test]
    fn test_admin_cookie_resolves() {
        let mut headers = HeaderMap::new();
        let cookie = format!("theme=dark; sb-access-token={}", mint_token("user-2", Some("admin")));
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        assert_eq!(resolver().resolve(&headers).unwrap().user_id, "user-2");
    }

    #[test]
    fn test_non_admin_and_missing_role_rejected() {
        assert!(resolver().resolve(&bearer(&mint_token("u", Some("editor")))).is_none());
        assert!(resolver().resolve(&bearer(&mint_token("u", None))).is_none());
    }

    #[test]
    fn test_wrong_secret_and_garbage_rejected() {
        let other = SessionResolver::new("another-secret", "authenticated", "sb-access-token");
        assert!(other.resolve(&bearer(&mint_token("u", Some("admin")))).is_none());
        assert!(resolver().resolve(&bearer("not.a.jwt")).is_none());
        assert!(resolver().resolve(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let other = SessionResolver::new(TEST_SECRET, "service_role", "sb-access-token");
        assert!(other.resolve(&bearer(&mint_token("u", Some("admin")))).is_none());
    }
}
