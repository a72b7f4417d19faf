//! Caller identity
//!
//! Extracts the identity provider's ID token from the `Authorization`
//! header and turns it into an authenticated caller id. Credentials are
//! never checked here beyond what the provider's token asserts.

use crate::error::AppError;
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a provider-issued ID token to the caller it identifies
    async fn authenticate(&self, id_token: &str) -> Result<Identity, AppError>;
}

/// Pull the bearer token out of the request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let Authorization(bearer) = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| {
            AppError::Unauthenticated("Missing or malformed authorization header".to_string())
        })?;

    let token = bearer.token().trim();
    if token.is_empty() {
        return Err(AppError::Unauthenticated("Empty bearer token".to_string()));
    }
    Ok(token.to_string())
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies HS256 ID tokens signed with a secret shared with the provider
pub struct JwtIdentityProvider {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match issuer {
            Some(iss) => validation.set_issuer(&[iss]),
            None => validation.iss = None,
        }
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, id_token: &str) -> Result<Identity, AppError> {
        let data = decode::<IdTokenClaims>(id_token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthenticated("ID token expired".to_string())
                }
                _ => AppError::Unauthenticated(format!("ID token validation failed: {}", e)),
            })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AppError::Unauthenticated("ID token has no subject".to_string()));
        }

        Ok(Identity {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_IDENTITY_SECRET: &str = "test-identity-secret";

    /// Mint an ID token the way the provider would
    pub fn id_token(uid: &str) -> String {
        id_token_with(uid, TEST_IDENTITY_SECRET, Duration::minutes(5))
    }

    pub fn id_token_with(uid: &str, secret: &str, valid_for: Duration) -> String {
        let claims = serde_json::json!({
            "sub": uid,
            "email": format!("{}@example.com", uid),
            "exp": (Utc::now() + valid_for).timestamp(),
        });
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(matches!(
            bearer_token(&headers),
            Err(AppError::Unauthenticated(_))
        ));

        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[tokio::test]
    async fn test_valid_id_token_yields_identity() {
        let provider = JwtIdentityProvider::new(TEST_IDENTITY_SECRET, None, None);
        let identity = provider.authenticate(&id_token("alice")).await.unwrap();
        assert_eq!(identity.uid, "alice");
        assert_eq!(identity.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_bad_or_expired_id_tokens_are_unauthenticated() {
        let provider = JwtIdentityProvider::new(TEST_IDENTITY_SECRET, None, None);

        let forged = id_token_with("alice", "wrong-secret", Duration::minutes(5));
        let err = provider.authenticate(&forged).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");

        let expired = id_token_with("alice", TEST_IDENTITY_SECRET, Duration::minutes(-10));
        let err = provider.authenticate(&expired).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_issuer_is_enforced_when_configured() {
        let provider =
            JwtIdentityProvider::new(TEST_IDENTITY_SECRET, Some("https://idp.example.com"), None);
        assert!(provider.authenticate(&id_token("alice")).await.is_err());
    }
}
