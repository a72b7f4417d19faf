//! Workspace token management
//!
//! Workspace tokens are HS256 JWTs binding one caller to one workspace with
//! the role they held when the token was minted.

use crate::auth::Role;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Opaque bearer credential scoped to exactly one workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceToken {
    pub role: Role,
    pub token: String,
}

/// Tokens held by one caller session, keyed by workspace id.
///
/// The client replaces its copy in full whenever the server returns one.
pub type WorkspaceTokenMap = BTreeMap<Uuid, WorkspaceToken>;

/// Workspace token claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkspaceClaims {
    /// Caller identity the token was issued to
    pub sub: String,
    /// Workspace the token grants access to
    pub wid: Uuid,
    /// Role at issuance time
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Unique per mint, so rotated tokens always differ
    pub jti: Uuid,
}

/// Mints and decodes workspace tokens with a shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Mint a token for `caller_id` in `workspace_id`
    pub fn mint(
        &self,
        caller_id: &str,
        workspace_id: Uuid,
        role: Role,
    ) -> Result<WorkspaceToken, AppError> {
        let now = Utc::now();
        let claims = WorkspaceClaims {
            sub: caller_id.to_string(),
            wid: workspace_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        self.encode_claims(&claims).map(|token| WorkspaceToken { role, token })
    }

    pub(crate) fn encode_claims(&self, claims: &WorkspaceClaims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to create workspace token: {}", e)))
    }

    /// Decode and validate a workspace token
    pub fn decode(&self, token: &str) -> Result<WorkspaceClaims, AppError> {
        let token_data = decode::<WorkspaceClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::InvalidToken("Workspace token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::InvalidToken("Workspace token signature is invalid".to_string())
                }
                _ => AppError::InvalidToken("Workspace token is malformed".to_string()),
            })?;

        Ok(token_data.claims)
    }
}

/// Short digest of a token, safe to put in logs
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)[..12].to_string()
}
