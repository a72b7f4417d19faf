//! Authorization gate
//!
//! Every business operation goes through the same sequence before touching
//! data: caller identity, required fields, workspace token. Each step
//! short-circuits the rest.

use crate::auth::identity::{bearer_token, Identity, IdentityProvider};
use crate::auth::jwt::WorkspaceTokenMap;
use crate::auth::verifier::WorkspaceTokenVerifier;
use crate::auth::Role;
use crate::error::{missing_fields_error, AppError};
use crate::models::ApiResponse;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Request field carrying the workspace token
pub const WORKSPACE_TOKEN_FIELD: &str = "workspaceToken";

/// A request that passed the gate, scoped to one workspace
#[derive(Debug, Clone)]
pub struct ScopedAccess {
    pub caller: Identity,
    pub workspace_id: Uuid,
    pub role: Role,
    pub workspace_tokens: WorkspaceTokenMap,
}

impl ScopedAccess {
    /// Wrap the outcome of the business step, attaching the token map either way
    pub fn respond<T>(self, result: Result<T, AppError>) -> ApiResponse<T> {
        match result {
            Ok(data) => ApiResponse::success(data, Some(self.workspace_tokens)),
            Err(error) => ApiResponse::failure(error, Some(self.workspace_tokens)),
        }
    }
}

pub struct AuthorizationGate {
    identity: Arc<dyn IdentityProvider>,
    verifier: WorkspaceTokenVerifier,
}

impl AuthorizationGate {
    pub fn new(identity: Arc<dyn IdentityProvider>, verifier: WorkspaceTokenVerifier) -> Self {
        Self { identity, verifier }
    }

    pub fn verifier(&self) -> &WorkspaceTokenVerifier {
        &self.verifier
    }

    /// Identity and field presence only, for operations outside any workspace
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        body: &Value,
        required: &[&str],
    ) -> Result<Identity, AppError> {
        let id_token = bearer_token(headers)?;
        let caller = self.identity.authenticate(&id_token).await?;
        require_fields(body, required)?;
        Ok(caller)
    }

    /// Full gate: identity, fields, then the workspace token against `role`
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        body: &Value,
        required: &[&str],
        role: Role,
    ) -> Result<ScopedAccess, AppError> {
        let caller = self.authenticate(headers, body, required).await?;

        let token = body.get(WORKSPACE_TOKEN_FIELD).and_then(Value::as_str);
        let verified = self.verifier.verify(token, &caller.uid, role).await?;

        debug!(
            user_id = %caller.uid,
            workspace_id = %verified.workspace_id,
            role = %verified.role,
            "request authorized"
        );

        Ok(ScopedAccess {
            caller,
            workspace_id: verified.workspace_id,
            role: verified.role,
            workspace_tokens: verified.workspace_tokens,
        })
    }
}

/// Report every required field that is absent or `null`
pub fn require_fields(body: &Value, required: &[&str]) -> Result<(), AppError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|field| body.get(**field).map_or(true, Value::is_null))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing_fields_error(missing))
    }
}

/// Deserialize a body that already passed the presence check
pub fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::InvalidInput {
        message: format!("Invalid request body: {}", e),
        details: None,
    })
}

/// Unreadable JSON counts as an empty body so the gate can report fields
pub fn body_or_empty(payload: Result<Json<Value>, JsonRejection>) -> Value {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!("Unreadable request body: {}", rejection.body_text());
            Value::Object(Default::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::tests::{id_token, TEST_IDENTITY_SECRET};
    use crate::auth::{JwtIdentityProvider, RefreshPolicy, TokenIssuer};
    use crate::repository::{InMemoryWorkspaceRepository, WorkspaceRepository};
    use axum::http::header::AUTHORIZATION;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn gate() -> (AuthorizationGate, Arc<InMemoryWorkspaceRepository>, TokenIssuer) {
        let repo = Arc::new(InMemoryWorkspaceRepository::new());
        let issuer = TokenIssuer::new("gate-test-secret", Duration::days(7));
        let verifier =
            WorkspaceTokenVerifier::new(issuer.clone(), repo.clone(), RefreshPolicy::default());
        let identity = Arc::new(JwtIdentityProvider::new(TEST_IDENTITY_SECRET, None, None));
        (AuthorizationGate::new(identity, verifier), repo, issuer)
    }

    fn headers_for(uid: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", id_token(uid)).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn test_require_fields_reports_every_missing_field() {
        let body = json!({ "title": "x", "content": null });
        let err = require_fields(&body, &["workspaceToken", "textId", "content"]).unwrap_err();
        assert_eq!(
            err.details(),
            Some(&json!({ "fields": ["workspaceToken", "textId", "content"] }))
        );

        let body = json!({ "workspaceToken": "t", "content": "c" });
        assert!(require_fields(&body, &["workspaceToken", "content"]).is_ok());
    }

    #[test]
    fn test_require_fields_on_non_object_body() {
        let err = require_fields(&Value::Null, &["workspaceToken"]).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_two_of_three_missing_reports_both() {
        let body = json!({ "workspaceToken": "t" });
        let err = require_fields(&body, &["workspaceToken", "textId", "content"]).unwrap_err();
        assert_eq!(err.details(), Some(&json!({ "fields": ["textId", "content"] })));
    }

    #[tokio::test]
    async fn test_identity_is_checked_before_fields() {
        let (gate, _, _) = gate();
        let err = gate
            .authorize(&HeaderMap::new(), &json!({}), &["workspaceToken"], Role::Editor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_fields_are_checked_before_token() {
        let (gate, _, _) = gate();
        let err = gate
            .authorize(
                &headers_for("alice"),
                &json!({}),
                &["workspaceToken", "content"],
                Role::Editor,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_authorized_access_carries_workspace_and_tokens() {
        let (gate, repo, issuer) = gate();
        let ws = repo.create("W1", "#000000", "alice").await.unwrap();
        let token = issuer.mint("alice", ws.id, Role::Admin).unwrap();

        let access = gate
            .authorize(
                &headers_for("alice"),
                &json!({ "workspaceToken": token.token }),
                &["workspaceToken"],
                Role::Editor,
            )
            .await
            .unwrap();
        assert_eq!(access.workspace_id, ws.id);
        assert_eq!(access.caller.uid, "alice");
        assert!(access.workspace_tokens.contains_key(&ws.id));
    }

    #[test]
    fn test_parse_body_rejects_wrong_shapes() {
        #[derive(Debug, serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Req {
            #[allow(dead_code)]
            text_id: Uuid,
        }
        let err = parse_body::<Req>(json!({ "textId": "not-a-uuid" })).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
