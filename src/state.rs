//! Application state management
//!
//! Contains shared state accessible across all handlers. Nothing in here is
//! mutated after startup; storage handles are injected, never looked up
//! through globals.

use crate::auth::{
    AuthorizationGate, IdentityProvider, JwtIdentityProvider, TokenIssuer, WorkspaceTokenVerifier,
};
use crate::config::AuthConfig;
use crate::repository::{CommentRepository, Repositories, TextRepository, WorkspaceRepository};
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Identity, field and workspace-token checks run before every operation
    pub gate: AuthorizationGate,

    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub texts: Arc<dyn TextRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl AppState {
    /// Build state from configuration using the JWT identity provider
    pub fn new(auth: &AuthConfig, repositories: Repositories) -> Self {
        let identity = Arc::new(JwtIdentityProvider::new(
            &auth.identity_secret,
            auth.identity_issuer.as_deref(),
            auth.identity_audience.as_deref(),
        ));
        Self::with_identity(auth, identity, repositories)
    }

    pub fn with_identity(
        auth: &AuthConfig,
        identity: Arc<dyn IdentityProvider>,
        repositories: Repositories,
    ) -> Self {
        let issuer = TokenIssuer::new(&auth.workspace_token_secret, auth.workspace_token_ttl);
        let verifier = WorkspaceTokenVerifier::new(
            issuer,
            repositories.workspaces.clone(),
            auth.refresh.clone(),
        );

        Self {
            gate: AuthorizationGate::new(identity, verifier),
            workspaces: repositories.workspaces,
            texts: repositories.texts,
            comments: repositories.comments,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
