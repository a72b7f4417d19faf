//! Workspace token verification
//!
//! Decides whether a caller may act in a workspace with at least a given
//! role, and hands back the token map the caller should hold afterwards.

use crate::auth::jwt::{
    fingerprint, TokenIssuer, WorkspaceClaims, WorkspaceToken, WorkspaceTokenMap,
};
use crate::auth::Role;
use crate::error::AppError;
use crate::repository::WorkspaceRepository;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// When tokens get re-minted on a successful verification
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Rotate the presented token once it is this close to expiring
    pub rotate_within: Duration,
    /// Mint tokens for every other workspace the caller belongs to
    pub include_all_memberships: bool,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            rotate_within: Duration::days(1),
            include_all_memberships: true,
        }
    }
}

/// Successful verification
#[derive(Debug, Clone)]
pub struct VerifiedWorkspace {
    pub workspace_id: Uuid,
    /// Role the caller holds right now, which may differ from the claim
    pub role: Role,
    pub workspace_tokens: WorkspaceTokenMap,
}

pub struct WorkspaceTokenVerifier {
    issuer: TokenIssuer,
    workspaces: Arc<dyn WorkspaceRepository>,
    policy: RefreshPolicy,
}

impl WorkspaceTokenVerifier {
    pub fn new(
        issuer: TokenIssuer,
        workspaces: Arc<dyn WorkspaceRepository>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            issuer,
            workspaces,
            policy,
        }
    }

    /// Authorize `caller_id` against the workspace named by `token`.
    pub async fn verify(
        &self,
        token: Option<&str>,
        caller_id: &str,
        required: Role,
    ) -> Result<VerifiedWorkspace, AppError> {
        if caller_id.trim().is_empty() {
            return Err(AppError::Unauthenticated("Caller identity is missing".to_string()));
        }

        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AppError::InvalidToken("Workspace token is missing".to_string())),
        };

        let claims = self.issuer.decode(token)?;
        if claims.sub != caller_id {
            debug!(token = %fingerprint(token), "workspace token presented by another caller");
            return Err(AppError::InvalidToken(
                "Workspace token was issued to another caller".to_string(),
            ));
        }

        if self.workspaces.find(claims.wid).await?.is_none() {
            return Err(AppError::WorkspaceNotFound(format!(
                "Workspace {} not found",
                claims.wid
            )));
        }

        let role = self
            .workspaces
            .member_role(claims.wid, caller_id)
            .await?
            .ok_or_else(|| {
                AppError::PermissionDenied(
                    "You are no longer a member of this workspace".to_string(),
                )
            })?;

        if !role.satisfies(required) {
            return Err(AppError::PermissionDenied(format!(
                "Requires {} role, you have {}",
                required, role
            )));
        }

        let workspace_tokens = self.refreshed_tokens(token, &claims, role, caller_id).await?;

        Ok(VerifiedWorkspace {
            workspace_id: claims.wid,
            role,
            workspace_tokens,
        })
    }

    /// Fresh tokens for every workspace the caller belongs to
    pub async fn issue_all(&self, caller_id: &str) -> Result<WorkspaceTokenMap, AppError> {
        let mut tokens = WorkspaceTokenMap::new();
        for membership in self.workspaces.memberships(caller_id).await? {
            let token = self.issuer.mint(caller_id, membership.workspace_id, membership.role)?;
            tokens.insert(membership.workspace_id, token);
        }
        Ok(tokens)
    }

    async fn refreshed_tokens(
        &self,
        presented: &str,
        claims: &WorkspaceClaims,
        role: Role,
        caller_id: &str,
    ) -> Result<WorkspaceTokenMap, AppError> {
        let remaining = claims.exp - Utc::now().timestamp();
        let expires_soon = remaining <= self.policy.rotate_within.num_seconds();
        let current = if claims.role != role || expires_soon {
            debug!(
                workspace_id = %claims.wid,
                token = %fingerprint(presented),
                role_changed = claims.role != role,
                "rotating workspace token"
            );
            self.issuer.mint(caller_id, claims.wid, role)?
        } else {
            WorkspaceToken {
                role,
                token: presented.to_string(),
            }
        };

        let mut tokens = WorkspaceTokenMap::new();
        if self.policy.include_all_memberships {
            for membership in self.workspaces.memberships(caller_id).await? {
                if membership.workspace_id != claims.wid {
                    let token = self
                        .issuer
                        .mint(caller_id, membership.workspace_id, membership.role)?;
                    tokens.insert(membership.workspace_id, token);
                }
            }
        }
        tokens.insert(claims.wid, current);
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Membership, Workspace};
    use crate::repository::InMemoryWorkspaceRepository;
    use async_trait::async_trait;

    const SECRET: &str = "verifier-test-secret";

    struct Fixture {
        repo: Arc<InMemoryWorkspaceRepository>,
        issuer: TokenIssuer,
        verifier: WorkspaceTokenVerifier,
    }

    fn fixture(policy: RefreshPolicy) -> Fixture {
        let repo = Arc::new(InMemoryWorkspaceRepository::new());
        let issuer = TokenIssuer::new(SECRET, Duration::days(7));
        let verifier = WorkspaceTokenVerifier::new(issuer.clone(), repo.clone(), policy);
        Fixture {
            repo,
            issuer,
            verifier,
        }
    }

    #[tokio::test]
    async fn test_admin_token_satisfies_editor_requirement() {
        let f = fixture(RefreshPolicy::default());
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        let token = f.issuer.mint("alice", ws.id, Role::Admin).unwrap();

        let verified = f
            .verifier
            .verify(Some(&token.token), "alice", Role::Editor)
            .await
            .unwrap();
        assert_eq!(verified.workspace_id, ws.id);
        assert_eq!(verified.role, Role::Admin);
        assert_eq!(verified.workspace_tokens[&ws.id].token, token.token);
    }

    #[tokio::test]
    async fn test_editor_token_is_denied_admin_operations() {
        let f = fixture(RefreshPolicy::default());
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        f.repo.upsert_member(ws.id, "bob", Role::Editor).await.unwrap();
        let token = f.issuer.mint("bob", ws.id, Role::Editor).unwrap();

        let err = f
            .verifier
            .verify(Some(&token.token), "bob", Role::Admin)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn test_absent_or_blank_token_is_invalid() {
        let f = fixture(RefreshPolicy::default());
        for token in [None, Some(""), Some("   ")] {
            let err = f.verifier.verify(token, "alice", Role::Editor).await.unwrap_err();
            assert_eq!(err.code(), "INVALID_TOKEN");
        }
    }

    #[tokio::test]
    async fn test_token_of_another_caller_is_invalid() {
        let f = fixture(RefreshPolicy::default());
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        let token = f.issuer.mint("alice", ws.id, Role::Admin).unwrap();

        let err = f
            .verifier
            .verify(Some(&token.token), "mallory", Role::Editor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_deleted_workspace_is_not_found() {
        let f = fixture(RefreshPolicy::default());
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        let token = f.issuer.mint("alice", ws.id, Role::Admin).unwrap();
        f.repo.remove(ws.id).await;

        let err = f
            .verifier
            .verify(Some(&token.token), "alice", Role::Editor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WORKSPACE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_revoked_membership_is_denied() {
        let f = fixture(RefreshPolicy::default());
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        f.repo.upsert_member(ws.id, "bob", Role::Admin).await.unwrap();
        let token = f.issuer.mint("bob", ws.id, Role::Admin).unwrap();
        f.repo.remove_member(ws.id, "bob").await;

        let err = f
            .verifier
            .verify(Some(&token.token), "bob", Role::Editor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn test_current_membership_role_wins_over_claim() {
        let f = fixture(RefreshPolicy::default());
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        f.repo.upsert_member(ws.id, "bob", Role::Admin).await.unwrap();
        let token = f.issuer.mint("bob", ws.id, Role::Admin).unwrap();

        // Demoted after the token was issued
        f.repo.upsert_member(ws.id, "bob", Role::Editor).await.unwrap();
        let err = f
            .verifier
            .verify(Some(&token.token), "bob", Role::Admin)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");

        let verified = f
            .verifier
            .verify(Some(&token.token), "bob", Role::Editor)
            .await
            .unwrap();
        let reissued = &verified.workspace_tokens[&ws.id];
        assert_eq!(reissued.role, Role::Editor);
        assert_ne!(reissued.token, token.token);
        assert_eq!(f.issuer.decode(&reissued.token).unwrap().role, Role::Editor);
    }

    #[tokio::test]
    async fn test_token_close_to_expiry_is_rotated() {
        let f = fixture(RefreshPolicy {
            rotate_within: Duration::days(30),
            include_all_memberships: false,
        });
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        let token = f.issuer.mint("alice", ws.id, Role::Admin).unwrap();

        let verified = f
            .verifier
            .verify(Some(&token.token), "alice", Role::Admin)
            .await
            .unwrap();
        assert_ne!(verified.workspace_tokens[&ws.id].token, token.token);
    }

    #[tokio::test]
    async fn test_map_covers_every_membership_when_enabled() {
        let f = fixture(RefreshPolicy::default());
        let w1 = f.repo.create("W1", "#000000", "alice").await.unwrap();
        let w2 = f.repo.create("W2", "#000000", "bob").await.unwrap();
        f.repo.upsert_member(w2.id, "alice", Role::Editor).await.unwrap();
        let token = f.issuer.mint("alice", w1.id, Role::Admin).unwrap();

        let verified = f
            .verifier
            .verify(Some(&token.token), "alice", Role::Editor)
            .await
            .unwrap();
        assert_eq!(verified.workspace_tokens.len(), 2);
        assert_eq!(verified.workspace_tokens[&w2.id].role, Role::Editor);

        let narrow = fixture(RefreshPolicy {
            include_all_memberships: false,
            ..RefreshPolicy::default()
        });
        let ws = narrow.repo.create("W", "#000000", "alice").await.unwrap();
        narrow.repo.create("Other", "#000000", "alice").await.unwrap();
        let token = narrow.issuer.mint("alice", ws.id, Role::Admin).unwrap();
        let verified = narrow
            .verifier
            .verify(Some(&token.token), "alice", Role::Editor)
            .await
            .unwrap();
        assert_eq!(verified.workspace_tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_verification_is_idempotent() {
        let f = fixture(RefreshPolicy::default());
        let ws = f.repo.create("W1", "#000000", "alice").await.unwrap();
        let token = f.issuer.mint("alice", ws.id, Role::Admin).unwrap();

        let first = f.verifier.verify(Some(&token.token), "alice", Role::Editor).await.unwrap();
        let second = f.verifier.verify(Some(&token.token), "alice", Role::Editor).await.unwrap();
        assert_eq!(first.workspace_id, second.workspace_id);
        assert_eq!(first.workspace_tokens[&ws.id], second.workspace_tokens[&ws.id]);
    }

    #[tokio::test]
    async fn test_issue_all_mints_one_token_per_membership() {
        let f = fixture(RefreshPolicy::default());
        let w1 = f.repo.create("W1", "#000000", "alice").await.unwrap();
        let w2 = f.repo.create("W2", "#000000", "bob").await.unwrap();
        f.repo.upsert_member(w2.id, "alice", Role::Editor).await.unwrap();

        let tokens = f.verifier.issue_all("alice").await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[&w1.id].role, Role::Admin);
        assert_eq!(f.issuer.decode(&tokens[&w2.id].token).unwrap().wid, w2.id);
        assert!(f.verifier.issue_all("nobody").await.unwrap().is_empty());
    }

    struct UnreachableDirectory;

    #[async_trait]
    impl WorkspaceRepository for UnreachableDirectory {
        async fn find(&self, _: Uuid) -> Result<Option<Workspace>, AppError> {
            Err(AppError::Internal("directory unreachable".into()))
        }
        async fn member_role(&self, _: Uuid, _: &str) -> Result<Option<Role>, AppError> {
            Err(AppError::Internal("directory unreachable".into()))
        }
        async fn memberships(&self, _: &str) -> Result<Vec<Membership>, AppError> {
            Err(AppError::Internal("directory unreachable".into()))
        }
        async fn list_for_user(&self, _: &str) -> Result<Vec<Workspace>, AppError> {
            Err(AppError::Internal("directory unreachable".into()))
        }
        async fn create(&self, _: &str, _: &str, _: &str) -> Result<Workspace, AppError> {
            Err(AppError::Internal("directory unreachable".into()))
        }
        async fn upsert_member(&self, _: Uuid, _: &str, _: Role) -> Result<Membership, AppError> {
            Err(AppError::Internal("directory unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_as_internal_error() {
        let issuer = TokenIssuer::new(SECRET, Duration::days(7));
        let token = issuer.mint("alice", Uuid::new_v4(), Role::Admin).unwrap();
        let verifier = WorkspaceTokenVerifier::new(
            issuer,
            Arc::new(UnreachableDirectory),
            RefreshPolicy::default(),
        );

        let err = verifier
            .verify(Some(&token.token), "alice", Role::Editor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.public_message(), "An internal error occurred");
    }
}
