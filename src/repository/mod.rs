//! Repository seams
//!
//! Business operations and the workspace token verifier depend on these
//! traits only. PostgreSQL implementations live in `crate::db`; the
//! in-memory ones back tests and the `memory` storage backend.

pub mod memory;

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{Comment, Membership, NewComment, NewText, Text, TextChanges, Workspace};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub use memory::{InMemoryCommentRepository, InMemoryTextRepository, InMemoryWorkspaceRepository};

/// Workspaces and who belongs to them
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn find(&self, workspace_id: Uuid) -> Result<Option<Workspace>, AppError>;

    /// Current role of `user_id`, or `None` when they are not a member
    async fn member_role(
        &self,
        workspace_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Role>, AppError>;

    async fn memberships(&self, user_id: &str) -> Result<Vec<Membership>, AppError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Workspace>, AppError>;

    /// Create a workspace with `creator` as its first admin
    async fn create(
        &self,
        name: &str,
        hex_color: &str,
        creator: &str,
    ) -> Result<Workspace, AppError>;

    async fn upsert_member(
        &self,
        workspace_id: Uuid,
        user_id: &str,
        role: Role,
    ) -> Result<Membership, AppError>;
}

/// Texts, always scoped by workspace
#[async_trait]
pub trait TextRepository: Send + Sync {
    /// Newest first
    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Text>, AppError>;

    async fn get(&self, id: Uuid, workspace_id: Uuid) -> Result<Option<Text>, AppError>;

    async fn create(&self, workspace_id: Uuid, text: NewText) -> Result<Text, AppError>;

    async fn update(
        &self,
        id: Uuid,
        workspace_id: Uuid,
        changes: TextChanges,
    ) -> Result<Option<Text>, AppError>;

    /// Returns whether a row was removed
    async fn delete(&self, id: Uuid, workspace_id: Uuid) -> Result<bool, AppError>;
}

/// Comments, always scoped by workspace
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Comment>, AppError>;

    async fn list_for_text(
        &self,
        text_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Vec<Comment>, AppError>;

    async fn get(&self, id: Uuid, workspace_id: Uuid) -> Result<Option<Comment>, AppError>;

    async fn create(&self, workspace_id: Uuid, comment: NewComment) -> Result<Comment, AppError>;

    async fn update_content(
        &self,
        id: Uuid,
        workspace_id: Uuid,
        content: &str,
    ) -> Result<Option<Comment>, AppError>;

    async fn delete(&self, id: Uuid, workspace_id: Uuid) -> Result<bool, AppError>;

    /// Remove every comment on a text; returns how many went
    async fn delete_for_text(&self, text_id: Uuid, workspace_id: Uuid) -> Result<u64, AppError>;
}

/// Storage handles injected into the application state
#[derive(Clone)]
pub struct Repositories {
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub texts: Arc<dyn TextRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            workspaces: Arc::new(InMemoryWorkspaceRepository::new()),
            texts: Arc::new(InMemoryTextRepository::new()),
            comments: Arc::new(InMemoryCommentRepository::new()),
        }
    }
}
