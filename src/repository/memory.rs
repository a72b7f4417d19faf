//! In-memory repositories
//!
//! Rows live behind `tokio::sync::RwLock`s and are kept in insertion order,
//! so listing newest-first is a reverse scan.

use super::{CommentRepository, TextRepository, WorkspaceRepository};
use crate::auth::Role;
use crate::error::AppError;
use crate::models::{Comment, Membership, NewComment, NewText, Text, TextChanges, Workspace};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryWorkspaceRepository {
    workspaces: Arc<RwLock<HashMap<Uuid, Workspace>>>,
    members: Arc<RwLock<HashMap<(Uuid, String), Role>>>,
}

impl InMemoryWorkspaceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl InMemoryWorkspaceRepository {
    /// Drop a workspace while leaving its memberships dangling
    pub async fn remove(&self, workspace_id: Uuid) {
        self.workspaces.write().await.remove(&workspace_id);
    }

    /// Revoke a membership
    pub async fn remove_member(&self, workspace_id: Uuid, user_id: &str) {
        self.members
            .write()
            .await
            .remove(&(workspace_id, user_id.to_string()));
    }
}

#[async_trait]
impl WorkspaceRepository for InMemoryWorkspaceRepository {
    async fn find(&self, workspace_id: Uuid) -> Result<Option<Workspace>, AppError> {
        Ok(self.workspaces.read().await.get(&workspace_id).cloned())
    }

    async fn member_role(
        &self,
        workspace_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Role>, AppError> {
        let members = self.members.read().await;
        Ok(members.get(&(workspace_id, user_id.to_string())).copied())
    }

    async fn memberships(&self, user_id: &str) -> Result<Vec<Membership>, AppError> {
        let workspaces = self.workspaces.read().await;
        let members = self.members.read().await;
        let mut memberships: Vec<Membership> = members
            .iter()
            .filter(|((workspace_id, uid), _)| {
                uid == user_id && workspaces.contains_key(workspace_id)
            })
            .map(|((workspace_id, uid), role)| Membership {
                workspace_id: *workspace_id,
                user_id: uid.clone(),
                role: *role,
            })
            .collect();
        memberships.sort_by_key(|m| m.workspace_id);
        Ok(memberships)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Workspace>, AppError> {
        let memberships = self.memberships(user_id).await?;
        let workspaces = self.workspaces.read().await;
        let mut list: Vec<Workspace> = memberships
            .iter()
            .filter_map(|m| workspaces.get(&m.workspace_id).cloned())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn create(
        &self,
        name: &str,
        hex_color: &str,
        creator: &str,
    ) -> Result<Workspace, AppError> {
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
            hex_color: hex_color.to_string(),
            created_at: Utc::now(),
        };
        self.workspaces
            .write()
            .await
            .insert(workspace.id, workspace.clone());
        self.members
            .write()
            .await
            .insert((workspace.id, creator.to_string()), Role::Admin);
        Ok(workspace)
    }

    async fn upsert_member(
        &self,
        workspace_id: Uuid,
        user_id: &str,
        role: Role,
    ) -> Result<Membership, AppError> {
        if !self.workspaces.read().await.contains_key(&workspace_id) {
            return Err(AppError::WorkspaceNotFound(format!(
                "Workspace {} not found",
                workspace_id
            )));
        }
        self.members
            .write()
            .await
            .insert((workspace_id, user_id.to_string()), role);
        Ok(Membership {
            workspace_id,
            user_id: user_id.to_string(),
            role,
        })
    }
}

#[derive(Default)]
pub struct InMemoryTextRepository {
    texts: Arc<RwLock<Vec<Text>>>,
}

impl InMemoryTextRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TextRepository for InMemoryTextRepository {
    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Text>, AppError> {
        let texts = self.texts.read().await;
        Ok(texts
            .iter()
            .rev()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid, workspace_id: Uuid) -> Result<Option<Text>, AppError> {
        let texts = self.texts.read().await;
        Ok(texts
            .iter()
            .find(|t| t.id == id && t.workspace_id == workspace_id)
            .cloned())
    }

    async fn create(&self, workspace_id: Uuid, text: NewText) -> Result<Text, AppError> {
        let now = Utc::now();
        let text = Text {
            id: Uuid::new_v4(),
            workspace_id,
            title: text.title,
            content: text.content,
            created_by: text.created_by,
            created_at: now,
            updated_at: now,
        };
        self.texts.write().await.push(text.clone());
        Ok(text)
    }

    async fn update(
        &self,
        id: Uuid,
        workspace_id: Uuid,
        changes: TextChanges,
    ) -> Result<Option<Text>, AppError> {
        let mut texts = self.texts.write().await;
        let Some(text) = texts
            .iter_mut()
            .find(|t| t.id == id && t.workspace_id == workspace_id)
        else {
            return Ok(None);
        };

        if changes.is_empty() {
            return Ok(Some(text.clone()));
        }
        if let Some(title) = changes.title {
            text.title = title;
        }
        if let Some(content) = changes.content {
            text.content = content;
        }
        text.updated_at = Utc::now();
        Ok(Some(text.clone()))
    }

    async fn delete(&self, id: Uuid, workspace_id: Uuid) -> Result<bool, AppError> {
        let mut texts = self.texts.write().await;
        let before = texts.len();
        texts.retain(|t| !(t.id == id && t.workspace_id == workspace_id));
        Ok(texts.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: Arc<RwLock<Vec<Comment>>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Comment>, AppError> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .rev()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn list_for_text(
        &self,
        text_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Vec<Comment>, AppError> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .rev()
            .filter(|c| c.text_id == text_id && c.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid, workspace_id: Uuid) -> Result<Option<Comment>, AppError> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .find(|c| c.id == id && c.workspace_id == workspace_id)
            .cloned())
    }

    async fn create(&self, workspace_id: Uuid, comment: NewComment) -> Result<Comment, AppError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            workspace_id,
            text_id: comment.text_id,
            content: comment.content,
            created_by: comment.created_by,
            created_at: now,
            updated_at: now,
        };
        self.comments.write().await.push(comment.clone());
        Ok(comment)
    }

    async fn update_content(
        &self,
        id: Uuid,
        workspace_id: Uuid,
        content: &str,
    ) -> Result<Option<Comment>, AppError> {
        let mut comments = self.comments.write().await;
        Ok(comments
            .iter_mut()
            .find(|c| c.id == id && c.workspace_id == workspace_id)
            .map(|c| {
                c.content = content.to_string();
                c.updated_at = Utc::now();
                c.clone()
            }))
    }

    async fn delete(&self, id: Uuid, workspace_id: Uuid) -> Result<bool, AppError> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| !(c.id == id && c.workspace_id == workspace_id));
        Ok(comments.len() < before)
    }

    async fn delete_for_text(&self, text_id: Uuid, workspace_id: Uuid) -> Result<u64, AppError> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| !(c.text_id == text_id && c.workspace_id == workspace_id));
        Ok((before - comments.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_texts_are_isolated_per_workspace() {
        let repo = InMemoryTextRepository::new();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let text = repo
            .create(
                w1,
                NewText {
                    title: "A".into(),
                    content: "first note".into(),
                    created_by: "alice".into(),
                },
            )
            .await
            .unwrap();

        assert!(repo.get(text.id, w2).await.unwrap().is_none());
        assert!(!repo.delete(text.id, w2).await.unwrap());
        assert!(repo.list(w2).await.unwrap().is_empty());
        assert_eq!(repo.list(w1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_texts_list_newest_first() {
        let repo = InMemoryTextRepository::new();
        let w = Uuid::new_v4();
        for title in ["one", "two", "three"] {
            repo.create(
                w,
                NewText {
                    title: title.into(),
                    content: "content body".into(),
                    created_by: "alice".into(),
                },
            )
            .await
            .unwrap();
        }
        let titles: Vec<String> =
            repo.list(w).await.unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);
    }

    #[tokio::test]
    async fn test_creator_becomes_admin() {
        let repo = InMemoryWorkspaceRepository::new();
        let ws = repo.create("Team", "#112233", "alice").await.unwrap();
        assert_eq!(repo.member_role(ws.id, "alice").await.unwrap(), Some(Role::Admin));
        assert_eq!(repo.member_role(ws.id, "bob").await.unwrap(), None);

        repo.upsert_member(ws.id, "bob", Role::Editor).await.unwrap();
        assert_eq!(repo.member_role(ws.id, "bob").await.unwrap(), Some(Role::Editor));
        assert_eq!(repo.list_for_user("bob").await.unwrap(), vec![ws]);
    }

    #[tokio::test]
    async fn test_removed_workspace_drops_out_of_memberships() {
        let repo = InMemoryWorkspaceRepository::new();
        let ws = repo.create("Team", "#112233", "alice").await.unwrap();
        repo.remove(ws.id).await;
        assert!(repo.memberships("alice").await.unwrap().is_empty());
        assert!(repo.upsert_member(ws.id, "bob", Role::Editor).await.is_err());
    }

    #[tokio::test]
    async fn test_deleting_comments_for_a_text_keeps_its_neighbours() {
        let repo = InMemoryCommentRepository::new();
        let w = Uuid::new_v4();
        let (doomed, kept) = (Uuid::new_v4(), Uuid::new_v4());
        for text_id in [doomed, doomed, kept] {
            repo.create(
                w,
                NewComment {
                    text_id,
                    content: "nice".into(),
                    created_by: "alice".into(),
                },
            )
            .await
            .unwrap();
        }

        assert_eq!(repo.delete_for_text(doomed, Uuid::new_v4()).await.unwrap(), 0);
        assert_eq!(repo.delete_for_text(doomed, w).await.unwrap(), 2);
        let left = repo.list(w).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].text_id, kept);
    }
}
