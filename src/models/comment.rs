//! Comment models and validation

use super::{validate_not_blank, DraftCheck};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const SHORT_COMMENT_THRESHOLD: usize = 3;

/// A comment attached to a text within the same workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub text_id: Uuid,
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text_id: Uuid,
    pub content: String,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub text_id: Uuid,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsRequest {
    pub text_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub comment_id: Uuid,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentIdRequest {
    pub comment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CommentPayload {
    pub comment: Comment,
}

#[derive(Debug, Serialize)]
pub struct CommentListPayload {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Validate)]
pub struct CommentDraft {
    #[validate(custom(function = "validate_not_blank"))]
    #[validate(length(max = 2000, message = "Content cannot exceed 2000 characters"))]
    pub content: String,
}

impl CommentDraft {
    pub fn check(&self) -> DraftCheck {
        let mut check = DraftCheck::from_validation(self.validate());
        let trimmed = self.content.trim();
        if !trimmed.is_empty() && trimmed.chars().count() < SHORT_COMMENT_THRESHOLD {
            check.warn("Content is very short");
        }
        check
    }
}
