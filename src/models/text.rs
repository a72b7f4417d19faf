//! Text (note) models and validation

use super::{validate_not_blank, DraftCheck};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_TEXT_TITLE: &str = "Untitled";
const SHORT_TEXT_THRESHOLD: usize = 10;

/// A short text note stored inside a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields persisted when creating a text
#[derive(Debug, Clone)]
pub struct NewText {
    pub title: String,
    pub content: String,
    pub created_by: String,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct TextChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl TextChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTextRequest {
    pub content: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextRequest {
    pub text_id: Uuid,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextIdRequest {
    pub text_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TextPayload {
    pub text: Text,
}

#[derive(Debug, Serialize)]
pub struct TextListPayload {
    pub texts: Vec<Text>,
}

/// Text as it will be stored, checked before it reaches a repository
#[derive(Debug, Validate)]
pub struct TextDraft {
    #[validate(length(max = 200, message = "Title cannot exceed 200 characters"))]
    pub title: String,
    #[validate(custom(function = "validate_not_blank"))]
    #[validate(length(max = 1000, message = "Content cannot exceed 1000 characters"))]
    pub content: String,
}

impl TextDraft {
    pub fn check(&self) -> DraftCheck {
        let mut check = DraftCheck::from_validation(self.validate());
        let content = self.content.trim();
        if !content.is_empty() && content.chars().count() < SHORT_TEXT_THRESHOLD {
            check.warn("Content is very short");
        }
        check
    }
}

/// Trims a title, falling back to the default when nothing is left
pub fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_TEXT_TITLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_draft_has_no_errors() {
        let draft = TextDraft {
            title: "Groceries".to_string(),
            content: "Milk, eggs and a loaf of bread".to_string(),
        };
        assert_eq!(draft.check(), DraftCheck::default());
    }

    #[test]
    fn test_blank_content_is_rejected() {
        let draft = TextDraft {
            title: DEFAULT_TEXT_TITLE.to_string(),
            content: "   ".to_string(),
        };
        let check = draft.check();
        assert!(!check.is_valid());
        assert_eq!(check.errors, vec!["Content is required".to_string()]);
    }

    #[test]
    fn test_length_limits_report_every_violation() {
        let draft = TextDraft {
            title: "t".repeat(201),
            content: "c".repeat(1001),
        };
        let check = draft.check();
        assert_eq!(
            check.errors,
            vec![
                "Content cannot exceed 1000 characters".to_string(),
                "Title cannot exceed 200 characters".to_string(),
            ]
        );
    }

    #[test]
    fn test_short_content_only_warns() {
        let draft = TextDraft {
            title: "Hi".to_string(),
            content: "ok".to_string(),
        };
        let check = draft.check();
        assert!(check.is_valid());
        assert_eq!(check.warnings, vec!["Content is very short".to_string()]);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title(None), DEFAULT_TEXT_TITLE);
        assert_eq!(normalize_title(Some("   ")), DEFAULT_TEXT_TITLE);
        assert_eq!(normalize_title(Some("  Plan ")), "Plan");
    }
}
