//! Workspace and membership models

use crate::auth::Role;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_WORKSPACE_COLOR: &str = "#6366F1";

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern is valid"));

/// Tenant boundary under which texts and comments are isolated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub hex_color: String,
    pub created_at: DateTime<Utc>,
}

/// A caller's role inside one workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub workspace_id: Uuid,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Workspace name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[validate(regex(path = *HEX_COLOR, message = "Color must be a hex value like #1A2B3C"))]
    pub hex_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWorkspaceRequest {
    pub workspace_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct WorkspacePayload {
    pub workspace: Workspace,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceListPayload {
    pub workspaces: Vec<Workspace>,
}

#[derive(Debug, Serialize)]
pub struct MembershipPayload {
    pub member: Membership,
}
