//! Workspace route handlers
//!
//! `issue_tokens` and `create_workspace` run before the caller holds any
//! workspace token, so they only pass the identity and field checks.

use crate::auth::{body_or_empty, parse_body, Role, ScopedAccess, WORKSPACE_TOKEN_FIELD};
use crate::error::{not_found_error, ApiResult, AppError};
use crate::models::{
    AddMemberRequest, ApiResponse, CreateWorkspaceRequest, DraftCheck, GetWorkspaceRequest,
    MembershipPayload, WorkspaceListPayload, WorkspacePayload, DEFAULT_WORKSPACE_COLOR,
};
use crate::state::SharedState;
use axum::{extract::rejection::JsonRejection, extract::State, http::HeaderMap, Json};
use serde_json::Value;
use tracing::info;
use validator::Validate;

/// POST /api/workspaces/tokens
///
/// Session bootstrap: a token for every workspace the caller belongs to.
pub async fn issue_tokens(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<WorkspaceListPayload> {
    let body = body_or_empty(payload);
    let caller = match state.gate.authenticate(&headers, &body, &[]).await {
        Ok(caller) => caller,
        Err(e) => return e.into(),
    };

    let tokens = match state.gate.verifier().issue_all(&caller.uid).await {
        Ok(tokens) => tokens,
        Err(e) => return e.into(),
    };
    match state.workspaces.list_for_user(&caller.uid).await {
        Ok(workspaces) => {
            info!(
                user_id = %caller.uid,
                count = tokens.len(),
                action = "issue_workspace_tokens",
                "Workspace tokens issued"
            );
            ApiResponse::success(WorkspaceListPayload { workspaces }, Some(tokens))
        }
        Err(e) => ApiResponse::failure(e, Some(tokens)),
    }
}

/// POST /api/workspaces/create
pub async fn create_workspace(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<WorkspacePayload> {
    let body = body_or_empty(payload);
    let caller = match state.gate.authenticate(&headers, &body, &["name"]).await {
        Ok(caller) => caller,
        Err(e) => return e.into(),
    };

    let mut req: CreateWorkspaceRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into(),
    };
    // Validate what gets stored, so a whitespace-only name counts as empty
    req.name = req.name.trim().to_string();
    if let Err(e) = DraftCheck::from_validation(req.validate()).into_result() {
        return e.into();
    }

    let color = req.hex_color.as_deref().unwrap_or(DEFAULT_WORKSPACE_COLOR);
    let workspace = match state.workspaces.create(&req.name, color, &caller.uid).await {
        Ok(workspace) => workspace,
        Err(e) => return e.into(),
    };

    info!(
        workspace_id = %workspace.id,
        user_id = %caller.uid,
        action = "create_workspace",
        "Workspace created"
    );

    // The new admin token arrives together with the workspace
    match state.gate.verifier().issue_all(&caller.uid).await {
        Ok(tokens) => ApiResponse::success(WorkspacePayload { workspace }, Some(tokens)),
        Err(e) => e.into(),
    }
}

/// POST /api/workspaces/list
pub async fn list_workspaces(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<WorkspaceListPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD], Role::Editor)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = state
        .workspaces
        .list_for_user(&access.caller.uid)
        .await
        .map(|workspaces| WorkspaceListPayload { workspaces });
    access.respond(result)
}

/// POST /api/workspaces/get
pub async fn get_workspace(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<WorkspacePayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "workspaceId"], Role::Editor)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = get(&state, &access, body).await;
    access.respond(result)
}

async fn get(
    state: &SharedState,
    access: &ScopedAccess,
    body: Value,
) -> ApiResult<WorkspacePayload> {
    let req: GetWorkspaceRequest = parse_body(body)?;
    // A token only opens the workspace it was minted for
    if req.workspace_id != access.workspace_id {
        return Err(not_found_error("Workspace not found"));
    }

    let workspace = state
        .workspaces
        .find(access.workspace_id)
        .await?
        .ok_or_else(|| not_found_error("Workspace not found"))?;
    Ok(WorkspacePayload { workspace })
}

/// POST /api/workspaces/members/add
pub async fn add_member(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<MembershipPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "userId", "role"], Role::Admin)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = add(&state, &access, body).await;
    access.respond(result)
}

async fn add(
    state: &SharedState,
    access: &ScopedAccess,
    body: Value,
) -> ApiResult<MembershipPayload> {
    let req: AddMemberRequest = parse_body(body)?;
    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput {
            message: "userId must not be blank".to_string(),
            details: None,
        });
    }

    let member = state
        .workspaces
        .upsert_member(access.workspace_id, user_id, req.role)
        .await?;

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        member_id = %member.user_id,
        member_role = %member.role,
        action = "add_member",
        "Member added"
    );
    Ok(MembershipPayload { member })
}
