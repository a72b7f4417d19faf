//! Text route handlers
//!
//! Each handler runs the authorization gate, then the business step scoped
//! to the authorized workspace.

use crate::auth::{body_or_empty, parse_body, Role, ScopedAccess, WORKSPACE_TOKEN_FIELD};
use crate::error::{not_found_error, ApiResult};
use crate::models::{
    normalize_title, ApiResponse, CreateTextRequest, DeletedPayload, NewText, TextChanges,
    TextDraft, TextIdRequest, TextListPayload, TextPayload, UpdateTextRequest,
};
use crate::state::SharedState;
use axum::{extract::rejection::JsonRejection, extract::State, http::HeaderMap, Json};
use serde_json::Value;
use tracing::info;

/// POST /api/texts/create
pub async fn create_text(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<TextPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "content"], Role::Editor)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = create(&state, &access, body).await;
    access.respond(result)
}

async fn create(
    state: &SharedState,
    access: &ScopedAccess,
    body: Value,
) -> ApiResult<TextPayload> {
    let req: CreateTextRequest = parse_body(body)?;
    let draft = TextDraft {
        title: normalize_title(req.title.as_deref()),
        content: req.content.trim().to_string(),
    };
    draft.check().into_result()?;

    let text = state
        .texts
        .create(
            access.workspace_id,
            NewText {
                title: draft.title,
                content: draft.content,
                created_by: access.caller.uid.clone(),
            },
        )
        .await?;

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        text_id = %text.id,
        action = "create_text",
        "Text created"
    );
    Ok(TextPayload { text })
}

/// POST /api/texts/list
pub async fn list_texts(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<TextListPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD], Role::Editor)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = state.texts.list(access.workspace_id).await.map(|texts| {
        info!(
            workspace_id = %access.workspace_id,
            user_id = %access.caller.uid,
            role = %access.role,
            count = texts.len(),
            action = "list_texts",
            "Texts listed"
        );
        TextListPayload { texts }
    });
    access.respond(result)
}

/// POST /api/texts/update
pub async fn update_text(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<TextPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "textId"], Role::Editor)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = update(&state, &access, body).await;
    access.respond(result)
}

async fn update(
    state: &SharedState,
    access: &ScopedAccess,
    body: Value,
) -> ApiResult<TextPayload> {
    let req: UpdateTextRequest = parse_body(body)?;
    let existing = state
        .texts
        .get(req.text_id, access.workspace_id)
        .await?
        .ok_or_else(|| not_found_error("Text not found"))?;

    let changes = TextChanges {
        title: req.title.as_deref().map(|t| normalize_title(Some(t))),
        content: req.content.as_deref().map(|c| c.trim().to_string()),
    };
    if !changes.is_empty() {
        TextDraft {
            title: changes.title.clone().unwrap_or_else(|| existing.title.clone()),
            content: changes.content.clone().unwrap_or_else(|| existing.content.clone()),
        }
        .check()
        .into_result()?;
    }

    let text = state
        .texts
        .update(req.text_id, access.workspace_id, changes)
        .await?
        .ok_or_else(|| not_found_error("Text not found"))?;

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        text_id = %text.id,
        action = "update_text",
        "Text updated"
    );
    Ok(TextPayload { text })
}

/// POST /api/texts/delete
pub async fn delete_text(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<DeletedPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "textId"], Role::Admin)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = delete(&state, &access, body).await;
    access.respond(result)
}

async fn delete(
    state: &SharedState,
    access: &ScopedAccess,
    body: Value,
) -> ApiResult<DeletedPayload> {
    let req: TextIdRequest = parse_body(body)?;
    if !state.texts.delete(req.text_id, access.workspace_id).await? {
        return Err(not_found_error("Text not found"));
    }
    // Comments never outlive their text
    let comments = state
        .comments
        .delete_for_text(req.text_id, access.workspace_id)
        .await?;

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        text_id = %req.text_id,
        comments,
        action = "delete_text",
        "Text deleted"
    );
    Ok(DeletedPayload { deleted: true })
}
