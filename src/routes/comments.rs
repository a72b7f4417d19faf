//! Comment route handlers

use crate::auth::{body_or_empty, parse_body, Role, ScopedAccess, WORKSPACE_TOKEN_FIELD};
use crate::error::{not_found_error, ApiResult};
use crate::models::{
    ApiResponse, CommentDraft, CommentIdRequest, CommentListPayload, CommentPayload,
    CreateCommentRequest, DeletedPayload, ListCommentsRequest, NewComment, UpdateCommentRequest,
};
use crate::state::SharedState;
use axum::{extract::rejection::JsonRejection, extract::State, http::HeaderMap, Json};
use serde_json::Value;
use tracing::info;

/// POST /api/comments/create
pub async fn create_comment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<CommentPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "textId", "content"], Role::Editor)
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
) -> ApiResult<CommentPayload> {
    let req: CreateCommentRequest = parse_body(body)?;
    let draft = CommentDraft {
        content: req.content.trim().to_string(),
    };
    draft.check().into_result()?;

    // The text must live in the same workspace
    if state.texts.get(req.text_id, access.workspace_id).await?.is_none() {
        return Err(not_found_error("Text not found"));
    }

    let comment = state
        .comments
        .create(
            access.workspace_id,
            NewComment {
                text_id: req.text_id,
                content: draft.content,
                created_by: access.caller.uid.clone(),
            },
        )
        .await?;

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        comment_id = %comment.id,
        text_id = %comment.text_id,
        action = "create_comment",
        "Comment created"
    );
    Ok(CommentPayload { comment })
}

/// POST /api/comments/list
///
/// Filters by `textId` when given, otherwise lists the whole workspace.
pub async fn list_comments(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<CommentListPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD], Role::Editor)
        .await
    {
        Ok(access) => access,
        Err(e) => return e.into(),
    };

    let result = list(&state, &access, body).await;
    access.respond(result)
}

async fn list(
    state: &SharedState,
    access: &ScopedAccess,
    body: Value,
) -> ApiResult<CommentListPayload> {
    let req: ListCommentsRequest = parse_body(body)?;
    let comments = match req.text_id {
        Some(text_id) => state.comments.list_for_text(text_id, access.workspace_id).await?,
        None => state.comments.list(access.workspace_id).await?,
    };

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        count = comments.len(),
        action = "list_comments",
        "Comments listed"
    );
    Ok(CommentListPayload { comments })
}

/// POST /api/comments/update
pub async fn update_comment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<CommentPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "commentId", "content"], Role::Editor)
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
) -> ApiResult<CommentPayload> {
    let req: UpdateCommentRequest = parse_body(body)?;
    if state.comments.get(req.comment_id, access.workspace_id).await?.is_none() {
        return Err(not_found_error("Comment not found"));
    }

    let draft = CommentDraft {
        content: req.content.trim().to_string(),
    };
    draft.check().into_result()?;

    let comment = state
        .comments
        .update_content(req.comment_id, access.workspace_id, &draft.content)
        .await?
        .ok_or_else(|| not_found_error("Comment not found"))?;

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        comment_id = %comment.id,
        action = "update_comment",
        "Comment updated"
    );
    Ok(CommentPayload { comment })
}

/// POST /api/comments/delete
pub async fn delete_comment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<DeletedPayload> {
    let body = body_or_empty(payload);
    let access = match state
        .gate
        .authorize(&headers, &body, &[WORKSPACE_TOKEN_FIELD, "commentId"], Role::Admin)
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
    let req: CommentIdRequest = parse_body(body)?;
    if !state.comments.delete(req.comment_id, access.workspace_id).await? {
        return Err(not_found_error("Comment not found"));
    }

    info!(
        workspace_id = %access.workspace_id,
        user_id = %access.caller.uid,
        role = %access.role,
        comment_id = %req.comment_id,
        action = "delete_comment",
        "Comment deleted"
    );
    Ok(DeletedPayload { deleted: true })
}
