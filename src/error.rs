//! Error handling module
//!
//! Provides the error taxonomy shared by the authorization gate and the
//! business operations, and its mapping onto HTTP responses.

use crate::models::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Missing request fields or failed business validation.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        details: Option<Value>,
    },

    #[error("Invalid workspace token: {0}")]
    InvalidToken(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable wire code for this error
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::InvalidInput { .. } => "INVALID_INPUT",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::WorkspaceNotFound(_) => "WORKSPACE_NOT_FOUND",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_)
            | AppError::Config(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::WorkspaceNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Unexpected failures are logged here with their full context and
    /// replaced by a generic message.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Unauthenticated(msg)
            | AppError::InvalidToken(msg)
            | AppError::PermissionDenied(msg)
            | AppError::WorkspaceNotFound(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidInput { message, .. } => message.clone(),
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Pool(e) => {
                error!("Pool error: {:?}", e);
                "Database connection pool exhausted".to_string()
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            AppError::Config(msg) => {
                error!("Configuration error: {}", msg);
                "A configuration error occurred".to_string()
            }
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            AppError::InvalidInput { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::failure(self, None).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Every missing field is listed, in the order the operation declares them.
pub fn missing_fields_error(fields: Vec<String>) -> AppError {
    AppError::InvalidInput {
        message: format!("Missing required fields: {}", fields.join(", ")),
        details: Some(json!({ "fields": fields })),
    }
}

/// Business validation failure carrying both errors and warnings
pub fn validation_error(errors: Vec<String>, warnings: Vec<String>) -> AppError {
    AppError::InvalidInput {
        message: errors.join(", "),
        details: Some(json!({ "errors": errors, "warnings": warnings })),
    }
}

pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_taxonomy() {
        assert_eq!(AppError::Unauthenticated("x".into()).code(), "UNAUTHENTICATED");
        assert_eq!(AppError::InvalidToken("x".into()).code(), "INVALID_TOKEN");
        assert_eq!(AppError::PermissionDenied("x".into()).code(), "PERMISSION_DENIED");
        assert_eq!(AppError::WorkspaceNotFound("x".into()).code(), "WORKSPACE_NOT_FOUND");
        assert_eq!(not_found_error("x").code(), "NOT_FOUND");
        assert_eq!(AppError::Internal("boom".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_internal_details_are_not_surfaced() {
        let err = AppError::Internal("connection reset by peer".into());
        assert_eq!(err.public_message(), "An internal error occurred");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_fields_error_lists_all_fields() {
        let err = missing_fields_error(vec!["workspaceToken".into(), "content".into()]);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.details(),
            Some(&json!({ "fields": ["workspaceToken", "content"] }))
        );
    }
}
