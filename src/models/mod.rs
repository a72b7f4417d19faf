//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains the request/response structures used by the API and the
//! response envelope every operation returns.

pub mod comment;
pub mod text;
pub mod workspace;

// Re-export commonly used types
pub use comment::*;
pub use text::*;
pub use workspace::*;

use crate::auth::WorkspaceTokenMap;
use crate::error::AppError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Response envelope shared by every operation.
///
/// Once a request has passed workspace authorization, the (possibly
/// refreshed) token map rides along on both outcomes so the client can
/// replace its stored copy.
#[derive(Debug)]
pub enum ApiResponse<T> {
    Success {
        data: T,
        workspace_tokens: Option<WorkspaceTokenMap>,
    },
    Failure {
        error: AppError,
        workspace_tokens: Option<WorkspaceTokenMap>,
    },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, workspace_tokens: Option<WorkspaceTokenMap>) -> Self {
        ApiResponse::Success {
            data,
            workspace_tokens,
        }
    }

    pub fn failure(error: AppError, workspace_tokens: Option<WorkspaceTokenMap>) -> Self {
        ApiResponse::Failure {
            error,
            workspace_tokens,
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(error: AppError) -> Self {
        ApiResponse::failure(error, None)
    }
}

#[derive(Serialize)]
struct SuccessBody<'a, T: Serialize> {
    success: bool,
    data: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_tokens: Option<&'a WorkspaceTokenMap>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

#[derive(Serialize)]
struct FailureBody<'a> {
    success: bool,
    error: ErrorBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_tokens: Option<&'a WorkspaceTokenMap>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success {
                data,
                workspace_tokens,
            } => {
                let body = SuccessBody {
                    success: true,
                    data: &data,
                    workspace_tokens: workspace_tokens.as_ref(),
                };
                match serde_json::to_value(&body) {
                    Ok(value) => (StatusCode::OK, Json(value)).into_response(),
                    Err(e) => {
                        AppError::Internal(format!("Failed to serialize response: {}", e))
                            .into_response()
                    }
                }
            }
            ApiResponse::Failure {
                error,
                workspace_tokens,
            } => {
                let body = FailureBody {
                    success: false,
                    error: ErrorBody {
                        code: error.code(),
                        message: error.public_message(),
                        details: error.details(),
                    },
                    workspace_tokens: workspace_tokens.as_ref(),
                };
                (error.status(), Json(body)).into_response()
            }
        }
    }
}

/// Payload of a delete operation
#[derive(Debug, Serialize)]
pub struct DeletedPayload {
    pub deleted: bool,
}

/// Outcome of business validation on a draft entity.
///
/// Warnings never block an operation; any error does.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DraftCheck {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl DraftCheck {
    pub fn from_validation(result: Result<(), validator::ValidationErrors>) -> Self {
        let mut check = DraftCheck::default();
        if let Err(errors) = result {
            let field_errors = errors.field_errors();
            let mut fields: Vec<_> = field_errors.keys().cloned().collect();
            fields.sort();
            for field in fields {
                for err in field_errors[&field].iter() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    check.errors.push(message);
                }
            }
        }
        check
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<Vec<String>, AppError> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(crate::error::validation_error(self.errors, self.warnings))
        }
    }
}

/// Rejects strings that are empty once trimmed
pub(crate) fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("Content is required".into());
        return Err(err);
    }
    Ok(())
}
