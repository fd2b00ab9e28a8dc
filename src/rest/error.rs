//! HTTP error taxonomy for the task API.
//!
//! Every failure the handlers can produce maps to one variant here;
//! `IntoResponse` renders the `{success: false, message, errors?}` envelope.
//! Store failures are logged server-side and never leak internals to the
//! caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::tasks::ValidationFailure;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A flat 400 with a single message ("Task title is required", …).
    #[error("{0}")]
    Validation(String),

    /// Field-level limit violations: 400 with a "Validation error" envelope
    /// and per-field messages.
    #[error("Validation error")]
    FieldErrors(Vec<String>),

    /// Id is not 24 hex chars. Rejected before any store lookup.
    #[error("Invalid task ID format")]
    InvalidId,

    #[error("Task not found")]
    NotFound,

    /// Unexpected storage failure. `operation` names what was being done
    /// ("fetching tasks", "creating task", …) for the generic 500 message.
    #[error("Server error while {operation}")]
    Store {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    /// Wrap a storage failure with the operation name used in the 500 body.
    pub fn store(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Store { operation, source }
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        match failure {
            ValidationFailure::MissingTitle(msg) => Self::Validation(msg.to_string()),
            ValidationFailure::FieldErrors(errors) => Self::FieldErrors(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            ApiError::FieldErrors(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": "Validation error", "errors": errors }),
            ),
            ApiError::InvalidId => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": "Invalid task ID format" }),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": "Task not found" }),
            ),
            ApiError::Store { operation, source } => {
                error!(err = %source, "storage failure while {operation}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": format!("Server error while {operation}") }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_renders_400() {
        let (status, body) = render(ApiError::Validation("Task title is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Task title is required");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn field_errors_carry_per_field_messages() {
        let (status, body) = render(ApiError::FieldErrors(vec![
            "Title cannot be more than 100 characters".into(),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation error");
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_hides_internal_details() {
        let (status, body) = render(
            ApiError::store("fetching tasks")(anyhow::anyhow!("disk exploded: /secret/path")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error while fetching tasks");
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn not_found_and_invalid_id() {
        let (status, body) = render(ApiError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Task not found");

        let (status, body) = render(ApiError::InvalidId).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid task ID format");
    }
}
