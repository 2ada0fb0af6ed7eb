use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

use crate::error::{SchedulerError, StoreError};
use crate::jobs::JobStatus;

/// Application-level error type for HTTP handlers.
///
/// Every variant renders as JSON with at least `error` and `code` fields.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request rejected before any job was created.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown or malformed task id.
    #[error("Task {0} not found")]
    NotFound(String),

    /// The job exists but has not produced audio yet.
    #[error("Task {id} is not ready (status: {status})")]
    NotReady { id: Uuid, status: JobStatus },

    /// The job reached `failed`; carries the stored error.
    #[error("Task {id} failed: {error}")]
    JobFailed { id: Uuid, error: String },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id.to_string()),
            // Only reachable through a bug in the scheduler.
            other @ StoreError::InvalidTransition { .. } => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "code": "VALIDATION_ERROR" }),
            ),
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": message, "code": "NOT_FOUND" }),
            ),
            ApiError::NotReady { id, status } => (
                StatusCode::CONFLICT,
                json!({
                    "error": message,
                    "code": "NOT_READY",
                    "task_id": id,
                    "status": status,
                }),
            ),
            ApiError::JobFailed { id, error } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": error,
                    "code": "SYNTHESIS_FAILED",
                    "task_id": id,
                    "status": JobStatus::Failed,
                }),
            ),
            ApiError::Scheduler(SchedulerError::Busy) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": message, "code": "BUSY" }),
            ),
            ApiError::Scheduler(SchedulerError::ShuttingDown) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": message, "code": "SHUTTING_DOWN" }),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal error occurred", "code": "INTERNAL_ERROR" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
