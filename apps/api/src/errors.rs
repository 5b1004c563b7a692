use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Per-item failures (a single chunk failing to embed, a single draft task
/// failing to detail, a single event failing validation) never surface here —
/// they are logged and isolated at the call site. This enum covers failures
/// that end a request.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Lifecycle violation: {0}")]
    Lifecycle(String),

    #[error("Telemetry fetch failed: {0}")]
    TelemetryFetch(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM invocation failed: {0}")]
    Llm(String),

    #[error("LLM output parse failed: {0}")]
    LlmParse(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Lifecycle(msg) => (StatusCode::CONFLICT, "LIFECYCLE_VIOLATION", msg.clone()),
            AppError::TelemetryFetch(e) => {
                tracing::error!("Telemetry fetch error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TELEMETRY_FETCH_FAILED",
                    "Could not read activity history".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::LlmParse(msg) => {
                tracing::error!("LLM output parse error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_OUTPUT_PARSE_ERROR",
                    "The AI response could not be interpreted".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
