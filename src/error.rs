//! Error types for the conversation service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Failures from the completion backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Completion returned no choices")]
    EmptyResponse,

    #[error("All retry attempts failed")]
    RetriesExhausted,
}

/// Failures from a conversation store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize conversation state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors surfaced by `ConversationService`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Completion failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Conversation store not available")]
    StoreUnavailable,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Thread worker unavailable: {0}")]
    Unavailable(String),
}

/// API error body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ServiceError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServiceError::Oracle(_) => (StatusCode::BAD_GATEWAY, "COMPLETION_FAILED"),
            ServiceError::StoreUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
            ServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            ServiceError::Unavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = serde_json::json!({
            "success": false,
            "error": ApiError {
                code: code.to_string(),
                message: self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
