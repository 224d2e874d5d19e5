use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced on the HTTP side (media routes, profile sync).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Media not found: {0}")]
    MediaNotFound(String),

    #[error("Attachment too large: {size} bytes (max {max})")]
    MediaTooLarge { size: usize, max: usize },

    #[error("Media storage error: {0}")]
    MediaStorage(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] retrouve_store::StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::MediaNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::MediaTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            ServerError::MediaStorage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Media storage error".to_string())
            }
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Store error".to_string())
            }
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Failure taxonomy for gateway event handlers.
///
/// Validation failures reject before the store is touched; persistence and
/// external-service failures during multi-item operations are caught
/// per-item and only escalate when they cause zero net progress.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing required field: {0}")]
    Validation(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] retrouve_store::StoreError),

    #[error("External service failed: {0}")]
    ExternalService(String),

    #[error("View assembly failed: {0}")]
    Assemble(#[from] retrouve_chat::AssembleError),

    #[error("State lock poisoned")]
    LockPoisoned,
}
