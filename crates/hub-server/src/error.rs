use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hub_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Object already exists: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::BlobNotFound(key) => ServerError::NotFound(key),
            StoreError::BlobTooLarge { size, max } => ServerError::TooLarge { size, max },
            StoreError::BlobExists(key) => ServerError::Conflict(key),
            StoreError::EmptyBlob => ServerError::BadRequest("Empty upload".into()),
            StoreError::PathTraversal => ServerError::BadRequest("Invalid object path".into()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
