//! Error types for the template API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use template_ingest::IngestError;
use thiserror::Error;

/// Caller-facing message for protected documents. Clients special-case it.
pub const ENCRYPTED_DOCUMENT_MESSAGE: &str =
    "PDF is encrypted. Please provide an unencrypted PDF.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid signing key")]
    InvalidSigningKey,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::InvalidSigningKey => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Ingest(IngestError::DocumentEncrypted) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ENCRYPTED_DOCUMENT_MESSAGE.to_string(),
            ),
            ApiError::Ingest(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
        };

        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}
