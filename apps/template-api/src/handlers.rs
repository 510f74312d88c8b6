//! HTTP handlers for the template API

use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::auth;
use crate::error::ApiError;
use crate::ingest;
use crate::models::{
    CreateTemplateRequest, TemplateResponse, VerifySigningKeyRequest, VerifySigningKeyResponse,
};
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Create a template from a list of document payloads.
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let auth = auth::can_create_template(&state.config, &headers)?;
    let template = ingest::create_template(state, auth, req).await?;
    Ok(Json(template))
}

/// Look up a signer by signing key.
pub async fn verify_signing_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifySigningKeyRequest>,
) -> Result<Json<VerifySigningKeyResponse>, ApiError> {
    let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT slug, name, submission_id, completed_at
        FROM submitters
        WHERE signing_key = ?
        "#,
    )
    .bind(req.key.trim())
    .fetch_optional(&state.db)
    .await?;

    let (slug, role, submission_id, completed_at) = row.ok_or(ApiError::InvalidSigningKey)?;

    Ok(Json(VerifySigningKeyResponse {
        slug,
        role,
        status: if completed_at.is_some() {
            "completed".to_string()
        } else {
            "pending".to_string()
        },
        submission_id,
    }))
}
