//! Wire models for the template API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use template_ingest::{SchemaEntry, TemplateField};

/// One caller-supplied document entry prior to resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentParam {
    /// Data URI, remote URL, or raw base64 content.
    pub file: String,
    /// Declared filename, if any.
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to create a template from document payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folder_name: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentParam>,
    /// Explicit field layout; when present, field extraction is skipped.
    #[serde(default)]
    pub fields: Option<Vec<TemplateField>>,
}

/// Persisted attachment metadata returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub uuid: String,
    pub filename: String,
    pub content_type: String,
    pub byte_size: i64,
    pub sha256: String,
}

/// Serialized template returned on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub id: String,
    pub name: String,
    pub folder_name: String,
    pub account_id: String,
    pub author_id: String,
    pub documents: Vec<AttachmentResponse>,
    pub schema: Vec<SchemaEntry>,
    pub fields: Vec<TemplateField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signing key lookup request.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifySigningKeyRequest {
    pub key: String,
}

/// Signing key lookup result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySigningKeyResponse {
    pub slug: String,
    pub role: String,
    pub status: String,
    pub submission_id: String,
}
