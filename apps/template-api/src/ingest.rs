//! Template assembly: the document ingestion pipeline.
//!
//! Drives one create-template request through resolution, storage, field
//! extraction, and schema merging, and commits the result in a single
//! transaction. A failure at any stage aborts the whole request and leaves
//! nothing persisted; notification fan-out runs only after the commit.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Sqlite, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use template_ingest::{
    classify, display_name, extract_fields, merge_extracted_fields, ExtractedField,
    ResolvedContent, SchemaEntry,
};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::models::{AttachmentResponse, CreateTemplateRequest, TemplateResponse};
use crate::notify;
use crate::state::AppState;

const DEFAULT_TEMPLATE_NAME: &str = "Untitled Template";
const DEFAULT_FOLDER_NAME: &str = "Default";

/// Create and commit a template from the request's document descriptors.
pub async fn create_template(
    state: Arc<AppState>,
    auth: AuthContext,
    req: CreateTemplateRequest,
) -> Result<TemplateResponse, ApiError> {
    let folder_name = req
        .folder_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_FOLDER_NAME)
        .to_string();
    let folder_id = find_or_create_folder(&state, &auth, &folder_name).await?;

    // Resolve every descriptor in submission order. Entries that fit no
    // known encoding are skipped; a resolution failure aborts the request.
    let mut resolved: Vec<ResolvedContent> = Vec::new();
    for doc in &req.documents {
        let Some(source) = classify(&doc.file) else {
            tracing::warn!("Skipping document entry with unrecognized payload shape");
            continue;
        };
        let content = state.resolver.resolve(&source, doc.name.as_deref()).await?;
        resolved.push(content);
    }

    let template_id = Uuid::new_v4().to_string();
    let template_name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_TEMPLATE_NAME)
        .to_string();
    let now = Utc::now();

    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO templates (id, name, folder_id, account_id, author_id, schema_json, fields_json, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, '[]', '[]', ?, ?)
        "#,
    )
    .bind(&template_id)
    .bind(&template_name)
    .bind(&folder_id)
    .bind(&auth.account_id)
    .bind(&auth.author_id)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    let mut attachments: Vec<AttachmentResponse> = Vec::new();
    for (position, content) in resolved.iter().enumerate() {
        let attachment = store_attachment(&mut tx, &template_id, position, content, now).await?;
        attachments.push(attachment);
    }

    // Field extraction runs only when the caller supplied no layout. An
    // encrypted document aborts here, before anything becomes visible.
    let (fields, pending_fields) = match &req.fields {
        Some(explicit) => (explicit.clone(), false),
        None => {
            let mut per_document: Vec<(String, Vec<ExtractedField>)> = Vec::new();
            for (attachment, content) in attachments.iter().zip(&resolved) {
                let extraction = extract_fields(&content.bytes)?;
                if !extraction.had_fields {
                    tracing::debug!(filename = %attachment.filename, "No native form fields found");
                }
                per_document.push((attachment.uuid.clone(), extraction.fields));
            }
            (merge_extracted_fields(&per_document), true)
        }
    };

    let schema: Vec<SchemaEntry> = attachments
        .iter()
        .map(|a| SchemaEntry {
            attachment_uuid: a.uuid.clone(),
            name: display_name(&a.filename),
            pending_fields,
        })
        .collect();

    sqlx::query(
        r#"
        UPDATE templates SET schema_json = ?, fields_json = ?, updated_at = ? WHERE id = ?
        "#,
    )
    .bind(serde_json::to_string(&schema).map_err(|e| ApiError::Internal(e.into()))?)
    .bind(serde_json::to_string(&fields).map_err(|e| ApiError::Internal(e.into()))?)
    .bind(now.to_rfc3339())
    .bind(&template_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Created template {} with {} attachments",
        template_id,
        attachments.len()
    );

    let response = TemplateResponse {
        id: template_id,
        name: template_name,
        folder_name,
        account_id: auth.account_id,
        author_id: auth.author_id,
        documents: attachments,
        schema,
        fields,
        created_at: now,
        updated_at: now,
    };

    notify::template_created(state, &response);

    Ok(response)
}

async fn store_attachment(
    tx: &mut Transaction<'_, Sqlite>,
    template_id: &str,
    position: usize,
    content: &ResolvedContent,
    now: DateTime<Utc>,
) -> Result<AttachmentResponse, ApiError> {
    let uuid = Uuid::new_v4().to_string();
    let sha256 = hex::encode(Sha256::digest(&content.bytes));
    // Size comes from the decoded bytes, never from caller metadata.
    let byte_size = content.bytes.len() as i64;

    sqlx::query(
        r#"
        INSERT INTO attachments (uuid, template_id, filename, content_type, byte_size, sha256, data, position, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&uuid)
    .bind(template_id)
    .bind(&content.filename)
    .bind(&content.content_type)
    .bind(byte_size)
    .bind(&sha256)
    .bind(&content.bytes)
    .bind(position as i64)
    .bind(now.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(AttachmentResponse {
        uuid,
        filename: content.filename.clone(),
        content_type: content.content_type.clone(),
        byte_size,
        sha256,
    })
}

async fn find_or_create_folder(
    state: &AppState,
    auth: &AuthContext,
    name: &str,
) -> Result<String, ApiError> {
    let existing: Option<(String,)> =
        sqlx::query_as("SELECT id FROM template_folders WHERE account_id = ? AND name = ?")
            .bind(&auth.account_id)
            .bind(name)
            .fetch_optional(&state.db)
            .await?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO template_folders (id, name, account_id, author_id, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(&auth.account_id)
    .bind(&auth.author_id)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    Ok(id)
}
