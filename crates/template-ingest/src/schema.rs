//! Template schema and field normalization.
//!
//! A template's schema is an ordered list with one entry per attachment,
//! matching the order documents were submitted in. Fields extracted from
//! individual documents are merged into a single template-level list here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::{ExtractedField, FieldType};

/// Per-attachment entry in a template's ordered schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub attachment_uuid: String,
    pub name: String,
    /// True when the entry's fields were auto-derived rather than supplied
    /// by the caller, and so await confirmation.
    #[serde(default)]
    pub pending_fields: bool,
}

/// A field definition attached to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateField {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub areas: Vec<TemplateFieldArea>,
}

/// Field position within a specific attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFieldArea {
    pub attachment_uuid: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Merge per-document extraction results into one template field list.
///
/// Input order is the attachment submission order and is preserved in the
/// output.
pub fn merge_extracted_fields(per_document: &[(String, Vec<ExtractedField>)]) -> Vec<TemplateField> {
    let mut merged = Vec::new();

    for (attachment_uuid, fields) in per_document {
        for field in fields {
            merged.push(TemplateField {
                uuid: Uuid::new_v4().to_string(),
                name: field.name.clone(),
                field_type: field.field_type,
                required: field.required,
                areas: field
                    .areas
                    .iter()
                    .map(|a| TemplateFieldArea {
                        attachment_uuid: attachment_uuid.clone(),
                        page: a.page,
                        x: a.x,
                        y: a.y,
                        w: a.w,
                        h: a.h,
                    })
                    .collect(),
            });
        }
    }

    merged
}

/// Display name for a schema entry: the filename without its extension.
pub fn display_name(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base.to_string(),
        _ => filename.to_string(),
    }
}
