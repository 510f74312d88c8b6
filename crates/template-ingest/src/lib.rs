//! Document ingestion pipeline
//!
//! This crate turns caller-supplied document descriptors into concrete
//! binary content and derives a field schema from each document's internal
//! structure:
//!
//! - `resolver`: classifies a payload as a data URI, remote URL, or raw
//!   base64 and resolves it into named bytes
//! - `fields`: walks a PDF's AcroForm looking for interactive input fields
//! - `schema`: normalizes extracted fields into template field definitions
//!
//! Persistence and HTTP routing live in the API server; this crate only
//! knows how to read documents.

pub mod error;
pub mod fields;
pub mod resolver;
pub mod schema;

pub use error::IngestError;
pub use fields::{extract_fields, ExtractedField, FieldArea, FieldExtraction, FieldType};
pub use resolver::{classify, DocumentSource, ResolvedContent, Resolver};
pub use schema::{display_name, merge_extracted_fields, SchemaEntry, TemplateField, TemplateFieldArea};
