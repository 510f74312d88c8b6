use thiserror::Error;

/// Failures raised while turning document descriptors into stored content.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The payload could not be decoded under any recognized encoding.
    #[error("Unable to decode document source: {0}")]
    UnresolvableSource(String),

    /// A remote document could not be fetched (timeout, DNS failure, or a
    /// non-success status).
    #[error("Failed to download document: {0}")]
    RemoteFetchFailed(String),

    /// The document is password-protected and cannot be opened. Kept
    /// distinct from the generic failures so the API can report it with a
    /// dedicated message.
    #[error("Document is encrypted")]
    DocumentEncrypted,

    /// The document bytes could not be parsed at all.
    #[error("Unable to read document: {0}")]
    InvalidDocument(String),
}
