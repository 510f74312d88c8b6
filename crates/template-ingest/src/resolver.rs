//! Document source classification and content resolution.
//!
//! Callers submit documents in one of three encodings: a base64 data URI,
//! an absolute HTTP(S) URL, or raw base64 without a prefix. The encoding is
//! inferred from the payload shape exactly once, up front; resolution then
//! turns the classified source into named bytes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

use crate::error::IngestError;

/// Fallback filename when the caller declares none.
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// Media type assumed for raw base64 payloads.
pub const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

/// Request timeout for remote document fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on a remote document body.
const MAX_REMOTE_BYTES: usize = 20 * 1024 * 1024;

lazy_static! {
    /// `data:<media-type>;base64,<data>`
    static ref DATA_URI_PATTERN: Regex = Regex::new(r"^data:([^;,]+);base64,(.+)$").unwrap();
}

/// A document source classified from the raw payload string.
///
/// Classification happens once per descriptor; downstream code never
/// re-inspects the payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Base64 data URI with a declared media type.
    DataUri { media_type: String, data: String },
    /// Absolute HTTP or HTTPS URL.
    RemoteUrl(String),
    /// Base64 content without a data-URI prefix.
    RawBase64(String),
}

/// Classify a payload into one of the three supported encodings.
///
/// Returns `None` for payloads that fit no encoding: empty strings and
/// `data:` payloads without a base64 section. Callers skip such entries
/// instead of failing the whole request.
pub fn classify(payload: &str) -> Option<DocumentSource> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with("data:") {
        let caps = DATA_URI_PATTERN.captures(trimmed)?;
        return Some(DocumentSource::DataUri {
            media_type: caps[1].to_string(),
            data: caps[2].to_string(),
        });
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(DocumentSource::RemoteUrl(trimmed.to_string()));
    }

    Some(DocumentSource::RawBase64(trimmed.to_string()))
}

/// Content resolved from a document source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Resolves classified document sources into concrete bytes.
pub struct Resolver {
    client: reqwest::Client,
    max_remote_bytes: usize,
}

impl Resolver {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            max_remote_bytes: MAX_REMOTE_BYTES,
        }
    }

    /// Resolve one classified source into named bytes.
    ///
    /// The filename falls back to the URL's last path segment for remote
    /// sources, then to [`DEFAULT_FILENAME`].
    pub async fn resolve(
        &self,
        source: &DocumentSource,
        declared_name: Option<&str>,
    ) -> Result<ResolvedContent, IngestError> {
        match source {
            DocumentSource::DataUri { media_type, data } => Ok(ResolvedContent {
                filename: name_or_default(declared_name),
                content_type: media_type.clone(),
                bytes: decode_base64(data)?,
            }),
            DocumentSource::RemoteUrl(url) => self.fetch(url, declared_name).await,
            DocumentSource::RawBase64(data) => Ok(ResolvedContent {
                filename: name_or_default(declared_name),
                content_type: DEFAULT_CONTENT_TYPE.to_string(),
                bytes: decode_base64(data)?,
            }),
        }
    }

    async fn fetch(
        &self,
        url: &str,
        declared_name: Option<&str>,
    ) -> Result<ResolvedContent, IngestError> {
        tracing::debug!(url, "Fetching remote document");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::RemoteFetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::RemoteFetchFailed(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        if let Some(declared_len) = response.content_length() {
            if declared_len > self.max_remote_bytes as u64 {
                return Err(self.too_large(url));
            }
        }

        let header_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty());

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| IngestError::RemoteFetchFailed(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_remote_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(IngestError::RemoteFetchFailed(format!(
                "{} returned an empty body",
                url
            )));
        }

        let filename = declared_name
            .map(str::to_string)
            .or_else(|| filename_from_url(url))
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        let content_type = sniff_content_type(&bytes)
            .map(str::to_string)
            .or(header_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(ResolvedContent {
            filename,
            content_type,
            bytes,
        })
    }

    fn too_large(&self, url: &str) -> IngestError {
        IngestError::RemoteFetchFailed(format!(
            "{} exceeds the {} byte limit",
            url, self.max_remote_bytes
        ))
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

fn name_or_default(declared_name: Option<&str>) -> String {
    match declared_name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => DEFAULT_FILENAME.to_string(),
    }
}

/// Decode base64, tolerating embedded whitespace (line-wrapped payloads).
fn decode_base64(data: &str) -> Result<Vec<u8>, IngestError> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| IngestError::UnresolvableSource(format!("invalid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(IngestError::UnresolvableSource(
            "decoded document is empty".to_string(),
        ));
    }

    Ok(bytes)
}

/// Derive a filename from the URL's last path segment, percent-decoded.
fn filename_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    let (_, path) = path.split_once('/')?;

    let segment = path.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }

    let decoded = percent_decode(segment);
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Minimal percent-decoding for URL path segments. Invalid escape
/// sequences pass through untouched.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        if bytes[i] == b'+' {
            out.push(b' ');
        } else {
            out.push(bytes[i]);
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Sniff well-known document types from magic bytes.
fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    if bytes.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    if bytes.starts_with(&PNG_MAGIC) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    None
}
