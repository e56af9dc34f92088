/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the durable store, the editing session and the pipeline.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioError};

/// Key for the image handed from the capture screen to the editor
pub const CAPTURED_IMAGE_KEY: &str = "capturedImage";

/// Key for the image handed from the editor to the post composer
pub const EDITED_IMAGE_KEY: &str = "editedImage";

/// A rendered image: encoded bytes plus their MIME type
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// MIME type of `bytes` (e.g. "image/png")
    pub mime: String,
    /// Encoded image file contents
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as a `data:<mime>;base64,<...>` URI
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Parse a base64 `data:` URI
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::DataUri("missing data: prefix".into()))?;
        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| StudioError::DataUri("missing ',' separator".into()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| StudioError::DataUri("only base64 payloads are supported".into()))?;
        if mime.is_empty() {
            return Err(StudioError::DataUri("missing MIME type".into()));
        }
        let bytes = STANDARD
            .decode(body)
            .map_err(|e| StudioError::DataUri(e.to_string()))?;
        Ok(Self::new(mime, bytes))
    }
}

// Payloads can be megabytes; never dump the bytes into logs
impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A record in the durable image store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImageRecord {
    /// Logical purpose of the image (e.g. "capturedImage")
    pub key: String,
    pub data: ImagePayload,
    /// When the record was last written
    pub timestamp: DateTime<Utc>,
}

impl StoredImageRecord {
    pub fn new(key: impl Into<String>, data: ImagePayload) -> Self {
        Self {
            key: key.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Whether the record is older than `max_age` at `now`
    pub fn is_expired(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.timestamp > max_age
    }
}
