/// Image picker: validation, loading and folder scanning
///
/// Every picked file is checked before it gets anywhere near the store:
/// - not empty
/// - not larger than the configured limit
/// - a MIME type (sniffed from the bytes, not the file name) on the allow list

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::encode;
use crate::config::StudioConfig;
use crate::error::{Result, ValidationError};
use crate::state::data::ImagePayload;

/// File extensions the folder scan offers for picking
const PICKABLE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// What the image picker accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureLimits {
    pub max_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

impl CaptureLimits {
    pub fn from_config(config: &StudioConfig) -> Self {
        Self {
            max_bytes: config.max_upload_bytes,
            allowed_mime_types: config.allowed_mime_types.clone(),
        }
    }

    fn check_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::Empty);
        }
        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Validate raw file bytes and return their MIME type
    pub fn validate(&self, bytes: &[u8]) -> Result<&'static str, ValidationError> {
        self.check_size(bytes.len() as u64)?;
        let mime = encode::sniff_mime(bytes)
            .ok_or_else(|| ValidationError::UnsupportedType("unknown".to_string()))?;
        if !self.allowed_mime_types.iter().any(|allowed| allowed == mime) {
            return Err(ValidationError::UnsupportedType(mime.to_string()));
        }
        Ok(mime)
    }
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

/// Validate in-memory bytes (camera frame, upload) into a payload
pub fn capture_bytes(bytes: Vec<u8>, limits: &CaptureLimits) -> Result<ImagePayload> {
    let mime = limits.validate(&bytes)?;
    Ok(ImagePayload::new(mime, bytes))
}

/// Load and validate a picked file
///
/// The size limit is checked from metadata before the file is read.
pub async fn capture_file(path: &Path, limits: &CaptureLimits) -> Result<ImagePayload> {
    let metadata = tokio::fs::metadata(path).await?;
    limits.check_size(metadata.len())?;

    let bytes = tokio::fs::read(path).await?;
    let payload = capture_bytes(bytes, limits)?;

    tracing::info!(
        path = %path.display(),
        mime = %payload.mime,
        bytes = payload.len(),
        "Captured image"
    );
    Ok(payload)
}

/// List pickable images under `folder`, recursively, sorted by path
pub fn scan_folder(folder: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_pickable(path))
        .collect();
    found.sort();

    tracing::debug!(folder = %folder.display(), count = found.len(), "Scanned folder");
    found
}

fn is_pickable(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| PICKABLE_EXTENSIONS.contains(&ext.as_str()))
}
