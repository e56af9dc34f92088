/// Studio configuration
///
/// Loaded once at startup from a JSON file in the user's config directory:
/// - Linux: ~/.config/content-studio/config.json
/// - macOS: ~/Library/Application Support/content-studio/config.json
/// - Windows: %APPDATA%\content-studio\config.json
///
/// A missing file means defaults. `STUDIO_BACKEND` (`local`/`remote`) and
/// `STUDIO_API_URL` override the backend selection.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StudioError};

const APP_DIR: &str = "content-studio";

/// Where posts and uploads go
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Keep everything in process (offline/demo mode)
    Local,
    /// JSON API at `base_url`
    Remote { base_url: String },
}

/// Encoding used for rendered edit results
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StudioConfig {
    /// Directory holding the durable image store and local posts
    pub data_dir: PathBuf,
    /// Largest file the image picker accepts, in bytes
    pub max_upload_bytes: u64,
    /// MIME types the image picker accepts
    pub allowed_mime_types: Vec<String>,
    /// Stored images older than this are swept at startup
    pub image_max_age_secs: u64,
    pub output_format: OutputFormat,
    pub backend: BackendConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
                "image/gif".to_string(),
            ],
            image_max_age_secs: 24 * 60 * 60,
            output_format: OutputFormat::Png,
            backend: BackendConfig::Local,
        }
    }
}

impl StudioConfig {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config = match config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Load from an explicit file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| StudioError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply `STUDIO_BACKEND` / `STUDIO_API_URL` from `lookup`
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("STUDIO_API_URL");
        match lookup("STUDIO_BACKEND").as_deref() {
            None => {
                if let (Some(url), BackendConfig::Remote { base_url }) = (url, &mut self.backend) {
                    *base_url = url;
                }
            }
            Some("local") => self.backend = BackendConfig::Local,
            Some("remote") => {
                let base_url = match (url, &self.backend) {
                    (Some(url), _) => url,
                    (None, BackendConfig::Remote { base_url }) => base_url.clone(),
                    (None, BackendConfig::Local) => {
                        return Err(StudioError::Config(
                            "STUDIO_BACKEND=remote requires STUDIO_API_URL".into(),
                        ))
                    }
                };
                self.backend = BackendConfig::Remote { base_url };
            }
            Some(other) => {
                return Err(StudioError::Config(format!("unknown backend: {}", other)));
            }
        }
        Ok(self)
    }

    /// Path of the SQLite image store
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("images.db")
    }

    /// Path of the local backend's scheduled posts
    pub fn posts_path(&self) -> PathBuf {
        self.data_dir.join("posts.json")
    }

    pub fn image_max_age(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.image_max_age_secs)
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}
