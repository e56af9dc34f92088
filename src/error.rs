/// Error types for the studio core
///
/// History operations never fail, so there is no history error here.
/// Everything else that can go wrong is one of:
/// - the durable store (open/read/write)
/// - the image picker validation
/// - image decoding/encoding in the pipeline
/// - the remote post/upload backend

use thiserror::Error;

/// Durable image store failure
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open image store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not create store directory: {0}")]
    Directory(#[from] std::io::Error),

    #[error("store transaction failed: {0}")]
    Transaction(#[from] rusqlite::Error),

    #[error("store worker stopped: {0}")]
    Worker(String),

    #[error("stored record {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Rejected input (image picker or post composer)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file is empty")]
    Empty,

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("file is too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("caption must not be empty")]
    EmptyCaption,

    #[error("caption is too long ({len} characters, max {max})")]
    CaptionTooLong { len: usize, max: usize },

    #[error("select at least one platform")]
    NoPlatform,

    #[error("scheduled time must be in the future")]
    ScheduleInPast,

    #[error("crop region {width}x{height}+{x}+{y} is outside the image")]
    CropOutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    #[error("blur sigma must be in (0, 100]: {0}")]
    InvalidBlur(String),
}

/// Remote backend failure
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Umbrella error for operations that cross module boundaries
#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid data URI: {0}")]
    DataUri(String),

    #[error("post {0} not found")]
    PostNotFound(uuid::Uuid),

    #[error("an operation is already in progress")]
    Busy,

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = StudioError> = std::result::Result<T, E>;
