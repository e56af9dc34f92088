//! Editing core for a social content studio.
//!
//! - `state`: edit model, undo/redo history, durable image store, sessions
//! - `pipeline`: image picker validation, transforms, encoding
//! - `posts`: post scheduling and uploads behind swappable repositories
//! - `config`, `error`: ambient plumbing

pub mod config;
pub mod error;
pub mod pipeline;
pub mod posts;
pub mod state;

pub use config::StudioConfig;
pub use error::{Result, StorageError, StudioError, ValidationError};
