/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - Edit actions and adjustment parameters (edit.rs)
/// - Undo/redo history (history.rs)
/// - The durable image store (library.rs)
/// - Long-running operation panels (processing.rs)
/// - Editing sessions tying the above together (session.rs)

pub mod data;
pub mod edit;
pub mod history;
pub mod library;
pub mod processing;
pub mod session;

pub use data::{ImagePayload, StoredImageRecord, CAPTURED_IMAGE_KEY, EDITED_IMAGE_KEY};
pub use edit::{EditAction, EditDocument, EditParams};
pub use history::{HistoryEntry, HistoryState};
pub use library::{ImageStore, MemoryImageStore, SqliteImageStore};
pub use processing::{ProcessingPanel, ProcessingState};
pub use session::EditorSession;
