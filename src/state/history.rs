/// Cursor-based undo/redo history for an editing session.
///
/// The history is an append-only log of rendered images with a cursor
/// marking the one on screen:
/// - `commit` drops everything after the cursor (the redo branch), appends
///   and moves the cursor to the new tip
/// - `undo`/`redo` only move the cursor
/// - the first entry is always the `Initial` image, so the log is never empty
///
/// Nothing here can fail. Undo at the oldest entry and redo at the tip are
/// no-ops that return `None`.

use chrono::{DateTime, Utc};

use super::data::ImagePayload;
use super::edit::EditAction;

/// A single entry in the history log. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    /// The operation that produced `image`
    pub action: EditAction,
    /// The rendered result after `action`
    pub image: ImagePayload,
    /// When this entry was committed
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(action: EditAction, image: ImagePayload) -> Self {
        Self {
            action,
            image,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only edit log with a movable cursor.
///
/// Invariant: `entries` is non-empty, `cursor < entries.len()` and
/// `entries[0].action == EditAction::Initial`.
#[derive(Clone, Debug)]
pub struct HistoryState {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl HistoryState {
    /// Start a history seeded with the captured/selected image.
    pub fn new(initial: ImagePayload) -> Self {
        Self {
            entries: vec![HistoryEntry::new(EditAction::Initial, initial)],
            cursor: 0,
        }
    }

    /// Record a new edit result.
    ///
    /// Any entries after the cursor are discarded first.
    pub fn commit(&mut self, action: EditAction, image: ImagePayload) {
        let discarded = self.entries.len() - (self.cursor + 1);
        self.entries.truncate(self.cursor + 1);

        let key = action.key();
        self.entries.push(HistoryEntry::new(action, image));
        self.cursor = self.entries.len() - 1;

        tracing::debug!(
            action = %key,
            discarded,
            cursor = self.cursor,
            len = self.entries.len(),
            "History entry committed"
        );
    }

    /// Step back one entry. Returns the image now current, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&ImagePayload> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        tracing::debug!(cursor = self.cursor, "Undo");
        Some(&self.entries[self.cursor].image)
    }

    /// Step forward one entry. Returns the image now current, or `None` at the tip.
    pub fn redo(&mut self) -> Option<&ImagePayload> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        tracing::debug!(cursor = self.cursor, "Redo");
        Some(&self.entries[self.cursor].image)
    }

    /// The image at the cursor.
    pub fn current(&self) -> &ImagePayload {
        &self.entries[self.cursor].image
    }

    pub fn current_entry(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The original image the session started from.
    pub fn initial(&self) -> &ImagePayload {
        &self.entries[0].image
    }

    /// Actions from the first edit up to and including the cursor.
    pub fn applied_actions(&self) -> impl Iterator<Item = &EditAction> {
        self.entries[1..=self.cursor].iter().map(|e| &e.action)
    }
}
