/// An editing session: one document, its history, and its AI panel.
///
/// The session is the only writer of its history. Each `apply` renders the
/// action on top of the image at the cursor and commits the result; a
/// failed render leaves the history untouched.

use std::future::Future;

use super::data::{ImagePayload, CAPTURED_IMAGE_KEY, EDITED_IMAGE_KEY};
use super::edit::{AiOperation, EditAction, EditDocument};
use super::history::HistoryState;
use super::library::ImageStore;
use super::processing::ProcessingPanel;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::pipeline::transform;

pub struct EditorSession {
    history: HistoryState,
    format: OutputFormat,
    ai_panel: ProcessingPanel,
}

impl EditorSession {
    /// Start a session from the captured/selected image
    pub fn start(initial: ImagePayload, format: OutputFormat) -> Self {
        tracing::info!(mime = %initial.mime, bytes = initial.len(), "Editing session started");
        Self {
            history: HistoryState::new(initial),
            format,
            ai_panel: ProcessingPanel::new(),
        }
    }

    /// Start from the image the capture screen left in the store
    ///
    /// Returns `None` when nothing was captured.
    pub async fn from_store(store: &dyn ImageStore, format: OutputFormat) -> Result<Option<Self>> {
        let captured = store.get_item(CAPTURED_IMAGE_KEY).await?;
        Ok(captured.map(|image| Self::start(image, format)))
    }

    /// Render `action` on the current image and commit it
    pub async fn apply(&mut self, action: EditAction) -> Result<&ImagePayload> {
        let rendered =
            transform::render_async(self.history.current().clone(), action.clone(), self.format)
                .await?;
        self.history.commit(action, rendered);
        Ok(self.history.current())
    }

    /// Run an AI job through the panel and commit its output
    ///
    /// Refused with `StudioError::Busy` while another AI job is in flight.
    pub async fn apply_ai<F>(&mut self, operation: AiOperation, job: F) -> Result<&ImagePayload>
    where
        F: Future<Output = Result<ImagePayload>>,
    {
        let label = format!("ai_{}", operation.key());
        let image = self.ai_panel.run(&label, job).await?;
        self.history.commit(
            EditAction::AiResult {
                operation,
                image: image.clone(),
            },
            image,
        );
        Ok(self.history.current())
    }

    pub fn undo(&mut self) -> Option<&ImagePayload> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> Option<&ImagePayload> {
        self.history.redo()
    }

    pub fn current(&self) -> &ImagePayload {
        self.history.current()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    pub fn ai_panel(&self) -> &ProcessingPanel {
        &self.ai_panel
    }

    /// The document as currently shown: original plus actions up to the cursor
    pub fn document(&self) -> EditDocument {
        EditDocument {
            base: self.history.initial().clone(),
            actions: self.history.applied_actions().cloned().collect(),
        }
    }

    /// Hand the current image to the next screen
    pub async fn persist(&self, store: &dyn ImageStore) -> Result<()> {
        store.set_item(EDITED_IMAGE_KEY, self.history.current()).await?;
        tracing::info!(cursor = self.history.cursor(), "Edited image persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StudioError;
    use crate::pipeline::encode;
    use crate::state::edit::{FlipAxis, Rotation};
    use crate::state::library::MemoryImageStore;
    use crate::state::processing::ProcessingState;
    use image::{DynamicImage, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    /// 2x1 PNG: red then blue
    fn captured() -> ImagePayload {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        encode::encode(&DynamicImage::ImageRgba8(img), OutputFormat::Png).unwrap()
    }

    fn dims(payload: &ImagePayload) -> (u32, u32) {
        let img = encode::decode(payload).unwrap();
        (img.width(), img.height())
    }

    #[tokio::test]
    async fn test_rotate_undo_flip_scenario() {
        let initial = captured();
        let mut session = EditorSession::start(initial.clone(), OutputFormat::Png);

        let rotated = session
            .apply(EditAction::Rotate { rotation: Rotation::Cw90 })
            .await
            .unwrap()
            .clone();
        assert_eq!(dims(&rotated), (1, 2));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().cursor(), 1);

        assert_eq!(session.undo(), Some(&initial));
        assert_eq!(session.history().cursor(), 0);

        let flipped = session
            .apply(EditAction::Flip { axis: FlipAxis::Horizontal })
            .await
            .unwrap()
            .clone();
        assert_eq!(dims(&flipped), (2, 1));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().cursor(), 1);
        assert_eq!(session.current(), &flipped);
        assert!(!session.can_redo());
    }

    #[tokio::test]
    async fn test_failed_render_leaves_history_alone() {
        let mut session = EditorSession::start(captured(), OutputFormat::Png);
        let result = session
            .apply(EditAction::Crop { x: 5, y: 5, width: 1, height: 1 })
            .await;
        assert!(result.is_err());
        assert_eq!(session.history().len(), 1);
        assert!(!session.can_undo());
    }

    #[tokio::test]
    async fn test_document_tracks_cursor() {
        let mut session = EditorSession::start(captured(), OutputFormat::Png);
        session.apply(EditAction::Rotate { rotation: Rotation::Cw90 }).await.unwrap();
        session.apply(EditAction::Flip { axis: FlipAxis::Vertical }).await.unwrap();
        session.undo();

        let doc = session.document();
        assert_eq!(doc.base, captured());
        assert_eq!(doc.labels(), vec!["Rotate 90°".to_string()]);
    }

    #[tokio::test]
    async fn test_ai_result_is_committed() {
        let mut session = EditorSession::start(captured(), OutputFormat::Png);
        let generated = ImagePayload::new("image/png", vec![7, 7, 7]);

        let out = session
            .apply_ai(AiOperation::Enhance, {
                let generated = generated.clone();
                async move { Ok(generated) }
            })
            .await
            .unwrap()
            .clone();
        assert_eq!(out, generated);
        assert_eq!(session.history().current_entry().action.key(), "ai_enhance");
        assert_eq!(session.ai_panel().state(), &ProcessingState::Success);
    }

    #[tokio::test]
    async fn test_ai_failure_sets_error_state() {
        let mut session = EditorSession::start(captured(), OutputFormat::Png);
        let result = session
            .apply_ai(AiOperation::BackgroundRemoval, async {
                Err(StudioError::Config("service down".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(session.history().len(), 1);
        assert!(matches!(session.ai_panel().state(), ProcessingState::Error(_)));
    }

    #[tokio::test]
    async fn test_ai_retry_after_abandoned_job() {
        let mut session = EditorSession::start(captured(), OutputFormat::Png);
        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            session.apply_ai(AiOperation::Enhance, std::future::pending()),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!session.ai_panel().state().is_processing());
        assert_eq!(session.history().len(), 1);

        let generated = ImagePayload::new("image/png", vec![9]);
        session
            .apply_ai(AiOperation::Enhance, {
                let generated = generated.clone();
                async move { Ok(generated) }
            })
            .await
            .unwrap();
        assert_eq!(session.current(), &generated);
        assert_eq!(session.ai_panel().state(), &ProcessingState::Success);
    }

    #[tokio::test]
    async fn test_store_hand_off() {
        let store = MemoryImageStore::new();
        assert!(EditorSession::from_store(&store, OutputFormat::Png)
            .await
            .unwrap()
            .is_none());

        store.set_item(CAPTURED_IMAGE_KEY, &captured()).await.unwrap();
        let mut session = EditorSession::from_store(&store, OutputFormat::Png)
            .await
            .unwrap()
            .unwrap();
        session
            .apply(EditAction::Rotate { rotation: Rotation::Cw180 })
            .await
            .unwrap();
        session.persist(&store).await.unwrap();

        let edited = store.get_item(EDITED_IMAGE_KEY).await.unwrap();
        assert_eq!(edited.as_ref(), Some(session.current()));
    }
}
