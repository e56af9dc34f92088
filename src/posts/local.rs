/// In-process post and upload repositories
///
/// Used when the studio runs without a backend. Posts are kept in memory
/// and, when opened with a path, mirrored to a JSON file after every
/// change so the next run sees them. Uploads are returned as data URIs.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{NewPost, PostStatus, ScheduledPost};
use super::{PostRepository, UploadRepository};
use crate::error::{Result, StudioError};
use crate::state::data::ImagePayload;

#[derive(Debug, Default)]
pub struct LocalPostRepository {
    /// Backing file; `None` keeps posts in memory only
    path: Option<PathBuf>,
    /// Sorted by `scheduled_at`
    posts: RwLock<Vec<ScheduledPost>>,
}

impl LocalPostRepository {
    /// Memory-only repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository backed by the JSON file at `path`; a missing file is empty
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut posts: Vec<ScheduledPost> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        posts.sort_by_key(|p| p.scheduled_at);
        tracing::info!(path = %path.display(), posts = posts.len(), "Local posts loaded");

        Ok(Self {
            path: Some(path),
            posts: RwLock::new(posts),
        })
    }

    /// Write `posts` to the backing file (temp file, then rename)
    async fn save(&self, posts: &[ScheduledPost]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(posts)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        tracing::debug!(path = %path.display(), posts = posts.len(), "Local posts saved");
        Ok(())
    }
}

#[async_trait]
impl PostRepository for LocalPostRepository {
    async fn create(&self, post: NewPost) -> Result<ScheduledPost> {
        let now = Utc::now();
        post.validate(now)?;

        let scheduled = ScheduledPost::from_new(post, now);
        let mut posts = self.posts.write().await;
        let mut next = posts.clone();
        let at = next.partition_point(|p| p.scheduled_at <= scheduled.scheduled_at);
        next.insert(at, scheduled.clone());
        self.save(&next).await?;
        *posts = next;

        tracing::info!(id = %scheduled.id, at = %scheduled.scheduled_at, "Post scheduled");
        Ok(scheduled)
    }

    async fn list(&self) -> Result<Vec<ScheduledPost>> {
        Ok(self.posts.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledPost>> {
        Ok(self.posts.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn cancel(&self, id: Uuid) -> Result<ScheduledPost> {
        let mut posts = self.posts.write().await;
        let mut next = posts.clone();
        let post = next
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StudioError::PostNotFound(id))?;
        post.status = PostStatus::Cancelled;
        let cancelled = post.clone();
        self.save(&next).await?;
        *posts = next;
        tracing::info!(id = %id, "Post cancelled");
        Ok(cancelled)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalUploadRepository;

#[async_trait]
impl UploadRepository for LocalUploadRepository {
    async fn upload(&self, image: &ImagePayload) -> Result<String> {
        Ok(image.to_data_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::model::Platform;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn new_post(caption: &str, hours: i64) -> NewPost {
        NewPost {
            caption: caption.to_string(),
            image_url: None,
            platforms: vec![Platform::Instagram],
            scheduled_at: Utc::now() + Duration::hours(hours),
        }
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_schedule() {
        let repo = LocalPostRepository::new();
        repo.create(new_post("later", 5)).await.unwrap();
        repo.create(new_post("sooner", 1)).await.unwrap();
        repo.create(new_post("middle", 3)).await.unwrap();

        let captions: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.caption)
            .collect();
        assert_eq!(captions, vec!["sooner", "middle", "later"]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let repo = LocalPostRepository::new();
        let result = repo.create(new_post("too late", -1)).await;
        assert!(matches!(result, Err(StudioError::Validation(_))));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_cancel() {
        let repo = LocalPostRepository::new();
        let post = repo.create(new_post("hello", 1)).await.unwrap();

        assert_eq!(repo.get(post.id).await.unwrap(), Some(post.clone()));
        assert_eq!(repo.get(Uuid::new_v4()).await.unwrap(), None);

        let cancelled = repo.cancel(post.id).await.unwrap();
        assert_eq!(cancelled.status, PostStatus::Cancelled);

        let missing = Uuid::new_v4();
        assert!(matches!(
            repo.cancel(missing).await,
            Err(StudioError::PostNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_posts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("posts.json");

        let (kept, cancelled) = {
            let repo = LocalPostRepository::open(&path).await.unwrap();
            assert!(repo.list().await.unwrap().is_empty());
            let kept = repo.create(new_post("kept", 2)).await.unwrap();
            let cancelled = repo.create(new_post("dropped", 1)).await.unwrap();
            repo.cancel(cancelled.id).await.unwrap();
            (kept, cancelled)
        };

        let reopened = LocalPostRepository::open(&path).await.unwrap();
        let posts = reopened.list().await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, cancelled.id);
        assert_eq!(posts[0].status, PostStatus::Cancelled);
        assert_eq!(posts[1], kept);
        assert!(!dir.path().join("data").join("posts.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_posts_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        std::fs::write(&path, "[{").unwrap();
        assert!(matches!(
            LocalPostRepository::open(&path).await,
            Err(StudioError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_returns_data_uri() {
        let payload = ImagePayload::new("image/png", vec![1, 2, 3]);
        let url = LocalUploadRepository.upload(&payload).await.unwrap();
        assert_eq!(url, "data:image/png;base64,AQID");
    }
}
