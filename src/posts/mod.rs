/// Post scheduling and image upload
///
/// The composer talks to two capabilities:
/// - `PostRepository` (schedule, list, cancel)
/// - `UploadRepository` (turn an edited image into a URL)
///
/// Each has a local and a remote implementation. Which pair is used is
/// decided once at startup from `StudioConfig::backend`.

pub mod local;
pub mod model;
pub mod remote;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{BackendConfig, StudioConfig};
use crate::error::Result;
use crate::state::data::ImagePayload;

pub use local::{LocalPostRepository, LocalUploadRepository};
pub use model::{NewPost, Platform, PostStatus, ScheduledPost};
pub use remote::{RemoteApi, RemotePostRepository, RemoteUploadRepository};

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Validate and schedule a post
    async fn create(&self, post: NewPost) -> Result<ScheduledPost>;

    /// All posts, soonest first
    async fn list(&self) -> Result<Vec<ScheduledPost>>;

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledPost>>;

    /// Mark a post cancelled; `PostNotFound` if it doesn't exist
    async fn cancel(&self, id: Uuid) -> Result<ScheduledPost>;
}

#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Store the image somewhere the post can reference; returns its URL
    async fn upload(&self, image: &ImagePayload) -> Result<String>;
}

/// The repositories chosen for this process
#[derive(Clone)]
pub struct Backend {
    pub posts: Arc<dyn PostRepository>,
    pub uploads: Arc<dyn UploadRepository>,
}

impl Backend {
    /// Build the repositories `config.backend` asks for
    ///
    /// The local backend keeps its posts in `config.posts_path()`.
    pub async fn from_config(config: &StudioConfig) -> Result<Self> {
        let backend = match &config.backend {
            BackendConfig::Local => Self {
                posts: Arc::new(LocalPostRepository::open(config.posts_path()).await?),
                uploads: Arc::new(LocalUploadRepository),
            },
            BackendConfig::Remote { base_url } => {
                let api = RemoteApi::new(base_url)?;
                Self {
                    posts: Arc::new(RemotePostRepository::new(api.clone())),
                    uploads: Arc::new(RemoteUploadRepository::new(api)),
                }
            }
        };
        tracing::info!(backend = ?config.backend, "Backend selected");
        Ok(backend)
    }

    /// Upload `image` and schedule a post that references it
    pub async fn publish(&self, image: &ImagePayload, mut post: NewPost) -> Result<ScheduledPost> {
        post.image_url = Some(self.uploads.upload(image).await?);
        self.posts.create(post).await
    }
}
