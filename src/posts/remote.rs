/// HTTP/JSON post and upload repositories

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::model::{NewPost, ScheduledPost};
use super::{PostRepository, UploadRepository};
use crate::error::{RemoteError, Result, StudioError};
use crate::state::data::ImagePayload;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared client and base URL for both remote repositories
#[derive(Debug, Clone)]
pub struct RemoteApi {
    client: Client,
    base_url: String,
}

impl RemoteApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn network(e: reqwest::Error) -> StudioError {
    RemoteError::Network(e.to_string()).into()
}

/// Fail on non-2xx, otherwise decode the JSON body
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        }
        .into());
    }
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()).into())
}

#[derive(Debug, Clone)]
pub struct RemotePostRepository {
    api: RemoteApi,
}

impl RemotePostRepository {
    pub fn new(api: RemoteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PostRepository for RemotePostRepository {
    async fn create(&self, post: NewPost) -> Result<ScheduledPost> {
        // Reject locally before spending a round trip
        post.validate(Utc::now())?;
        let response = self
            .api
            .client
            .post(self.api.url("posts"))
            .json(&post)
            .send()
            .await
            .map_err(network)?;
        let scheduled: ScheduledPost = decode(response).await?;
        tracing::info!(id = %scheduled.id, "Post scheduled remotely");
        Ok(scheduled)
    }

    async fn list(&self) -> Result<Vec<ScheduledPost>> {
        let response = self
            .api
            .client
            .get(self.api.url("posts"))
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledPost>> {
        let response = self
            .api
            .client
            .get(self.api.url(&format!("posts/{}", id)))
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn cancel(&self, id: Uuid) -> Result<ScheduledPost> {
        let response = self
            .api
            .client
            .delete(self.api.url(&format!("posts/{}", id)))
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StudioError::PostNotFound(id));
        }
        decode(response).await
    }
}

#[derive(Serialize)]
struct UploadRequest {
    mime: String,
    data: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Clone)]
pub struct RemoteUploadRepository {
    api: RemoteApi,
}

impl RemoteUploadRepository {
    pub fn new(api: RemoteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl UploadRepository for RemoteUploadRepository {
    async fn upload(&self, image: &ImagePayload) -> Result<String> {
        let request = UploadRequest {
            mime: image.mime.clone(),
            data: image.to_data_uri(),
        };
        let response = self
            .api
            .client
            .post(self.api.url("uploads"))
            .json(&request)
            .send()
            .await
            .map_err(network)?;
        let uploaded: UploadResponse = decode(response).await?;
        tracing::info!(url = %uploaded.url, bytes = image.len(), "Image uploaded");
        Ok(uploaded.url)
    }
}
