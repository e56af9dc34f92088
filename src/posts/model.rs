/// Scheduled post data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Longest caption any supported platform accepts
pub const MAX_CAPTION_CHARS: usize = 2200;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
    Tiktok,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::Linkedin),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Scheduled,
    Published,
    Cancelled,
}

/// A post as submitted by the composer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewPost {
    pub caption: String,
    /// Where the uploaded image lives (URL or data URI)
    pub image_url: Option<String>,
    pub platforms: Vec<Platform>,
    pub scheduled_at: DateTime<Utc>,
}

impl NewPost {
    /// Check the post can be scheduled at `now`
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let caption = self.caption.trim();
        if caption.is_empty() {
            return Err(ValidationError::EmptyCaption);
        }
        let len = caption.chars().count();
        if len > MAX_CAPTION_CHARS {
            return Err(ValidationError::CaptionTooLong {
                len,
                max: MAX_CAPTION_CHARS,
            });
        }
        if self.platforms.is_empty() {
            return Err(ValidationError::NoPlatform);
        }
        if self.scheduled_at <= now {
            return Err(ValidationError::ScheduleInPast);
        }
        Ok(())
    }
}

/// A post accepted by a repository
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduledPost {
    pub id: Uuid,
    pub caption: String,
    pub image_url: Option<String>,
    pub platforms: Vec<Platform>,
    pub scheduled_at: DateTime<Utc>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
}

impl ScheduledPost {
    pub fn from_new(post: NewPost, now: DateTime<Utc>) -> Self {
        let mut platforms = post.platforms;
        platforms.sort();
        platforms.dedup();
        Self {
            id: Uuid::new_v4(),
            caption: post.caption.trim().to_string(),
            image_url: post.image_url,
            platforms,
            scheduled_at: post.scheduled_at,
            status: PostStatus::Scheduled,
            created_at: now,
        }
    }
}
