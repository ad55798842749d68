//! Video records

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppResult;

/// Metadata for an uploaded video
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when registering an upload
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// All videos owned by `user_id`, oldest first
    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Video>>;

    async fn get(&self, id: i64) -> AppResult<Option<Video>>;

    async fn create(&self, video: NewVideo) -> AppResult<Video>;

    /// Remove a video, returning whether it existed
    async fn delete(&self, id: i64) -> AppResult<bool>;
}

/// Videos held in process memory
pub struct InMemoryVideoStore {
    videos: RwLock<HashMap<i64, Video>>,
    next_id: AtomicI64,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self {
            videos: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryVideoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Video>> {
        let videos = self.videos.read().unwrap_or_else(PoisonError::into_inner);
        let mut owned: Vec<Video> = videos
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|v| v.id);
        Ok(owned)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Video>> {
        let videos = self.videos.read().unwrap_or_else(PoisonError::into_inner);
        Ok(videos.get(&id).cloned())
    }

    async fn create(&self, video: NewVideo) -> AppResult<Video> {
        let now = Utc::now();
        let record = Video {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            file_name: video.file_name,
            content_type: video.content_type,
            file_size: video.file_size,
            created_at: now,
            updated_at: now,
        };

        let mut videos = self.videos.write().unwrap_or_else(PoisonError::into_inner);
        videos.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut videos = self.videos.write().unwrap_or_else(PoisonError::into_inner);
        Ok(videos.remove(&id).is_some())
    }
}
