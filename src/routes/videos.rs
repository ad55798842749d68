//! Video endpoints
//!
//! Every route here runs behind authentication. A video is only visible to
//! the user who uploaded it.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    routes::users::json_body,
    store::{NewVideo, Video},
    AppState,
};

/// Content types accepted for upload
pub const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "video/mp4",
    "video/mpeg",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-ms-wmv",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
}

#[derive(Debug, Serialize)]
pub struct VideoList {
    pub videos: Vec<Video>,
    pub total: usize,
}

/// Name the upload is stored under: `<userId>_<yyyyMMdd_HHmmss><ext>`
pub fn stored_file_name(user_id: i64, original: &str, at: DateTime<Utc>) -> String {
    let ext = FsPath::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}_{}{}", user_id, at.format("%Y%m%d_%H%M%S"), ext)
}

impl UploadRequest {
    fn validate(&self, max_size: u64) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".to_string()));
        }
        if !ALLOWED_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(AppError::BadRequest(format!(
                "unsupported video type: {}",
                self.content_type
            )));
        }
        if self.file_size == 0 {
            return Err(AppError::BadRequest("file is empty".to_string()));
        }
        if self.file_size > max_size {
            return Err(AppError::BadRequest(format!(
                "file too large, maximum is {} bytes",
                max_size
            )));
        }
        Ok(())
    }
}

fn video_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("invalid video id".to_string()))
}

/// Load a video the caller owns
async fn owned_video(state: &AppState, user: AuthenticatedUser, id: i64) -> AppResult<Video> {
    let video = state
        .videos
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("video not found".to_string()))?;

    if video.user_id != user.subject_id {
        warn!(video_id = id, user_id = user.subject_id, "Access to another user's video");
        return Err(AppError::Forbidden);
    }
    Ok(video)
}

/// Register an uploaded video
#[instrument(skip_all, fields(user_id = user.subject_id))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Video>)> {
    let request = json_body(payload)?;
    request.validate(state.config.max_upload_size)?;

    let video = state
        .videos
        .create(NewVideo {
            user_id: user.subject_id,
            title: request.title.trim().to_string(),
            description: request.description,
            file_name: stored_file_name(user.subject_id, &request.file_name, Utc::now()),
            content_type: request.content_type,
            file_size: request.file_size,
        })
        .await?;

    info!(video_id = video.id, file_name = %video.file_name, "Video uploaded");

    Ok((StatusCode::CREATED, Json(video)))
}

/// The caller's videos
pub async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> AppResult<Json<VideoList>> {
    let videos = state.videos.list_for_user(user.subject_id).await?;
    Ok(Json(VideoList {
        total: videos.len(),
        videos,
    }))
}

/// One of the caller's videos
pub async fn get(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Video>> {
    let id = video_id(path)?;
    owned_video(&state, user, id).await.map(Json)
}

/// Delete one of the caller's videos
#[instrument(skip_all, fields(user_id = user.subject_id))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let id = video_id(path)?;
    owned_video(&state, user, id).await?;

    if !state.videos.delete(id).await? {
        return Err(AppError::NotFound("video not found".to_string()));
    }

    info!(video_id = id, "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}
