use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::features::videos::models::{Caption, VideoRecord, WatchStatus};

/// Upload video request DTO for OpenAPI documentation
/// Note: The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadVideoDto {
    /// The recorded video
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub video: String,
    /// Title shown to the patient
    #[schema(example = "Morning medication routine")]
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// JSON array of `{start, end, text}` captions; invalid JSON is ignored
    #[schema(example = "[{\"start\":0,\"end\":3,\"text\":\"Good morning\"}]")]
    pub subtitles: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadVideoResponseDto {
    pub video_id: String,
}

/// Video as listed for the patient
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientVideoDto {
    pub id: String,
    /// Upload date, e.g. "January 15, 2025"
    pub date: String,
    /// Upload time, e.g. "10:30 AM"
    pub time: String,
    /// "{category}: {title}"
    #[serde(rename = "type")]
    pub kind: String,
    pub status: WatchStatus,
    pub video_url: String,
    pub summary: String,
    pub transcript: Vec<Caption>,
}

impl From<VideoRecord> for PatientVideoDto {
    fn from(record: VideoRecord) -> Self {
        Self {
            date: record.uploaded_at.format("%B %d, %Y").to_string(),
            time: record.uploaded_at.format("%I:%M %p").to_string(),
            kind: format!("{}: {}", record.kind, record.title),
            status: record.status,
            video_url: format!("/api/videos/stream/{}", record.id),
            summary: record.description,
            transcript: record.captions,
            id: record.id,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UpdateStatusQuery {
    /// "watched" or "unwatched"
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateResponseDto {
    pub id: String,
    pub status: WatchStatus,
    pub watched: bool,
    pub watched_at: Option<DateTime<Utc>>,
}

impl From<VideoRecord> for StatusUpdateResponseDto {
    fn from(record: VideoRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            watched: record.watched,
            watched_at: record.watched_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponseDto {
    /// Records dropped because their file no longer exists
    pub removed: usize,
    pub remaining: usize,
}
