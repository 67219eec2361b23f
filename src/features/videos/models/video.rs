use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::DEFAULT_VIDEO_KIND;

/// Watch progress of a video as seen by the patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    #[default]
    Unwatched,
    Watched,
}

impl WatchStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unwatched" => Some(WatchStatus::Unwatched),
            "watched" => Some(WatchStatus::Watched),
            _ => None,
        }
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchStatus::Unwatched => write!(f, "unwatched"),
            WatchStatus::Watched => write!(f, "watched"),
        }
    }
}

/// One timed caption line over the video timeline, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Caption {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Persisted metadata for one uploaded video.
///
/// Field names match the on-disk JSON. Unknown fields are ignored on load,
/// and `watched`/`watched_at` are brought in line with `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(from = "StoredVideoRecord")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Stored as `{id}.{extension}` inside the videos directory
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(rename = "subtitles")]
    pub captions: Vec<Caption>,
    pub uploaded_at: DateTime<Utc>,
    pub status: WatchStatus,
    pub watched: bool,
    pub watched_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// On-disk shape, tolerant of records that predate some fields
#[derive(Deserialize)]
struct StoredVideoRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    filename: String,
    #[serde(default)]
    subtitles: Vec<Caption>,
    #[serde(deserialize_with = "crate::shared::timestamp::deserialize")]
    uploaded_at: DateTime<Utc>,
    #[serde(default)]
    status: Option<WatchStatus>,
    #[serde(default)]
    watched: Option<bool>,
    #[serde(default, deserialize_with = "crate::shared::timestamp::option::deserialize")]
    watched_at: Option<DateTime<Utc>>,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
}

impl From<StoredVideoRecord> for VideoRecord {
    fn from(stored: StoredVideoRecord) -> Self {
        // `status` wins; `watched` only fills in for records without one
        let status = stored.status.unwrap_or(if stored.watched.unwrap_or(false) {
            WatchStatus::Watched
        } else {
            WatchStatus::Unwatched
        });
        let watched = status == WatchStatus::Watched;

        Self {
            id: stored.id,
            title: stored.title,
            description: stored.description,
            file_name: stored.filename,
            captions: stored.subtitles,
            uploaded_at: stored.uploaded_at,
            status,
            watched,
            watched_at: if watched { stored.watched_at } else { None },
            kind: stored.kind,
        }
    }
}

fn default_kind() -> String {
    DEFAULT_VIDEO_KIND.to_string()
}

impl VideoRecord {
    pub fn new(
        id: String,
        title: String,
        description: String,
        file_name: String,
        captions: Vec<Caption>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            file_name,
            captions,
            uploaded_at: Utc::now(),
            status: WatchStatus::Unwatched,
            watched: false,
            watched_at: None,
            kind: default_kind(),
        }
    }

    /// Apply a status transition. Watching stamps `watched_at`; reverting clears it.
    pub fn set_status(&mut self, status: WatchStatus, now: DateTime<Utc>) {
        self.status = status;
        match status {
            WatchStatus::Watched => {
                self.watched = true;
                self.watched_at = Some(now);
            }
            WatchStatus::Unwatched => {
                self.watched = false;
                self.watched_at = None;
            }
        }
    }
}
