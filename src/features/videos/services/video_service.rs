use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::videos::dtos::{
    PatientVideoDto, ReconcileResponseDto, StatusUpdateResponseDto, UploadVideoResponseDto,
};
use crate::features::videos::models::{Caption, VideoRecord, WatchStatus};
use crate::features::videos::services::VideoStore;
use crate::shared::constants::DEFAULT_VIDEO_EXTENSION;

/// A video body written to disk whose metadata has not been recorded yet
#[derive(Debug)]
pub struct PendingUpload {
    pub id: String,
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Service for the doctor-to-patient video library
pub struct VideoService {
    store: Arc<VideoStore>,
}

impl VideoService {
    pub fn new(store: Arc<VideoStore>) -> Self {
        Self { store }
    }

    /// Extension for the stored file, taken from the client's file name.
    /// Anything that is not a short alphanumeric suffix becomes the default.
    fn extension_from(original_filename: Option<&str>) -> String {
        original_filename
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
    }

    /// Parse the caption track sent with an upload. Invalid JSON yields no
    /// captions rather than rejecting the upload.
    fn parse_captions(raw: Option<&str>) -> Vec<Caption> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<Caption>>(raw) {
            Ok(captions) => captions,
            Err(e) => {
                warn!("Ignoring unparsable subtitles on upload: {}", e);
                Vec::new()
            }
        }
    }

    /// Write an uploaded body to `{id}.{extension}` in the videos directory.
    ///
    /// The body is consumed chunk by chunk. On failure the partial file is
    /// removed.
    pub async fn store_body<S, E>(
        &self,
        original_filename: Option<&str>,
        body: S,
    ) -> Result<PendingUpload>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Display,
    {
        let id = Uuid::new_v4().to_string();
        let file_name = format!("{}.{}", id, Self::extension_from(original_filename));
        let path = self.store.videos_dir().join(&file_name);

        tokio::fs::create_dir_all(self.store.videos_dir()).await?;
        let mut file = tokio::fs::File::create(&path).await?;

        let mut body = std::pin::pin!(body);
        let mut size: u64 = 0;
        let written: Result<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read video data: {}", e))
                })?;
                file.write_all(&chunk).await?;
                size += chunk.len() as u64;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<(), AppError>(())
        }
        .await;

        drop(file);
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        debug!("Stored video body {} ({} bytes)", path.display(), size);
        Ok(PendingUpload {
            id,
            file_name,
            path,
            size,
        })
    }

    /// Remove a stored body whose upload was rejected
    pub async fn discard(&self, pending: PendingUpload) {
        if let Err(e) = tokio::fs::remove_file(&pending.path).await {
            warn!(
                "Failed to remove rejected upload {}: {}",
                pending.path.display(),
                e
            );
        }
    }

    /// Record metadata for a stored body. The file is already on disk, so a
    /// crash between the two steps leaves an unreferenced file, never a
    /// record without one.
    pub async fn register_upload(
        &self,
        pending: PendingUpload,
        title: String,
        description: String,
        subtitles: Option<&str>,
    ) -> Result<UploadVideoResponseDto> {
        let title = title.trim().to_string();
        if title.is_empty() {
            self.discard(pending).await;
            return Err(AppError::Validation("title is required".to_string()));
        }

        let record = VideoRecord::new(
            pending.id.clone(),
            title,
            description,
            pending.file_name.clone(),
            Self::parse_captions(subtitles),
        );

        let record = match self.store.append(record).await {
            Ok(record) => record,
            Err(e) => {
                self.discard(pending).await;
                return Err(e);
            }
        };

        info!(
            "Video uploaded: id={}, file={}, size={}, captions={}",
            record.id,
            record.file_name,
            pending.size,
            record.captions.len()
        );

        Ok(UploadVideoResponseDto {
            video_id: record.id,
        })
    }

    pub async fn list_for_patient(&self) -> Vec<PatientVideoDto> {
        self.store
            .list()
            .await
            .into_iter()
            .map(PatientVideoDto::from)
            .collect()
    }

    pub async fn get(&self, id: &str) -> Result<VideoRecord> {
        self.store
            .find(id)
            .await
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }

    pub async fn update_status(&self, id: &str, status: &str) -> Result<StatusUpdateResponseDto> {
        let status = WatchStatus::parse(status).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid status '{}'. Expected 'watched' or 'unwatched'",
                status
            ))
        })?;

        let now = Utc::now();
        let record = self
            .store
            .update_in_place(id, |record| record.set_status(status, now))
            .await?;

        info!("Video {} marked {}", record.id, record.status);
        Ok(StatusUpdateResponseDto::from(record))
    }

    pub async fn reconcile(&self) -> ReconcileResponseDto {
        let outcome = self.store.reconcile_orphans().await;
        ReconcileResponseDto {
            removed: outcome.removed,
            remaining: outcome.remaining,
        }
    }
}
