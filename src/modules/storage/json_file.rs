use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::backend::{RecordBackend, StorageError};

/// Persists a collection as a pretty-printed JSON array in a single file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Sibling of the target file, unique per write. `None` when the
    /// configured path does not name a file.
    fn temp_path(&self) -> Option<PathBuf> {
        let file_name = self.path.file_name()?.to_string_lossy().into_owned();
        Some(
            self.path
                .with_file_name(format!(".{}.tmp-{}", file_name, Uuid::new_v4())),
        )
    }
}

#[async_trait]
impl<T> RecordBackend<T> for JsonFileBackend
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self) -> Result<Vec<T>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No record file at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, records: &[T]) -> Result<(), StorageError> {
        let tmp_path = self.temp_path().ok_or_else(|| {
            StorageError::Unavailable(format!("{} is not a file path", self.path.display()))
        })?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.io_error(dir, e))?;
        }

        let raw = serde_json::to_vec_pretty(records).map_err(StorageError::Serialize)?;

        // Write beside the target and rename over it so the previous snapshot
        // survives a crash mid-write.
        if let Err(e) = tokio::fs::write(&tmp_path, &raw).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.io_error(&tmp_path, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.io_error(&self.path, e));
        }

        debug!(
            "Persisted {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
