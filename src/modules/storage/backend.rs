use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a persistence backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize records: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable home for an ordered collection of records.
///
/// `load` returns an empty collection when nothing has been persisted yet.
/// `save` replaces the whole collection.
#[async_trait]
pub trait RecordBackend<T>: Send + Sync
where
    T: Send + Sync,
{
    async fn load(&self) -> Result<Vec<T>, StorageError>;

    async fn save(&self, records: &[T]) -> Result<(), StorageError>;

    /// Human readable location, used in log lines
    fn describe(&self) -> String;
}
