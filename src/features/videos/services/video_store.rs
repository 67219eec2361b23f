use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::error::Result;
use crate::features::videos::models::VideoRecord;
use crate::modules::storage::{RecordBackend, RecordStore, StorageError, StoredRecord};

impl StoredRecord for VideoRecord {
    const KIND: &'static str = "Video";

    fn id(&self) -> &str {
        &self.id
    }

    fn restore_identity(&mut self, original: &Self) {
        self.id = original.id.clone();
        self.file_name = original.file_name.clone();
    }
}

/// Result of an orphan reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub removed: usize,
    pub remaining: usize,
}

/// Video metadata plus the directory holding the video files
pub struct VideoStore {
    records: RecordStore<VideoRecord>,
    videos_dir: PathBuf,
}

impl VideoStore {
    pub fn new(backend: Arc<dyn RecordBackend<VideoRecord>>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            records: RecordStore::new(backend),
            videos_dir: videos_dir.into(),
        }
    }

    /// Build the store and load whatever the backend currently holds
    pub async fn open(
        backend: Arc<dyn RecordBackend<VideoRecord>>,
        videos_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            records: RecordStore::open(backend).await,
            videos_dir: videos_dir.into(),
        }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Location of a record's backing file. Only the final path component of
    /// the stored name is used, so a record can never point outside the
    /// videos directory.
    pub fn file_path(&self, record: &VideoRecord) -> PathBuf {
        let name = Path::new(&record.file_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.videos_dir.join(name)
    }

    /// Write the collection only if a mutation failed to persist earlier.
    /// Returns whether a write was made.
    pub async fn flush_if_dirty(&self) -> std::result::Result<bool, StorageError> {
        self.records.flush_if_dirty().await
    }

    /// Drop records whose backing file is gone. Files without a record are
    /// never touched. Persists only when something was removed. Records
    /// appended while the files are being checked are kept.
    pub async fn reconcile_orphans(&self) -> ReconcileOutcome {
        let snapshot = self.records.list().await;

        let mut orphans = HashSet::new();
        for record in &snapshot {
            let path = self.file_path(record);
            match tokio::fs::try_exists(&path).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        "Pruning orphaned video record id={} (missing file {})",
                        record.id,
                        path.display()
                    );
                    orphans.insert(record.id.clone());
                }
                Err(e) => {
                    // Cannot tell whether the file exists; keep the record.
                    warn!(
                        "Could not check file {} for video id={}: {}",
                        path.display(),
                        record.id,
                        e
                    );
                }
            }
        }

        if orphans.is_empty() {
            debug!("Orphan reconciliation found nothing to prune");
            return ReconcileOutcome {
                removed: 0,
                remaining: snapshot.len(),
            };
        }

        let (removed, remaining) = self.records.retain(|r| !orphans.contains(&r.id)).await;
        let outcome = ReconcileOutcome { removed, remaining };
        info!(
            "Orphan reconciliation removed {} records, {} remaining",
            outcome.removed, outcome.remaining
        );
        outcome
    }

    /// Add a new record and flush. Ids must be unique.
    pub async fn append(&self, record: VideoRecord) -> Result<VideoRecord> {
        self.records.append(record).await
    }

    pub async fn find(&self, id: &str) -> Option<VideoRecord> {
        self.records.find(id).await
    }

    pub async fn list(&self) -> Vec<VideoRecord> {
        self.records.list().await
    }

    pub async fn count(&self) -> usize {
        self.records.count().await
    }

    /// Mutate one record in place and flush. `id` and `file_name` are
    /// restored after the mutator runs.
    pub async fn update_in_place<F>(&self, id: &str, mutator: F) -> Result<VideoRecord>
    where
        F: FnOnce(&mut VideoRecord),
    {
        self.records.update_in_place(id, mutator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use crate::features::videos::models::{Caption, WatchStatus};
    use crate::modules::storage::{JsonFileBackend, MemoryBackend};
    use crate::shared::test_helpers::{fake_video_record, write_video_file};

    fn memory_backend() -> Arc<MemoryBackend<VideoRecord>> {
        Arc::new(MemoryBackend::new(Vec::new()))
    }

    async fn file_store(dir: &Path) -> (VideoStore, Arc<JsonFileBackend>) {
        let backend = Arc::new(JsonFileBackend::new(dir.join("videos.json")));
        let store = VideoStore::open(backend.clone(), dir).await;
        (store, backend)
    }

    #[tokio::test]
    async fn test_open_with_no_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = file_store(dir.path()).await;
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_open_with_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("videos.json"), "{ not json").unwrap();

        let (store, _) = file_store(dir.path()).await;
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_reopen_restores_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend) = file_store(dir.path()).await;
        for _ in 0..3 {
            store.append(fake_video_record()).await.unwrap();
        }
        let before = store.list().await;

        let reopened = VideoStore::open(backend.clone(), dir.path()).await;

        assert_eq!(reopened.list().await, before);
    }

    #[tokio::test]
    async fn test_append_rejects_duplicate_id() {
        let backend = memory_backend();
        let store = VideoStore::new(backend, "unused");
        let record = fake_video_record();

        store.append(record.clone()).await.unwrap();
        let result = store.append(record).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_update_in_place_missing_id_is_not_found() {
        let backend = memory_backend();
        let store = VideoStore::new(backend, "unused");

        let result = store
            .update_in_place("missing", |r| r.title = "changed".to_string())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_in_place_keeps_identity_fields() {
        let backend = memory_backend();
        let store = VideoStore::new(backend.clone(), "unused");
        let record = store.append(fake_video_record()).await.unwrap();

        let updated = store
            .update_in_place(&record.id, |r| {
                r.id = "hijacked".to_string();
                r.file_name = "../../etc/passwd".to_string();
                r.title = "Renamed".to_string();
            })
            .await
            .unwrap();

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.file_name, record.file_name);
        assert_eq!(updated.title, "Renamed");
        assert_eq!(backend.persisted()[0].title, "Renamed");
    }

    #[tokio::test]
    async fn test_status_toggle_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend) = file_store(dir.path()).await;
        let record = store.append(fake_video_record()).await.unwrap();

        store
            .update_in_place(&record.id, |r| {
                r.set_status(WatchStatus::Watched, chrono::Utc::now())
            })
            .await
            .unwrap();

        let reloaded = VideoStore::open(backend.clone(), dir.path()).await;
        let watched = reloaded.find(&record.id).await.unwrap();
        assert!(watched.watched);
        assert!(watched.watched_at.is_some());
        assert_eq!(watched.status, WatchStatus::Watched);

        store
            .update_in_place(&record.id, |r| {
                r.set_status(WatchStatus::Unwatched, chrono::Utc::now())
            })
            .await
            .unwrap();

        let reloaded = VideoStore::open(backend.clone(), dir.path()).await;
        let unwatched = reloaded.find(&record.id).await.unwrap();
        assert!(!unwatched.watched);
        assert!(unwatched.watched_at.is_none());
        assert_eq!(unwatched.status, WatchStatus::Unwatched);
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_mutation_in_memory() {
        let backend = memory_backend();
        let store = VideoStore::new(backend.clone(), "unused");
        backend.set_fail_writes(true);

        let record = store.append(fake_video_record()).await.unwrap();

        assert!(store.find(&record.id).await.is_some());
        assert!(backend.persisted().is_empty());
        assert!(store.flush_if_dirty().await.is_err());

        backend.set_fail_writes(false);
        assert!(store.flush_if_dirty().await.unwrap());
        assert_eq!(backend.persisted().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flush_leaves_malformed_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.json");
        std::fs::write(&path, "{ not json").unwrap();

        let (store, _) = file_store(dir.path()).await;
        assert!(!store.flush_if_dirty().await.unwrap());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_are_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend) = file_store(dir.path()).await;
        let store = Arc::new(store);
        let target = store.append(fake_video_record()).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            let target_id = target.id.clone();
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    store.append(fake_video_record()).await.map(|_| ())
                } else {
                    store
                        .update_in_place(&target_id, |r| {
                            r.captions.push(Caption {
                                start: i as f64,
                                end: i as f64 + 1.0,
                                text: format!("line {}", i),
                            })
                        })
                        .await
                        .map(|_| ())
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        store
            .update_in_place(&target.id, |r| {
                r.set_status(WatchStatus::Watched, chrono::Utc::now())
            })
            .await
            .unwrap();

        let reopened = VideoStore::open(backend.clone(), dir.path()).await;
        assert_eq!(reopened.list().await, store.list().await);
        assert_eq!(reopened.count().await, 26);

        let reloaded = reopened.find(&target.id).await.unwrap();
        assert_eq!(reloaded.captions.len(), 25);
        assert_eq!(reloaded.status, WatchStatus::Watched);
        assert!(reloaded.watched);
    }

    #[tokio::test]
    async fn test_reconcile_orphans_prunes_missing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend) = file_store(dir.path()).await;

        let mut kept = Vec::new();
        for i in 0..5 {
            let record = store.append(fake_video_record()).await.unwrap();
            if i % 2 == 0 {
                write_video_file(dir.path(), &record.file_name, 16);
                kept.push(record.id.clone());
            }
        }
        // A stray file without metadata must survive
        write_video_file(dir.path(), "stray.mp4", 8);

        let outcome = store.reconcile_orphans().await;
        assert_eq!(
            outcome,
            ReconcileOutcome {
                removed: 2,
                remaining: 3
            }
        );

        let reloaded = VideoStore::open(backend.clone(), dir.path()).await;
        let ids: Vec<String> = reloaded.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, kept);
        assert!(dir.path().join("stray.mp4").exists());
    }

    #[tokio::test]
    async fn test_reconcile_without_orphans_does_not_write() {
        let backend = memory_backend();
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::new(backend.clone(), dir.path());
        let record = store.append(fake_video_record()).await.unwrap();
        write_video_file(dir.path(), &record.file_name, 4);

        backend.set_fail_writes(true);
        let outcome = store.reconcile_orphans().await;

        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.remaining, 1);
        assert_eq!(backend.persisted().len(), 1);
    }

    #[tokio::test]
    async fn test_file_path_strips_directories() {
        let store = VideoStore::new(memory_backend(), "/srv/videos");
        let mut record = fake_video_record();
        record.file_name = "../../secret/abc.mp4".to_string();

        assert_eq!(
            store.file_path(&record),
            PathBuf::from("/srv/videos/abc.mp4")
        );
    }
}
