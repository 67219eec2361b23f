use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use super::backend::{RecordBackend, StorageError};
use crate::core::error::{AppError, Result};

/// A record kept in a [`RecordStore`]
pub trait StoredRecord: Clone + Send + Sync + 'static {
    /// Name used in error messages, e.g. "Video"
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Put back fields a mutator is not allowed to change
    fn restore_identity(&mut self, original: &Self);
}

/// Ordered in-memory collection mirrored to a persistence backend.
///
/// Readers take a snapshot under a shared lock. Every mutation runs under
/// `writer`, so mutate-then-persist sequences never interleave and snapshots
/// reach the backend in mutation order. A failed save is logged, the
/// in-memory state stays authoritative and the store is marked dirty until
/// a later save succeeds.
pub struct RecordStore<T: StoredRecord> {
    backend: Arc<dyn RecordBackend<T>>,
    records: RwLock<Vec<T>>,
    writer: Mutex<()>,
    dirty: AtomicBool,
}

impl<T: StoredRecord> RecordStore<T> {
    pub fn new(backend: Arc<dyn RecordBackend<T>>) -> Self {
        Self {
            backend,
            records: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Build the store and load whatever the backend currently holds
    pub async fn open(backend: Arc<dyn RecordBackend<T>>) -> Self {
        let store = Self::new(backend);
        store.load().await;
        store
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// A missing file yields an empty collection. A read or parse failure is
    /// logged and also yields an empty collection; the backend is left as is.
    pub async fn load(&self) -> usize {
        let _writer = self.writer.lock().await;

        let loaded = self.backend.load().await.unwrap_or_else(|e| {
            warn!(
                "Failed to load {} records from {}: {}. Starting empty",
                T::KIND,
                self.backend.describe(),
                e
            );
            Vec::new()
        });

        let count = loaded.len();
        *self.records.write().await = loaded;
        self.dirty.store(false, Ordering::SeqCst);
        info!(
            "Loaded {} {} records from {}",
            count,
            T::KIND,
            self.backend.describe()
        );
        count
    }

    /// Persist the current collection, reporting any failure to the caller
    pub async fn save(&self) -> std::result::Result<(), StorageError> {
        let _writer = self.writer.lock().await;
        let snapshot = self.records.read().await.clone();
        self.backend.save(&snapshot).await?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// True when a mutation has not reached the backend yet
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Save only if an earlier persist failed. Returns whether a write was made.
    pub async fn flush_if_dirty(&self) -> std::result::Result<bool, StorageError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    /// Best-effort flush used after mutations. Caller holds `writer`.
    async fn persist(&self, snapshot: &[T]) {
        match self.backend.save(snapshot).await {
            Ok(()) => self.dirty.store(false, Ordering::SeqCst),
            Err(e) => {
                self.dirty.store(true, Ordering::SeqCst);
                error!(
                    "Failed to persist {} records to {}: {}. Changes are kept in memory only",
                    T::KIND,
                    self.backend.describe(),
                    e
                );
            }
        }
    }

    /// Add a new record and flush. Ids must be unique.
    pub async fn append(&self, record: T) -> Result<T> {
        let _writer = self.writer.lock().await;

        let snapshot = {
            let mut records = self.records.write().await;
            if records.iter().any(|r| r.id() == record.id()) {
                return Err(AppError::Conflict(format!(
                    "{} with id {} already exists",
                    T::KIND,
                    record.id()
                )));
            }
            records.push(record.clone());
            records.clone()
        };

        self.persist(&snapshot).await;
        Ok(record)
    }

    pub async fn find(&self, id: &str) -> Option<T> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    pub async fn list(&self) -> Vec<T> {
        self.records.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Mutate one record in place and flush. Identity fields are restored
    /// after the mutator runs.
    pub async fn update_in_place<F>(&self, id: &str, mutator: F) -> Result<T>
    where
        F: FnOnce(&mut T),
    {
        let _writer = self.writer.lock().await;

        let (updated, snapshot) = {
            let mut records = self.records.write().await;
            let record = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| AppError::NotFound(format!("{} not found", T::KIND)))?;

            let original = record.clone();
            mutator(record);
            record.restore_identity(&original);

            let updated = record.clone();
            (updated, records.clone())
        };

        self.persist(&snapshot).await;
        Ok(updated)
    }

    /// Keep only records matching `keep`. Persists only when something was
    /// removed. Returns `(removed, remaining)`.
    pub async fn retain<F>(&self, keep: F) -> (usize, usize)
    where
        F: Fn(&T) -> bool,
    {
        let _writer = self.writer.lock().await;

        let (removed, snapshot) = {
            let mut records = self.records.write().await;
            let before = records.len();
            records.retain(|r| keep(r));
            (before - records.len(), records.clone())
        };

        if removed > 0 {
            self.persist(&snapshot).await;
        }
        (removed, snapshot.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::{JsonFileBackend, MemoryBackend};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl StoredRecord for Note {
        const KIND: &'static str = "Note";

        fn id(&self) -> &str {
            &self.id
        }

        fn restore_identity(&mut self, original: &Self) {
            self.id = original.id.clone();
        }
    }

    fn note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn test_append_rejects_duplicate_id() {
        let store = RecordStore::<Note>::new(Arc::new(MemoryBackend::<Note>::new(Vec::new())));

        store.append(note("a")).await.unwrap();
        let result = store.append(note("a")).await;

        match result {
            Err(AppError::Conflict(message)) => {
                assert_eq!(message, "Note with id a already exists")
            }
            other => panic!("expected conflict, got {:?}", other.map(|n| n.id)),
        }
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_update_in_place_restores_identity_and_names_kind() {
        let backend = Arc::new(MemoryBackend::<Note>::new(Vec::new()));
        let store = RecordStore::<Note>::new(backend.clone());
        store.append(note("a")).await.unwrap();

        let updated = store
            .update_in_place("a", |n| {
                n.id = "b".to_string();
                n.body = "edited".to_string();
            })
            .await
            .unwrap();
        assert_eq!(updated.id, "a");
        assert_eq!(backend.persisted()[0].body, "edited");

        let missing = store.update_in_place("zzz", |_| {}).await;
        assert!(matches!(missing, Err(AppError::NotFound(m)) if m == "Note not found"));
    }

    #[tokio::test]
    async fn test_failed_persist_marks_dirty_until_flushed() {
        let backend = Arc::new(MemoryBackend::<Note>::new(Vec::new()));
        let store = RecordStore::<Note>::new(backend.clone());
        assert!(!store.is_dirty());

        backend.set_fail_writes(true);
        store.append(note("a")).await.unwrap();
        assert!(store.is_dirty());
        assert!(store.flush_if_dirty().await.is_err());
        assert!(store.is_dirty());

        backend.set_fail_writes(false);
        assert!(store.flush_if_dirty().await.unwrap());
        assert!(!store.is_dirty());
        assert_eq!(backend.persisted(), vec![note("a")]);

        assert!(!store.flush_if_dirty().await.unwrap());
    }

    #[tokio::test]
    async fn test_save_then_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(JsonFileBackend::new(dir.path().join("notes.json")));
        let store = RecordStore::<Note>::open(backend.clone()).await;
        for id in ["a", "b", "c"] {
            store.append(note(id)).await.unwrap();
        }
        let before = store.list().await;

        let reopened = RecordStore::<Note>::open(backend).await;
        reopened.save().await.unwrap();
        assert_eq!(reopened.load().await, 3);

        assert_eq!(reopened.list().await, before);
    }

    #[tokio::test]
    async fn test_clean_store_never_rewrites_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = RecordStore::<Note>::new(Arc::new(JsonFileBackend::new(&path)));
        assert_eq!(store.load().await, 0);

        assert!(!store.flush_if_dirty().await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_retain_persists_only_when_something_was_removed() {
        let backend = Arc::new(MemoryBackend::<Note>::new(Vec::new()));
        let store = RecordStore::<Note>::new(backend.clone());
        for id in ["a", "b", "c"] {
            store.append(note(id)).await.unwrap();
        }

        backend.set_fail_writes(true);
        assert_eq!(store.retain(|_| true).await, (0, 3));
        assert!(!store.is_dirty());

        backend.set_fail_writes(false);
        assert_eq!(store.retain(|n| n.id != "b").await, (1, 2));
        let ids: Vec<String> = backend.persisted().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
