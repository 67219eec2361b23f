use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::backend::{RecordBackend, StorageError};

/// Keeps the persisted snapshot in process memory.
///
/// Used to exercise the stores without touching disk. `fail_writes` simulates
/// a backend that rejects every save.
#[derive(Debug)]
pub struct MemoryBackend<T> {
    snapshot: Mutex<Vec<T>>,
    fail_writes: AtomicBool,
}

impl<T: Clone> MemoryBackend<T> {
    pub fn new(initial: Vec<T>) -> Self {
        Self {
            snapshot: Mutex::new(initial),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Copy of what was last persisted
    pub fn persisted(&self) -> Vec<T> {
        self.snapshot
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<T> RecordBackend<T> for MemoryBackend<T>
where
    T: Clone + Send + Sync,
{
    async fn load(&self) -> Result<Vec<T>, StorageError> {
        self.snapshot
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| StorageError::Unavailable("memory snapshot poisoned".to_string()))
    }

    async fn save(&self, records: &[T]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "writes disabled for this backend".to_string(),
            ));
        }

        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| StorageError::Unavailable("memory snapshot poisoned".to_string()))?;
        *guard = records.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_replaces_snapshot() {
        let backend = MemoryBackend::new(vec![1, 2]);
        tokio_test::block_on(backend.save(&[3])).unwrap();
        assert_eq!(tokio_test::block_on(backend.load()).unwrap(), vec![3]);
    }

    #[test]
    fn test_failing_writes_keep_previous_snapshot() {
        let backend = MemoryBackend::new(vec!["a".to_string()]);
        backend.set_fail_writes(true);

        let result = tokio_test::block_on(backend.save(&["b".to_string()]));
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(backend.persisted(), vec!["a".to_string()]);
    }
}
