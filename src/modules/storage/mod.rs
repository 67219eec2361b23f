//! Storage module for record persistence
//!
//! Provides the `RecordBackend` abstraction, a JSON-file implementation for
//! production, an in-memory implementation for tests, and `RecordStore`, the
//! single-writer collection the feature stores are built on.

mod backend;
mod json_file;
#[cfg(test)]
mod memory;
mod record_store;

pub use backend::{RecordBackend, StorageError};
pub use json_file::JsonFileBackend;
#[cfg(test)]
pub use memory::MemoryBackend;
pub use record_store::{RecordStore, StoredRecord};
