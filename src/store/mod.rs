//! Batch-capable key-value store the committer writes into.
//!
//! Adapters must normalize to all-or-raise: a `write_batch` call either
//! applies every record in the batch or returns an error.

mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use crate::model::StoreRecord;

pub use in_memory::InMemoryStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store rejected the batch.
    #[error("batch rejected: {0}")]
    Rejected(String),
    /// The store could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Record encoding failed.
    #[error("serialization error: {0}")]
    Serde(String),
    /// Adapter-internal failure (e.g. poisoned lock).
    #[error("storage error: {0}")]
    Storage(String),
}

/// A store that accepts writes and deletes in batches.
///
/// Implementations are shared by every worker of a batch writer, so they must
/// be safe for concurrent use.
pub trait BatchStore: Send + Sync {
    /// Write (or, with `delete`, remove) every record in `batch` for `env`.
    fn write_batch(&self, env: &str, batch: &[StoreRecord], delete: bool)
        -> Result<(), StoreError>;
}

impl<S: BatchStore + ?Sized> BatchStore for Arc<S> {
    fn write_batch(
        &self,
        env: &str,
        batch: &[StoreRecord],
        delete: bool,
    ) -> Result<(), StoreError> {
        (**self).write_batch(env, batch, delete)
    }
}

impl<S: BatchStore + ?Sized> BatchStore for &S {
    fn write_batch(
        &self,
        env: &str,
        batch: &[StoreRecord],
        delete: bool,
    ) -> Result<(), StoreError> {
        (**self).write_batch(env, batch, delete)
    }
}
