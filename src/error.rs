use std::time::Duration;

use thiserror::Error;

use crate::records::RecordError;
use crate::store::StoreError;

/// Errors surfaced by a commit attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommitError {
    /// Task/publish lookup or update failed.
    #[error(transparent)]
    Records(#[from] RecordError),

    /// A store batch write raised.
    #[error("{label}: batch write failed: {source}")]
    Write {
        label: String,
        #[source]
        source: StoreError,
    },

    /// The producer could not enqueue within the queue timeout; workers are
    /// stalled or gone.
    #[error("{label}: write queue full, enqueue timed out after {timeout:?}")]
    QueueFull { label: String, timeout: Duration },

    /// The worker pool stopped with items still queued and no write error.
    #[error("Commit incomplete, queue not empty ({label}: {remaining} item(s) never attempted)")]
    QueueNotEmpty { label: String, remaining: usize },

    /// One or more workers panicked; items they held may not have been written.
    #[error("{label}: {panicked} worker(s) panicked")]
    WorkerPanicked { label: String, panicked: usize },

    /// A worker thread could not be started.
    #[error("{label}: failed to start worker: {reason}")]
    Spawn { label: String, reason: String },

    /// Deleting written items after a failure did not complete.
    #[error("rollback failed: {rollback}; caused by: {cause}")]
    RollbackFailed {
        cause: Box<CommitError>,
        rollback: Box<CommitError>,
    },
}

impl CommitError {
    /// Backpressure failure: the pool could not make progress at all.
    pub fn is_backpressure(&self) -> bool {
        matches!(self, CommitError::QueueFull { .. })
    }

    /// The original failure behind a rollback failure, or `self`.
    pub fn root_cause(&self) -> &CommitError {
        match self {
            CommitError::RollbackFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}
