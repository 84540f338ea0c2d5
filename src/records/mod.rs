//! Task and publish records owned by the surrounding system.

mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Publish, PublishState, Task, TaskState};

pub use in_memory::InMemoryRecords;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("task {0} not found")]
    TaskNotFound(String),
    #[error("publish {0} not found")]
    PublishNotFound(String),
    #[error("task {task_id} is {state}, expected NOT_STARTED")]
    TaskStateChanged { task_id: String, state: TaskState },
    #[error("record store error: {0}")]
    Backend(String),
}

/// Read-by-id and state updates for tasks and publishes.
///
/// Updates must be visible to subsequent reads in the same process; the
/// committer relies on that for its re-entrancy guards.
pub trait RecordStore: Send + Sync {
    fn get_task(&self, id: &str) -> Result<Option<Task>, RecordError>;

    fn get_publish(&self, id: &str) -> Result<Option<Publish>, RecordError>;

    /// Atomically reserve a NOT_STARTED task for one delivery.
    ///
    /// Returns `false` when the task is no longer NOT_STARTED or another
    /// delivery already holds it.
    fn claim(&self, task_id: &str) -> Result<bool, RecordError>;

    /// Drop a claim without changing any state.
    fn release(&self, task_id: &str) -> Result<(), RecordError>;

    /// Set task and publish state together and drop the claim.
    ///
    /// Fails with [`RecordError::TaskStateChanged`] unless the task is still
    /// NOT_STARTED, so a finished task is never overwritten.
    fn finalize(
        &self,
        task_id: &str,
        task_state: TaskState,
        publish_id: &str,
        publish_state: PublishState,
    ) -> Result<(), RecordError>;
}

impl<R: RecordStore + ?Sized> RecordStore for Arc<R> {
    fn get_task(&self, id: &str) -> Result<Option<Task>, RecordError> {
        (**self).get_task(id)
    }

    fn get_publish(&self, id: &str) -> Result<Option<Publish>, RecordError> {
        (**self).get_publish(id)
    }

    fn claim(&self, task_id: &str) -> Result<bool, RecordError> {
        (**self).claim(task_id)
    }

    fn release(&self, task_id: &str) -> Result<(), RecordError> {
        (**self).release(task_id)
    }

    fn finalize(
        &self,
        task_id: &str,
        task_state: TaskState,
        publish_id: &str,
        publish_state: PublishState,
    ) -> Result<(), RecordError> {
        (**self).finalize(task_id, task_state, publish_id, publish_state)
    }
}
