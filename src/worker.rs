//! Commit entrypoint invoked by the task dispatcher.
//!
//! The dispatcher hands over the identity of the task being executed through a
//! [`TaskContext`] and the publish id as payload. The committer checks that the
//! task is still worth running, delegates the writes to [`CommitEngine`] and
//! records the outcome on both the task and the publish.
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use publish_commit::{
//!     Committer, InMemoryRecords, InMemoryStore, Item, Publish, PublishState, RecordStore,
//!     Settings, Task, TaskContext, TaskState,
//! };
//!
//! let records = InMemoryRecords::new();
//! let store = InMemoryStore::new();
//! let now = Utc::now();
//!
//! records
//!     .insert_publish(
//!         Publish::new("p1", "live")
//!             .with_state(PublishState::Committing)
//!             .with_items([Item::new("/r/a.rpm", "a")]),
//!     )
//!     .unwrap();
//! records
//!     .insert_task(Task::new("t1", "p1", now + Duration::hours(2)))
//!     .unwrap();
//!
//! let committer = Committer::new(records.clone(), store.clone(), Settings::default()).unwrap();
//! committer.commit(&TaskContext::new("t1"), "p1", "live", now).unwrap();
//!
//! assert_eq!(records.get_task("t1").unwrap().unwrap().state, TaskState::Complete);
//! assert!(store.contains("live", "/r/a.rpm").unwrap());
//! ```

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::autoindex::{Autoindex, NoopAutoindex};
use crate::commit::{CommitEngine, CommitSummary};
use crate::error::CommitError;
use crate::model::{Publish, PublishState, Task, TaskState};
use crate::records::{RecordError, RecordStore};
use crate::settings::{Settings, SettingsError};
use crate::store::BatchStore;

/// Identity of the task the dispatcher is currently executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub task_id: String,
}

impl TaskContext {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

/// How a commit invocation ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Both phases written; task COMPLETE, publish COMMITTED.
    Committed(CommitSummary),
    /// Publish had no items; marked COMMITTED without store I/O.
    Empty,
    /// Deadline had passed; task and publish FAILED without store I/O.
    Expired,
    /// Task was not NOT_STARTED; nothing touched.
    TaskNotRunnable(TaskState),
    /// Another delivery of the same task holds it; nothing touched.
    AlreadyClaimed,
    /// Publish was not COMMITTING; nothing touched.
    PublishNotCommitting(PublishState),
}

/// Runs commit tasks against a record store and a batch store.
pub struct Committer<R, S, A = NoopAutoindex> {
    records: R,
    store: S,
    autoindex: A,
    settings: Settings,
}

impl<R, S> Committer<R, S, NoopAutoindex>
where
    R: RecordStore,
    S: BatchStore,
{
    pub fn new(records: R, store: S, settings: Settings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            records,
            store,
            autoindex: NoopAutoindex,
            settings,
        })
    }
}

impl<R, S, A> Committer<R, S, A>
where
    R: RecordStore,
    S: BatchStore,
    A: Autoindex,
{
    /// Replace the post-commit autoindex hook.
    pub fn with_autoindex<B: Autoindex>(self, autoindex: B) -> Committer<R, S, B> {
        Committer {
            records: self.records,
            store: self.store,
            autoindex,
            settings: self.settings,
        }
    }

    /// Commit `publish_id` into `env` on behalf of the task in `ctx`.
    ///
    /// Benign outcomes (expiry, duplicate delivery, empty publish) are `Ok`.
    /// Any write failure is returned as `Err` after task and publish have both
    /// been marked FAILED. Missing records are `Err` with nothing updated.
    pub fn commit(
        &self,
        ctx: &TaskContext,
        publish_id: &str,
        env: &str,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome, CommitError> {
        let task = self
            .records
            .get_task(&ctx.task_id)?
            .ok_or_else(|| RecordError::TaskNotFound(ctx.task_id.clone()))?;

        if task.state != TaskState::NotStarted {
            warn!("Task {} in unexpected state, '{}'", task.id, task.state);
            return Ok(CommitOutcome::TaskNotRunnable(task.state));
        }

        let publish = self
            .records
            .get_publish(publish_id)?
            .ok_or_else(|| RecordError::PublishNotFound(publish_id.to_string()))?;

        if publish.state != PublishState::Committing {
            warn!("Publish {} in unexpected state, '{}'", publish.id, publish.state);
            return Ok(CommitOutcome::PublishNotCommitting(publish.state));
        }

        if !self.records.claim(&task.id)? {
            warn!("Task {} is already being committed by another delivery", task.id);
            return Ok(CommitOutcome::AlreadyClaimed);
        }

        if task.is_expired(now) {
            warn!("Task {} expired at {}", task.id, task.deadline);
            self.finish(&task, &publish, TaskState::Failed, PublishState::Failed)?;
            return Ok(CommitOutcome::Expired);
        }

        if publish.is_empty() {
            info!("No items to write for publish {}", publish.id);
            self.finish(&task, &publish, TaskState::Complete, PublishState::Committed)?;
            return Ok(CommitOutcome::Empty);
        }

        let engine = CommitEngine::new(
            &self.store,
            &self.settings,
            &publish,
            env,
            now,
            &task.id,
        );

        match engine.run() {
            Ok(summary) => {
                self.finish(&task, &publish, TaskState::Complete, PublishState::Committed)?;
                self.run_autoindex(&publish, env);
                Ok(CommitOutcome::Committed(summary))
            }
            Err(err) => {
                error!(
                    task_id = %task.id,
                    publish_id = %publish.id,
                    "Task {} encountered an error: {}",
                    task.id,
                    err
                );
                // finish logs its own failure.
                let _ = self.finish(&task, &publish, TaskState::Failed, PublishState::Failed);
                Err(err)
            }
        }
    }

    fn finish(
        &self,
        task: &Task,
        publish: &Publish,
        task_state: TaskState,
        publish_state: PublishState,
    ) -> Result<(), RecordError> {
        let result = self
            .records
            .finalize(&task.id, task_state, &publish.id, publish_state);
        if let Err(err) = &result {
            error!(
                task_id = %task.id,
                publish_id = %publish.id,
                error = %err,
                "Could not mark task {} {} and publish {} {}",
                task.id,
                task_state,
                publish.id,
                publish_state
            );
            if let Err(release_err) = self.records.release(&task.id) {
                error!(task_id = %task.id, error = %release_err, "Could not release task claim");
            }
        }
        result
    }

    fn run_autoindex(&self, publish: &Publish, env: &str) {
        if let Err(err) = self.autoindex.run(publish, env) {
            warn!(
                publish_id = %publish.id,
                error = %err,
                "Autoindex failed for publish {}",
                publish.id
            );
        }
    }
}
