//! Two-phase batch write of a publish, with rollback on failure.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::CommitError;
use crate::model::{Item, Publish, StoreRecord};
use crate::settings::Settings;
use crate::store::BatchStore;
use crate::writer::{BatchWriter, WrittenSet};

const ITEMS_LABEL: &str = "items";
const ENTRY_POINTS_LABEL: &str = "entry point items";
const ROLLBACK_LABEL: &str = "rollback";

/// Counts from a successful commit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    pub items_written: usize,
    pub entry_points_written: usize,
}

/// Commits one publish into the store.
///
/// Content items are written first; entry points only once every content item
/// has landed. If either phase fails, everything written so far in this
/// attempt is deleted again before the error is returned. The engine never
/// touches task or publish state.
pub struct CommitEngine<'a, S: ?Sized> {
    store: &'a S,
    settings: &'a Settings,
    publish: &'a Publish,
    env: &'a str,
    now: DateTime<Utc>,
    task_id: &'a str,
}

impl<'a, S> CommitEngine<'a, S>
where
    S: BatchStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        settings: &'a Settings,
        publish: &'a Publish,
        env: &'a str,
        now: DateTime<Utc>,
        task_id: &'a str,
    ) -> Self {
        Self {
            store,
            settings,
            publish,
            env,
            now,
            task_id,
        }
    }

    pub fn run(&self) -> Result<CommitSummary, CommitError> {
        let mut written = WrittenSet::new();

        match self.write_phases(&mut written) {
            Ok(summary) => {
                info!(
                    task_id = %self.task_id,
                    publish_id = %self.publish.id,
                    items = summary.items_written,
                    entry_points = summary.entry_points_written,
                    "Commit of publish {} complete",
                    self.publish.id
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    task_id = %self.task_id,
                    publish_id = %self.publish.id,
                    error = %err,
                    "Exception while submitting batch write(s)"
                );
                Err(self.rollback(written, err))
            }
        }
    }

    fn write_phases(&self, written: &mut WrittenSet) -> Result<CommitSummary, CommitError> {
        let files = &self.settings.entry_point_files;

        let items = self.records(self.publish.content_items(files));
        let items_written = self.submit(items, ITEMS_LABEL, written)?;

        let entry_points = self.records(self.publish.entry_point_items(files));
        let entry_points_written = self.submit(entry_points, ENTRY_POINTS_LABEL, written)?;

        Ok(CommitSummary {
            items_written,
            entry_points_written,
        })
    }

    fn records(&self, items: Vec<&Item>) -> Vec<StoreRecord> {
        items.into_iter().map(|item| item.to_record(self.now)).collect()
    }

    fn submit(
        &self,
        records: Vec<StoreRecord>,
        label: &str,
        written: &mut WrittenSet,
    ) -> Result<usize, CommitError> {
        if records.is_empty() {
            debug!(publish_id = %self.publish.id, "No {} to write", label);
            return Ok(0);
        }

        let writer = BatchWriter::new(self.store, self.settings, self.env, records.len(), label);
        match writer.submit(records) {
            Ok(outcome) => {
                let count = outcome.written.len();
                written.extend(outcome.written);
                Ok(count)
            }
            Err(failure) => {
                written.extend(failure.written);
                Err(failure.error)
            }
        }
    }

    /// Delete everything in `written` and hand back the error to surface.
    ///
    /// That is `cause` when the deletes complete, otherwise a
    /// [`CommitError::RollbackFailed`] wrapping both.
    fn rollback(&self, written: WrittenSet, cause: CommitError) -> CommitError {
        warn!(
            task_id = %self.task_id,
            publish_id = %self.publish.id,
            "Rolling back {} item(s) due to error",
            written.len()
        );

        if written.is_empty() {
            return cause;
        }

        let records = written.into_records();
        let writer = BatchWriter::new(
            self.store,
            self.settings,
            self.env,
            records.len(),
            ROLLBACK_LABEL,
        )
        .deleting();

        match writer.submit(records) {
            Ok(outcome) => {
                debug!(
                    publish_id = %self.publish.id,
                    deleted = outcome.written.len(),
                    "Rollback complete"
                );
                cause
            }
            Err(failure) => {
                error!(
                    task_id = %self.task_id,
                    publish_id = %self.publish.id,
                    cause = %cause,
                    error = %failure.error,
                    deleted = failure.written.len(),
                    "Commit may be incomplete: rollback did not finish"
                );
                CommitError::RollbackFailed {
                    cause: Box::new(cause),
                    rollback: Box::new(failure.error),
                }
            }
        }
    }
}
