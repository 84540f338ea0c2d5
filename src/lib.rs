//! Commit engine for staged publishes.
//!
//! A publish is committed in two phases (content items, then entry points)
//! through a bounded worker pool writing fixed-size batches into a
//! [`BatchStore`]. A failed attempt deletes whatever it already wrote, and the
//! task/publish pair always ends COMPLETE+COMMITTED or FAILED+FAILED.

mod autoindex;
mod commit;
mod error;
mod model;
mod records;
mod settings;
mod store;
mod worker;
mod writer;

pub use autoindex::{Autoindex, AutoindexError, NoopAutoindex};
pub use commit::{CommitEngine, CommitSummary};
pub use error::CommitError;
pub use model::{Item, Publish, PublishState, StoreRecord, Task, TaskState};
pub use records::{InMemoryRecords, RecordError, RecordStore};
pub use settings::{Settings, SettingsError, ENV_PREFIX};
pub use store::{BatchStore, InMemoryStore, StoreError};
pub use worker::{CommitOutcome, Committer, TaskContext};
pub use writer::{BatchFailure, BatchWriter, WriteOutcome, WriterStats, WrittenSet};
