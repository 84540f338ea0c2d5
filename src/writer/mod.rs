//! Batch Writer - Drains a bounded queue into the store with a worker pool.
//!
//! - `BatchWriter` - Producer side plus the worker pool for one submission
//! - `WriterStats` - Counters collected from the workers
//! - `WrittenSet` - Records confirmed written during a commit attempt
//! - `BatchFailure` - Error paired with the records written before it
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use publish_commit::{BatchWriter, InMemoryStore, Item, Settings};
//!
//! let store = InMemoryStore::new();
//! let settings = Settings::default().with_max_workers(2).with_batch_size(2);
//! let now = Utc::now();
//! let records: Vec<_> = ["/a", "/b", "/c"]
//!     .iter()
//!     .map(|uri| Item::new(*uri, "obj").to_record(now))
//!     .collect();
//!
//! let writer = BatchWriter::new(&store, &settings, "live", records.len(), "items");
//! let outcome = writer.submit(records).unwrap();
//!
//! assert_eq!(outcome.written.len(), 3);
//! assert_eq!(store.keys("live").unwrap(), vec!["/a", "/b", "/c"]);
//! ```

mod batch_writer;
mod written;

pub use batch_writer::{BatchWriter, WriteOutcome, WriterStats};
pub use written::{BatchFailure, WrittenSet};
