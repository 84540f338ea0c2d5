use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;
use tracing::{debug, error};

use super::BatchFailure;
use crate::error::CommitError;
use crate::model::StoreRecord;
use crate::settings::Settings;
use crate::store::BatchStore;

/// How long idle workers and a blocked producer sleep between queue checks.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Counters collected from the workers of one submission.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    pub workers: usize,
    pub batches_written: usize,
    pub records_written: usize,
    pub batches_failed: usize,
}

impl WriterStats {
    fn merge(&mut self, other: WriterStats) {
        self.batches_written += other.batches_written;
        self.records_written += other.records_written;
        self.batches_failed += other.batches_failed;
    }
}

/// Result of a fully successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: Vec<StoreRecord>,
    pub stats: WriterStats,
}

/// State shared between the producer and every worker.
struct Shared {
    queue: ArrayQueue<StoreRecord>,
    producer_done: AtomicBool,
    failed: AtomicBool,
    first_error: Mutex<Option<CommitError>>,
    written: Mutex<Vec<StoreRecord>>,
}

impl Shared {
    fn new(capacity: usize, expected: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            producer_done: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
            written: Mutex::new(Vec::with_capacity(expected)),
        }
    }

    /// Record a failure. Only the first one is kept.
    fn fail(&self, err: CommitError) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
        self.failed.store(true, Ordering::SeqCst);
    }

    fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn is_producer_done(&self) -> bool {
        self.producer_done.load(Ordering::SeqCst)
    }

    fn record_written(&self, batch: Vec<StoreRecord>) {
        // A poisoned lock still holds valid records; rollback needs them.
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(batch);
    }
}

/// Writes records to a [`BatchStore`] through a bounded queue drained by a
/// pool of worker threads.
///
/// The calling thread is the producer. It blocks for up to
/// `write_queue_timeout` when the queue is full and fails with
/// [`CommitError::QueueFull`] if no worker frees a slot in time. Workers group
/// records into batches of `write_batch_size` and stop taking new batches as
/// soon as any failure has been observed. `submit` returns only after every
/// worker has finished, so the written records it reports are final.
pub struct BatchWriter<'a, S: ?Sized> {
    store: &'a S,
    settings: &'a Settings,
    env: &'a str,
    item_count: usize,
    label: String,
    delete: bool,
}

impl<'a, S> BatchWriter<'a, S>
where
    S: BatchStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        settings: &'a Settings,
        env: &'a str,
        item_count: usize,
        label: impl Into<String>,
    ) -> Self {
        Self {
            store,
            settings,
            env,
            item_count,
            label: label.into(),
            delete: false,
        }
    }

    /// Submit deletes instead of writes (used for rollback).
    pub fn deleting(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Number of workers to start: never more than there are batches.
    pub fn worker_count(&self) -> usize {
        let batch_size = self.settings.write_batch_size.max(1);
        let batches = self.item_count.div_ceil(batch_size);
        self.settings.write_max_workers.min(batches).max(1)
    }

    /// Enqueue every record, run the pool and wait for it to finish.
    ///
    /// On failure the returned [`BatchFailure`] carries the first error seen
    /// and every record that was confirmed written before the pool stopped.
    pub fn submit(&self, records: Vec<StoreRecord>) -> Result<WriteOutcome, BatchFailure> {
        if records.is_empty() {
            return Ok(WriteOutcome {
                written: Vec::new(),
                stats: WriterStats::default(),
            });
        }

        let workers = self.worker_count();
        let shared = Shared::new(self.settings.write_queue_size.max(1), records.len());

        debug!(
            label = %self.label,
            items = records.len(),
            workers,
            delete = self.delete,
            "Submitting batch write(s)"
        );

        let (stats, panicked) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for n in 0..workers {
                let shared = &shared;
                let spawned = thread::Builder::new()
                    .name(format!("batchwriter-{}-{}", self.label, n))
                    .spawn_scoped(scope, move || self.run_worker(shared));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        shared.fail(CommitError::Spawn {
                            label: self.label.clone(),
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }

            if !shared.has_failed() {
                self.produce(&shared, records);
            }
            shared.producer_done.store(true, Ordering::SeqCst);

            let mut stats = WriterStats {
                workers: handles.len(),
                ..Default::default()
            };
            let mut panicked: usize = 0;
            for handle in handles {
                match handle.join() {
                    Ok(worker_stats) => stats.merge(worker_stats),
                    Err(_) => panicked += 1,
                }
            }
            (stats, panicked)
        });

        let remaining = shared.queue.len();
        let written = shared
            .written
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let first_error = shared
            .first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(error) = first_error {
            return Err(BatchFailure::new(error, written));
        }

        if remaining > 0 {
            error!(
                label = %self.label,
                remaining,
                panicked,
                "Commit incomplete, queue not empty"
            );
            return Err(BatchFailure::new(
                CommitError::QueueNotEmpty {
                    label: self.label.clone(),
                    remaining,
                },
                written,
            ));
        }

        if panicked > 0 {
            error!(label = %self.label, panicked, "Batch writer worker(s) panicked");
            return Err(BatchFailure::new(
                CommitError::WorkerPanicked {
                    label: self.label.clone(),
                    panicked,
                },
                written,
            ));
        }

        debug!(
            label = %self.label,
            workers = stats.workers,
            batches = stats.batches_written,
            records = stats.records_written,
            failed = stats.batches_failed,
            "Batch write(s) complete"
        );

        Ok(WriteOutcome { written, stats })
    }

    fn produce(&self, shared: &Shared, records: Vec<StoreRecord>) {
        let timeout = self.settings.queue_timeout();
        for record in records {
            if shared.has_failed() {
                debug!(label = %self.label, "Failure observed, no longer enqueueing");
                return;
            }
            if let Err(err) = self.enqueue(shared, record, timeout) {
                error!(label = %self.label, ?timeout, "Write queue full, workers are not keeping up");
                shared.fail(err);
                return;
            }
        }
    }

    /// Push one record, waiting up to `timeout` for a free slot.
    ///
    /// The record is dropped without error if a worker fails meanwhile; the
    /// producer stops right after.
    fn enqueue(
        &self,
        shared: &Shared,
        mut record: StoreRecord,
        timeout: Duration,
    ) -> Result<(), CommitError> {
        let deadline = Instant::now() + timeout;
        loop {
            match shared.queue.push(record) {
                Ok(()) => return Ok(()),
                Err(rejected) => record = rejected,
            }

            if shared.has_failed() {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(CommitError::QueueFull {
                    label: self.label.clone(),
                    timeout,
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    fn run_worker(&self, shared: &Shared) -> WriterStats {
        let batch_size = self.settings.write_batch_size.max(1);
        let mut stats = WriterStats::default();

        loop {
            if shared.has_failed() {
                break;
            }

            let batch = next_batch(shared, batch_size);
            if batch.is_empty() || shared.has_failed() {
                break;
            }

            match self.store.write_batch(self.env, &batch, self.delete) {
                Ok(()) => {
                    stats.batches_written += 1;
                    stats.records_written += batch.len();
                    debug!(
                        label = %self.label,
                        records = batch.len(),
                        delete = self.delete,
                        "Batch written"
                    );
                    shared.record_written(batch);
                }
                Err(source) => {
                    stats.batches_failed += 1;
                    error!(
                        label = %self.label,
                        records = batch.len(),
                        error = %source,
                        "Batch write failed"
                    );
                    shared.fail(CommitError::Write {
                        label: self.label.clone(),
                        source,
                    });
                    break;
                }
            }
        }

        stats
    }
}

/// Collect up to `batch_size` records. Returns a short (or empty) batch once
/// the producer is done and the queue is drained, or when a failure is seen.
fn next_batch(shared: &Shared, batch_size: usize) -> Vec<StoreRecord> {
    let mut batch = Vec::with_capacity(batch_size);

    while batch.len() < batch_size {
        if let Some(record) = shared.queue.pop() {
            batch.push(record);
            continue;
        }

        if shared.is_producer_done() {
            // Pushes made before the flag was set are visible now.
            match shared.queue.pop() {
                Some(record) => {
                    batch.push(record);
                    continue;
                }
                None => break,
            }
        }

        if shared.has_failed() {
            break;
        }

        thread::sleep(POLL_INTERVAL);
    }

    batch
}
