//! Shared fixtures: a scriptable store, record fixtures and log capture.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use publish_commit::{
    Autoindex, AutoindexError, BatchStore, InMemoryRecords, InMemoryStore, Item, Publish,
    PublishState, RecordError, RecordStore, StoreError, StoreRecord, Task, TaskState,
};

pub const TASK_ID: &str = "8d8a4692-c89b-4b57-840f-b3f0166148d2";
pub const PUBLISH_ID: &str = "123e4567-e89b-12d3-a456-426614174000";
pub const ENV: &str = "test";

// ============================================================================
// Scripted store
// ============================================================================

/// What the store does on one `write_batch` call.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Ok,
    Fail,
    Panic,
    Stall(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub keys: Vec<String>,
    pub delete: bool,
}

/// Store that follows a per-call script (then succeeds) and records every call.
#[derive(Default)]
pub struct ScriptedStore {
    pub inner: InMemoryStore,
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        let store = Self::default();
        store.script.lock().unwrap().extend(steps);
        Arc::new(store)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_kinds(&self) -> Vec<bool> {
        self.calls().iter().map(|c| c.delete).collect()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .calls()
            .into_iter()
            .filter(|c| c.delete)
            .flat_map(|c| c.keys)
            .collect();
        keys.sort();
        keys
    }
}

impl BatchStore for ScriptedStore {
    fn write_batch(
        &self,
        env: &str,
        batch: &[StoreRecord],
        delete: bool,
    ) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(Call {
            keys: batch.iter().map(|r| r.web_uri.clone()).collect(),
            delete,
        });
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Ok);

        match step {
            Step::Ok => {}
            Step::Fail => return Err(StoreError::Rejected("simulated failure".into())),
            Step::Panic => panic!("simulated worker crash"),
            Step::Stall(pause) => thread::sleep(pause),
        }
        self.inner.write_batch(env, batch, delete)
    }
}

// ============================================================================
// Autoindex
// ============================================================================

#[derive(Clone, Default)]
pub struct CountingAutoindex {
    pub runs: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingAutoindex {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Autoindex for CountingAutoindex {
    fn run(&self, _publish: &Publish, _env: &str) -> Result<(), AutoindexError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AutoindexError("index upload failed".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Records
// ============================================================================

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn task(now: DateTime<Utc>) -> Task {
    Task::new(TASK_ID, PUBLISH_ID, now + ChronoDuration::hours(2))
}

pub fn content_items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|n| {
            Item::new(
                format!("/content/testproduct/1/repo/pkg-{}.rpm", n),
                format!("{:064x}", n),
            )
            .with_content_type("application/x-rpm")
        })
        .collect()
}

pub fn entry_point_items() -> Vec<Item> {
    vec![
        Item::new("/content/testproduct/1/repo/repodata/repomd.xml", "e".repeat(64))
            .with_content_type("application/xml"),
        Item::new("/content/testproduct/1/iso/PULP_MANIFEST", "f".repeat(64)),
    ]
}

/// A COMMITTING publish with `content` content items and two entry points.
pub fn publish(content: usize) -> Publish {
    Publish::new(PUBLISH_ID, ENV)
        .with_state(PublishState::Committing)
        .with_items(content_items(content))
        .with_items(entry_point_items())
}

pub fn records_with(task: Task, publish: Publish) -> InMemoryRecords {
    let records = InMemoryRecords::new();
    records.insert_task(task).unwrap();
    records.insert_publish(publish).unwrap();
    records
}

/// Record store whose state updates always fail; reads and claims pass through.
#[derive(Clone)]
pub struct ReadOnlyRecords {
    pub inner: InMemoryRecords,
}

impl RecordStore for ReadOnlyRecords {
    fn get_task(&self, id: &str) -> Result<Option<Task>, RecordError> {
        self.inner.get_task(id)
    }

    fn get_publish(&self, id: &str) -> Result<Option<Publish>, RecordError> {
        self.inner.get_publish(id)
    }

    fn claim(&self, task_id: &str) -> Result<bool, RecordError> {
        self.inner.claim(task_id)
    }

    fn release(&self, task_id: &str) -> Result<(), RecordError> {
        self.inner.release(task_id)
    }

    fn finalize(
        &self,
        _task_id: &str,
        _task_state: TaskState,
        _publish_id: &str,
        _publish_state: PublishState,
    ) -> Result<(), RecordError> {
        Err(RecordError::Backend("database is read-only".into()))
    }
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber capturing events from the calling thread.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
