use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use super::{RecordError, RecordStore};
use crate::model::{Publish, PublishState, Task, TaskState};

#[derive(Default)]
struct Tables {
    tasks: HashMap<String, Task>,
    publishes: HashMap<String, Publish>,
    claimed: HashSet<String>,
}

/// HashMap-backed record store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryRecords {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(&self, task: Task) -> Result<(), RecordError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RecordError::LockPoisoned("task insert"))?;
        tables.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    pub fn insert_publish(&self, publish: Publish) -> Result<(), RecordError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RecordError::LockPoisoned("publish insert"))?;
        tables.publishes.insert(publish.id.clone(), publish);
        Ok(())
    }
}

impl RecordStore for InMemoryRecords {
    fn get_task(&self, id: &str) -> Result<Option<Task>, RecordError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RecordError::LockPoisoned("task read"))?;
        Ok(tables.tasks.get(id).cloned())
    }

    fn get_publish(&self, id: &str) -> Result<Option<Publish>, RecordError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RecordError::LockPoisoned("publish read"))?;
        Ok(tables.publishes.get(id).cloned())
    }

    fn claim(&self, task_id: &str) -> Result<bool, RecordError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RecordError::LockPoisoned("claim"))?;
        let state = tables
            .tasks
            .get(task_id)
            .map(|task| task.state)
            .ok_or_else(|| RecordError::TaskNotFound(task_id.to_string()))?;
        if state != TaskState::NotStarted {
            return Ok(false);
        }
        Ok(tables.claimed.insert(task_id.to_string()))
    }

    fn release(&self, task_id: &str) -> Result<(), RecordError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RecordError::LockPoisoned("release"))?;
        tables.claimed.remove(task_id);
        Ok(())
    }

    fn finalize(
        &self,
        task_id: &str,
        task_state: TaskState,
        publish_id: &str,
        publish_state: PublishState,
    ) -> Result<(), RecordError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RecordError::LockPoisoned("finalize"))?;

        // Check both before touching either so the pair stays consistent.
        let current = tables
            .tasks
            .get(task_id)
            .map(|task| task.state)
            .ok_or_else(|| RecordError::TaskNotFound(task_id.to_string()))?;
        if current != TaskState::NotStarted {
            return Err(RecordError::TaskStateChanged {
                task_id: task_id.to_string(),
                state: current,
            });
        }
        if !tables.publishes.contains_key(publish_id) {
            return Err(RecordError::PublishNotFound(publish_id.to_string()));
        }

        if let Some(task) = tables.tasks.get_mut(task_id) {
            task.state = task_state;
        }
        if let Some(publish) = tables.publishes.get_mut(publish_id) {
            publish.state = publish_state;
        }
        tables.claimed.remove(task_id);

        Ok(())
    }
}
