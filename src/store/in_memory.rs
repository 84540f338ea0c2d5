//! InMemoryStore - HashMap-backed batch store for testing and single-process use.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{BatchStore, StoreError};
use crate::model::StoreRecord;

/// In-memory key-value store.
///
/// Storage key is `"ENV:web_uri"`; values are JSON-encoded records. Clone-friendly
/// via Arc, so clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(env: &str, web_uri: &str) -> String {
        format!("{}:{}", env, web_uri)
    }

    /// Fetch the record stored under `web_uri` in `env`.
    pub fn get(&self, env: &str, web_uri: &str) -> Result<Option<StoreRecord>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        match storage.get(&Self::make_key(env, web_uri)) {
            Some(bytes) => {
                let record = serde_json::from_slice(bytes)
                    .map_err(|e| StoreError::Serde(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub fn contains(&self, env: &str, web_uri: &str) -> Result<bool, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        Ok(storage.contains_key(&Self::make_key(env, web_uri)))
    }

    /// Sorted keys stored for `env`.
    pub fn keys(&self, env: &str) -> Result<Vec<String>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        let prefix = format!("{}:", env);
        let mut keys: Vec<String> = storage
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BatchStore for InMemoryStore {
    fn write_batch(
        &self,
        env: &str,
        batch: &[StoreRecord],
        delete: bool,
    ) -> Result<(), StoreError> {
        // Encode everything up front so a bad record leaves the batch unapplied.
        let encoded = if delete {
            Vec::new()
        } else {
            batch
                .iter()
                .map(|record| {
                    serde_json::to_vec(record)
                        .map(|bytes| (Self::make_key(env, record.key()), bytes))
                        .map_err(|e| StoreError::Serde(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        if delete {
            for record in batch {
                storage.remove(&Self::make_key(env, record.key()));
            }
        } else {
            storage.extend(encoded);
        }

        Ok(())
    }
}
