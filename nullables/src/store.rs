//! Nullable store: thread-safe in-memory generator storage for testing.

use std::collections::BTreeMap;
use std::sync::Mutex;

use delos_store::{GeneratorStore, StoreError};

/// An in-memory `GeneratorStore`.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullGeneratorStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl NullGeneratorStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NullGeneratorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorStore for NullGeneratorStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
