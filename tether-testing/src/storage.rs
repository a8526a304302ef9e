// In-memory key-value storage

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tether_client::host::{KeyValueStorage, StorageError};

/// [`KeyValueStorage`] backed by a map, with switchable failure.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read and write fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stored value, bypassing the failure switch.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError("storage unavailable".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check()?;
        self.values.lock().insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check()?;
        Ok(self.values.lock().get(key).cloned())
    }
}
