//! Persisted request logs.
//!
//! Records live in the host key-value store as one object mapping a local
//! date (`YYYYMMDD`) to that day's entries. Both the number of days and the
//! entries per day are bounded; the oldest are dropped first.
//!
//! Writes are read-modify-write without locking. Concurrent requests may
//! overwrite each other's entries.

use crate::host::KeyValueStorage;
use crate::{Result, TetherError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Storage key the record is kept under.
pub const LOG_STORAGE_KEY: &str = "tether:request-logs";

/// Date buckets retained.
pub const MAX_LOG_DAYS: usize = 7;

/// Entries retained per date bucket.
pub const MAX_LOG_ENTRIES: usize = 300;

/// Date bucket → entries, oldest first.
pub type LogRecord = BTreeMap<String, VecDeque<String>>;

/// One completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub adapter: String,
    pub status_code: Option<u16>,
    pub method: String,
    pub url: String,
}

impl LogEntry {
    /// `adapter,status,METHOD,url,epochMillis,HH:MM:SS`
    pub fn line(&self, at: &DateTime<Local>) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.adapter,
            self.status_code.map(|s| s.to_string()).unwrap_or_default(),
            self.method,
            self.url,
            at.timestamp_millis(),
            at.format("%H:%M:%S")
        )
    }
}

/// Writes request logs to host storage.
pub struct LogManager {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    max_days: usize,
    max_entries: usize,
}

impl LogManager {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            key: LOG_STORAGE_KEY.to_string(),
            max_days: MAX_LOG_DAYS,
            max_entries: MAX_LOG_ENTRIES,
        }
    }

    /// Override the retention limits. Zero is treated as one.
    pub fn with_limits(mut self, max_days: usize, max_entries: usize) -> Self {
        self.max_days = max_days.max(1);
        self.max_entries = max_entries.max(1);
        self
    }

    /// Store under a different key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Append an entry stamped with the current local time.
    pub fn record(&self, entry: &LogEntry) -> Result<()> {
        self.record_at(entry, Local::now())
    }

    /// Append an entry stamped with `at`.
    pub fn record_at(&self, entry: &LogEntry, at: DateTime<Local>) -> Result<()> {
        let mut record = self.load()?;
        let day = at.format("%Y%m%d").to_string();

        if !record.contains_key(&day) {
            while record.len() >= self.max_days {
                record.pop_first();
            }
        }

        let bucket = record.entry(day).or_default();
        bucket.push_back(entry.line(&at));
        while bucket.len() > self.max_entries {
            bucket.pop_front();
        }

        let value = serde_json::to_value(&record)?;
        self.storage.set_value(&self.key, value)?;
        Ok(())
    }

    /// Read the stored record. A missing or unreadable record is empty.
    pub fn load(&self) -> Result<LogRecord> {
        let Some(value) = self.storage.get_value(&self.key)? else {
            return Ok(LogRecord::new());
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::debug!(error = %e, key = %self.key, "Discarding unreadable request log");
                Ok(LogRecord::new())
            }
        }
    }

    /// Drop every stored entry.
    pub fn clear(&self) -> Result<()> {
        self.storage
            .set_value(&self.key, serde_json::json!({}))
            .map_err(TetherError::from)
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("key", &self.key)
            .field("max_days", &self.max_days)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}
