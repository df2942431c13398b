//! Diagnostic log sink
//!
//! An append-only, ordered list of human-readable progress and failure
//! messages. A sink is handed to each computation; nothing here is global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Progress,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind,
            message: message.into(),
        }
    }
}

/// Append-only diagnostic sink
pub trait LogSink: Send + Sync {
    fn append(&self, entry: LogEntry);

    fn progress(&self, message: String) {
        self.append(LogEntry::new(LogKind::Progress, message));
    }

    fn failure(&self, message: String) {
        self.append(LogEntry::new(LogKind::Failure, message));
    }
}

/// Collects entries in memory, in append order
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds a usable Vec
    fn entries(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Copy of all entries so far
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries().to_vec()
    }

    /// Messages only
    pub fn messages(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|e| e.message).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemoryLog {
    fn append(&self, entry: LogEntry) {
        self.entries().push(entry);
    }
}

/// Forwards entries to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn append(&self, entry: LogEntry) {
        match entry.kind {
            LogKind::Progress => tracing::info!(target: "refdisp::progress", "{}", entry.message),
            LogKind::Failure => tracing::warn!(target: "refdisp::progress", "{}", entry.message),
        }
    }
}

/// Disabled sink
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn append(&self, _entry: LogEntry) {}
}
