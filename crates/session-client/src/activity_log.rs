//! Bounded, append-only activity log.
//!
//! Every user-visible state change of a session is appended here with a
//! severity. Entries are mirrored to `tracing` so the same history shows up
//! in structured logs.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Default number of entries kept before the oldest are evicted.
pub const DEFAULT_ACTIVITY_LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

/// Shared handle to the log. Clones append to the same history.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_LOG_CAPACITY)
    }
}

impl ActivityLog {
    /// Create a log holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity,
        }
    }

    /// Append an entry stamped with the current time.
    pub fn append(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();

        match severity {
            Severity::Info | Severity::Success => {
                info!(target: "sc.activity", severity = %severity, "{}", message);
            }
            Severity::Warn => warn!(target: "sc.activity", severity = %severity, "{}", message),
            Severity::Error => error!(target: "sc.activity", severity = %severity, "{}", message),
        }

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            timestamp: Utc::now(),
            message,
            severity,
        });
    }

    /// Entries in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Messages only, in append order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.message.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order_and_severity() {
        let log = ActivityLog::new(10);

        log.append("Generating token...", Severity::Info);
        log.append("Token generated successfully", Severity::Success);

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.first().map(|e| e.severity), Some(Severity::Info));
        assert_eq!(
            log.messages(),
            vec!["Generating token...", "Token generated successfully"]
        );
        assert!(entries.windows(2).all(|w| match w {
            [a, b] => a.timestamp <= b.timestamp,
            _ => true,
        }));
    }

    #[test]
    fn test_oldest_entries_evicted_at_capacity() {
        let log = ActivityLog::new(3);

        for i in 0..5 {
            log.append(format!("entry {i}"), Severity::Info);
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.messages(), vec!["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn test_clones_share_history() {
        let log = ActivityLog::new(10);
        let other = log.clone();

        other.append("Camera enabled", Severity::Success);

        assert_eq!(log.messages(), vec!["Camera enabled"]);
    }

    #[test]
    fn test_zero_capacity_keeps_one_entry() {
        let log = ActivityLog::new(0);

        log.append("first", Severity::Info);
        log.append("second", Severity::Warn);

        assert_eq!(log.capacity(), 1);
        assert_eq!(log.messages(), vec!["second"]);
    }
}
