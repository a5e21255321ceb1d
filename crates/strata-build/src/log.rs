//! Append-only execution log shared by worker threads

use serde::Serialize;
use std::sync::Mutex;
use std::time::Instant;

/// What happened to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "kebab-case")]
pub enum LogEvent {
    Started,
    Succeeded,
    Failed(String),
    Skipped(String),
}

/// One log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Milliseconds since the log was created
    pub at_ms: u64,
    pub task: String,
    #[serde(flatten)]
    pub event: LogEvent,
}

/// Thread-safe execution log
#[derive(Debug)]
pub struct ExecutionLog {
    start: Instant,
    entries: Mutex<Vec<LogEntry>>,
}

impl ExecutionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append an entry
    pub fn record(&self, task: &str, event: LogEvent) {
        let entry = LogEntry {
            at_ms: self.start.elapsed().as_millis() as u64,
            task: task.to_string(),
            event,
        };
        // A panicking writer cannot leave a half-pushed entry behind
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the log, returning its entries in append order
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_appends_are_all_kept() {
        let log = Arc::new(ExecutionLog::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for _ in 0..50 {
                        log.record(&format!("t{}", i), LogEvent::Started);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let log = Arc::try_unwrap(log).unwrap();
        assert_eq!(log.len(), 400);
        assert_eq!(log.into_entries().len(), 400);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LogEntry {
            at_ms: 5,
            task: "build".into(),
            event: LogEvent::Failed("exit code 1".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"at_ms": 5, "task": "build", "event": "failed", "detail": "exit code 1"})
        );
    }
}
