//! Per-run log stream.
//!
//! Every pipeline run owns one [`RunLog`]. Events are kept in emission order
//! so dashboards can poll with a cursor, and are also broadcast so live
//! observers (SSE, the terminal) can subscribe.

use std::sync::Mutex;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One line in a run's activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Position in the run's log, starting at 0
    pub seq: u64,
    /// Wall-clock time as `HH:MM:SS`
    pub time: String,
    pub timestamp: DateTime<Utc>,
    /// Which agent or phase emitted it
    pub source: String,
    pub message: String,
    pub level: LogLevel,
}

pub struct RunLog {
    history: Mutex<Vec<LogEvent>>,
    sender: broadcast::Sender<LogEvent>,
}

impl RunLog {
    /// Create a log whose live channel buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            history: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Append an event. Sequence numbers and broadcast order match.
    pub fn emit(&self, source: &str, message: impl Into<String>, level: LogLevel) -> LogEvent {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!(source = source, "{message}"),
            LogLevel::Warning => tracing::warn!(source = source, "{message}"),
            LogLevel::Info | LogLevel::Success => tracing::info!(source = source, "{message}"),
        }

        let now = Utc::now();
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let event = LogEvent {
            seq: history.len() as u64,
            time: now.with_timezone(&Local).format("%H:%M:%S").to_string(),
            timestamp: now,
            source: source.to_string(),
            message,
            level,
        };
        history.push(event.clone());
        // No subscribers is fine; history still has it.
        let _ = self.sender.send(event.clone());
        event
    }

    pub fn info(&self, source: &str, message: impl Into<String>) {
        self.emit(source, message, LogLevel::Info);
    }

    pub fn success(&self, source: &str, message: impl Into<String>) {
        self.emit(source, message, LogLevel::Success);
    }

    pub fn warning(&self, source: &str, message: impl Into<String>) {
        self.emit(source, message, LogLevel::Warning);
    }

    pub fn error(&self, source: &str, message: impl Into<String>) {
        self.emit(source, message, LogLevel::Error);
    }

    /// Events with `seq >= cursor`.
    pub fn since(&self, cursor: u64) -> Vec<LogEvent> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.iter().skip(cursor as usize).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.sender.subscribe()
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog").field("events", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let log = RunLog::new(16);
        let mut rx = log.subscribe();

        log.info("Research", "Starting keyword research");
        log.success("Research", "Topic map saved");

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
        assert_eq!(second.level, LogLevel::Success);
        assert_eq!(second.source, "Research");
    }

    #[test]
    fn since_returns_tail_from_cursor() {
        let log = RunLog::default();
        for i in 0..5 {
            log.info("Pipeline", format!("step {i}"));
        }
        let tail = log.since(3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].message, "step 3");
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn emit_without_subscribers_keeps_history() {
        let log = RunLog::new(4);
        log.error("Pipeline", "Phase 2 error: no topics");
        assert_eq!(log.len(), 1);
        assert_eq!(log.since(0)[0].time.len(), 8);
    }
}
