//! Dashboard-facing status: rolling event log, trigger outcome, counters.
//!
//! The board is the only state shared between the ingestion path and the
//! trigger worker. The worker writes outcomes here and nowhere else.

use lapse_traits::Clock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::state::PrintState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Milliseconds since the pipeline was built.
    pub at_ms: u64,
    pub level: LogLevel,
    pub message: String,
}

/// Bounded log; the oldest line is dropped once capacity is reached.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriggerCounters {
    pub scheduled: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Debug)]
struct BoardInner {
    log: EventLog,
    last_outcome: Option<String>,
    counters: TriggerCounters,
}

/// Cloneable handle to the shared status board.
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<Mutex<BoardInner>>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl core::fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let g = self.lock();
        f.debug_struct("StatusBoard")
            .field("log_len", &g.log.len())
            .field("last_outcome", &g.last_outcome)
            .field("counters", &g.counters)
            .finish()
    }
}

impl StatusBoard {
    pub fn new(capacity: usize, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            inner: Arc::new(Mutex::new(BoardInner {
                log: EventLog::with_capacity(capacity),
                last_outcome: None,
                counters: TriggerCounters::default(),
            })),
            clock,
            epoch,
        }
    }

    // A panic while holding the lock must not take the dashboard down with it.
    fn lock(&self) -> MutexGuard<'_, BoardInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            at_ms: self.clock.ms_since(self.epoch),
            level,
            message: message.into(),
        };
        self.lock().log.push(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub(crate) fn count_scheduled(&self) {
        self.lock().counters.scheduled += 1;
    }

    pub(crate) fn count_skipped(&self) {
        self.lock().counters.skipped += 1;
    }

    /// Record a terminal trigger outcome as a human-readable string.
    pub(crate) fn set_outcome(&self, succeeded: bool, text: String) {
        let mut g = self.lock();
        if succeeded {
            g.counters.succeeded += 1;
        } else {
            g.counters.failed += 1;
        }
        g.last_outcome = Some(text);
    }

    pub fn last_outcome(&self) -> Option<String> {
        self.lock().last_outcome.clone()
    }

    pub fn counters(&self) -> TriggerCounters {
        self.lock().counters
    }

    pub fn log_lines(&self) -> Vec<LogEntry> {
        self.lock().log.iter().cloned().collect()
    }
}

/// Read-only view polled by the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub accepted_state: PrintState,
    pub candidate_state: Option<PrintState>,
    pub current_layer: u32,
    pub total_layers: Option<u32>,
    pub last_triggered_layer: Option<u32>,
    pub trigger_pending: bool,
    pub actuator_ready: bool,
    pub timelapse_armed: bool,
    pub last_trigger_outcome: Option<String>,
    pub counters: TriggerCounters,
    pub log: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_traits::clock::test_clock::TestClock;
    use std::time::Duration;

    #[test]
    fn event_log_drops_oldest_past_capacity() {
        let mut log = EventLog::with_capacity(3);
        for i in 0..5 {
            log.push(LogEntry {
                at_ms: i,
                level: LogLevel::Info,
                message: format!("line {i}"),
            });
        }
        assert_eq!(log.len(), 3);
        let msgs: Vec<_> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, ["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn board_timestamps_follow_clock() {
        let clock = TestClock::new();
        let board = StatusBoard::new(10, Arc::new(clock.clone()));
        board.info("first");
        clock.advance(Duration::from_millis(1_500));
        board.warn("second");
        let lines = board.log_lines();
        assert_eq!(lines[0].at_ms, 0);
        assert_eq!(lines[1].at_ms, 1_500);
        assert_eq!(lines[1].level, LogLevel::Warn);
    }

    #[test]
    fn outcomes_update_counters() {
        let board = StatusBoard::new(10, Arc::new(TestClock::new()));
        board.count_scheduled();
        board.set_outcome(true, "layer 1 captured (attempt 1)".into());
        board.count_scheduled();
        board.set_outcome(false, "layer 2 failed".into());
        let c = board.counters();
        assert_eq!((c.scheduled, c.succeeded, c.failed), (2, 1, 1));
        assert_eq!(board.last_outcome().as_deref(), Some("layer 2 failed"));
    }
}
