use std::collections::VecDeque;

use floorwatch_core::types::{now_millis, LogEntry};
use parking_lot::Mutex;

pub const DEFAULT_CAPACITY: usize = 100;

/// Newest-first ring of captured worker output lines. Contents are
/// operational visibility only; nothing here survives a server restart.
pub struct LogBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Insert at the head, dropping the tail once over capacity.
    pub fn push(&self, text: impl Into<String>) {
        let mut entries = self.entries.lock();
        entries.push_front(LogEntry {
            timestamp: now_millis(),
            text: text.into(),
        });
        if entries.len() > self.capacity {
            entries.pop_back();
        }
    }

    /// Current contents, newest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
