// SYNOID Shorts Event Log
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Bounded, append-only record of what a run did. Handed to every stage
// through `EventLogHandle` instead of living in a global.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock `HH:MM:SS`.
    pub time: String,
    pub level: EventLevel,
    pub message: String,
}

/// Ring buffer of the most recent `capacity` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, level: EventLevel, message: impl Into<String>) {
        self.push_entry(LogEntry {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        });
    }

    pub fn push_entry(&mut self, entry: LogEntry) {
        while self.entries.len() >= self.capacity {
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

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}

/// Shared handle; clones point at the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLogHandle {
    inner: Arc<Mutex<EventLog>>,
}

impl EventLogHandle {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EventLog::with_capacity(capacity))),
        }
    }

    /// Appends and mirrors the message to tracing.
    pub fn record(&self, level: EventLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            EventLevel::Info | EventLevel::Success => info!("[EVENTS] {}", message),
            EventLevel::Warn => warn!("[EVENTS] {}", message),
            EventLevel::Error => error!("[EVENTS] {}", message),
        }
        let mut log = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log.push(level, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(EventLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.record(EventLevel::Success, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(EventLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(EventLevel::Error, message);
    }

    pub fn snapshot(&self) -> EventLog {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
