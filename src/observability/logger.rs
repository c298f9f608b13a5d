//! Event Observers
//!
//! Components report what they do through an injected [`Observer`] rather than
//! process-wide logging hooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Sink for component events.
pub trait Observer: Send + Sync {
    fn record_event(&self, level: EventLevel, message: &str);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn record_event(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Debug => tracing::debug!("{}", message),
            EventLevel::Info => tracing::info!("{}", message),
            EventLevel::Warning => tracing::warn!("{}", message),
            EventLevel::Error => tracing::error!("{}", message),
        }
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn record_event(&self, _level: EventLevel, _message: &str) {}
}

/// Forwards every event to each of its sinks, in order.
#[derive(Clone, Default)]
pub struct FanoutObserver {
    sinks: Vec<Arc<dyn Observer>>,
}

impl FanoutObserver {
    pub fn new(sinks: Vec<Arc<dyn Observer>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn Observer>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Observer for FanoutObserver {
    fn record_event(&self, level: EventLevel, message: &str) {
        for sink in &self.sinks {
            sink.record_event(level, message);
        }
    }
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub message: String,
}

/// Bounded in-memory event log, optionally appended to a JSON-lines file.
pub struct EventLog {
    log_file: Option<PathBuf>,
    entries: Arc<Mutex<VecDeque<EventEntry>>>,
    max_in_memory: usize,
}

impl EventLog {
    pub fn new(log_file: Option<PathBuf>, max_in_memory: usize) -> Self {
        Self {
            log_file,
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_in_memory,
        }
    }

    /// Most recent entries, oldest first.
    pub fn entries(&self) -> Vec<EventEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn messages_at(&self, level: EventLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    fn append_to_file(&self, entry: &EventEntry) -> std::io::Result<()> {
        if let Some(ref log_file) = self.log_file {
            let mut file = OpenOptions::new().create(true).append(true).open(log_file)?;
            let json = serde_json::to_string(entry)?;
            writeln!(file, "{}", json)?;
        }
        Ok(())
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(None, 1000)
    }
}

impl Observer for EventLog {
    fn record_event(&self, level: EventLevel, message: &str) {
        let entry = EventEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
        };

        if let Err(e) = self.append_to_file(&entry) {
            tracing::warn!("Failed to write event log: {}", e);
        }

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry);
        while entries.len() > self.max_in_memory {
            entries.pop_front();
        }
    }
}
