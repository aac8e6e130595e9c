/*!
 * Reporting interface handed to every pipeline component.
 *
 * Components never talk to the global logger directly: they receive a
 * `Reporter` so a run can be observed in isolation. `LogReporter` forwards
 * to the `log` facade, `MemoryReporter` keeps entries in memory.
 */

use log::Level;
use parking_lot::Mutex;
use std::sync::Arc;

/// A single captured report line
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Severity of the entry
    pub level: Level,
    /// Message text
    pub message: String,
}

/// Sink for the messages emitted by the pipeline
pub trait Reporter: Send + Sync {
    /// Record a message at the given level
    fn report(&self, level: Level, message: &str);

    fn error(&self, message: &str) {
        self.report(Level::Error, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::Warn, message);
    }

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn debug(&self, message: &str) {
        self.report(Level::Debug, message);
    }
}

/// Shared handle passed between tasks
pub type SharedReporter = Arc<dyn Reporter>;

/// Forwards every report to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl LogReporter {
    pub fn shared() -> SharedReporter {
        Arc::new(Self)
    }
}

impl Reporter for LogReporter {
    fn report(&self, level: Level, message: &str) {
        log::log!(target: "teamgrab", level, "{}", message);
    }
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Messages reported at exactly `level`
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages_at(Level::Warn)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages_at(Level::Error)
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, message: &str) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}
