//! Logger collaborator available through the [`Registry`](crate::Registry).
//!
//! The dispatcher and layers log through the [`Logger`] trait so that output
//! sinks stay outside this crate. [`TracingLogger`] forwards to `tracing`;
//! [`MemoryLogger`] keeps an in-process archive, which is what tests and
//! debug output read back. [`CompositeLogger`] fans one message out to several
//! named sinks above a default level.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
pub use tracing::Level;

/// Sink for framework log messages.
pub trait Logger: Send + Sync {
    /// Logs `message` at `level` with structured `context`.
    fn log(&self, level: Level, message: &str, context: &serde_json::Value);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message, &serde_json::Value::Null);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message, &serde_json::Value::Null);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message, &serde_json::Value::Null);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message, &serde_json::Value::Null);
    }
}

/// Logger emitting `tracing` events under the `ferrous_dispatch` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, context: &serde_json::Value) {
        match level {
            Level::ERROR => tracing::error!(target: "ferrous_dispatch", %context, "{}", message),
            Level::WARN => tracing::warn!(target: "ferrous_dispatch", %context, "{}", message),
            Level::INFO => tracing::info!(target: "ferrous_dispatch", %context, "{}", message),
            Level::DEBUG => tracing::debug!(target: "ferrous_dispatch", %context, "{}", message),
            _ => tracing::trace!(target: "ferrous_dispatch", %context, "{}", message),
        }
    }
}

/// One archived log message.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    pub message: String,
    pub context: serde_json::Value,
}

fn serialize_level<S: serde::Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(level.as_str())
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<5} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.message
        )
    }
}

/// Logger archiving entries in memory, oldest first.
///
/// With a capacity set, the oldest entries are dropped once it is reached.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Logger, MemoryLogger};
///
/// let logger = MemoryLogger::with_capacity(2);
/// logger.info("one");
/// logger.info("two");
/// logger.warn("three");
/// assert_eq!(logger.messages(), vec!["two", "three"]);
/// ```
#[derive(Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
    capacity: Option<usize>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// True when any archived message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str, context: &serde_json::Value) {
        let mut entries = self.entries.lock();
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            if entries.len() >= capacity {
                let overflow = entries.len() + 1 - capacity;
                entries.drain(..overflow);
            }
        }
        entries.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            context: context.clone(),
        });
    }
}

impl fmt::Debug for MemoryLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLogger")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Logger forwarding each message to every attached sink.
///
/// Messages less severe than the default level are dropped before fan-out.
/// Sinks are looked up by name, ignoring case.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{CompositeLogger, Level, Logger, MemoryLogger};
/// use std::sync::Arc;
///
/// let archive = Arc::new(MemoryLogger::new());
/// let logger = CompositeLogger::new(Level::INFO);
/// logger.attach("archive", archive.clone());
///
/// logger.debug("skipped");
/// logger.warn("kept");
/// assert_eq!(archive.messages(), vec!["kept"]);
/// assert!(logger.logger("ARCHIVE").is_some());
/// ```
pub struct CompositeLogger {
    sinks: RwLock<Vec<(String, Arc<dyn Logger>)>>,
    default_level: RwLock<Level>,
}

impl CompositeLogger {
    pub fn new(default_level: Level) -> Self {
        Self {
            sinks: RwLock::new(Vec::new()),
            default_level: RwLock::new(default_level),
        }
    }

    /// Attaches `logger` under `name`, replacing a sink with the same name.
    pub fn attach(&self, name: impl Into<String>, logger: Arc<dyn Logger>) -> &Self {
        let name = name.into();
        let mut sinks = self.sinks.write();
        match sinks.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = logger,
            None => sinks.push((name, logger)),
        }
        self
    }

    /// Detaches the sink called `name`; returns whether one was attached.
    pub fn detach(&self, name: &str) -> bool {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        sinks.len() != before
    }

    pub fn detach_all(&self) {
        self.sinks.write().clear();
    }

    pub fn logger(&self, name: &str) -> Option<Arc<dyn Logger>> {
        self.sinks
            .read()
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, logger)| logger.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.sinks.read().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn set_default_level(&self, level: Level) {
        *self.default_level.write() = level;
    }

    pub fn default_level(&self) -> Level {
        *self.default_level.read()
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }
}

impl Default for CompositeLogger {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl Logger for CompositeLogger {
    fn log(&self, level: Level, message: &str, context: &serde_json::Value) {
        // tracing orders verbose levels above severe ones
        if level > self.default_level() {
            return;
        }
        // Sinks may log back into this logger; never call them under the lock
        let sinks: Vec<Arc<dyn Logger>> = self.sinks.read().iter().map(|(_, logger)| logger.clone()).collect();
        for sink in sinks {
            sink.log(level, message, context);
        }
    }
}

impl fmt::Debug for CompositeLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeLogger")
            .field("sinks", &self.names())
            .field("default_level", &self.default_level())
            .finish()
    }
}
