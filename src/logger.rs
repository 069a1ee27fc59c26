//! The logging pipeline: a set of sinks, each behind its own minimum level.

use crate::builder::LoggerBuilder;
use crate::sink::Sink;
use crate::{Event, Level, LevelSwitch};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fans every event out to the sinks whose minimum level admits it.
///
/// Build one with [`Logger::builder`] or [`LoggerBuilder::from_config`].
/// Dropping the logger disposes all of its sinks.
pub struct Logger {
    sinks: Vec<(LevelSwitch, Box<dyn Sink>)>,
    disposed: AtomicBool,
}

impl Logger {
    /// Start building a logger with no sinks.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub(crate) fn from_sinks(sinks: Vec<(LevelSwitch, Box<dyn Sink>)>) -> Self {
        Self {
            sinks,
            disposed: AtomicBool::new(false),
        }
    }

    /// Number of attached sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Whether at least one sink would accept an event at `level`.
    pub fn is_enabled(&self, level: Level) -> bool {
        !self.disposed.load(Ordering::Acquire)
            && self.sinks.iter().any(|(switch, _)| switch.allows(level))
    }

    /// Create an event stamped now and emit it.
    pub fn write(
        &self,
        level: Level,
        message_template: &str,
        properties: BTreeMap<String, serde_json::Value>,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        self.emit(&Event::new(level, message_template).with_properties(properties));
    }

    pub fn verbose(&self, message_template: &str) {
        self.write(Level::Verbose, message_template, BTreeMap::new());
    }

    pub fn debug(&self, message_template: &str) {
        self.write(Level::Debug, message_template, BTreeMap::new());
    }

    pub fn information(&self, message_template: &str) {
        self.write(Level::Information, message_template, BTreeMap::new());
    }

    pub fn warning(&self, message_template: &str) {
        self.write(Level::Warning, message_template, BTreeMap::new());
    }

    pub fn error(&self, message_template: &str) {
        self.write(Level::Error, message_template, BTreeMap::new());
    }

    pub fn fatal(&self, message_template: &str) {
        self.write(Level::Fatal, message_template, BTreeMap::new());
    }
}

impl Sink for Logger {
    fn emit(&self, event: &Event) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        for (switch, sink) in &self.sinks {
            if switch.allows(event.level()) {
                sink.emit(event);
            }
        }
    }

    fn flush(&self) {
        for (_, sink) in &self.sinks {
            sink.flush();
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for (_, sink) in &self.sinks {
            sink.dispose();
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("sinks", &self.sinks.len())
            .field("disposed", &self.disposed.load(Ordering::Relaxed))
            .finish()
    }
}
