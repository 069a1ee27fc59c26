//! Log events and severity levels.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use time::OffsetDateTime;

/// Event severity, ordered from least to most severe.
///
/// The default is the lowest level, so an unset minimum admits everything.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Level {
    /// Tracing detail, rarely enabled outside development.
    #[default]
    #[serde(alias = "verbose", alias = "trace")]
    Verbose,
    /// Internal state useful when diagnosing a problem.
    #[serde(alias = "debug")]
    Debug,
    /// Normal operation.
    #[serde(alias = "information", alias = "info")]
    Information,
    /// Something unexpected that the application recovered from.
    #[serde(alias = "warning", alias = "warn")]
    Warning,
    /// A failure of the current operation.
    #[serde(alias = "error")]
    Error,
    /// The application cannot continue.
    #[serde(alias = "fatal")]
    Fatal,
}

impl Level {
    const ALL: [Level; 6] = [
        Level::Verbose,
        Level::Debug,
        Level::Information,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    /// The name written into JSON records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }

    fn as_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(value: u8) -> Self {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .unwrap_or(Level::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" | "trace" => Ok(Level::Verbose),
            "debug" => Ok(Level::Debug),
            "information" | "info" => Ok(Level::Information),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            other => Err(crate::Error::Config(format!("unknown level: {}", other))),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Verbose,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Information,
            tracing::Level::WARN => Level::Warning,
            _ => Level::Error,
        }
    }
}

/// A minimum level that can be shared between sinks and changed at runtime.
#[derive(Debug, Clone)]
pub struct LevelSwitch {
    minimum: Arc<AtomicU8>,
}

impl LevelSwitch {
    /// Create a switch starting at `minimum`.
    pub fn new(minimum: Level) -> Self {
        Self {
            minimum: Arc::new(AtomicU8::new(minimum.as_u8())),
        }
    }

    /// Current minimum level.
    pub fn minimum(&self) -> Level {
        Level::from_u8(self.minimum.load(Ordering::Relaxed))
    }

    /// Change the minimum level for every holder of this switch.
    pub fn set_minimum(&self, level: Level) {
        self.minimum.store(level.as_u8(), Ordering::Relaxed);
    }

    /// Whether an event at `level` passes this switch.
    pub fn allows(&self, level: Level) -> bool {
        level >= self.minimum()
    }
}

impl Default for LevelSwitch {
    fn default() -> Self {
        Self::new(Level::default())
    }
}

impl From<Level> for LevelSwitch {
    fn from(minimum: Level) -> Self {
        Self::new(minimum)
    }
}

/// One structured log record.
///
/// Events are produced by the application and only read by sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    timestamp: OffsetDateTime,
    level: Level,
    message_template: String,
    properties: BTreeMap<String, serde_json::Value>,
    exception: Option<String>,
}

impl Event {
    /// Create an event stamped with the current UTC time.
    pub fn new(level: Level, message_template: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            level,
            message_template: message_template.into(),
            properties: BTreeMap::new(),
            exception: None,
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach a property. A later value for the same name replaces the earlier one.
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Attach all properties from a map.
    pub fn with_properties(mut self, properties: BTreeMap<String, serde_json::Value>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Attach a rendered error.
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    pub fn properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.properties
    }

    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Verbose < Level::Debug);
        assert!(Level::Information < Level::Warning);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("info".parse::<Level>().unwrap(), Level::Information);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("trace".parse::<Level>().unwrap(), Level::Verbose);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_deserialize_aliases() {
        let level: Level = serde_yaml::from_str("warn").unwrap();
        assert_eq!(level, Level::Warning);
        let level: Level = serde_yaml::from_str("Information").unwrap();
        assert_eq!(level, Level::Information);
    }

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Verbose);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
    }

    #[test]
    fn test_level_switch_shared() {
        let switch = LevelSwitch::new(Level::Information);
        let clone = switch.clone();
        assert!(!switch.allows(Level::Debug));

        clone.set_minimum(Level::Verbose);
        assert!(switch.allows(Level::Debug));
        assert_eq!(switch.minimum(), Level::Verbose);
    }

    #[test]
    fn test_event_properties_unique() {
        let event = Event::new(Level::Information, "Hello {Name}")
            .at(datetime!(2024-01-15 10:00 UTC))
            .with_property("Name", "a")
            .with_property("Name", "b");

        assert_eq!(event.properties().len(), 1);
        assert_eq!(event.properties()["Name"], "b");
        assert_eq!(event.timestamp(), datetime!(2024-01-15 10:00 UTC));
    }
}
