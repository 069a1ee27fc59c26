//! Builder for assembling a [`Logger`] from sinks.
//!
//! # Example
//!
//! ```rust,no_run
//! use jsonsink::{Level, Logger, RollingFileConfig};
//!
//! let logger = Logger::builder()
//!     .json_console(Level::Information)
//!     .json_rolling_file(RollingFileConfig::new("logs/app-{Date}.json"))?
//!     .build();
//!
//! logger.information("service started");
//! # Ok::<(), jsonsink::Error>(())
//! ```

use crate::logger::Logger;
use crate::sink::{ConsoleSink, NullSink, Sink};
use crate::{
    FileSink, FileSinkConfig, JsonFormatter, LevelSwitch, LogConfig, Result, RollingFileConfig,
    RollingFileSink, SelfLog,
};

/// Collects sinks, each with its own minimum level, and builds a [`Logger`].
pub struct LoggerBuilder {
    selflog: SelfLog,
    render_message: bool,
    sinks: Vec<(LevelSwitch, Box<dyn Sink>)>,
}

impl LoggerBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            selflog: SelfLog::new(),
            render_message: false,
            sinks: Vec::new(),
        }
    }

    /// Create a builder with every sink named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if any sink configuration is invalid.
    /// A file that cannot be opened is not an error; see [`Self::json_file`].
    pub fn from_config(config: &LogConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::new().render_message(config.render_message);
        if config.console {
            builder = builder.json_console(config.level);
        }
        if let Some(file) = &config.file {
            builder = builder.json_file(file.clone())?;
        }
        if let Some(rolling_file) = &config.rolling_file {
            builder = builder.json_rolling_file(rolling_file.clone())?;
        }
        Ok(builder)
    }

    /// Send sink diagnostics to `selflog`. Applies to sinks added afterwards.
    pub fn with_selflog(mut self, selflog: SelfLog) -> Self {
        self.selflog = selflog;
        self
    }

    /// Add the rendered message to every record. Applies to sinks added
    /// afterwards.
    pub fn render_message(mut self, render_message: bool) -> Self {
        self.render_message = render_message;
        self
    }

    fn formatter(&self) -> JsonFormatter {
        JsonFormatter::new().with_rendered_message(self.render_message)
    }

    /// Write JSON lines to standard output.
    pub fn json_console(self, minimum: impl Into<LevelSwitch>) -> Self {
        let sink = ConsoleSink::new(self.formatter()).with_selflog(self.selflog.clone());
        self.sink(minimum, sink)
    }

    /// Write JSON lines to a single file.
    ///
    /// When the file cannot be opened the failure goes to the self-log and a
    /// [`NullSink`] takes its place, so logging setup never stops the
    /// application.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `config` is invalid.
    pub fn json_file(self, config: FileSinkConfig) -> Result<Self> {
        let minimum = config.restricted_to_minimum_level;
        match FileSink::open(&config, self.formatter(), self.selflog.clone()) {
            Ok(sink) => Ok(self.sink(minimum, sink)),
            Err(e) if e.is_config() => Err(e),
            Err(e) => {
                self.selflog.write(format!(
                    "Unable to open file sink for {}: {}",
                    config.path.display(),
                    e
                ));
                Ok(self.sink(minimum, NullSink))
            }
        }
    }

    /// Write JSON lines to a series of dated files.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `config` is invalid.
    pub fn json_rolling_file(self, config: RollingFileConfig) -> Result<Self> {
        let sink = RollingFileSink::new(&config, self.formatter(), self.selflog.clone())?;
        Ok(self.sink(config.restricted_to_minimum_level, sink))
    }

    /// Add any sink behind a minimum level or a shared [`LevelSwitch`].
    pub fn sink(mut self, minimum: impl Into<LevelSwitch>, sink: impl Sink + 'static) -> Self {
        self.sinks.push((minimum.into(), Box::new(sink)));
        self
    }

    pub fn build(self) -> Logger {
        Logger::from_sinks(self.sinks)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
