use crate::rotation::deserialize_size_limit;
use crate::{Error, Level, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default size limit for a single log file: 1 GiB.
pub const DEFAULT_FILE_SIZE_LIMIT_BYTES: u64 = 1024 * 1024 * 1024;

/// Default number of rolled files kept, including the current one.
pub const DEFAULT_RETAINED_FILE_COUNT_LIMIT: u32 = 31;

/// Configuration for a logging pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Enable JSON console output
    #[serde(default)]
    pub console: bool,
    /// Minimum level written to the console
    #[serde(default)]
    pub level: Level,
    /// Add the rendered message to every JSON record
    #[serde(default)]
    pub render_message: bool,
    /// Single file output
    pub file: Option<FileSinkConfig>,
    /// Rolling file output
    pub rolling_file: Option<RollingFileConfig>,
    /// Output of the sinks' own diagnostics
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl LogConfig {
    /// Create a new LogConfig with defaults
    pub fn new() -> Self {
        Self {
            console: false,
            level: Level::default(),
            render_message: false,
            file: None,
            rolling_file: None,
            diagnostics: DiagnosticsConfig::default(),
        }
    }

    /// Enable console output
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Set the console minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Add rendered messages to JSON records
    pub fn with_render_message(mut self, render_message: bool) -> Self {
        self.render_message = render_message;
        self
    }

    /// Set single file output
    pub fn with_file(mut self, file: FileSinkConfig) -> Self {
        self.file = Some(file);
        self
    }

    /// Set rolling file output
    pub fn with_rolling_file(mut self, rolling_file: RollingFileConfig) -> Self {
        self.rolling_file = Some(rolling_file);
        self
    }

    /// Set diagnostics output
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Check every configured sink.
    pub fn validate(&self) -> Result<()> {
        if let Some(file) = &self.file {
            file.validate()?;
        }
        if let Some(rolling_file) = &self.rolling_file {
            rolling_file.validate()?;
        }
        Ok(())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_file_size_limit() -> Option<u64> {
    Some(DEFAULT_FILE_SIZE_LIMIT_BYTES)
}

fn default_retained_file_count_limit() -> Option<u32> {
    Some(DEFAULT_RETAINED_FILE_COUNT_LIMIT)
}

fn validate_size_limit(limit: Option<u64>) -> Result<()> {
    if limit == Some(0) {
        return Err(Error::Config(
            "file_size_limit_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Configuration for writing JSON to a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Path to the log file
    pub path: PathBuf,
    /// Events below this level are not written
    #[serde(default)]
    pub restricted_to_minimum_level: Level,
    /// Writing stops once the file reaches this size; `None` for no limit
    #[serde(
        default = "default_file_size_limit",
        deserialize_with = "deserialize_size_limit"
    )]
    pub file_size_limit_bytes: Option<u64>,
    /// Defer flushing instead of flushing after every event
    #[serde(default)]
    pub buffered: bool,
}

impl FileSinkConfig {
    /// Create a new FileSinkConfig
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            restricted_to_minimum_level: Level::default(),
            file_size_limit_bytes: default_file_size_limit(),
            buffered: false,
        }
    }

    /// Set the minimum level
    pub fn with_minimum_level(mut self, level: Level) -> Self {
        self.restricted_to_minimum_level = level;
        self
    }

    /// Set the size limit
    pub fn with_file_size_limit(mut self, limit: Option<u64>) -> Self {
        self.file_size_limit_bytes = limit;
        self
    }

    /// Set buffering
    pub fn with_buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("file path must not be empty".to_string()));
        }
        validate_size_limit(self.file_size_limit_bytes)
    }
}

/// Configuration for writing JSON to a series of dated files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingFileConfig {
    /// Path template with a `{Date}` token, e.g. `logs/app-{Date}.json`
    pub path_format: String,
    /// Events below this level are not written
    #[serde(default)]
    pub restricted_to_minimum_level: Level,
    /// A file rolls to the next sequence number at this size; `None` for no limit
    #[serde(
        default = "default_file_size_limit",
        deserialize_with = "deserialize_size_limit"
    )]
    pub file_size_limit_bytes: Option<u64>,
    /// Files kept including the current one; `None` keeps everything
    #[serde(default = "default_retained_file_count_limit")]
    pub retained_file_count_limit: Option<u32>,
    /// Defer flushing instead of flushing after every event
    #[serde(default)]
    pub buffered: bool,
}

impl RollingFileConfig {
    /// Create a new RollingFileConfig
    pub fn new(path_format: impl Into<String>) -> Self {
        Self {
            path_format: path_format.into(),
            restricted_to_minimum_level: Level::default(),
            file_size_limit_bytes: default_file_size_limit(),
            retained_file_count_limit: default_retained_file_count_limit(),
            buffered: false,
        }
    }

    /// Set the minimum level
    pub fn with_minimum_level(mut self, level: Level) -> Self {
        self.restricted_to_minimum_level = level;
        self
    }

    /// Set the size limit
    pub fn with_file_size_limit(mut self, limit: Option<u64>) -> Self {
        self.file_size_limit_bytes = limit;
        self
    }

    /// Set the retained file count
    pub fn with_retained_file_count_limit(mut self, limit: Option<u32>) -> Self {
        self.retained_file_count_limit = limit;
        self
    }

    /// Set buffering
    pub fn with_buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    pub fn validate(&self) -> Result<()> {
        crate::rotation::PathTemplate::parse(&self.path_format)?;
        validate_size_limit(self.file_size_limit_bytes)?;
        if self.retained_file_count_limit == Some(0) {
            return Err(Error::Config(
                "retained_file_count_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the sinks' own diagnostics go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Level filter, e.g. "warn" or "jsonsink=debug"
    #[serde(default = "default_diagnostics_level")]
    pub level: String,
    /// Output format ("text" or "json")
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            level: default_diagnostics_level(),
            format: default_format(),
        }
    }
}

fn default_diagnostics_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}
