//! # jsonsink
//!
//! Structured events written as one JSON object per line.
//!
//! ## Features
//!
//! - JSON output to the console, a single file, or a series of dated files
//! - Date and size based rolling with a bounded number of retained files
//! - Per-sink minimum levels, switchable at runtime
//! - Sink failures reported on a side channel instead of to the caller
//! - Integration with the `tracing` ecosystem
//!
//! ## Example
//!
//! ```rust,no_run
//! use jsonsink::{Level, Logger, RollingFileConfig};
//! use std::collections::BTreeMap;
//!
//! let logger = Logger::builder()
//!     .json_console(Level::Information)
//!     .json_rolling_file(
//!         RollingFileConfig::new("logs/app-{Date}.json").with_retained_file_count_limit(Some(7)),
//!     )?
//!     .build();
//!
//! let mut properties = BTreeMap::new();
//! properties.insert("Username".to_string(), "alice".into());
//! logger.write(Level::Information, "Hello, world from {Username}!", properties);
//! # Ok::<(), jsonsink::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod event;
pub mod file;
pub mod format;
pub mod layer;
pub mod logger;
pub mod retention;
pub mod rolling;
pub mod rotation;
pub mod selflog;
pub mod sink;
pub mod tracing_init;
pub mod writer;

pub use builder::LoggerBuilder;
pub use config::{
    DEFAULT_FILE_SIZE_LIMIT_BYTES, DEFAULT_RETAINED_FILE_COUNT_LIMIT, DiagnosticsConfig,
    FileSinkConfig, LogConfig, RollingFileConfig,
};
pub use error::{Error, Result};
pub use event::{Event, Level, LevelSwitch};
pub use file::FileSink;
pub use format::{Formatter, JsonFormatter, render_template};
pub use layer::EventLayer;
pub use logger::Logger;
pub use rolling::{RollingFileSink, RollingState};
pub use rotation::{Decision, FileIdentity, PathTemplate, RollingPolicy, parse_size};
pub use selflog::{SELFLOG_TARGET, SelfLog};
pub use sink::{ConsoleSink, NullSink, Sink};
pub use tracing_init::init_diagnostics;
pub use writer::FileWriter;
