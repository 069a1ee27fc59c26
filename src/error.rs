use thiserror::Error as ThisError;

/// Errors that can occur while building or running sinks
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
    /// Timestamp formatting or parsing failed.
    #[error("Time error: {0}")]
    Time(#[from] time::error::Error),
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for errors that reflect a programming mistake rather than
    /// a runtime environment failure.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
