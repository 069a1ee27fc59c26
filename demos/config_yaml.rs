//! Example of loading the pipeline configuration from a YAML file and
//! bridging `tracing` events into it.
//!
//! Run with:
//! ```bash
//! cargo run --example config_yaml
//! ```

use jsonsink::{EventLayer, LogConfig, LoggerBuilder, Sink, init_diagnostics};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Read the YAML configuration file
    let config_path = "demos/config.yaml";
    let config_content = fs::read_to_string(config_path)?;

    // Parse the YAML configuration
    let root: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&config_content)?;
    let config: LogConfig = serde_yaml::from_value(root["log"].clone())?;

    init_diagnostics(&config.diagnostics, None)?;
    let logger = Arc::new(LoggerBuilder::from_config(&config)?.build());

    let subscriber = tracing_subscriber::registry().with(EventLayer::new(Arc::clone(&logger)));
    tracing::subscriber::with_default(subscriber, || {
        tracing::trace!("This is a trace message (filtered by every sink)");
        tracing::debug!("This is a debug message");
        tracing::info!("This is an info message");
        tracing::warn!("This is a warning message");
        tracing::error!("This is an error message");

        // Log with structured data
        tracing::info!(user = "alice", action = "login", "User performed an action");

        tracing::warn!(error_code = 404, path = "/api/users", "Resource not found");
    });

    logger.dispose();
    Ok(())
}
