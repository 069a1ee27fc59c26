//! Writes a few JSON lines to standard output.
//!
//! Run with:
//! ```bash
//! cargo run --example json_console
//! ```

use jsonsink::{Level, Logger, Sink};
use std::collections::BTreeMap;

fn main() {
    let username = std::env::var("USER").unwrap_or_else(|_| "nobody".to_string());

    let logger = Logger::builder()
        .render_message(true)
        .json_console(Level::Information)
        .build();

    let mut properties = BTreeMap::new();
    properties.insert("Username".to_string(), username.into());
    logger.write(Level::Information, "Hello, world from {Username}!", properties);

    logger.debug("Below the console level, not shown");
    logger.warning("Shutting down");
    logger.dispose();
}
