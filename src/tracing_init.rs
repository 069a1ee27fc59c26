use crate::config::DiagnosticsConfig;
use crate::{Error, Result};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber that prints the sinks' own diagnostics to
/// standard error.
///
/// `RUST_LOG` overrides `config.level`; `cli_verbose` raises the level for
/// this crate.
pub fn init_diagnostics(config: &DiagnosticsConfig, cli_verbose: Option<u8>) -> Result<()> {
    let log_spec = effective_log_spec(config, cli_verbose);

    let env_filter = EnvFilter::try_new(&log_spec).map_err(|e| Error::Init(e.to_string()))?;

    let fmt_layer_builder = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.format == "json" {
        fmt_layer_builder.json().boxed()
    } else {
        fmt_layer_builder.boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    Ok(())
}

/// Determine the effective filter, considering `RUST_LOG` and CLI overrides.
fn effective_log_spec(config: &DiagnosticsConfig, cli_verbose: Option<u8>) -> String {
    let rust_log = std::env::var("RUST_LOG").ok();
    log_spec(rust_log.as_deref(), &config.level, cli_verbose)
}

fn log_spec(rust_log: Option<&str>, level: &str, cli_verbose: Option<u8>) -> String {
    // RUST_LOG takes precedence over everything
    if let Some(rust_log) = rust_log
        && !rust_log.is_empty()
    {
        return rust_log.to_string();
    }

    let level = if level.is_empty() { "warn" } else { level };

    if let Some(verbose) = cli_verbose {
        return match verbose {
            0 => level.to_string(),
            1 => format!("{},jsonsink=debug", level),
            2 => format!("{},jsonsink=trace", level),
            _ => "trace".to_string(),
        };
    }

    // A full directive list is used as written
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{},jsonsink={}", level, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_config_level() {
        assert_eq!(log_spec(Some("trace"), "info", None), "trace");
        assert_eq!(log_spec(Some("debug"), "info", Some(2)), "debug");
    }

    #[test]
    fn cfg_level_used_when_no_rust_log() {
        assert_eq!(log_spec(None, "warn", None), "warn,jsonsink=warn");
        assert_eq!(log_spec(None, "warn", Some(1)), "warn,jsonsink=debug");
        assert_eq!(log_spec(None, "warn", Some(2)), "warn,jsonsink=trace");
        assert_eq!(log_spec(None, "warn", Some(3)), "trace");
    }

    #[test]
    fn test_log_spec_with_empty_rust_log() {
        assert_eq!(log_spec(Some(""), "error", None), "error,jsonsink=error");
    }

    #[test]
    fn test_log_spec_with_empty_config_level() {
        assert_eq!(log_spec(None, "", None), "warn,jsonsink=warn");
    }

    #[test]
    fn test_log_spec_keeps_directives() {
        assert_eq!(
            log_spec(None, "info,jsonsink::selflog=debug", None),
            "info,jsonsink::selflog=debug"
        );
        assert_eq!(log_spec(None, "jsonsink=debug", None), "jsonsink=debug");
    }

    #[test]
    fn test_log_spec_cli_verbose_zero() {
        assert_eq!(log_spec(None, "info", Some(0)), "info");
    }

    #[test]
    fn test_effective_log_spec_reads_config() {
        let config = DiagnosticsConfig::default();
        let spec = effective_log_spec(&config, None);
        match std::env::var("RUST_LOG") {
            Ok(rust_log) if !rust_log.is_empty() => assert_eq!(spec, rust_log),
            _ => assert_eq!(spec, "warn,jsonsink=warn"),
        }
    }

    #[test]
    fn test_init_rejects_bad_filter() {
        let config = DiagnosticsConfig {
            level: "jsonsink=notalevel".to_string(),
            ..Default::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            let err = init_diagnostics(&config, None).unwrap_err();
            assert!(matches!(err, Error::Init(_)));
        }
    }

    #[test]
    fn init_diagnostics_succeeds_with_defaults() {
        // This may fail if a subscriber is already installed, but should not panic
        let _ = init_diagnostics(&DiagnosticsConfig::default(), None);
    }

    #[test]
    fn test_init_diagnostics_json_format() {
        let config = DiagnosticsConfig {
            format: "json".to_string(),
            ..Default::default()
        };
        let result = init_diagnostics(&config, None);
        assert!(result.is_ok() || matches!(result, Err(Error::Init(_))));
    }
}
