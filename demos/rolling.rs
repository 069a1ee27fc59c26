use jsonsink::{DiagnosticsConfig, Level, Logger, RollingFileConfig, Sink, init_diagnostics};
use std::collections::BTreeMap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_diagnostics(&DiagnosticsConfig::default(), Some(1))?;

    let temp_dir = tempfile::tempdir()?;
    let path_format = temp_dir.path().join("app-{Date}.json");

    let rolling = RollingFileConfig::new(path_format.to_string_lossy())
        .with_file_size_limit(Some(1024)) // 1KB per file
        .with_retained_file_count_limit(Some(3));

    let logger = Logger::builder().json_rolling_file(rolling)?.build();

    for i in 0..100 {
        let mut properties = BTreeMap::new();
        properties.insert("Number".to_string(), i.into());
        logger.write(Level::Information, "Log message number {Number}", properties);
    }
    logger.dispose();

    let mut files: Vec<_> = std::fs::read_dir(temp_dir.path())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name())
        .collect();
    files.sort();
    println!("{} files retained: {:?}", files.len(), files);

    Ok(())
}
