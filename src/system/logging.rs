//! Logging system initialization
//!
//! Sets up the tracing subscriber from the `[logging]` section of the
//! static configuration.

use tracing_appender::rolling;

use crate::config::StaticConfig;
use crate::errors::{Result, StatsError};

/// Initialize logging system based on configuration
///
/// Must be called once during startup, after the configuration is loaded.
///
/// # Returns
/// * `WorkerGuard` - Must be kept alive for the duration of the program
///   to ensure non-blocking log writes are flushed
pub fn init_logging(config: &StaticConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let logging = &config.logging;

    let writer: Box<dyn std::io::Write + Send + Sync> = match logging.file.as_deref() {
        Some(log_file) if !log_file.is_empty() && logging.enable_rotation => {
            // 按天滚动
            let path = std::path::Path::new(log_file);
            let dir = path.parent().unwrap_or(std::path::Path::new("."));
            let filename = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("clickstats.log");
            let appender = rolling::Builder::new()
                .rotation(rolling::Rotation::DAILY)
                .filename_prefix(filename.trim_end_matches(".log"))
                .filename_suffix("log")
                .max_log_files(logging.max_backups as usize)
                .build(dir)
                .map_err(|e| {
                    StatsError::file_operation(format!("cannot create log appender: {}", e))
                })?;
            Box::new(appender)
        }
        Some(log_file) if !log_file.is_empty() => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;
            Box::new(file)
        }
        _ => Box::new(std::io::stdout()),
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .map_err(|e| StatsError::config(format!("invalid log level '{}': {}", logging.level, e)))?;

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(logging.file.as_ref().is_none_or(|f| f.is_empty()));

    let installed = if logging.format == "json" {
        subscriber_builder.json().try_init()
    } else {
        subscriber_builder.try_init()
    };
    installed.map_err(|e| StatsError::config(format!("logging already initialized: {}", e)))?;

    Ok(guard)
}
