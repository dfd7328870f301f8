//! Logging configuration and initialization for feeder.
//!
//! Log output goes to stderr so the report printed on stdout stays clean.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter directives: the configured level first, then any `RUST_LOG`
/// directives, which take precedence where they overlap.
fn filter_directives(level: &str, rust_log: Option<&str>) -> String {
    let base = parse_level(level).to_string().to_lowercase();
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(extra) => format!("{base},{extra}"),
        None => base,
    }
}

fn build_filter(level: &str) -> EnvFilter {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(level, rust_log.as_deref());
    EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring {}: {e}", EnvFilter::DEFAULT_ENV);
        EnvFilter::new(filter_directives(level, None))
    })
}

/// Open `path` for appending, creating it and its directory if needed.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialize the logging system with the given configuration.
///
/// Logs to stderr, and additionally appends to `config.file` when set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file_layer = match &config.file {
        Some(path) if !path.is_empty() => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(open_log_file(Path::new(path))?))
                .with_ansi(false)
                .with_target(true),
        ),
        _ => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .with(build_filter(&config.level))
        .init();

    Ok(())
}

/// Initialize console-only logging.
///
/// Used when the configured log file cannot be opened.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(build_filter(level))
        .init();
}
