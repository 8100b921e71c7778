//! Logging system configuration and initialization
//!
//! This module provides the logging setup with:
//! - One log file per harvesting session
//! - Configuration file based log level control (overridable with `RUST_LOG`)
//! - Structured JSON logging (optional)
//! - Console and file output support
//! - Startup cleanup of old session logs

use anyhow::{Result, anyhow};
use chrono::Local;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive for the life of the process
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

const LOG_FILE_PREFIX: &str = "bsr_parser_";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Get the log directory configured, or `logs/parser` under the working directory
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(|| {
        std::env::current_dir()
            .unwrap_or_default()
            .join("logs")
            .join("parser")
    })
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Session log file name, e.g. `bsr_parser_20260118_142501.log`
pub fn session_log_file_name() -> String {
    format!("{LOG_FILE_PREFIX}{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    // Browser protocol chatter is only interesting at TRACE
    if !config.level.to_lowercase().contains("trace") {
        for directive in ["chromiumoxide=warn", "tungstenite=warn", "hyper=warn"] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

/// Initialize logging with custom configuration
///
/// # Environment Variable Override
/// ```bash
/// # Show browser protocol traffic
/// RUST_LOG="debug,chromiumoxide=debug" bsr-catalog parse
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(config)?;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut log_file = None;

    if config.file_output {
        let log_dir = get_log_directory(config);
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        if config.auto_cleanup_logs {
            cleanup_old_logs(&log_dir, config.max_files)?;
        }

        let file_name = session_log_file_name();
        let (file_writer, guard) = non_blocking(rolling::never(&log_dir, &file_name));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard holder poisoned"))?
            .push(guard);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
            .with_ansi(false);
        layers.push(if config.json_format {
            file_layer
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            file_layer.with_target(false).boxed()
        });
        log_file = Some(log_dir.join(file_name));
    }

    if config.console_output {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_target(false)
                .boxed(),
        );
    }

    Registry::default()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("=== Logging system initialized ===");
    info!("Log level: {}", config.level);
    if let Some(path) = log_file {
        info!("Session log file: {:?}", path);
    }

    Ok(())
}

/// Remove the oldest session logs so that at most `max_files - 1` remain
/// before the new session adds its own file.
pub fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let path = entry?.path();
        let is_session_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"));
        if is_session_log {
            log_files.push(path);
        }
    }

    // Timestamped names sort chronologically; newest first
    log_files.sort();
    log_files.reverse();

    let keep = (max_files as usize).saturating_sub(1);
    let mut removed = 0;
    for path in log_files.iter().skip(keep) {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.level.is_empty());
        assert!(config.console_output);
        assert!(config.file_output);
    }

    #[test]
    fn test_log_directory_defaults_under_logs_parser() {
        let log_dir = get_log_directory(&LoggingConfig::default());
        assert!(log_dir.ends_with("logs/parser"));
    }

    #[test]
    fn test_session_log_file_name_shape() {
        let name = session_log_file_name();
        assert!(name.starts_with(LOG_FILE_PREFIX));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), LOG_FILE_PREFIX.len() + "20260101_000000.log".len());
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for stamp in ["20250101_000000", "20250102_000000", "20250103_000000"] {
            std::fs::write(dir.path().join(format!("{LOG_FILE_PREFIX}{stamp}.log")), "").unwrap();
        }
        std::fs::write(dir.path().join("unrelated.log"), "").unwrap();

        let removed = cleanup_old_logs(dir.path(), 2).unwrap();

        assert_eq!(removed, 2);
        assert!(dir.path().join(format!("{LOG_FILE_PREFIX}20250103_000000.log")).exists());
        assert!(dir.path().join("unrelated.log").exists());
    }
}
