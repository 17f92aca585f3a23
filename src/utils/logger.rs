use crate::utils::error::{QualityError, Result};
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("nyc311_quality={},warn", level))
}

/// `RUST_LOG` wins over the configured level when set.
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter(level))
}

fn open_log_file(path: Option<&str>) -> Result<Option<Mutex<File>>> {
    path.map(|p| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(p)
            .map(Mutex::new)
            .map_err(QualityError::from)
    })
    .transpose()
}

fn init_error(e: impl std::fmt::Display) -> QualityError {
    QualityError::config(format!("Failed to initialize logging: {}", e))
}

/// Compact console logging, plus a plain-text copy in `log_file` when given.
pub fn init_cli_logger(level: &str, log_file: Option<&str>) -> Result<()> {
    let filter = default_filter(level);

    let file_layer = open_log_file(log_file)?.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .map_err(init_error)
}

/// JSON console logging for runs whose output is collected by a log shipper.
pub fn init_json_logger(level: &str, log_file: Option<&str>) -> Result<()> {
    let filter = default_filter(level);

    let file_layer = open_log_file(log_file)?.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .json()
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .with(file_layer)
        .try_init()
        .map_err(init_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so only
    // the file handling is exercised here.

    #[test]
    fn test_open_log_file_creates_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("data_quality.log");

        let writer = open_log_file(path.to_str()).unwrap();

        assert!(writer.is_some());
        assert!(path.exists());
    }

    #[test]
    fn test_crate_filter_uses_configured_level() {
        let directives = crate_filter("warn").to_string();
        assert!(directives.contains("nyc311_quality=warn"));
        assert!(!directives.contains("nyc311_quality=info"));
    }

    #[test]
    fn test_no_log_file() {
        assert!(open_log_file(None).unwrap().is_none());
    }

    #[test]
    fn test_unwritable_log_file_is_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("missing-dir").join("x.log");
        assert!(open_log_file(path.to_str()).is_err());
    }
}
