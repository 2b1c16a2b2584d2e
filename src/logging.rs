//! Logging initialization for notiflow.
//!
//! With `logging.to_file` set, logs go to `<state>/logs/notiflow-{datetime}.log`;
//! otherwise they go to stderr so command output on stdout stays clean.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Result of logging initialization
pub struct LoggingHandle {
    /// Flushes buffered file output when dropped; keep it alive until exit.
    pub _guard: Option<WorkerGuard>,

    /// Path to the log file when file logging is enabled
    pub log_file_path: Option<PathBuf>,
}

/// Level filter, with `--debug` taking precedence over config
fn effective_level(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

fn log_file_name(now: DateTime<Utc>) -> String {
    format!("notiflow-{}.log", now.format("%Y%m%dT%H%M%SZ"))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over both the configured level and `debug_override`.
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let log_level = effective_level(config, debug_override);
    let filter =
        tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or(log_level));

    if config.logging.to_file {
        let logs_dir = config.logs_path();
        std::fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;

        let log_filename = log_file_name(Utc::now());
        let log_file_path = logs_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .try_init()
            .context("Failed to install log subscriber")?;

        Ok(LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(log_file_path),
        })
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to install log subscriber")?;

        Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        })
    }
}
