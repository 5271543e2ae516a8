//! File logging for ragdesk
//!
//! Stdout belongs to the typewriter and the watch spinner, so every log line
//! goes to `$XDG_STATE_HOME/ragdesk/ragdesk.log.<date>`.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose debug output drowns out polling and reveal events
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Install the file subscriber.
///
/// `RUST_LOG` wins over `[logging] level`. Files rotate daily and at most
/// `max_files` are kept. Hold the returned guard until exit so buffered
/// lines get flushed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ragdesk.log")
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("failed to create log file: {}", e)))?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Filter for the configured level with HTTP plumbing capped at `warn`.
fn level_filter(level: &str) -> Result<EnvFilter> {
    let mut directives = level.trim().to_string();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{}=warn", target));
    }
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("invalid logging.level {:?}: {}", level, e)))
}

/// Route logs to the test harness; `RUST_LOG` picks the level.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flushes pending log lines when dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}
