//! Logging setup.
//!
//! Console output goes to stderr so listings on stdout stay clean. When a
//! log directory is configured, a second layer writes `vidq.log.YYYY-MM-DD`
//! files that are kept for [`LOG_RETENTION_DAYS`] days.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "vidq=info";

/// Filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "vidq=debug";

/// Filter used with `--quiet`.
pub const QUIET_LOG_FILTER: &str = "error";

/// Log retention period in days.
pub const LOG_RETENTION_DAYS: i64 = 7;

/// Prefix of rolled log files; the appender adds `.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "vidq.log";

/// Timestamps in the local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// How to set up logging.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    pub verbose: bool,
    pub quiet: bool,
    /// Also write daily log files here.
    pub log_dir: Option<PathBuf>,
}

impl LoggingOptions {
    /// Filter directive for these options.
    ///
    /// `--quiet` and `--verbose` win over `RUST_LOG`, which wins over the default.
    pub fn filter_directive(&self) -> String {
        if self.quiet {
            QUIET_LOG_FILTER.to_string()
        } else if self.verbose {
            VERBOSE_LOG_FILTER.to_string()
        } else {
            std::env::var(EnvFilter::DEFAULT_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
        }
    }
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when file logging is enabled; keep it
/// alive until exit so buffered lines are flushed.
pub fn init_logging(options: &LoggingOptions) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(options.filter_directive())
        .map_err(|e| Error::config(format!("Invalid log filter directive: {}", e)))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_timer(LocalTimer);

    let (file_layer, guard) = match &options.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)
                .map_err(|e| Error::io_path("creating log directory", log_dir, e))?;

            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(guard)
}

/// Delete rolled log files older than `retention_days`. Returns how many were deleted.
pub async fn cleanup_old_logs(log_dir: &Path, retention_days: i64) -> std::io::Result<usize> {
    let cutoff = (Utc::now() - chrono::Duration::days(retention_days)).date_naive();

    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let mut deleted_count = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(date_str) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(LOG_FILE_PREFIX))
            .and_then(|n| n.strip_prefix('.'))
        else {
            continue;
        };

        let Ok(file_date) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };

        if file_date < cutoff {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    deleted_count += 1;
                    debug!(path = %path.display(), "Deleted old log file");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete old log file")
                }
            }
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "Cleaned up old log files");
    }

    Ok(deleted_count)
}
