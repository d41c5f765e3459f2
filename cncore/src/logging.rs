//! Tracing setup for the `cn-core` binary.

use cncore_shared::errors::{CncoreError, CncoreResult};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// File name used under `--log-dir`.
pub const LOG_FILE_NAME: &str = "cn-core.log";

/// Install the global subscriber.
///
/// Logs go to standard error, or to `<log_dir>/cn-core.log` when a directory
/// is given, so that standard output only carries health lines and the final
/// success marker. Verbosity follows `RUST_LOG` and defaults to `info`.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_logging(log_dir: Option<&Path>) -> CncoreResult<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard, ansi) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                CncoreError::Config(format!("Failed to create log dir {}: {}", dir.display(), e))
            })?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_NAME)
                .build(dir)
                .map_err(|e| {
                    CncoreError::Config(format!(
                        "Failed to open log file in {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (writer, guard, false)
        }
        None => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            (writer, guard, true)
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init()
        .map_err(|e| CncoreError::Internal(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}
