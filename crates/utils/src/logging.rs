//! provides logging helpers

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::InitError;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

pub const LOG_PATH_ENV_VAR: &str = "ROTATOR_LOG_PATH";

const DEFAULT_LOG_FILE: &str = "rotator.log";

fn env_filter() -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Builds the daily rolling appender behind `--log-path`.
///
/// The file name of `log_path` becomes the prefix of the dated files. A path
/// with no file name component falls back to `rotator.log` inside it.
pub fn rolling_appender(log_path: &Path) -> Result<RollingFileAppender, InitError> {
    let (dir, prefix) = match log_path.file_name() {
        Some(file) => (
            log_path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new(".")),
            file.to_string_lossy().into_owned(),
        ),
        None => (log_path, DEFAULT_LOG_FILE.to_string()),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(3)
        .build(dir)
}

/// initiate the global tracing subscriber
///
/// Logs go to stderr unless `log_path` is set, in which case they are written
/// through a non-blocking daily rolling file. The returned guard must be held
/// for as long as file logging is needed.
pub fn init(log_path: Option<&Path>) -> Result<Option<WorkerGuard>, InitError> {
    match log_path {
        Some(path) => {
            let (file_writer, guard) = tracing_appender::non_blocking(rolling_appender(path)?);
            let fmt_layer = layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter());
            registry().with(fmt_layer).init();
            Ok(Some(guard))
        }
        None => {
            let fmt_layer = layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(env_filter());
            registry().with(fmt_layer).init();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn rolling_appender_accepts_file_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("controller.log");

        assert!(rolling_appender(&path).is_ok());
    }

    #[test]
    fn rolling_appender_accepts_directory_path() {
        let dir = tempfile::tempdir().expect("tempdir");

        assert!(rolling_appender(dir.path()).is_ok());
    }
}
