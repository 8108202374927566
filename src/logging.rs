//! Tracing configuration and log routing.
//!
//! Events go to a compact stdout layer and to a single log file written through a non-blocking
//! worker. The file comes from [`crate::config::Config::log_file`], falling back to
//! `logs/pdf-summarizer.log`.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "pdf-summarizer.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` controls filtering (default `info`). When the log file cannot be prepared only the
/// stdout layer is installed. A second call keeps the first subscriber.
pub fn init_tracing(log_file: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact());

    let (directory, file_name) = log_target(log_file);
    let installed = match file_writer(&directory, &file_name) {
        Some(writer) => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .compact(),
            )
            .try_init(),
        None => registry.try_init(),
    };

    if let Err(err) = installed {
        eprintln!("Tracing subscriber already installed: {err}");
    }
}

/// Split the configured log path into the directory to create and the file inside it.
fn log_target(log_file: Option<&Path>) -> (PathBuf, OsString) {
    let Some(path) = log_file else {
        return (PathBuf::from(DEFAULT_LOG_DIR), OsString::from(DEFAULT_LOG_FILE));
    };
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(DEFAULT_LOG_FILE));
    (directory, file_name)
}

fn file_writer(directory: &Path, file_name: &OsString) -> Option<NonBlocking> {
    if let Err(err) = std::fs::create_dir_all(directory) {
        eprintln!("Failed to create log directory {}: {err}", directory.display());
        return None;
    }
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}
