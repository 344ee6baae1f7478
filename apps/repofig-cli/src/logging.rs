//! Logging setup for the CLI.
//!
//! Logs always go to stderr. When the project config sets
//! `[logging] file = true`, a JSON copy is also written to
//! `.repofig/logs/<unix-seconds>.log` and files older than
//! `retention_days` are pruned on startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` (the `-v` count) picks
/// the level. The returned guard flushes the file layer on drop and must
/// be held until the program exits.
///
/// # Errors
///
/// Returns an error if the log directory or file cannot be created.
pub fn init_tracing(
    repo_path: &Path,
    verbosity: u8,
    file: bool,
) -> Result<Option<WorkerGuard>> {
    if !file {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter(verbosity))
            .init();
        return Ok(None);
    }

    let (writer, guard) = open_log_writer(repo_path)?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter(verbosity)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(filter(verbosity)),
        )
        .init();
    Ok(Some(guard))
}

fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(verbosity)))
}

fn level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn logs_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(".repofig").join("logs")
}

fn open_log_writer(repo_path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let dir = logs_dir(repo_path);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let path = dir.join(format!("{secs}.log"));
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    Ok(tracing_appender::non_blocking(file))
}

/// Remove `.log` files older than `retention_days` from `.repofig/logs/`.
///
/// Best effort. Runs before tracing is installed, so problems are
/// reported with `eprintln!`.
pub fn cleanup_old_logs(repo_path: &Path, retention_days: u64) {
    let dir = logs_dir(repo_path);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let cutoff =
        SystemTime::now() - Duration::from_secs(retention_days.saturating_mul(SECONDS_PER_DAY));

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("warning: failed to read metadata for {}: {e}", path.display());
                continue;
            }
        };
        if modified < cutoff
            && let Err(e) = fs::remove_file(&path)
        {
            eprintln!("warning: failed to remove old log file {}: {e}", path.display());
        }
    }
}
