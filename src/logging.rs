//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `WORLDREC_WATCH_LOG` environment variable (an `EnvFilter` directive)
//! 3. default to `info`
//!
//! The supervisor loop starts hidden at logon with nowhere to print, so it
//! logs to a daily file; one-shot commands log to stderr.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "WORLDREC_WATCH_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    /// Append to a dated file in this directory
    DailyFile(PathBuf),
}

/// <data_local_dir>/WorldRec/logs
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir)
        .join("WorldRec")
        .join("logs")
}

/// File name for today's log
pub fn log_file_name(date: chrono::NaiveDate) -> String {
    date.format("worldrec-watch-%Y%m%d.log").to_string()
}

/// Filter directive in priority order: CLI level, a valid env directive, `info`.
pub fn filter_directive(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level.directive().to_string();
    }
    match env.map(str::trim) {
        Some(directive) if !directive.is_empty() && EnvFilter::try_new(directive).is_ok() => {
            directive.to_string()
        }
        _ => "info".to_string(),
    }
}

/// Initialise the global subscriber. Safe to call once at startup.
///
/// Returns the log file path when logging to a file. If the file cannot be
/// opened, logging falls back to stderr.
pub fn init_logging(cli_level: Option<LogLevel>, target: LogTarget) -> Result<Option<PathBuf>> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = EnvFilter::new(filter_directive(cli_level, env.as_deref()));

    let file = match target {
        LogTarget::Stderr => None,
        LogTarget::DailyFile(dir) => match open_log_file(&dir) {
            Ok(opened) => Some(opened),
            Err(e) => {
                eprintln!("Warning: file logging unavailable, using stderr: {e:#}");
                None
            }
        },
    };

    match file {
        Some((path, file)) => {
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;
            tracing::info!(path = %path.display(), "file logging initialized");
            Ok(Some(path))
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;
            Ok(None)
        }
    }
}

/// Create `dir` if needed and open today's log file for appending.
pub fn open_log_file(dir: &Path) -> Result<(PathBuf, fs::File)> {
    fs::create_dir_all(dir).with_context(|| format!("creating log dir {}", dir.display()))?;
    let path = dir.join(log_file_name(chrono::Local::now().date_naive()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    Ok((path, file))
}
