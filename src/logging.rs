// src/logging.rs

//! Logging for `devrunner` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `DEVRUNNER_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR; the supervised commands inherit STDOUT.
//!
//! The orchestration core does not call `tracing` directly for the messages
//! a user reads (state transitions, command lines, failures). It goes through
//! the [`Logger`] capability instead, so the sink can be swapped in tests.
//! [`TracingLogger`] is the production implementation.

use std::fmt;

use anyhow::Result;
use tracing_subscriber::fmt as subscriber_fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("DEVRUNNER_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    subscriber_fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

/// Severity accepted by a [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogSeverity::Debug => "debug",
            LogSeverity::Info => "info",
            LogSeverity::Warn => "warn",
            LogSeverity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Side-effecting log sink used by the watcher, process runner and
/// orchestrator.
pub trait Logger: Send + Sync {
    fn log(&self, severity: LogSeverity, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogSeverity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogSeverity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogSeverity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogSeverity::Error, message);
    }
}

/// Forwards every message to the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, severity: LogSeverity, message: &str) {
        match severity {
            LogSeverity::Debug => tracing::debug!(target: "devrunner", "{message}"),
            LogSeverity::Info => tracing::info!(target: "devrunner", "{message}"),
            LogSeverity::Warn => tracing::warn!(target: "devrunner", "{message}"),
            LogSeverity::Error => tracing::error!(target: "devrunner", "{message}"),
        }
    }
}
