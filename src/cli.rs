// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{CommandInput, ConfigOverrides};

/// Command-line arguments for `devrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devrunner",
    version,
    about = "Watch a project, rebuild on change and restart the app.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `devrunner.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root; commands run here and change paths are shown relative
    /// to it.
    #[arg(long, value_name = "PATH")]
    pub project_root: Option<PathBuf>,

    /// Directory to watch (repeatable). Replaces the configured list.
    #[arg(long = "watch", value_name = "DIR")]
    pub watch: Vec<String>,

    /// Path segment to ignore (repeatable). Added to the built-in defaults.
    #[arg(long = "ignore", value_name = "SEGMENT")]
    pub ignore: Vec<String>,

    /// Quiet period after the last change before rebuilding.
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Build command line, e.g. "npm run build".
    #[arg(long, value_name = "CMD")]
    pub build: Option<String>,

    /// Run command line, e.g. "node dist/index.js".
    #[arg(long, value_name = "CMD")]
    pub run: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVRUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build once, then run the build tool's watch mode next to the app
    /// (configured by the `[simple]` table).
    #[arg(long)]
    pub simple: bool,

    /// Print the resolved configuration without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Flags that override the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            project_root: self.project_root.clone(),
            watch_dirs: (!self.watch.is_empty()).then(|| self.watch.clone()),
            ignore: (!self.ignore.is_empty()).then(|| self.ignore.clone()),
            debounce_ms: self.debounce_ms,
            build: self.build.clone().map(CommandInput::Line),
            run: self.run.clone().map(CommandInput::Line),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
