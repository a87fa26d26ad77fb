// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// project_root = "."
/// watch_dirs = ["src", "views"]
/// ignore = ["tmp"]
/// debounce_ms = 150
/// build = "cargo build"
///
/// [run]
/// command = "target/debug/server"
/// args = ["--port", "8080"]
/// env = { RUST_LOG = "debug" }
/// ```
///
/// Every field is optional; [`crate::config::resolve_config`] fills in the
/// defaults and produces a [`ResolvedConfig`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Project root. Relative values are resolved against the current
    /// working directory.
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Directories to watch, relative to the project root.
    #[serde(default)]
    pub watch_dirs: Option<Vec<String>>,

    /// Extra path segments to ignore; always unioned with the built-in set.
    #[serde(default)]
    pub ignore: Option<Vec<String>>,

    #[serde(default)]
    pub debounce_ms: Option<u64>,

    #[serde(default)]
    pub build: Option<CommandInput>,

    #[serde(default)]
    pub run: Option<CommandInput>,

    /// `[simple]` section used by `--simple`.
    #[serde(default)]
    pub simple: SimpleSection,
}

/// A command as written by the user: either a whitespace-separated string
/// or a structured table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CommandInput {
    Line(String),
    Spec(RawCommandSpec),
}

/// `{ command = "...", args = [...], shell = bool, env = {...} }`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawCommandSpec {
    pub command: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub shell: Option<bool>,
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,
}

/// `[simple]` section.
///
/// Commands here are plain strings executed through the platform shell.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimpleSection {
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub run_command: Option<String>,
    #[serde(default)]
    pub wait_for_path: Option<String>,
    #[serde(default)]
    pub watch: Option<bool>,
    #[serde(default)]
    pub build_watch_command: Option<String>,
    #[serde(default)]
    pub run_with_node_watch: Option<bool>,
}

/// Field-by-field overrides (typically from the command line). A `Some`
/// value replaces the corresponding file value entirely.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project_root: Option<PathBuf>,
    pub watch_dirs: Option<Vec<String>>,
    pub ignore: Option<Vec<String>>,
    pub debounce_ms: Option<u64>,
    pub build: Option<CommandInput>,
    pub run: Option<CommandInput>,
}

/// A fully defaulted command, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    pub args: Vec<String>,
    pub shell: bool,
    /// Merged over the inherited environment at spawn time.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            shell: false,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Configuration handed to the orchestrator. Immutable once resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub project_root: PathBuf,
    pub watch_dirs: Vec<PathBuf>,
    pub ignore: Vec<String>,
    pub debounce: Duration,
    pub build: Option<CommandSpec>,
    pub run: CommandSpec,
}

/// Resolved `[simple]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleConfig {
    pub cwd: PathBuf,
    pub build: CommandSpec,
    pub run_line: String,
    pub wait_for_path: PathBuf,
    pub watch: bool,
    pub build_watch: CommandSpec,
    pub run_with_node_watch: bool,
}
