// src/config/resolve.rs

//! Turn a [`RawConfig`] (plus overrides) into a [`ResolvedConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{
    CommandInput, CommandSpec, ConfigOverrides, RawConfig, ResolvedConfig, SimpleConfig,
};
use crate::errors::{DevRunnerError, Result};
use crate::watch::path_utils::normalize_lexically;

/// Segments ignored even when the user supplies their own list.
pub const DEFAULT_IGNORE: [&str; 4] = ["node_modules", "dist", "coverage", ".git"];
pub const DEFAULT_WATCH_DIRS: [&str; 1] = ["src"];
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// `node dist/index.js`.
pub fn default_run_command() -> CommandSpec {
    CommandSpec::new("node").arg("dist/index.js")
}

/// Merge `overrides` over `raw` and apply defaults.
///
/// Relative `project_root` values resolve against `cwd`; watch directories
/// resolve against the project root.
pub fn resolve_config(
    raw: &RawConfig,
    overrides: &ConfigOverrides,
    cwd: &Path,
) -> Result<ResolvedConfig> {
    let project_root = overrides
        .project_root
        .as_deref()
        .or(raw.project_root.as_deref())
        .map(|p| absolutize(cwd, p))
        .unwrap_or_else(|| normalize_lexically(cwd));

    let watch_dirs = normalize_watch_dirs(
        overrides.watch_dirs.as_deref().or(raw.watch_dirs.as_deref()),
        &project_root,
    );
    let ignore = normalize_ignore(overrides.ignore.as_deref().or(raw.ignore.as_deref()));
    let debounce_ms = overrides
        .debounce_ms
        .or(raw.debounce_ms)
        .unwrap_or(DEFAULT_DEBOUNCE_MS);

    let build = overrides
        .build
        .as_ref()
        .or(raw.build.as_ref())
        .map(normalize_command)
        .transpose()?;
    let run = match overrides.run.as_ref().or(raw.run.as_ref()) {
        Some(input) => normalize_command(input)?,
        None => default_run_command(),
    };

    Ok(ResolvedConfig {
        project_root,
        watch_dirs,
        ignore,
        debounce: Duration::from_millis(debounce_ms),
        build,
        run,
    })
}

/// Resolve the `[simple]` section against `cwd`.
pub fn resolve_simple_config(raw: &RawConfig, cwd: &Path) -> Result<SimpleConfig> {
    let s = &raw.simple;
    let cwd = s
        .cwd
        .as_deref()
        .map(|p| absolutize(cwd, p))
        .unwrap_or_else(|| normalize_lexically(cwd));

    let build_line = s.build_command.as_deref().unwrap_or("npm run build");
    let build_watch_line = s
        .build_watch_command
        .as_deref()
        .unwrap_or("npm run build -- --watch");
    let run_line = s.run_command.as_deref().unwrap_or("node dist/server.js");
    // Validated here so `--simple` fails before anything is spawned.
    parse_command_string(run_line)?;

    let wait_for_path = absolutize(&cwd, Path::new(s.wait_for_path.as_deref().unwrap_or("dist/server.js")));

    Ok(SimpleConfig {
        build: parse_command_string(build_line)?.shell(true),
        run_line: run_line.trim().to_string(),
        wait_for_path,
        watch: s.watch.unwrap_or(true),
        build_watch: parse_command_string(build_watch_line)?.shell(true),
        run_with_node_watch: s.run_with_node_watch.unwrap_or(true),
        cwd,
    })
}

/// Split a command line on whitespace: first token is the executable, the
/// rest are arguments taken verbatim. No quoting or globbing.
pub fn parse_command_string(value: &str) -> Result<CommandSpec> {
    let mut parts = value.split_whitespace();
    let command = parts.next().ok_or_else(|| {
        DevRunnerError::ConfigError("command string cannot be empty".to_string())
    })?;
    Ok(CommandSpec::new(command).args(parts))
}

fn normalize_command(input: &CommandInput) -> Result<CommandSpec> {
    match input {
        CommandInput::Line(line) => parse_command_string(line),
        CommandInput::Spec(spec) => {
            if spec.command.trim().is_empty() {
                return Err(DevRunnerError::ConfigError(
                    "`command` cannot be empty".to_string(),
                ));
            }
            Ok(CommandSpec {
                command: spec.command.clone(),
                args: spec.args.clone().unwrap_or_default(),
                shell: spec.shell.unwrap_or(false),
                env: spec.env.clone().unwrap_or_default(),
            })
        }
    }
}

fn normalize_ignore(ignore: Option<&[String]>) -> Vec<String> {
    let mut out: Vec<String> = DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect();
    for entry in ignore.unwrap_or_default() {
        if !out.contains(entry) {
            out.push(entry.clone());
        }
    }
    out
}

fn normalize_watch_dirs(dirs: Option<&[String]>, project_root: &Path) -> Vec<PathBuf> {
    let defaults: Vec<String> = DEFAULT_WATCH_DIRS.iter().map(|s| s.to_string()).collect();
    let dirs = match dirs {
        Some(d) if !d.is_empty() => d,
        _ => defaults.as_slice(),
    };

    let mut out: Vec<PathBuf> = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let abs = absolutize(project_root, Path::new(dir));
        if !out.contains(&abs) {
            out.push(abs);
        }
    }
    out
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    normalize_lexically(&base.join(path))
}
