// src/exec/oneshot.rs

//! Run a command to completion.

use std::path::Path;
use std::process::ExitStatus;

use tracing::debug;

use crate::config::CommandSpec;
use crate::errors::{DevRunnerError, Result};
use crate::exec::command::{build_command, describe_command};

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpawnResult {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Terminating signal (Unix only).
    pub signal: Option<i32>,
}

impl SpawnResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// `"2"`, `"null (signal: 15)"`, ...
    pub fn describe_code(&self) -> String {
        let code = self
            .code
            .map_or_else(|| "null".to_string(), |c| c.to_string());
        match self.signal {
            Some(signal) => format!("{code} (signal: {signal})"),
            None => code,
        }
    }
}

/// Spawn `spec` in `cwd` with inherited stdio and wait for it to exit.
///
/// Fails with [`DevRunnerError::Spawn`] only if the process could not be
/// started; a non-zero exit is reported through the returned
/// [`SpawnResult`].
pub async fn execute_command(spec: &CommandSpec, cwd: &Path) -> Result<SpawnResult> {
    let description = describe_command(spec);
    debug!(command = %description, cwd = ?cwd, "spawning one-shot command");

    let mut child = build_command(spec, cwd)
        .spawn()
        .map_err(|source| DevRunnerError::Spawn {
            command: description.clone(),
            source,
        })?;

    let status = child.wait().await?;
    let result = SpawnResult::from_status(status);
    debug!(command = %description, code = ?result.code, signal = ?result.signal, "one-shot command exited");
    Ok(result)
}
