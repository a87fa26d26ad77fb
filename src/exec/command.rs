// src/exec/command.rs

//! Turning a [`CommandSpec`] into a `tokio::process::Command`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::CommandSpec;

/// Package-manager wrappers that are batch scripts on Windows.
const WINDOWS_WRAPPERS: [&str; 2] = ["npm", "npx"];

/// Apply the Windows `.cmd` shim for the current platform.
pub fn resolve_executable(executable: &str) -> String {
    resolve_executable_for(executable, cfg!(windows))
}

/// On Windows, `npm`/`npx` and names without an extension get `.cmd`
/// appended. Everything else, and every name on other platforms, is returned
/// unchanged.
pub fn resolve_executable_for(executable: &str, windows: bool) -> String {
    if windows
        && (WINDOWS_WRAPPERS.contains(&executable)
            || Path::new(executable).extension().is_none())
    {
        return format!("{executable}.cmd");
    }
    executable.to_string()
}

/// Overlay `overlay` onto `base`. Overlay entries win.
pub fn merge_env<I>(base: I, overlay: &BTreeMap<String, String>) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut merged: BTreeMap<OsString, OsString> = base.into_iter().collect();
    for (key, value) in overlay {
        merged.insert(OsString::from(key), OsString::from(value));
    }
    merged
}

/// Human-readable command line, as it will be executed.
pub fn describe_command(spec: &CommandSpec) -> String {
    std::iter::once(resolve_executable(&spec.command))
        .chain(spec.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the process for `spec` in `cwd` with inherited stdio and the merged
/// environment.
///
/// With `shell = true` the command line is handed to `sh -c` (or `cmd /C` on
/// Windows) as a single string.
pub fn build_command(spec: &CommandSpec, cwd: &Path) -> Command {
    let mut cmd = if spec.shell {
        let line = describe_command(spec);
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            c
        }
    } else {
        let mut c = Command::new(resolve_executable(&spec.command));
        c.args(&spec.args);
        c
    };

    cmd.current_dir(cwd)
        .env_clear()
        .envs(merge_env(std::env::vars_os(), &spec.env))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    cmd
}
