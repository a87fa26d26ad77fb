// src/util.rs

//! Small helpers for the simplified startup mode.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

/// How long `--simple` waits for the build output to appear.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval used while waiting.
pub const WAIT_INTERVAL: Duration = Duration::from_millis(200);

/// Poll until `path` exists as a file or directory.
///
/// Returns `false` once `timeout` has elapsed without seeing it.
pub async fn wait_for_path(path: &Path, timeout: Duration, interval: Duration) -> bool {
    let started = Instant::now();

    loop {
        if let Ok(meta) = tokio::fs::metadata(path).await {
            if meta.is_file() || meta.is_dir() {
                return true;
            }
        }

        if started.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Inject `--watch` after a leading `node ` so Node reloads on its own.
/// Any other command is returned unchanged.
pub fn derive_run_watch_command(run_command: &str) -> String {
    match run_command.trim().strip_prefix("node ") {
        Some(rest) => format!("node --watch {}", rest.trim_start()),
        None => run_command.to_string(),
    }
}
