// src/exec/runner.rs

//! Tracked long-running process with graceful stop and restart.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::config::CommandSpec;
use crate::errors::{DevRunnerError, Result};
use crate::exec::command::{build_command, describe_command};
use crate::exec::oneshot::SpawnResult;
use crate::logging::Logger;

/// Wait after a graceful signal before the process is killed outright.
pub const GRACE_PERIOD: Duration = Duration::from_millis(2000);

/// Signal used to ask a process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// SIGTERM.
    Terminate,
    /// SIGINT.
    Interrupt,
    /// Immediate forced kill.
    Kill,
}

/// A long-running process plus the means to stop or replace it.
///
/// Each spawned process is owned by a small monitor task that waits for it to
/// exit, publishes the exit on a `watch` channel and logs unexpected exits.
/// Processes being stopped or replaced are detached first, so their exit is
/// not reported as a crash.
pub struct ProcessRunner {
    spec: CommandSpec,
    cwd: PathBuf,
    logger: Arc<dyn Logger>,
    grace: Duration,
    child: Option<TrackedChild>,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("command", &describe_command(&self.spec))
            .field("pid", &self.id())
            .field("running", &self.is_running())
            .finish()
    }
}

struct TrackedChild {
    pid: Option<u32>,
    /// Firing this makes the monitor kill the process. Dropping it does not.
    force_kill: Option<oneshot::Sender<()>>,
    exit_rx: watch::Receiver<Option<SpawnResult>>,
    detached: Arc<AtomicBool>,
}

impl TrackedChild {
    fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }
}

impl ProcessRunner {
    /// Spawn `spec` in `cwd`. Must be called from within a Tokio runtime.
    pub fn spawn(spec: CommandSpec, cwd: &Path, logger: Arc<dyn Logger>) -> Result<Self> {
        let cwd = cwd.to_path_buf();
        let child = spawn_tracked_child(&spec, &cwd, &logger)?;
        Ok(Self {
            spec,
            cwd,
            logger,
            grace: GRACE_PERIOD,
            child: Some(child),
        })
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.pid)
    }

    pub fn is_running(&self) -> bool {
        self.child.as_ref().is_some_and(|c| !c.has_exited())
    }

    /// Send `signal` and wait for the process to exit.
    ///
    /// A forced kill is scheduled at the end of the grace period no matter
    /// what, so this returns within roughly one grace period even if the
    /// process ignores the signal. Returns immediately if nothing is running.
    pub async fn stop(&mut self, signal: StopSignal) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if child.has_exited() {
            return;
        }

        child.detached.store(true, Ordering::SeqCst);

        let delivered = signal != StopSignal::Kill
            && match send_signal(child.pid, signal) {
                Ok(()) => true,
                Err(err) => {
                    debug!(pid = ?child.pid, error = %err, "graceful signal not delivered");
                    false
                }
            };

        if let Some(force_kill) = child.force_kill.take() {
            if delivered {
                let grace = self.grace;
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    // Fails harmlessly if the process already exited.
                    let _ = force_kill.send(());
                });
            } else {
                let _ = force_kill.send(());
            }
        }

        wait_for_exit(&mut child.exit_rx).await;
        debug!(pid = ?child.pid, "tracked process stopped");
    }

    /// Replace the current process with a fresh one from the same spec.
    ///
    /// The previous process is detached and sent SIGTERM without waiting;
    /// errors from an already-dead process are ignored.
    pub fn restart(&mut self) -> Result<()> {
        if let Some(mut previous) = self.child.take() {
            previous.detached.store(true, Ordering::SeqCst);
            if !previous.has_exited() && send_signal(previous.pid, StopSignal::Terminate).is_err() {
                if let Some(force_kill) = previous.force_kill.take() {
                    let _ = force_kill.send(());
                }
            }
        }

        self.child = Some(spawn_tracked_child(&self.spec, &self.cwd, &self.logger)?);
        Ok(())
    }
}

fn spawn_tracked_child(
    spec: &CommandSpec,
    cwd: &Path,
    logger: &Arc<dyn Logger>,
) -> Result<TrackedChild> {
    let description = describe_command(spec);

    let mut cmd = build_command(spec, cwd);
    cmd.kill_on_drop(true);
    let mut child = cmd.spawn().map_err(|source| DevRunnerError::Spawn {
        command: description.clone(),
        source,
    })?;

    let pid = child.id();
    let (force_tx, mut force_rx) = oneshot::channel::<()>();
    let (exit_tx, exit_rx) = watch::channel(None);
    let detached = Arc::new(AtomicBool::new(false));

    let monitor_detached = Arc::clone(&detached);
    let logger = Arc::clone(logger);

    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            forced = &mut force_rx => {
                match forced {
                    Ok(()) => {
                        debug!(pid = ?pid, command = %description, "grace period over; killing process");
                        if let Err(err) = child.start_kill() {
                            debug!(pid = ?pid, error = %err, "kill failed; process probably exited");
                        }
                    }
                    Err(_) => {
                        debug!(pid = ?pid, "process handle released; waiting for natural exit");
                    }
                }
                child.wait().await
            }
        };

        let result = match status {
            Ok(status) => SpawnResult::from_status(status),
            Err(err) => {
                logger.error(&format!("Failed to wait for `{description}`: {err}"));
                SpawnResult::default()
            }
        };

        if !monitor_detached.load(Ordering::SeqCst) {
            if result.success() {
                logger.info("Process exited cleanly with code 0");
            } else {
                logger.warn(&format!("Process exited with code {}", result.describe_code()));
            }
        }

        exit_tx.send_replace(Some(result));
    });

    Ok(TrackedChild {
        pid,
        force_kill: Some(force_tx),
        exit_rx,
        detached,
    })
}

async fn wait_for_exit(exit_rx: &mut watch::Receiver<Option<SpawnResult>>) {
    while exit_rx.borrow_and_update().is_none() {
        if exit_rx.changed().await.is_err() {
            // Monitor gone; nothing left to wait for.
            break;
        }
    }
}

#[cfg(unix)]
fn send_signal(pid: Option<u32>, signal: StopSignal) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = pid.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process has no pid"))?;
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    let signal = match signal {
        StopSignal::Terminate => Signal::SIGTERM,
        StopSignal::Interrupt => Signal::SIGINT,
        StopSignal::Kill => Signal::SIGKILL,
    };

    kill(Pid::from_raw(pid), signal).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send_signal(_pid: Option<u32>, _signal: StopSignal) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful signals are not supported on this platform",
    ))
}
