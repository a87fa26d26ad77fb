// src/engine/mod.rs

//! Orchestration engine for devrunner.
//!
//! This module ties together:
//! - the debounce timer (a burst of changes collapses into one rebuild)
//! - the coalescing slot (what happens when changes arrive while a rebuild
//!   is in flight)
//! - the rebuild procedure (build, then replace the run process)
//! - the event loop that reacts to:
//!   - file changes reported by the watcher
//!   - debounce timer expiries
//!   - stop requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;

use tokio::sync::oneshot;

use crate::watch::WatchEvent;

/// Lifecycle of the orchestrator as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Building,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Idle => "idle",
            RunnerState::Building => "building",
            RunnerState::Running => "running",
            RunnerState::Stopping => "stopping",
            RunnerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How one rebuild cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Build passed (or there was none) and a fresh run process is up.
    Restarted,
    /// The build exited non-zero or could not be spawned. The run process
    /// was left untouched.
    BuildFailed { code: Option<i32> },
    /// The old run process was stopped but the new one failed to spawn.
    RunSpawnFailed,
    /// A stop arrived during the build; the restart step was skipped.
    Abandoned,
}

/// Events flowing into the orchestrator from the watcher, timers and
/// control handles.
#[derive(Debug)]
pub enum RunnerEvent {
    FileChanged(WatchEvent),
    /// The debounce timer armed as `generation` expired.
    TimerFired { generation: u64, reason: String },
    /// Stop requested; the sender is completed once stopped.
    StopRequested(oneshot::Sender<()>),
}

pub mod core;
pub mod rebuild;
pub mod runtime;
pub mod timer;

pub use self::core::{CoreCommand, RebuildCore};
pub use rebuild::{restart_run_process, run_build, BuildStep};
pub use runtime::{Orchestrator, OrchestratorHandle};
pub use timer::{TimerCallback, TimerHandle, TimerScheduler, TokioTimers};
