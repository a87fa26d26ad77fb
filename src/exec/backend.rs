// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The orchestrator talks to a `ProcessBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake backend in tests while
//! keeping the production implementation in [`super::oneshot`] and
//! [`super::runner`].
//!
//! - `TokioProcessBackend` is the default implementation used by `devrunner`.
//! - Tests can provide their own `ProcessBackend` that records which commands
//!   were run and scripts their exit codes.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CommandSpec;
use crate::errors::Result;
use crate::logging::Logger;

use super::oneshot::{execute_command, SpawnResult};
use super::runner::{ProcessRunner, StopSignal, GRACE_PERIOD};

/// Boxed `Send` future, as returned by the backend traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A tracked long-running process.
pub trait RunHandle: Send {
    /// Gracefully stop the process; see [`ProcessRunner::stop`].
    fn stop(&mut self, signal: StopSignal) -> BoxFuture<'_, ()>;

    /// Replace the process with a fresh instance of the same command.
    fn restart(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    fn id(&self) -> Option<u32>;
}

/// Trait abstracting how build and run commands are executed.
///
/// Production code uses [`TokioProcessBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessBackend: Send + Sync {
    /// Run `spec` to completion in `cwd`.
    fn run_to_completion<'a>(
        &'a self,
        spec: &'a CommandSpec,
        cwd: &'a Path,
    ) -> BoxFuture<'a, Result<SpawnResult>>;

    /// Spawn `spec` in `cwd` and keep tracking it.
    fn spawn_tracked(&self, spec: &CommandSpec, cwd: &Path) -> Result<Box<dyn RunHandle>>;
}

impl RunHandle for ProcessRunner {
    fn stop(&mut self, signal: StopSignal) -> BoxFuture<'_, ()> {
        Box::pin(ProcessRunner::stop(self, signal))
    }

    fn restart(&mut self) -> Result<()> {
        ProcessRunner::restart(self)
    }

    fn is_running(&self) -> bool {
        ProcessRunner::is_running(self)
    }

    fn id(&self) -> Option<u32> {
        ProcessRunner::id(self)
    }
}

/// Real backend used in production: Tokio child processes.
pub struct TokioProcessBackend {
    logger: Arc<dyn Logger>,
    grace: Duration,
}

impl TokioProcessBackend {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            grace: GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl ProcessBackend for TokioProcessBackend {
    fn run_to_completion<'a>(
        &'a self,
        spec: &'a CommandSpec,
        cwd: &'a Path,
    ) -> BoxFuture<'a, Result<SpawnResult>> {
        Box::pin(execute_command(spec, cwd))
    }

    fn spawn_tracked(&self, spec: &CommandSpec, cwd: &Path) -> Result<Box<dyn RunHandle>> {
        let runner = ProcessRunner::spawn(spec.clone(), cwd, Arc::clone(&self.logger))?
            .with_grace_period(self.grace);
        Ok(Box::new(runner))
    }
}
