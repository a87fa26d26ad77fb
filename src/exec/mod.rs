// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the build and run
//! commands, using `tokio::process::Command`.
//!
//! - [`command`] builds the OS command: executable shim, shell mode, merged
//!   environment, inherited stdio.
//! - [`oneshot`] runs a command to completion (the build step).
//! - [`runner`] tracks a long-running process (the application) and knows how
//!   to stop it gracefully or restart it.
//! - [`backend`] provides the `ProcessBackend` / `RunHandle` traits and a
//!   concrete `TokioProcessBackend` that the orchestrator uses in production,
//!   and which tests can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod oneshot;
pub mod runner;

pub use backend::{BoxFuture, ProcessBackend, RunHandle, TokioProcessBackend};
pub use command::{build_command, describe_command, merge_env, resolve_executable, resolve_executable_for};
pub use oneshot::{execute_command, SpawnResult};
pub use runner::{ProcessRunner, StopSignal, GRACE_PERIOD};
