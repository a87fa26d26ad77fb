// src/engine/core.rs

//! Pure rebuild state machine.
//!
//! This module contains a synchronous, deterministic core that decides
//! *what* should happen when changes arrive, timers fire, rebuilds finish
//! or a stop is requested. It returns [`CoreCommand`]s describing the work;
//! the async shell ([`crate::engine::Orchestrator`]) performs them.
//!
//! The core is intended to be unit tested without any Tokio, channels,
//! filesystem, or processes.
//!
//! Coalescing is a two-slot state: `active` (a rebuild is in flight) and
//! `pending` (the most recent reason that arrived meanwhile). It is a
//! chaining pattern, not a queue: at most one extra rebuild is ever owed.

use std::time::Duration;

use crate::engine::{RebuildOutcome, RunnerState};

/// Command produced by the core, to be executed by the outer shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Cancel the armed debounce timer.
    CancelTimer,
    /// Arm the debounce timer; on expiry report `generation` back.
    ArmTimer {
        generation: u64,
        delay: Duration,
        reason: String,
    },
    /// Run one rebuild cycle.
    StartRebuild { reason: String },
    StopWatcher,
    /// Gracefully terminate the run process.
    StopRunProcess,
}

#[derive(Debug)]
pub struct RebuildCore {
    debounce: Duration,
    state: RunnerState,
    /// A run process was started by the last successful cycle.
    serving: bool,
    active: bool,
    pending: Option<String>,
    stopping: bool,
    /// Generation of the armed timer, if any.
    timer: Option<u64>,
    next_generation: u64,
}

impl RebuildCore {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: RunnerState::Idle,
            serving: false,
            active: false,
            pending: None,
            stopping: false,
            timer: None,
            next_generation: 0,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn is_rebuilding(&self) -> bool {
        self.active
    }

    pub fn pending_reason(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Debounce: every call re-arms the timer, so only the last call of a
    /// burst survives to trigger a rebuild.
    pub fn schedule_restart(&mut self, reason: impl Into<String>) -> Vec<CoreCommand> {
        if self.stopping {
            return Vec::new();
        }

        let mut commands = Vec::new();
        if self.timer.take().is_some() {
            commands.push(CoreCommand::CancelTimer);
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.timer = Some(generation);
        commands.push(CoreCommand::ArmTimer {
            generation,
            delay: self.debounce,
            reason: reason.into(),
        });
        commands
    }

    /// The timer armed as `generation` expired. Expiries of superseded or
    /// cancelled timers are ignored.
    pub fn timer_fired(&mut self, generation: u64, reason: impl Into<String>) -> Vec<CoreCommand> {
        if self.timer != Some(generation) {
            return Vec::new();
        }
        self.timer = None;
        self.trigger_rebuild(reason)
    }

    /// Start a rebuild, or remember `reason` if one is already in flight.
    pub fn trigger_rebuild(&mut self, reason: impl Into<String>) -> Vec<CoreCommand> {
        if self.stopping {
            return Vec::new();
        }

        let reason = reason.into();
        if self.active {
            // Last writer wins; an older pending reason is dropped.
            self.pending = Some(reason);
            return Vec::new();
        }

        self.active = true;
        self.state = RunnerState::Building;
        vec![CoreCommand::StartRebuild { reason }]
    }

    /// The in-flight rebuild completed. Chains the pending reason, if any.
    pub fn rebuild_finished(&mut self, outcome: &RebuildOutcome) -> Vec<CoreCommand> {
        self.active = false;
        match outcome {
            RebuildOutcome::Restarted => self.serving = true,
            RebuildOutcome::RunSpawnFailed => self.serving = false,
            RebuildOutcome::BuildFailed { .. } | RebuildOutcome::Abandoned => {}
        }

        if self.stopping {
            self.pending = None;
            return vec![CoreCommand::StopRunProcess];
        }

        self.state = if self.serving {
            RunnerState::Running
        } else {
            RunnerState::Idle
        };

        match self.pending.take() {
            Some(next) => self.trigger_rebuild(next),
            None => Vec::new(),
        }
    }

    /// Enter `Stopping`. The run process is stopped right away unless a
    /// rebuild is in flight, in which case [`RebuildCore::rebuild_finished`]
    /// asks for it.
    pub fn request_stop(&mut self) -> Vec<CoreCommand> {
        if self.stopping {
            return Vec::new();
        }

        self.stopping = true;
        self.state = RunnerState::Stopping;
        self.pending = None;

        let mut commands = Vec::new();
        if self.timer.take().is_some() {
            commands.push(CoreCommand::CancelTimer);
        }
        commands.push(CoreCommand::StopWatcher);
        if !self.active {
            commands.push(CoreCommand::StopRunProcess);
        }
        commands
    }

    pub fn mark_stopped(&mut self) {
        self.serving = false;
        self.state = RunnerState::Stopped;
    }
}
