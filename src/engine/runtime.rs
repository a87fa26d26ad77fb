// src/engine/runtime.rs

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::errors::Result;
use crate::exec::{BoxFuture, ProcessBackend, RunHandle, StopSignal};
use crate::logging::Logger;
use crate::watch::path_utils::relative_display;
use crate::watch::{ChangeCallback, DirectoryWatcher, WatchEvent, WatchEventKind, WatcherOptions};

use super::core::{CoreCommand, RebuildCore};
use super::rebuild::{restart_run_process, run_build, BuildStep};
use super::timer::{TimerHandle, TimerScheduler, TokioTimers};
use super::{RebuildOutcome, RunnerEvent, RunnerState};

/// Completion of one step of the in-flight rebuild.
enum PhaseDone {
    Built {
        reason: String,
        step: BuildStep,
    },
    Restarted {
        reason: String,
        handle: Option<Box<dyn RunHandle>>,
        outcome: RebuildOutcome,
    },
}

/// Drives the rebuild state machine in response to [`RunnerEvent`]s, and
/// delegates process work to a [`ProcessBackend`].
///
/// This is the IO shell around [`RebuildCore`], which holds the ordering
/// and coalescing rules. The shell owns the watcher, the run-process handle
/// and the armed debounce timer, and polls at most one rebuild step at a
/// time next to its event channel.
pub struct Orchestrator<B: ProcessBackend + 'static> {
    config: Arc<ResolvedConfig>,
    backend: Arc<B>,
    logger: Arc<dyn Logger>,
    timers: Arc<dyn TimerScheduler>,
    core: RebuildCore,
    watcher: Option<DirectoryWatcher>,
    run_handle: Option<Box<dyn RunHandle>>,
    timer: Option<TimerHandle>,
    in_flight: Option<BoxFuture<'static, PhaseDone>>,
    events_tx: mpsc::UnboundedSender<RunnerEvent>,
    events_rx: mpsc::UnboundedReceiver<RunnerEvent>,
    stop_waiters: Vec<oneshot::Sender<()>>,
}

impl<B: ProcessBackend + 'static> fmt::Debug for Orchestrator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("core", &self.core)
            .field("run_pid", &self.run_process_id())
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend + 'static> Orchestrator<B> {
    pub fn new(config: Arc<ResolvedConfig>, backend: B, logger: Arc<dyn Logger>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let core = RebuildCore::new(config.debounce);
        Self {
            config,
            backend: Arc::new(backend),
            logger,
            timers: Arc::new(TokioTimers),
            core,
            watcher: None,
            run_handle: None,
            timer: None,
            in_flight: None,
            events_tx,
            events_rx,
            stop_waiters: Vec::new(),
        }
    }

    pub fn with_timers(mut self, timers: Arc<dyn TimerScheduler>) -> Self {
        self.timers = timers;
        self
    }

    /// Use `watcher` instead of creating a `notify`-backed one in
    /// [`Orchestrator::start`]. Wire it to [`OrchestratorHandle::change_callback`].
    pub fn with_watcher(mut self, watcher: DirectoryWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            events_tx: self.events_tx.clone(),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn state(&self) -> RunnerState {
        self.core.state()
    }

    pub fn is_rebuilding(&self) -> bool {
        self.core.is_rebuilding()
    }

    /// True iff a run process is tracked and still alive.
    pub fn is_running(&self) -> bool {
        self.run_handle.as_ref().is_some_and(|h| h.is_running())
    }

    pub fn run_process_id(&self) -> Option<u32> {
        self.run_handle.as_ref().and_then(|h| h.id())
    }

    /// Start the watcher and perform the initial rebuild cycle.
    ///
    /// Returns once that cycle (and anything chained onto it) has finished.
    /// Fails only if the watcher could not be created.
    pub async fn start(&mut self) -> Result<()> {
        if self.core.is_stopping() {
            return Ok(());
        }

        self.logger.info("Starting development runner");

        if self.watcher.is_none() {
            let options = WatcherOptions {
                project_root: self.config.project_root.clone(),
                watch_dirs: self.config.watch_dirs.clone(),
                ignore: self.config.ignore.clone(),
            };
            let watcher = DirectoryWatcher::new(
                options,
                self.handle().change_callback(),
                Arc::clone(&self.logger),
            )?;
            self.watcher = Some(watcher);
        }
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.start();
        }

        self.trigger_rebuild("initial startup").await;
        self.drive_in_flight().await;
        Ok(())
    }

    /// Log a detected change and schedule a debounced rebuild for it.
    pub async fn handle_file_change(&mut self, path: &Path, kind: WatchEventKind) {
        if self.core.is_stopping() {
            return;
        }

        let relative = relative_display(&self.config.project_root, path);
        self.logger.info(&format!("Detected {kind} in {relative}"));
        self.schedule_restart(format!("change in {relative}")).await;
    }

    /// (Re)arm the debounce timer for `reason`.
    pub async fn schedule_restart(&mut self, reason: impl Into<String>) {
        let commands = self.core.schedule_restart(reason);
        self.apply(commands).await;
    }

    /// Start a rebuild now, or record `reason` as pending if one is in
    /// flight. The rebuild itself is driven by [`Orchestrator::run`],
    /// [`Orchestrator::settle`] or [`Orchestrator::stop`].
    pub async fn trigger_rebuild(&mut self, reason: impl Into<String>) {
        let commands = self.core.trigger_rebuild(reason);
        self.apply(commands).await;
    }

    /// Process every event queued so far and finish the in-flight rebuild
    /// chain. Does not wait for timers that have not fired yet.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(event) = self.events_rx.try_recv() {
                self.handle_event(event).await;
            }
            if self.in_flight.is_none() {
                break;
            }
            self.drive_in_flight().await;
        }
    }

    /// Stop watching, let the in-flight rebuild step finish, then terminate
    /// the run process. Idempotent.
    pub async fn stop(&mut self) {
        let commands = self.core.request_stop();
        self.apply(commands).await;
        self.drive_in_flight().await;
    }

    /// Main event loop. Returns once the orchestrator has stopped.
    pub async fn run(mut self) -> Result<()> {
        info!("devrunner orchestrator running");

        while self.core.state() != RunnerState::Stopped {
            tokio::select! {
                done = next_phase(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.on_phase_done(done).await;
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }

        info!("devrunner orchestrator exiting");
        Ok(())
    }

    async fn handle_event(&mut self, event: RunnerEvent) {
        debug!(?event, "orchestrator received event");

        match event {
            RunnerEvent::FileChanged(change) => {
                self.handle_file_change(&change.path, change.kind).await;
            }
            RunnerEvent::TimerFired { generation, reason } => {
                let commands = self.core.timer_fired(generation, reason);
                if !self.core.timer_armed() {
                    // Expired on its own; nothing left to cancel.
                    self.timer = None;
                }
                self.apply(commands).await;
            }
            RunnerEvent::StopRequested(done) => {
                if self.core.state() == RunnerState::Stopped {
                    let _ = done.send(());
                    return;
                }
                self.stop_waiters.push(done);
                let commands = self.core.request_stop();
                self.apply(commands).await;
            }
        }
    }

    async fn apply(&mut self, commands: Vec<CoreCommand>) {
        for command in commands {
            debug!(?command, "applying core command");
            match command {
                CoreCommand::CancelTimer => {
                    if let Some(timer) = self.timer.take() {
                        timer.cancel();
                    }
                }
                CoreCommand::ArmTimer {
                    generation,
                    delay,
                    reason,
                } => {
                    let events_tx = self.events_tx.clone();
                    let timer = self.timers.schedule(
                        delay,
                        Box::new(move || {
                            let _ = events_tx.send(RunnerEvent::TimerFired { generation, reason });
                        }),
                    );
                    self.timer = Some(timer);
                }
                CoreCommand::StartRebuild { reason } => {
                    self.logger.info(&format!("Rebuilding due to {reason}"));
                    self.in_flight = Some(self.build_phase(reason));
                }
                CoreCommand::StopWatcher => {
                    if let Some(watcher) = self.watcher.as_ref() {
                        watcher.stop();
                    }
                }
                CoreCommand::StopRunProcess => self.finish_stop().await,
            }
        }
    }

    async fn drive_in_flight(&mut self) {
        while let Some(phase) = self.in_flight.take() {
            let done = phase.await;
            self.on_phase_done(done).await;
        }
    }

    async fn on_phase_done(&mut self, done: PhaseDone) {
        let commands = match done {
            PhaseDone::Built {
                reason,
                step: BuildStep::Failed { code },
            } => {
                debug!(%reason, ?code, "build failed; keeping current run process");
                self.core
                    .rebuild_finished(&RebuildOutcome::BuildFailed { code })
            }
            PhaseDone::Built {
                reason,
                step: BuildStep::Proceed,
            } => {
                if self.core.is_stopping() {
                    debug!(%reason, "stop requested during build; skipping restart");
                    self.core.rebuild_finished(&RebuildOutcome::Abandoned)
                } else {
                    self.in_flight = Some(self.restart_phase(reason));
                    return;
                }
            }
            PhaseDone::Restarted {
                reason,
                handle,
                outcome,
            } => {
                self.run_handle = handle;
                if outcome == RebuildOutcome::Restarted {
                    self.logger
                        .info(&format!("Application restarted after {reason}"));
                }
                self.core.rebuild_finished(&outcome)
            }
        };

        self.apply(commands).await;
    }

    fn build_phase(&self, reason: String) -> BoxFuture<'static, PhaseDone> {
        let backend = Arc::clone(&self.backend);
        let config = Arc::clone(&self.config);
        let logger = Arc::clone(&self.logger);

        Box::pin(async move {
            let step = run_build(backend.as_ref(), &config, logger.as_ref()).await;
            PhaseDone::Built { reason, step }
        })
    }

    /// The rebuild step that replaces the run process. The handle moves into
    /// the future and comes back with its result.
    fn restart_phase(&mut self, reason: String) -> BoxFuture<'static, PhaseDone> {
        let backend = Arc::clone(&self.backend);
        let config = Arc::clone(&self.config);
        let logger = Arc::clone(&self.logger);
        let current = self.run_handle.take();

        Box::pin(async move {
            let (handle, outcome) =
                restart_run_process(backend.as_ref(), &config, logger.as_ref(), current).await;
            PhaseDone::Restarted {
                reason,
                handle,
                outcome,
            }
        })
    }

    async fn finish_stop(&mut self) {
        if let Some(mut handle) = self.run_handle.take() {
            self.logger.info("Stopping running process");
            handle.stop(StopSignal::Terminate).await;
        }

        self.core.mark_stopped();
        for waiter in self.stop_waiters.drain(..) {
            let _ = waiter.send(());
        }
        debug!("orchestrator stopped");
    }
}

async fn next_phase(in_flight: &mut Option<BoxFuture<'static, PhaseDone>>) -> PhaseDone {
    match in_flight {
        Some(phase) => phase.await,
        None => std::future::pending().await,
    }
}

/// Cloneable control surface for a running [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    events_tx: mpsc::UnboundedSender<RunnerEvent>,
}

impl OrchestratorHandle {
    /// Report a file change. Returns false if the orchestrator is gone.
    pub fn notify_change(&self, event: WatchEvent) -> bool {
        self.events_tx.send(RunnerEvent::FileChanged(event)).is_ok()
    }

    /// Watcher callback that forwards into this orchestrator.
    pub fn change_callback(&self) -> ChangeCallback {
        let handle = self.clone();
        Arc::new(move |event| {
            handle.notify_change(event);
        })
    }

    /// Request a stop and wait until the run process is gone.
    pub async fn stop(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.events_tx.send(RunnerEvent::StopRequested(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}
