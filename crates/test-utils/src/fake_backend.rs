use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use devrunner::config::CommandSpec;
use devrunner::errors::{DevRunnerError, Result};
use devrunner::exec::{
    describe_command, BoxFuture, ProcessBackend, RunHandle, SpawnResult, StopSignal,
};

/// Scripted result of one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedBuild {
    Exit(i32),
    Signal(i32),
    SpawnError,
}

/// Everything the backend was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Build { command: String },
    Spawn { command: String, pid: u32 },
    SpawnFailed { command: String },
    Stop { pid: u32, signal: StopSignal },
    Restart { pid: u32 },
}

/// A process backend that never spawns anything.
///
/// - builds succeed unless scripted otherwise
/// - builds can be held at a gate until the test releases them
/// - tracked processes are fake handles whose liveness the test can inspect
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Mutex<Vec<BackendCall>>,
    builds: Mutex<VecDeque<ScriptedBuild>>,
    spawn_failures: AtomicUsize,
    gate: Mutex<Option<Arc<Semaphore>>>,
    active_builds: AtomicUsize,
    max_active_builds: AtomicUsize,
    next_pid: AtomicUsize,
    processes: Mutex<Vec<Arc<Mutex<FakeProcess>>>>,
}

#[derive(Debug)]
struct FakeProcess {
    pid: u32,
    alive: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds wait for [`FakeBackend::release_builds`] before finishing.
    pub fn gated() -> Self {
        let backend = Self::default();
        *backend.state.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
        backend
    }

    pub fn release_builds(&self, n: usize) {
        if let Some(gate) = self.state.gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Queue results for upcoming builds; unscripted builds exit 0.
    pub fn script_builds(&self, builds: impl IntoIterator<Item = ScriptedBuild>) {
        self.state.builds.lock().unwrap().extend(builds);
    }

    /// Make the next `n` tracked spawns fail.
    pub fn fail_next_spawns(&self, n: usize) {
        self.state.spawn_failures.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn build_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Build { .. }))
            .count()
    }

    pub fn spawn_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Spawn { .. }))
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Stop { .. }))
            .count()
    }

    /// Builds currently past the gate and not yet finished.
    pub fn active_builds(&self) -> usize {
        self.state.active_builds.load(Ordering::SeqCst)
    }

    /// Highest number of builds ever running at once.
    pub fn max_concurrent_builds(&self) -> usize {
        self.state.max_active_builds.load(Ordering::SeqCst)
    }

    /// Pids of fake processes that have not been stopped.
    pub fn alive_pids(&self) -> Vec<u32> {
        self.state
            .processes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| {
                let p = p.lock().unwrap();
                p.alive.then_some(p.pid)
            })
            .collect()
    }

    /// Simulate `pid` exiting on its own.
    pub fn exit_process(&self, pid: u32) {
        for process in self.state.processes.lock().unwrap().iter() {
            let mut process = process.lock().unwrap();
            if process.pid == pid {
                process.alive = false;
            }
        }
    }

    fn record(&self, call: BackendCall) {
        self.state.calls.lock().unwrap().push(call);
    }

    fn new_process(&self) -> Arc<Mutex<FakeProcess>> {
        let pid = 1000 + self.state.next_pid.fetch_add(1, Ordering::SeqCst) as u32;
        let process = Arc::new(Mutex::new(FakeProcess { pid, alive: true }));
        self.state
            .processes
            .lock()
            .unwrap()
            .push(Arc::clone(&process));
        process
    }
}

impl ProcessBackend for FakeBackend {
    fn run_to_completion<'a>(
        &'a self,
        spec: &'a CommandSpec,
        _cwd: &'a Path,
    ) -> BoxFuture<'a, Result<SpawnResult>> {
        Box::pin(async move {
            let command = describe_command(spec);
            self.record(BackendCall::Build {
                command: command.clone(),
            });

            let gate = self.state.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.acquire().await.expect("gate closed").forget();
            }

            let active = self.state.active_builds.fetch_add(1, Ordering::SeqCst) + 1;
            self.state
                .max_active_builds
                .fetch_max(active, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.state.active_builds.fetch_sub(1, Ordering::SeqCst);

            let scripted = self.state.builds.lock().unwrap().pop_front();
            match scripted.unwrap_or(ScriptedBuild::Exit(0)) {
                ScriptedBuild::Exit(code) => Ok(SpawnResult {
                    code: Some(code),
                    signal: None,
                }),
                ScriptedBuild::Signal(signal) => Ok(SpawnResult {
                    code: None,
                    signal: Some(signal),
                }),
                ScriptedBuild::SpawnError => Err(DevRunnerError::Spawn {
                    command,
                    source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
                }),
            }
        })
    }

    fn spawn_tracked(&self, spec: &CommandSpec, _cwd: &Path) -> Result<Box<dyn RunHandle>> {
        let command = describe_command(spec);

        let remaining = self.state.spawn_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state
                .spawn_failures
                .store(remaining - 1, Ordering::SeqCst);
            self.record(BackendCall::SpawnFailed {
                command: command.clone(),
            });
            return Err(DevRunnerError::Spawn {
                command,
                source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }

        let process = self.new_process();
        let pid = process.lock().unwrap().pid;
        self.record(BackendCall::Spawn { command, pid });

        Ok(Box::new(FakeRunHandle {
            backend: self.clone(),
            process: Some(process),
        }))
    }
}

/// Handle to a fake tracked process.
#[derive(Debug)]
pub struct FakeRunHandle {
    backend: FakeBackend,
    process: Option<Arc<Mutex<FakeProcess>>>,
}

impl RunHandle for FakeRunHandle {
    fn stop(&mut self, signal: StopSignal) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Some(process) = self.process.take() else {
                return;
            };
            let pid = {
                let mut process = process.lock().unwrap();
                if !process.alive {
                    return;
                }
                process.alive = false;
                process.pid
            };
            self.backend.record(BackendCall::Stop { pid, signal });
            tokio::task::yield_now().await;
        })
    }

    fn restart(&mut self) -> Result<()> {
        if let Some(previous) = self.process.take() {
            let mut previous = previous.lock().unwrap();
            previous.alive = false;
            self.backend.record(BackendCall::Restart { pid: previous.pid });
        }
        self.process = Some(self.backend.new_process());
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.process
            .as_ref()
            .is_some_and(|p| p.lock().unwrap().alive)
    }

    fn id(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.lock().unwrap().pid)
    }
}
