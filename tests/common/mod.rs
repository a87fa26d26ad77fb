#![allow(dead_code, unused_imports)]

pub use devrunner_test_utils::builders::ResolvedConfigBuilder;
pub use devrunner_test_utils::fake_backend::{BackendCall, FakeBackend, ScriptedBuild};
pub use devrunner_test_utils::fake_watch::FakeWatchBackend;
pub use devrunner_test_utils::manual_timers::ManualTimers;
pub use devrunner_test_utils::recording_logger::RecordingLogger;
pub use devrunner_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;

use devrunner::engine::Orchestrator;
use devrunner::fs::mock::MockFileSystem;
use devrunner::watch::{DirectoryWatcher, WatcherOptions};

/// Orchestrator over a fake backend, manual timers and a recording logger.
pub struct Harness {
    pub orchestrator: Orchestrator<FakeBackend>,
    pub backend: FakeBackend,
    pub timers: ManualTimers,
    pub logger: Arc<RecordingLogger>,
}

impl Harness {
    pub fn new(config: devrunner::config::ResolvedConfig) -> Self {
        Self::with_backend(config, FakeBackend::new())
    }

    pub fn with_backend(config: devrunner::config::ResolvedConfig, backend: FakeBackend) -> Self {
        init_tracing();
        let timers = ManualTimers::new();
        let logger = Arc::new(RecordingLogger::new());
        let orchestrator = Orchestrator::new(Arc::new(config), backend.clone(), logger.clone())
            .with_timers(Arc::new(timers.clone()));
        Self {
            orchestrator,
            backend,
            timers,
            logger,
        }
    }

    /// Swap in a watcher over `fs` and a fake backend, wired to the
    /// orchestrator's change callback.
    pub fn with_fake_watcher(mut self, fs: MockFileSystem) -> (Self, FakeWatchBackend) {
        let config = self.orchestrator.config().clone();
        let backend = FakeWatchBackend::new();
        let watcher = DirectoryWatcher::with_backend(
            WatcherOptions {
                project_root: config.project_root,
                watch_dirs: config.watch_dirs,
                ignore: config.ignore,
            },
            Box::new(backend.clone()),
            Arc::new(fs),
            self.orchestrator.handle().change_callback(),
            self.logger.clone(),
        );
        self.orchestrator = self.orchestrator.with_watcher(watcher);
        (self, backend)
    }
}
