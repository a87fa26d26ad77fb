use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use devrunner::errors::{DevRunnerError, Result};
use devrunner::watch::WatchBackend;

/// Watch backend that only records which directories are watched.
///
/// Clones share state, so a test can keep one clone while the watcher owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct FakeWatchBackend {
    state: Arc<Mutex<FakeWatchState>>,
}

#[derive(Debug, Default)]
struct FakeWatchState {
    active: BTreeSet<PathBuf>,
    unwatched: Vec<PathBuf>,
    failing: BTreeSet<PathBuf>,
}

impl FakeWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `watch` fail for `dir`.
    pub fn fail_on(&self, dir: impl AsRef<Path>) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(dir.as_ref().to_path_buf());
    }

    /// Directories with a live watch, sorted.
    pub fn active(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().active.iter().cloned().collect()
    }

    pub fn is_watching(&self, dir: impl AsRef<Path>) -> bool {
        self.state.lock().unwrap().active.contains(dir.as_ref())
    }

    /// Every `unwatch` call, in order.
    pub fn unwatched(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().unwatched.clone()
    }
}

impl WatchBackend for FakeWatchBackend {
    fn watch(&mut self, dir: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(dir) {
            return Err(DevRunnerError::IoError(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot watch {}", dir.display()),
            )));
        }
        state.active.insert(dir.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.active.remove(dir);
        state.unwatched.push(dir.to_path_buf());
        Ok(())
    }
}
