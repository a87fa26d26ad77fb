// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::Logger;
use crate::watch::backend::{NotifyBackend, RawEvent, WatchBackend};
use crate::watch::ignore::IgnorePolicy;
use crate::watch::{WatchEvent, WatchEventKind};

/// Receives every qualifying change.
pub type ChangeCallback = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// What to watch and what to skip.
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    pub project_root: PathBuf,
    pub watch_dirs: Vec<PathBuf>,
    pub ignore: Vec<String>,
}

/// Recursive directory watcher built on a non-recursive [`WatchBackend`].
///
/// The set of watched directories is tracked explicitly, keyed by absolute
/// path. Existing subdirectories are watched on `start()`; directories that
/// appear later are picked up when a `Rename` event reports them.
pub struct DirectoryWatcher {
    state: Arc<Mutex<WatcherState>>,
    raw_rx: Option<mpsc::UnboundedReceiver<RawEvent>>,
    pump: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("watched", &self.watched_dirs())
            .finish_non_exhaustive()
    }
}

struct WatcherState {
    policy: IgnorePolicy,
    roots: Vec<PathBuf>,
    backend: Box<dyn WatchBackend>,
    fs: Arc<dyn FileSystem>,
    watched: BTreeSet<PathBuf>,
    running: bool,
    on_change: ChangeCallback,
    logger: Arc<dyn Logger>,
}

impl DirectoryWatcher {
    /// Watcher on top of `notify` and the real filesystem.
    ///
    /// Must be started from within a Tokio runtime.
    pub fn new(
        options: WatcherOptions,
        on_change: ChangeCallback,
        logger: Arc<dyn Logger>,
    ) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let backend = NotifyBackend::new(raw_tx)?;
        let mut watcher = Self::with_backend(
            options,
            Box::new(backend),
            Arc::new(RealFileSystem),
            on_change,
            logger,
        );
        watcher.raw_rx = Some(raw_rx);
        Ok(watcher)
    }

    /// Watcher over an arbitrary backend and filesystem.
    ///
    /// Raw events must be fed in through [`DirectoryWatcher::handle_raw_event`].
    pub fn with_backend(
        options: WatcherOptions,
        backend: Box<dyn WatchBackend>,
        fs: Arc<dyn FileSystem>,
        on_change: ChangeCallback,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let state = WatcherState {
            policy: IgnorePolicy::new(options.project_root, options.ignore),
            roots: options.watch_dirs,
            backend,
            fs,
            watched: BTreeSet::new(),
            running: false,
            on_change,
            logger,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            raw_rx: None,
            pump: None,
        }
    }

    /// Start watching all roots. A second call while running is a no-op.
    pub fn start(&mut self) {
        {
            let mut state = self.lock_state();
            if state.running {
                return;
            }
            state.running = true;

            let roots = state.roots.clone();
            for root in roots {
                state.watch_directory(&root);
            }
        }

        if let Some(mut raw_rx) = self.raw_rx.take() {
            let state = Arc::clone(&self.state);
            self.pump = Some(tokio::spawn(async move {
                while let Some(raw) = raw_rx.recv().await {
                    state
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .handle_raw_event(raw);
                }
                debug!("watcher event pump finished");
            }));
        }
    }

    /// Close every watch and forget them. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        state.running = false;

        let watched = std::mem::take(&mut state.watched);
        for dir in watched {
            if let Err(err) = state.backend.unwatch(&dir) {
                debug!(dir = ?dir, error = %err, "unwatch failed");
            }
        }
    }

    /// Process one event from the backend.
    pub fn handle_raw_event(&self, raw: RawEvent) {
        self.lock_state().handle_raw_event(raw);
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    /// Directories currently under watch, sorted.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.lock_state().watched.iter().cloned().collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, WatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl WatcherState {
    fn watch_directory(&mut self, dir: &Path) {
        if self.watched.contains(dir) {
            return;
        }
        // Covers missing paths as well as plain files.
        if !self.fs.is_dir(dir) {
            return;
        }
        if self.policy.is_ignored(dir) {
            return;
        }

        if let Err(err) = self.backend.watch(dir) {
            self.logger
                .error(&format!("Failed to watch directory: {}: {err}", dir.display()));
            return;
        }
        self.watched.insert(dir.to_path_buf());
        self.logger
            .debug(&format!("Watching directory: {}", dir.display()));

        let children = match self.fs.read_dir(dir) {
            Ok(children) => children,
            Err(err) => {
                self.logger.error(&format!(
                    "Failed to list directory: {}: {err:#}",
                    dir.display()
                ));
                return;
            }
        };

        for child in children {
            // Symlinked directories could loop back into the tree.
            if self.fs.is_dir(&child) && !self.fs.is_symlink(&child) {
                self.watch_directory(&child);
            }
        }
    }

    fn handle_raw_event(&mut self, raw: RawEvent) {
        if !self.running {
            return;
        }

        let path = raw.affected_path();
        if self.policy.is_ignored(&path) {
            return;
        }

        (self.on_change)(WatchEvent {
            kind: raw.kind,
            path: path.clone(),
        });

        if raw.kind == WatchEventKind::Rename {
            self.handle_potential_directory(&path);
        }
    }

    fn handle_potential_directory(&mut self, path: &Path) {
        if !self.fs.exists(path) {
            self.forget_subtree(path);
            return;
        }

        if self.fs.is_dir(path) {
            // Failures are logged by `watch_directory` and never propagate.
            self.watch_directory(path);
        }
    }

    /// A removed directory is dropped so a later directory with the same name
    /// gets a fresh watch.
    fn forget_subtree(&mut self, path: &Path) {
        let gone: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|dir| dir.starts_with(path))
            .cloned()
            .collect();

        for dir in gone {
            self.watched.remove(&dir);
            if let Err(err) = self.backend.unwatch(&dir) {
                // The OS usually drops watches on deleted directories itself.
                debug!(dir = ?dir, error = %err, "unwatch of removed directory failed");
            }
        }
    }
}
