// src/watch/backend.rs

//! The OS watch mechanism, reduced to "watch one directory".

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::errors::{DevRunnerError, Result};
use crate::watch::WatchEventKind;

/// Event for one watched directory, as reported by a [`WatchBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: WatchEventKind,
    /// Directory the event was observed in.
    pub dir: PathBuf,
    /// Child the event refers to; `None` when the backend did not report one.
    pub file_name: Option<OsString>,
}

impl RawEvent {
    /// Absolute path of the affected entry.
    pub fn affected_path(&self) -> PathBuf {
        match &self.file_name {
            Some(name) => self.dir.join(name),
            None => self.dir.clone(),
        }
    }
}

/// Non-recursive watch capability.
///
/// Implementations report events for direct children of each watched
/// directory. Recursion is handled by [`crate::watch::DirectoryWatcher`].
pub trait WatchBackend: Send {
    fn watch(&mut self, dir: &Path) -> Result<()>;
    fn unwatch(&mut self, dir: &Path) -> Result<()>;
}

/// Production backend on top of `notify`.
///
/// Events are forwarded from the notify thread into `events_tx` untouched
/// apart from classification; they must not be processed on that thread,
/// because registering a new watch from inside the notify callback can
/// deadlock some backends.
pub struct NotifyBackend {
    inner: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish_non_exhaustive()
    }
}

impl NotifyBackend {
    pub fn new(events_tx: mpsc::UnboundedSender<RawEvent>) -> Result<Self> {
        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    trace!(?event, "received notify event");
                    let Some(kind) = classify(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if events_tx.send(split_path(kind, path)).is_err() {
                            // Watcher is shutting down.
                            return;
                        }
                    }
                }
                Err(err) => warn!("file watch error: {err}"),
            },
            Config::default(),
        )
        .map_err(|e| {
            DevRunnerError::Other(anyhow::Error::new(e).context("creating filesystem watcher"))
        })?;

        Ok(Self { inner })
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, dir: &Path) -> Result<()> {
        self.inner
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| DevRunnerError::Watch {
                path: dir.to_path_buf(),
                source,
            })
    }

    fn unwatch(&mut self, dir: &Path) -> Result<()> {
        self.inner
            .unwatch(dir)
            .map_err(|source| DevRunnerError::Watch {
                path: dir.to_path_buf(),
                source,
            })
    }
}

/// Map a notify event kind onto the two kinds the watcher reports.
///
/// Access events never indicate a change and are dropped.
pub fn classify(kind: &EventKind) -> Option<WatchEventKind> {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            Some(WatchEventKind::Rename)
        }
        EventKind::Modify(_) | EventKind::Any => Some(WatchEventKind::Change),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

fn split_path(kind: WatchEventKind, path: PathBuf) -> RawEvent {
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => RawEvent {
            kind,
            dir: dir.to_path_buf(),
            file_name: Some(name.to_os_string()),
        },
        _ => RawEvent {
            kind,
            dir: path,
            file_name: None,
        },
    }
}
