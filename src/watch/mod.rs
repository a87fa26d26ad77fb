// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which paths are ignored (`ignore`).
//! - Wrapping the OS watch mechanism as a "watch one directory" capability
//!   (`backend`, using `notify` in non-recursive mode).
//! - Rebuilding recursive coverage on top of it (`watcher`): existing
//!   subdirectories are watched eagerly, new ones when a rename-class event
//!   reveals them.
//!
//! It knows nothing about builds or processes; it only turns filesystem
//! changes into [`WatchEvent`]s.

use std::fmt;
use std::path::PathBuf;

pub mod backend;
pub mod ignore;
pub mod path_utils;
pub mod watcher;

pub use backend::{NotifyBackend, RawEvent, WatchBackend};
pub use ignore::IgnorePolicy;
pub use watcher::{ChangeCallback, DirectoryWatcher, WatcherOptions};

/// Kind of change reported by the watcher.
///
/// `Rename` covers create, delete and move; `Change` covers content and
/// metadata modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Change,
    Rename,
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchEventKind::Change => f.write_str("change"),
            WatchEventKind::Rename => f.write_str("rename"),
        }
    }
}

/// A qualifying change under one of the watch roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    /// Absolute path of the affected entry.
    pub path: PathBuf,
}
