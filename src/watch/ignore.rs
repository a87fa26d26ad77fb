// src/watch/ignore.rs

//! Segment-based ignore policy.
//!
//! A path is ignored when it lies outside the project root, or when any of
//! its components (relative to the root) is exactly one of the configured
//! segments. `distribution` does not match an entry `dist`.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    project_root: PathBuf,
    segments: HashSet<String>,
}

impl IgnorePolicy {
    pub fn new<I, S>(project_root: impl Into<PathBuf>, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            project_root: project_root.into(),
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.project_root) else {
            return true;
        };

        relative.components().any(|component| match component {
            Component::Normal(segment) => segment
                .to_str()
                .is_some_and(|s| self.segments.contains(s)),
            // `root/../elsewhere` escapes the project.
            Component::ParentDir => true,
            _ => false,
        })
    }
}
