#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use devrunner::config::{default_run_command, CommandSpec, ResolvedConfig, DEFAULT_IGNORE};

/// Builder for `ResolvedConfig` to simplify test setup.
///
/// Defaults: watch `<root>/src`, built-in ignore list, 50 ms debounce,
/// `npm run build` as the build and `node dist/index.js` as the run command.
pub struct ResolvedConfigBuilder {
    config: ResolvedConfig,
}

impl ResolvedConfigBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config: ResolvedConfig {
                watch_dirs: vec![root.join("src")],
                project_root: root,
                ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
                debounce: Duration::from_millis(50),
                build: Some(CommandSpec::new("npm").args(["run", "build"])),
                run: default_run_command(),
            },
        }
    }

    /// Replace the watch roots; relative entries are joined onto the root.
    pub fn watch_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let root = self.config.project_root.clone();
        self.config.watch_dirs = dirs
            .into_iter()
            .map(|d| root.join(d.as_ref()))
            .collect::<Vec<PathBuf>>();
        self
    }

    pub fn ignore(mut self, segment: &str) -> Self {
        self.config.ignore.push(segment.to_string());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce = Duration::from_millis(ms);
        self
    }

    pub fn build(mut self, spec: CommandSpec) -> Self {
        self.config.build = Some(spec);
        self
    }

    pub fn no_build(mut self) -> Self {
        self.config.build = None;
        self
    }

    pub fn run(mut self, spec: CommandSpec) -> Self {
        self.config.run = spec;
        self
    }

    pub fn build_config(self) -> ResolvedConfig {
        self.config
    }
}
