// src/simple.rs

//! Simplified startup mode (`--simple`).
//!
//! One blocking build, a wait for the build output, then two long-running
//! processes (the build tool's own watch mode and the application) that are
//! left alone until shutdown. No orchestrator, no debounce, no restarts.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{parse_command_string, SimpleConfig};
use crate::errors::Result;
use crate::exec::{describe_command, ProcessBackend, RunHandle, StopSignal};
use crate::logging::Logger;
use crate::util::{derive_run_watch_command, wait_for_path, WAIT_INTERVAL, WAIT_TIMEOUT};

pub struct SimpleRunner<B: ProcessBackend> {
    config: SimpleConfig,
    backend: B,
    logger: Arc<dyn Logger>,
    wait_timeout: Duration,
    wait_interval: Duration,
}

impl<B: ProcessBackend> SimpleRunner<B> {
    pub fn new(config: SimpleConfig, backend: B, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            backend,
            logger,
            wait_timeout: WAIT_TIMEOUT,
            wait_interval: WAIT_INTERVAL,
        }
    }

    pub fn with_wait(mut self, timeout: Duration, interval: Duration) -> Self {
        self.wait_timeout = timeout;
        self.wait_interval = interval;
        self
    }

    /// The command line actually used for the application process.
    pub fn effective_run_line(&self) -> String {
        if self.config.watch && self.config.run_with_node_watch {
            derive_run_watch_command(&self.config.run_line)
        } else {
            self.config.run_line.clone()
        }
    }

    /// Run until `shutdown` resolves. Returns the process exit code.
    ///
    /// A failed build returns its exit code (1 when killed by a signal) and a
    /// missing build output returns 1, both before anything long-running is
    /// started.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<i32> {
        let cfg = &self.config;
        let logger = self.logger.as_ref();

        logger.info("Starting development runner");
        logger.info("Rebuilding due to initial startup");
        logger.info(&format!("Running build command: {}", describe_command(&cfg.build)));

        let build = match self.backend.run_to_completion(&cfg.build, &cfg.cwd).await {
            Ok(result) => result,
            Err(err) => {
                logger.error(&format!("Build command failed to start: {err}"));
                return Ok(1);
            }
        };
        if !build.success() {
            logger.error(&format!("Build failed with code {}", build.describe_code()));
            return Ok(build.code.unwrap_or(1));
        }

        if !wait_for_path(&cfg.wait_for_path, self.wait_timeout, self.wait_interval).await {
            logger.error(&format!("Timed out waiting for {}", cfg.wait_for_path.display()));
            return Ok(1);
        }

        let mut build_watch: Option<Box<dyn RunHandle>> = None;
        if cfg.watch {
            logger.info("Starting build watcher");
            match self.backend.spawn_tracked(&cfg.build_watch, &cfg.cwd) {
                Ok(handle) => build_watch = Some(handle),
                Err(err) => logger.error(&format!("Failed to start build watcher: {err}")),
            }
        }

        let run_line = self.effective_run_line();
        let run_spec = parse_command_string(&run_line)?.shell(true);
        logger.info(&format!("Starting command: {run_line}"));
        let mut app = match self.backend.spawn_tracked(&run_spec, &cfg.cwd) {
            Ok(handle) => {
                logger.info("Application restarted after initial startup");
                Some(handle)
            }
            Err(err) => {
                logger.error(&format!("Failed to start run command: {err}"));
                None
            }
        };

        shutdown.await;

        for handle in [build_watch.as_mut(), app.as_mut()].into_iter().flatten() {
            handle.stop(StopSignal::Terminate).await;
        }
        logger.info("Development runner stopped");
        Ok(0)
    }
}
