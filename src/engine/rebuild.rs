// src/engine/rebuild.rs

//! The two steps of a rebuild cycle.
//!
//! Each step is a free async function over borrowed collaborators so the
//! runtime can box it as an owned future and keep polling its event channel
//! while the step runs.

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::engine::RebuildOutcome;
use crate::exec::{describe_command, ProcessBackend, RunHandle, StopSignal};
use crate::logging::Logger;

/// Result of the build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Build passed, or no build command is configured.
    Proceed,
    Failed { code: Option<i32> },
}

/// Run the configured build command (if any) under the project root.
pub async fn run_build<B>(backend: &B, config: &ResolvedConfig, logger: &dyn Logger) -> BuildStep
where
    B: ProcessBackend + ?Sized,
{
    let Some(build) = config.build.as_ref() else {
        return BuildStep::Proceed;
    };

    logger.info(&format!("Running build command: {}", describe_command(build)));

    match backend.run_to_completion(build, &config.project_root).await {
        Ok(result) if result.success() => BuildStep::Proceed,
        Ok(result) => {
            logger.error(&format!(
                "Build command exited with code {}",
                result.describe_code()
            ));
            BuildStep::Failed { code: result.code }
        }
        Err(err) => {
            logger.error(&format!("Build command failed to start: {err}"));
            BuildStep::Failed { code: None }
        }
    }
}

/// Stop `current` (if any) gracefully, then start a fresh run process.
///
/// Returns the handle that should be tracked from now on. On spawn failure
/// that is `None`: the old process is already gone.
pub async fn restart_run_process<B>(
    backend: &B,
    config: &ResolvedConfig,
    logger: &dyn Logger,
    current: Option<Box<dyn RunHandle>>,
) -> (Option<Box<dyn RunHandle>>, RebuildOutcome)
where
    B: ProcessBackend + ?Sized,
{
    if let Some(mut previous) = current {
        let pid = previous.id();
        logger.info("Stopping running process");
        previous.stop(StopSignal::Terminate).await;
        debug!(pid = ?pid, "previous run process stopped");
    }

    logger.info(&format!("Starting command: {}", describe_command(&config.run)));

    match backend.spawn_tracked(&config.run, &config.project_root) {
        Ok(handle) => (Some(handle), RebuildOutcome::Restarted),
        Err(err) => {
            logger.error(&format!("Failed to start run command: {err}"));
            (None, RebuildOutcome::RunSpawnFailed)
        }
    }
}
