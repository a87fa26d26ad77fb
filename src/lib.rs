// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod simple;
pub mod util;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{
    load_config, resolve_config, resolve_simple_config, ResolvedConfig, SimpleConfig,
};
use crate::engine::Orchestrator;
use crate::exec::{describe_command, TokioProcessBackend};
use crate::logging::{Logger, TracingLogger};
use crate::simple::SimpleRunner;

/// High-level entry point used by `main.rs`. Returns the exit code.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the orchestrator (or the simplified runner with `--simple`)
/// - the real process backend
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let loaded = load_config(args.config.as_deref(), &cwd)?;
    if let Some(path) = loaded.path.as_ref() {
        info!("Using configuration from {}", path.display());
    }

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
    let backend = TokioProcessBackend::new(Arc::clone(&logger));

    if args.simple {
        let simple = resolve_simple_config(&loaded.config, &cwd)?;
        if args.dry_run {
            print_simple_dry_run(&simple);
            return Ok(0);
        }
        let code = SimpleRunner::new(simple, backend, logger)
            .run(shutdown_signal())
            .await?;
        return Ok(code);
    }

    let config = resolve_config(&loaded.config, &args.overrides(), &cwd)?;
    if args.dry_run {
        print_dry_run(&config);
        return Ok(0);
    }

    let mut orchestrator = Orchestrator::new(Arc::new(config), backend, logger);
    let handle = orchestrator.handle();

    let mut task = tokio::spawn(async move {
        orchestrator.start().await?;
        orchestrator.run().await
    });

    tokio::select! {
        joined = &mut task => {
            // Only reachable if startup failed.
            joined??;
            return Ok(0);
        }
        () = shutdown_signal() => {}
    }

    info!("shutdown requested; stopping devrunner");
    handle.stop().await;
    task.await??;
    Ok(0)
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                eprintln!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => debug!("received Ctrl+C"),
        () = terminate => debug!("received SIGTERM"),
    }
}

/// Simple dry-run output: print what would be watched and run.
fn print_dry_run(cfg: &ResolvedConfig) {
    println!("devrunner dry-run");
    println!("  project_root = {}", cfg.project_root.display());
    println!("  debounce_ms = {}", cfg.debounce.as_millis());
    println!();

    println!("watch ({}):", cfg.watch_dirs.len());
    for dir in &cfg.watch_dirs {
        println!("  - {}", dir.display());
    }
    println!("ignore: {:?}", cfg.ignore);
    println!();

    match cfg.build.as_ref() {
        Some(build) => println!("build: {}", describe_command(build)),
        None => println!("build: (none)"),
    }
    println!("run: {}", describe_command(&cfg.run));
    for (key, value) in &cfg.run.env {
        println!("  env {key}={value}");
    }

    debug!("dry-run complete (no execution)");
}

fn print_simple_dry_run(cfg: &SimpleConfig) {
    println!("devrunner dry-run (simple mode)");
    println!("  cwd = {}", cfg.cwd.display());
    println!("  build: {}", describe_command(&cfg.build));
    println!("  wait_for_path: {}", cfg.wait_for_path.display());
    println!("  watch: {}", cfg.watch);
    if cfg.watch {
        println!("  build_watch: {}", describe_command(&cfg.build_watch));
    }
    println!("  run: {}", cfg.run_line);
    println!("  run_with_node_watch: {}", cfg.run_with_node_watch);

    debug!("dry-run complete (no execution)");
}
