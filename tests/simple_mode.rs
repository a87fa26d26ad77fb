// tests/simple_mode.rs

mod common;
use crate::common::{
    init_tracing, with_timeout, BackendCall, FakeBackend, RecordingLogger, ScriptedBuild,
};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use devrunner::config::{resolve_simple_config, RawConfig, SimpleConfig};
use devrunner::exec::StopSignal;
use devrunner::simple::SimpleRunner;
use devrunner::util::{derive_run_watch_command, wait_for_path};

fn simple_config(cwd: &Path, toml_text: &str) -> SimpleConfig {
    let raw: RawConfig = toml::from_str(toml_text).unwrap();
    resolve_simple_config(&raw, cwd).unwrap()
}

fn simple_runner(
    config: SimpleConfig,
    backend: &FakeBackend,
) -> (SimpleRunner<FakeBackend>, Arc<RecordingLogger>) {
    init_tracing();
    let logger = Arc::new(RecordingLogger::new());
    let runner = SimpleRunner::new(config, backend.clone(), logger.clone())
        .with_wait(Duration::from_millis(100), Duration::from_millis(10));
    (runner, logger)
}

fn with_build_output(dir: &Path) {
    fs::create_dir_all(dir.join("dist")).unwrap();
    fs::write(dir.join("dist").join("server.js"), "").unwrap();
}

#[test]
fn node_commands_gain_watch_flag() {
    assert_eq!(
        derive_run_watch_command("node dist/server.js"),
        "node --watch dist/server.js"
    );
    assert_eq!(
        derive_run_watch_command("  node   --inspect dist/server.js"),
        "node --watch --inspect dist/server.js"
    );
    assert_eq!(derive_run_watch_command("deno run main.ts"), "deno run main.ts");
    assert_eq!(derive_run_watch_command("nodemon app.js"), "nodemon app.js");
}

#[tokio::test]
async fn wait_for_path_sees_files_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("out.js");
    fs::write(&file, "").unwrap();

    assert!(wait_for_path(&file, Duration::ZERO, Duration::from_millis(10)).await);
    assert!(wait_for_path(dir.path(), Duration::ZERO, Duration::from_millis(10)).await);
}

#[tokio::test]
async fn wait_for_path_gives_up_after_the_timeout() {
    let dir = tempfile::tempdir().unwrap();

    let found = with_timeout(wait_for_path(
        &dir.path().join("never.js"),
        Duration::from_millis(50),
        Duration::from_millis(10),
    ))
    .await;

    assert!(!found);
}

#[tokio::test]
async fn wait_for_path_picks_up_a_late_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("late.js");

    let writer = {
        let target = target.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fs::write(target, "").unwrap();
        })
    };

    let found =
        with_timeout(wait_for_path(&target, Duration::from_secs(2), Duration::from_millis(10))).await;
    assert!(found);
    writer.await.unwrap();
}

#[tokio::test]
async fn failed_build_returns_its_code_and_starts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new();
    backend.script_builds([ScriptedBuild::Exit(2)]);
    let (runner, logger) = simple_runner(simple_config(dir.path(), ""), &backend);

    let code = with_timeout(runner.run(async {})).await.unwrap();

    assert_eq!(code, 2);
    assert_eq!(backend.spawn_count(), 0);
    assert!(logger.contains("Build failed with code 2"));
}

#[tokio::test]
async fn build_killed_by_signal_or_not_started_returns_one() {
    for scripted in [ScriptedBuild::Signal(9), ScriptedBuild::SpawnError] {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new();
        backend.script_builds([scripted]);
        let (runner, _logger) = simple_runner(simple_config(dir.path(), ""), &backend);

        let code = with_timeout(runner.run(async {})).await.unwrap();

        assert_eq!(code, 1, "{scripted:?}");
        assert_eq!(backend.spawn_count(), 0);
    }
}

#[tokio::test]
async fn missing_build_output_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new();
    let (runner, logger) = simple_runner(simple_config(dir.path(), ""), &backend);

    let code = with_timeout(runner.run(async {})).await.unwrap();

    assert_eq!(code, 1);
    assert!(logger.contains("Timed out waiting for"));
    assert_eq!(backend.spawn_count(), 0);
}

#[tokio::test]
async fn starts_build_watcher_and_node_watch_then_stops_both() {
    let dir = tempfile::tempdir().unwrap();
    with_build_output(dir.path());
    let backend = FakeBackend::new();
    let (runner, logger) = simple_runner(simple_config(dir.path(), ""), &backend);
    assert_eq!(runner.effective_run_line(), "node --watch dist/server.js");

    let code = with_timeout(runner.run(async {})).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::Build {
                command: "npm run build".into()
            },
            BackendCall::Spawn {
                command: "npm run build -- --watch".into(),
                pid: 1000
            },
            BackendCall::Spawn {
                command: "node --watch dist/server.js".into(),
                pid: 1001
            },
            BackendCall::Stop {
                pid: 1000,
                signal: StopSignal::Terminate
            },
            BackendCall::Stop {
                pid: 1001,
                signal: StopSignal::Terminate
            },
        ]
    );
    assert!(backend.alive_pids().is_empty());
    assert!(logger.contains("Application restarted after initial startup"));
    assert!(logger.contains("Development runner stopped"));
}

#[tokio::test]
async fn without_watch_only_the_app_runs_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    with_build_output(dir.path());
    let backend = FakeBackend::new();
    let config = simple_config(
        dir.path(),
        r#"
[simple]
watch = false
"#,
    );
    let (runner, _logger) = simple_runner(config, &backend);

    let code = with_timeout(runner.run(async {})).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(backend.spawn_count(), 1);
    assert!(backend.calls().contains(&BackendCall::Spawn {
        command: "node dist/server.js".into(),
        pid: 1000
    }));
}

#[tokio::test]
async fn processes_keep_running_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    with_build_output(dir.path());
    let backend = FakeBackend::new();
    let (runner, _logger) = simple_runner(simple_config(dir.path(), ""), &backend);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let task = tokio::spawn(runner.run(async move {
        let _ = rx.await;
    }));

    with_timeout(async {
        while backend.spawn_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_eq!(backend.alive_pids(), vec![1000, 1001]);
    assert_eq!(backend.stop_count(), 0);

    tx.send(()).unwrap();
    let code = with_timeout(task).await.unwrap().unwrap();

    assert_eq!(code, 0);
    assert!(backend.alive_pids().is_empty());
}
