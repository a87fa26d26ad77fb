// tests/watcher_mock_fs.rs

mod common;
use crate::common::{FakeWatchBackend, RecordingLogger};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use devrunner::fs::mock::MockFileSystem;
use devrunner::logging::LogSeverity;
use devrunner::watch::{
    ChangeCallback, DirectoryWatcher, RawEvent, WatchEvent, WatchEventKind, WatcherOptions,
};

const ROOT: &str = "/proj";

fn p(rel: &str) -> PathBuf {
    Path::new(ROOT).join(rel)
}

struct Setup {
    watcher: DirectoryWatcher,
    fs: MockFileSystem,
    backend: FakeWatchBackend,
    events: Arc<Mutex<Vec<WatchEvent>>>,
    logger: Arc<RecordingLogger>,
}

impl Setup {
    fn new(fs: MockFileSystem, roots: &[&str]) -> Self {
        let backend = FakeWatchBackend::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let logger = Arc::new(RecordingLogger::new());

        let sink = Arc::clone(&events);
        let on_change: ChangeCallback = Arc::new(move |event| sink.lock().unwrap().push(event));

        let watcher = DirectoryWatcher::with_backend(
            WatcherOptions {
                project_root: PathBuf::from(ROOT),
                watch_dirs: roots.iter().map(|r| p(r)).collect(),
                ignore: vec!["node_modules".into(), "dist".into(), ".git".into()],
            },
            Box::new(backend.clone()),
            Arc::new(fs.clone()),
            on_change,
            logger.clone(),
        );

        Self {
            watcher,
            fs,
            backend,
            events,
            logger,
        }
    }

    fn raw(&self, kind: WatchEventKind, dir: &str, name: Option<&str>) {
        self.watcher.handle_raw_event(RawEvent {
            kind,
            dir: p(dir),
            file_name: name.map(OsString::from),
        });
    }

    fn events(&self) -> Vec<WatchEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[test]
fn start_watches_existing_subdirectories_but_not_ignored_ones() {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/index.ts"));
    fs.add_dir(p("src/lib/deep"));
    fs.add_dir(p("src/node_modules/pkg"));
    fs.add_dir(p("src/lib/dist"));
    let mut s = Setup::new(fs, &["src"]);

    s.watcher.start();

    assert!(s.watcher.is_running());
    assert_eq!(
        s.watcher.watched_dirs(),
        vec![p("src"), p("src/lib"), p("src/lib/deep")]
    );
    assert_eq!(s.backend.active(), s.watcher.watched_dirs());
}

#[test]
fn missing_plain_file_and_ignored_roots_are_skipped_silently() {
    let fs = MockFileSystem::new();
    fs.add_file(p("README.md"));
    fs.add_dir(p("dist"));
    fs.add_dir(p("src"));
    let mut s = Setup::new(fs, &["missing", "README.md", "dist", "src"]);

    s.watcher.start();

    assert_eq!(s.watcher.watched_dirs(), vec![p("src")]);
    assert!(s.logger.messages_at(LogSeverity::Error).is_empty());
}

#[test]
fn root_outside_the_project_is_ignored() {
    let fs = MockFileSystem::new();
    fs.add_dir("/elsewhere/src");
    let backend = FakeWatchBackend::new();
    let mut watcher = DirectoryWatcher::with_backend(
        WatcherOptions {
            project_root: PathBuf::from(ROOT),
            watch_dirs: vec![PathBuf::from("/elsewhere/src")],
            ignore: vec![],
        },
        Box::new(backend.clone()),
        Arc::new(fs),
        Arc::new(|_: WatchEvent| {}),
        Arc::new(RecordingLogger::new()),
    );

    watcher.start();

    assert!(backend.active().is_empty());
}

#[test]
fn events_are_forwarded_with_absolute_paths() {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.ts"));
    let mut s = Setup::new(fs, &["src"]);
    s.watcher.start();

    s.raw(WatchEventKind::Change, "src", Some("a.ts"));
    s.raw(WatchEventKind::Change, "src", None);

    assert_eq!(
        s.events(),
        vec![
            WatchEvent {
                kind: WatchEventKind::Change,
                path: p("src/a.ts"),
            },
            WatchEvent {
                kind: WatchEventKind::Change,
                path: p("src"),
            },
        ]
    );
}

#[test]
fn ignored_paths_never_reach_the_callback() {
    let fs = MockFileSystem::new();
    fs.add_dir(p("src/lib"));
    let mut s = Setup::new(fs, &["src"]);
    s.watcher.start();

    s.raw(WatchEventKind::Rename, "src", Some("node_modules"));
    s.raw(WatchEventKind::Change, "src/lib", Some(".git"));
    s.raw(WatchEventKind::Change, "src/lib/dist", Some("bundle.js"));
    s.raw(WatchEventKind::Change, "src", Some("distribution.ts"));

    let events = s.events();
    assert_eq!(events.len(), 1, "events: {events:?}");
    assert_eq!(events[0].path, p("src/distribution.ts"));
}

#[test]
fn new_subdirectory_is_watched_after_a_rename_event() {
    let fs = MockFileSystem::new();
    fs.add_dir(p("src"));
    let mut s = Setup::new(fs, &["src"]);
    s.watcher.start();

    s.fs.add_dir(p("src/feature/nested"));
    s.raw(WatchEventKind::Rename, "src", Some("feature"));

    assert!(s.backend.is_watching(p("src/feature")));
    assert!(s.backend.is_watching(p("src/feature/nested")));

    // Events from inside the new directory now arrive.
    s.fs.add_file(p("src/feature/nested/x.ts"));
    s.raw(WatchEventKind::Rename, "src/feature/nested", Some("x.ts"));
    assert_eq!(s.events().last().unwrap().path, p("src/feature/nested/x.ts"));
}

#[test]
fn change_events_do_not_add_watches() {
    let fs = MockFileSystem::new();
    fs.add_dir(p("src"));
    let mut s = Setup::new(fs, &["src"]);
    s.watcher.start();

    s.fs.add_dir(p("src/late"));
    s.raw(WatchEventKind::Change, "src", Some("late"));

    assert!(!s.backend.is_watching(p("src/late")));
}

#[test]
fn removed_directory_is_forgotten_and_can_be_watched_again() {
    let fs = MockFileSystem::new();
    fs.add_dir(p("src/old/inner"));
    let mut s = Setup::new(fs, &["src"]);
    s.watcher.start();
    assert!(s.backend.is_watching(p("src/old/inner")));

    s.fs.remove(p("src/old"));
    s.raw(WatchEventKind::Rename, "src", Some("old"));

    assert_eq!(s.watcher.watched_dirs(), vec![p("src")]);
    assert!(s.backend.unwatched().contains(&p("src/old/inner")));

    s.fs.add_dir(p("src/old"));
    s.raw(WatchEventKind::Rename, "src", Some("old"));
    assert!(s.backend.is_watching(p("src/old")));
}

#[test]
fn watch_failures_are_logged_and_do_not_stop_other_directories() {
    let fs = MockFileSystem::new();
    fs.add_dir(p("src/broken"));
    fs.add_dir(p("src/fine"));
    fs.add_dir(p("src/unlistable/child"));
    fs.make_unreadable(p("src/unlistable"));
    let mut s = Setup::new(fs, &["src"]);
    s.backend.fail_on(p("src/broken"));

    s.watcher.start();

    assert_eq!(
        s.watcher.watched_dirs(),
        vec![p("src"), p("src/fine"), p("src/unlistable")]
    );
    let errors = s.logger.messages_at(LogSeverity::Error);
    assert!(errors.iter().any(|m| m.starts_with("Failed to watch directory")));
    assert!(errors.iter().any(|m| m.starts_with("Failed to list directory")));
}

#[test]
fn stop_is_idempotent_and_silences_events() {
    let fs = MockFileSystem::new();
    fs.add_dir(p("src/a"));
    let mut s = Setup::new(fs, &["src"]);

    // Never started.
    s.watcher.stop();

    s.watcher.start();
    s.watcher.start();
    assert_eq!(s.backend.active().len(), 2);

    s.watcher.stop();
    s.watcher.stop();

    assert!(!s.watcher.is_running());
    assert!(s.watcher.watched_dirs().is_empty());
    assert!(s.backend.active().is_empty());

    s.raw(WatchEventKind::Change, "src", Some("a.ts"));
    assert!(s.events().is_empty());
}
