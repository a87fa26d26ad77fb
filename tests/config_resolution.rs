// tests/config_resolution.rs

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use devrunner::config::{
    load_config, load_from_path, parse_command_string, resolve_config, resolve_simple_config,
    CommandInput, CommandSpec, ConfigOverrides, RawConfig, DEFAULT_CONFIG_FILE,
};
use devrunner::errors::DevRunnerError;

fn cwd() -> &'static Path {
    Path::new("/work/app")
}

fn parse(toml_text: &str) -> RawConfig {
    toml::from_str(toml_text).expect("valid config")
}

#[test]
fn empty_config_resolves_to_defaults() {
    let cfg = resolve_config(&RawConfig::default(), &ConfigOverrides::default(), cwd()).unwrap();

    assert_eq!(cfg.project_root, PathBuf::from("/work/app"));
    assert_eq!(cfg.watch_dirs, vec![PathBuf::from("/work/app/src")]);
    assert_eq!(cfg.ignore, vec!["node_modules", "dist", "coverage", ".git"]);
    assert_eq!(cfg.debounce, Duration::from_millis(200));
    assert_eq!(cfg.build, None);
    assert_eq!(cfg.run, CommandSpec::new("node").arg("dist/index.js"));
}

#[test]
fn file_values_are_resolved_against_the_project_root() {
    let raw = parse(
        r#"
project_root = "packages/api"
watch_dirs = ["src", "./config", "src", "../shared"]
ignore = ["tmp", "dist"]
debounce_ms = 0
build = "npm run build"

[run]
command = "node"
args = ["--enable-source-maps", "dist/server.js"]
env = { PORT = "8080" }
"#,
    );

    let cfg = resolve_config(&raw, &ConfigOverrides::default(), cwd()).unwrap();

    assert_eq!(cfg.project_root, PathBuf::from("/work/app/packages/api"));
    assert_eq!(
        cfg.watch_dirs,
        vec![
            PathBuf::from("/work/app/packages/api/src"),
            PathBuf::from("/work/app/packages/api/config"),
            PathBuf::from("/work/app/packages/shared"),
        ]
    );
    assert_eq!(cfg.ignore, vec!["node_modules", "dist", "coverage", ".git", "tmp"]);
    assert_eq!(cfg.debounce, Duration::ZERO);
    assert_eq!(cfg.build, Some(CommandSpec::new("npm").args(["run", "build"])));
    assert_eq!(
        cfg.run,
        CommandSpec::new("node")
            .args(["--enable-source-maps", "dist/server.js"])
            .env("PORT", "8080")
    );
    assert!(!cfg.run.shell);
}

#[test]
fn overrides_replace_file_values() {
    let raw = parse(
        r#"
watch_dirs = ["src"]
debounce_ms = 500
run = "node dist/index.js"
"#,
    );
    let overrides = ConfigOverrides {
        project_root: Some(PathBuf::from("/elsewhere")),
        watch_dirs: Some(vec!["lib".to_string()]),
        debounce_ms: Some(25),
        run: Some(CommandInput::Line("deno run main.ts".to_string())),
        ..ConfigOverrides::default()
    };

    let cfg = resolve_config(&raw, &overrides, cwd()).unwrap();

    assert_eq!(cfg.project_root, PathBuf::from("/elsewhere"));
    assert_eq!(cfg.watch_dirs, vec![PathBuf::from("/elsewhere/lib")]);
    assert_eq!(cfg.debounce, Duration::from_millis(25));
    assert_eq!(cfg.run, CommandSpec::new("deno").args(["run", "main.ts"]));
}

#[test]
fn empty_commands_are_configuration_errors() {
    let raw = parse(r#"build = "   ""#);
    let err = resolve_config(&raw, &ConfigOverrides::default(), cwd()).unwrap_err();
    assert!(matches!(err, DevRunnerError::ConfigError(_)), "got {err:?}");

    let raw = parse(
        r#"
[run]
command = ""
"#,
    );
    let err = resolve_config(&raw, &ConfigOverrides::default(), cwd()).unwrap_err();
    assert!(matches!(err, DevRunnerError::ConfigError(_)), "got {err:?}");
}

#[test]
fn command_strings_split_on_whitespace_only() {
    let spec = parse_command_string("  node   --inspect=9229\tdist/index.js ").unwrap();

    assert_eq!(spec.command, "node");
    assert_eq!(spec.args, vec!["--inspect=9229", "dist/index.js"]);
    assert!(!spec.shell);
    assert!(spec.env.is_empty());
}

#[test]
fn simple_section_defaults() {
    let cfg = resolve_simple_config(&RawConfig::default(), cwd()).unwrap();

    assert_eq!(cfg.cwd, PathBuf::from("/work/app"));
    assert_eq!(cfg.build, CommandSpec::new("npm").args(["run", "build"]).shell(true));
    assert_eq!(cfg.run_line, "node dist/server.js");
    assert_eq!(cfg.wait_for_path, PathBuf::from("/work/app/dist/server.js"));
    assert!(cfg.watch);
    assert_eq!(
        cfg.build_watch,
        CommandSpec::new("npm")
            .args(["run", "build", "--", "--watch"])
            .shell(true)
    );
    assert!(cfg.run_with_node_watch);
}

#[test]
fn simple_section_from_file() {
    let raw = parse(
        r#"
[simple]
cwd = "web"
build_command = "pnpm build"
run_command = "node build/main.js"
wait_for_path = "build/main.js"
watch = false
run_with_node_watch = false
"#,
    );

    let cfg = resolve_simple_config(&raw, cwd()).unwrap();

    assert_eq!(cfg.cwd, PathBuf::from("/work/app/web"));
    assert_eq!(cfg.build.command, "pnpm");
    assert_eq!(cfg.run_line, "node build/main.js");
    assert_eq!(cfg.wait_for_path, PathBuf::from("/work/app/web/build/main.js"));
    assert!(!cfg.watch);
    assert!(!cfg.run_with_node_watch);
}

#[test]
fn unknown_keys_are_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "debounce = 10").unwrap();

    let err = load_from_path(file.path()).unwrap_err();

    assert!(matches!(err, DevRunnerError::TomlError(_)), "got {err:?}");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_config(Some(Path::new("nope.toml")), dir.path()).unwrap_err();

    match err {
        DevRunnerError::ConfigError(msg) => assert!(msg.contains("nope.toml")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn default_config_file_is_optional() {
    let dir = tempfile::tempdir().unwrap();

    let loaded = load_config(None, dir.path()).unwrap();
    assert_eq!(loaded.path, None);
    assert_eq!(loaded.config, RawConfig::default());

    std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "debounce_ms = 75\n").unwrap();
    let loaded = load_config(None, dir.path()).unwrap();
    assert_eq!(loaded.path, Some(dir.path().join(DEFAULT_CONFIG_FILE)));
    assert_eq!(loaded.config.debounce_ms, Some(75));
}
