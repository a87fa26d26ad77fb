// tests/exec_command.rs

use std::collections::BTreeMap;
use std::ffi::OsString;

use devrunner::config::CommandSpec;
use devrunner::exec::{describe_command, merge_env, resolve_executable_for};

#[test]
fn windows_shim_appends_cmd_to_package_managers_and_bare_names() {
    assert_eq!(resolve_executable_for("npm", true), "npm.cmd");
    assert_eq!(resolve_executable_for("npx", true), "npx.cmd");
    assert_eq!(resolve_executable_for("node", true), "node.cmd");
    assert_eq!(resolve_executable_for("node.exe", true), "node.exe");
    assert_eq!(resolve_executable_for("scripts/dev.bat", true), "scripts/dev.bat");
}

#[test]
fn other_platforms_are_never_shimmed() {
    for name in ["npm", "npx", "node", "node.exe"] {
        assert_eq!(resolve_executable_for(name, false), name);
    }
}

#[test]
fn overlay_wins_over_the_inherited_environment() {
    let base = vec![
        (OsString::from("PATH"), OsString::from("/usr/bin")),
        (OsString::from("NODE_ENV"), OsString::from("production")),
    ];
    let mut overlay = BTreeMap::new();
    overlay.insert("NODE_ENV".to_string(), "development".to_string());
    overlay.insert("PORT".to_string(), "3000".to_string());

    let merged = merge_env(base, &overlay);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged[&OsString::from("PATH")], OsString::from("/usr/bin"));
    assert_eq!(merged[&OsString::from("NODE_ENV")], OsString::from("development"));
    assert_eq!(merged[&OsString::from("PORT")], OsString::from("3000"));
}

#[test]
fn empty_overlay_keeps_the_base_untouched() {
    let base = vec![(OsString::from("HOME"), OsString::from("/home/dev"))];

    let merged = merge_env(base.clone(), &BTreeMap::new());

    assert_eq!(merged.into_iter().collect::<Vec<_>>(), base);
}

#[test]
fn describe_joins_executable_and_arguments() {
    let spec = CommandSpec::new("node").args(["--inspect", "dist/index.js"]);

    assert_eq!(describe_command(&spec), "node --inspect dist/index.js");
}
