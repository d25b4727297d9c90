//! End-to-end tests running the `modconf` binary against a throw-away project.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("composer.json"),
        r#"{
            "name": "test/app",
            "extra": {
                "config-plugin-options": {
                    "modules": { "main": { "path": "", "config-directory": "config" } },
                    "module-root": "main"
                },
                "config-plugin": {
                    "params": "params.json",
                    "web": "web.json"
                },
                "config-plugin-environments": { "dev": { "web": "web-dev.json" } }
            }
        }"#,
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(dir.path().join("config/params.json"), r#"{"title": "Demo"}"#).unwrap();
    fs::write(dir.path().join("config/web.json"), r#"{"title": "${params.title}", "debug": false}"#).unwrap();
    fs::write(dir.path().join("config/web-dev.json"), r#"{"debug": true}"#).unwrap();
    dir
}

fn modconf(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modconf"))
        .args(args)
        .arg("-d")
        .arg(dir)
        .output()
        .unwrap()
}

#[test]
fn test_rebuild_then_get() {
    let dir = project();

    let output = modconf(dir.path(), &["rebuild"]);
    assert!(output.status.success());
    assert!(dir.path().join(".merge-plan.json").is_file());

    let output = modconf(dir.path(), &["get", "web", "--env", "dev"]);
    assert!(output.status.success());
    let web: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(web, serde_json::json!({ "title": "Demo", "debug": true }));
}

#[test]
fn test_second_rebuild_reports_up_to_date() {
    let dir = project();
    modconf(dir.path(), &["rebuild"]);

    let output = modconf(dir.path(), &["rebuild"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("up to date"));
}

#[test]
fn test_get_without_plan_fails() {
    let dir = project();

    let output = modconf(dir.path(), &["get", "web"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("modconf rebuild"));
}

#[test]
fn test_plan_lists_groups() {
    let dir = project();
    modconf(dir.path(), &["rebuild"]);

    let output = modconf(dir.path(), &["plan"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("params"));
    assert!(stdout.contains("dev"));
}
