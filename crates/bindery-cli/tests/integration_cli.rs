//! Runs the `bindery` binary end to end.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn bindery(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bindery").unwrap();
    cmd.current_dir(cwd).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "index.html",
        r#"<link rel="import" href="elements/x-app.html"><x-app></x-app>"#,
    );
    write(temp.path(), "elements/x-app.html", "<p>app</p><script>var x = 1;</script>");
    temp
}

#[test]
fn build_writes_bundles() {
    let temp = project();

    bindery(temp.path())
        .args(["build", "index.html", "--out-dir", "out"])
        .assert()
        .success();

    let html = fs::read_to_string(temp.path().join("out/index.html")).unwrap();
    assert!(html.contains("<p>app</p>"));
    assert!(html.contains("var x = 1;"));
}

#[test]
fn build_reads_config_file() {
    let temp = project();
    write(
        temp.path(),
        "bindery.config.json",
        r#"{ "entrypoints": ["index.html"], "outDir": "public", "inlineScripts": false }"#,
    );

    bindery(temp.path()).arg("build").assert().success();

    assert!(temp.path().join("public/index.html").is_file());
}

#[test]
fn flags_override_config_file() {
    let temp = project();
    write(
        temp.path(),
        "bindery.config.json",
        r#"{ "entrypoints": ["index.html"], "outDir": "public" }"#,
    );

    bindery(temp.path())
        .args(["build", "-d", "flagged"])
        .assert()
        .success();

    assert!(temp.path().join("flagged/index.html").is_file());
    assert!(!temp.path().join("public").exists());
}

#[test]
fn deps_prints_json() {
    let temp = project();

    bindery(temp.path())
        .args(["deps", "index.html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"/index.html\""))
        .stdout(predicate::str::contains("/elements/x-app.html"));
}

#[test]
fn missing_entrypoints_fail() {
    let temp = TempDir::new().unwrap();

    bindery(temp.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("entrypoints"));
}

#[test]
fn shell_strategy_needs_a_shell() {
    let temp = project();

    bindery(temp.path())
        .args(["build", "index.html", "--strategy", "shell"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("shell"));
}

#[test]
fn malformed_config_fails() {
    let temp = project();
    write(temp.path(), "bindery.config.json", "{ not json");

    bindery(temp.path())
        .args(["build", "index.html"])
        .assert()
        .failure();
}

#[test]
fn legacy_elements_fail_the_build() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "index.html",
        r#"<polymer-element name="x-old"></polymer-element>"#,
    );

    bindery(temp.path())
        .args(["build", "index.html"])
        .assert()
        .failure();
    assert!(!temp.path().join("dist/index.html").exists());
}
