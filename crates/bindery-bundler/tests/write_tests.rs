//! End-to-end builds against the real file system.

mod helpers;

use std::fs;
use std::sync::Arc;

use bindery_bundler::{
    BundleError, Bundler, BundlerOptions, FsAnalyzer, NativeRuntime, ResolvedUrl,
    SharedByEntrypointSet,
};
use helpers::urls;
use tempfile::TempDir;

fn write(root: &TempDir, path: &str, contents: &str) {
    let path = root.path().join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn build_and_write_to_disk() {
    let project = TempDir::new().unwrap();
    write(
        &project,
        "index.html",
        r#"<html><head><link rel="import" href="elements/app-shell.html"></head><body><script src="main.js"></script></body></html>"#,
    );
    write(&project, "elements/app-shell.html", "<p>shell</p>");
    write(&project, "main.js", "console.log('main');");

    let runtime = Arc::new(NativeRuntime::new());
    let analyzer = Arc::new(FsAnalyzer::new(runtime.clone(), project.path()));
    let output = Bundler::new(analyzer, BundlerOptions::default().with_inline_scripts(false))
        .build(&urls(&["/index.html"]), &SharedByEntrypointSet::default())
        .await
        .unwrap();

    let out = TempDir::new().unwrap();
    let written = output
        .write_to(runtime.as_ref(), project.path(), out.path())
        .await
        .unwrap();

    assert_eq!(written.bundles, vec![out.path().join("index.html")]);
    assert_eq!(written.copied, vec![out.path().join("main.js")]);

    let html = fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(html.contains("<p>shell</p>"));
    assert!(html.contains(r#"<script src="main.js"></script>"#));
    assert_eq!(
        fs::read_to_string(out.path().join("main.js")).unwrap(),
        "console.log('main');"
    );
    assert!(!out.path().join("elements").exists());
}

#[tokio::test]
async fn nested_bundles_keep_their_directories() {
    let project = TempDir::new().unwrap();
    write(
        &project,
        "app/index.html",
        r#"<html><head></head><body><link rel="lazy-import" href="views/detail.html"></body></html>"#,
    );
    write(&project, "app/views/detail.html", "<p>detail</p>");

    let runtime = Arc::new(NativeRuntime::new());
    let analyzer = Arc::new(FsAnalyzer::new(runtime.clone(), project.path()));
    let output = Bundler::new(analyzer, BundlerOptions::default())
        .build(&urls(&["/app/index.html"]), &SharedByEntrypointSet::default())
        .await
        .unwrap();
    assert!(output.bundle(&ResolvedUrl::new("/app/views/detail.html")).is_some());

    let out = TempDir::new().unwrap();
    output
        .write_to(runtime.as_ref(), project.path(), out.path())
        .await
        .unwrap();
    assert!(out.path().join("app/index.html").is_file());
    assert!(
        fs::read_to_string(out.path().join("app/views/detail.html"))
            .unwrap()
            .contains("<p>detail</p>")
    );
}

#[tokio::test]
async fn unknown_entrypoints_fail_the_build() {
    let project = TempDir::new().unwrap();
    let runtime = Arc::new(NativeRuntime::new());
    let analyzer = Arc::new(FsAnalyzer::new(runtime, project.path()));
    let err = Bundler::new(analyzer, BundlerOptions::default())
        .build(&urls(&["/nope.html"]), &SharedByEntrypointSet::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BundleError::Deps(_)));
}
