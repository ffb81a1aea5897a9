//! Smoke tests for bindery-graph.
//!
//! Fast, deterministic checks of the discovery and assignment pipeline end
//! to end, over an in-memory project.

use std::sync::Arc;

use indexmap::IndexSet;

use crate::runtime::memory::MemoryRuntime;
use crate::url::relativize;
use crate::{
    BundleStrategy, ExcludePatterns, FsAnalyzer, PerEntrypoint, ResolvedUrl,
    SharedByEntrypointSet, build_deps_index,
};

fn analyzer(files: &[(&str, &str)]) -> FsAnalyzer {
    FsAnalyzer::new(
        Arc::new(MemoryRuntime::with_files("/", files.iter().copied())),
        "/",
    )
}

fn sorted(set: &IndexSet<ResolvedUrl>) -> Vec<&str> {
    let mut urls: Vec<&str> = set.iter().map(ResolvedUrl::as_str).collect();
    urls.sort();
    urls
}

fn endpoints_project() -> FsAnalyzer {
    analyzer(&[
        ("/common.html", "<dom-module id=common></dom-module>"),
        (
            "/endpoint1.html",
            r#"<link rel="import" href="common.html"><link rel="import" href="dep1.html">"#,
        ),
        (
            "/endpoint2.html",
            r#"<link rel="import" href="common.html">
<link rel="import" href="dep2.html">
<link rel="import" href="endpoint1.html">"#,
        ),
        ("/dep1.html", "<p>dep1</p>"),
        ("/dep2.html", "<p>dep2</p>"),
    ])
}

#[tokio::test]
async fn test_endpoint_scenario_deps() {
    let analyzer = endpoints_project();
    let entrypoints: Vec<ResolvedUrl> = ["/common.html", "/endpoint1.html", "/endpoint2.html"]
        .into_iter()
        .map(ResolvedUrl::from)
        .collect();
    let index = build_deps_index(&entrypoints, &analyzer, &ExcludePatterns::default())
        .await
        .expect("deps index");

    assert_eq!(
        sorted(&index.get(&"/common.html".into()).unwrap().deps),
        vec!["/common.html"]
    );
    assert_eq!(
        sorted(&index.get(&"/endpoint1.html".into()).unwrap().deps),
        vec!["/common.html", "/dep1.html", "/endpoint1.html"]
    );
    assert_eq!(
        sorted(&index.get(&"/endpoint2.html".into()).unwrap().deps),
        vec![
            "/common.html",
            "/dep1.html",
            "/dep2.html",
            "/endpoint1.html",
            "/endpoint2.html"
        ]
    );
}

#[tokio::test]
async fn test_eager_deps_are_subset_of_deps() {
    let analyzer = analyzer(&[
        (
            "/app.html",
            r#"<link rel="import" href="a.html"><link rel="lazy-import" href="lazy.html">"#,
        ),
        ("/a.html", r#"<script src="a.js"></script>"#),
        ("/a.js", "import './b.js';\nimport('./chunk.js');"),
        ("/b.js", ""),
        ("/chunk.js", ""),
        ("/lazy.html", "<p>later</p>"),
    ]);
    let index = build_deps_index(&["/app.html".into()], &analyzer, &ExcludePatterns::default())
        .await
        .unwrap();

    for record in index.records() {
        assert!(record.deps.contains(&record.entrypoint));
        assert!(record.eager_deps.iter().all(|dep| record.deps.contains(dep)));
    }

    // Lazily reached resources are entrypoints of their own and nobody's
    // eager dependency.
    for lazy in ["/lazy.html", "/chunk.js"] {
        let url = ResolvedUrl::new(lazy);
        assert!(index.contains(&url), "{lazy} should be an entrypoint");
        for record in index.records().filter(|record| record.entrypoint != url) {
            assert!(!record.eager_deps.contains(&url));
        }
    }
}

#[tokio::test]
async fn test_strategies_partition_discovered_files() {
    let analyzer = endpoints_project();
    let entrypoints: Vec<ResolvedUrl> = vec!["/endpoint1.html".into(), "/endpoint2.html".into()];
    let index = build_deps_index(&entrypoints, &analyzer, &ExcludePatterns::default())
        .await
        .unwrap();

    let strategies: Vec<Box<dyn BundleStrategy>> = vec![
        Box::new(SharedByEntrypointSet::default()),
        Box::new(PerEntrypoint),
    ];
    for strategy in strategies {
        let manifest = strategy.assign(&index).unwrap();
        for file in index.eager_files() {
            let owners = manifest
                .bundles()
                .filter(|bundle| bundle.files.contains(&file))
                .count();
            assert_eq!(owners, 1, "{file} must live in exactly one bundle");
        }
    }
}

#[tokio::test]
async fn test_cross_bundle_reference_points_at_bundle() {
    let analyzer = endpoints_project();
    let entrypoints: Vec<ResolvedUrl> = vec!["/endpoint1.html".into(), "/endpoint2.html".into()];
    let index = build_deps_index(&entrypoints, &analyzer, &ExcludePatterns::default())
        .await
        .unwrap();
    let manifest = SharedByEntrypointSet::default().assign(&index).unwrap();

    let common = manifest.bundle_for_file(&"/common.html".into()).unwrap();
    assert_eq!(common.url.as_str(), "/shared_bundle_1.html");
    assert_eq!(
        relativize("/endpoint1.html", common.url.as_str()),
        "shared_bundle_1.html"
    );
}
