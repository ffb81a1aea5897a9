//! Shared test utilities for bindery-bundler tests.

#![allow(dead_code)]

use std::sync::Arc;

use bindery_bundler::{
    BuildOutput, BundleStrategy, Bundler, BundlerOptions, FsAnalyzer, ResolvedUrl,
    SharedByEntrypointSet,
};
use bindery_graph::MemoryRuntime;

/// Project root of the virtual file system.
pub const ROOT: &str = "/project";

/// Analyzer over virtual files given as `(url path, contents)`.
pub fn analyzer(files: &[(&str, &str)]) -> Arc<FsAnalyzer> {
    let runtime = MemoryRuntime::new(ROOT);
    for (path, contents) in files {
        runtime.add_file(format!("{ROOT}{path}"), *contents);
    }
    Arc::new(FsAnalyzer::new(Arc::new(runtime), ROOT))
}

pub fn urls(urls: &[&str]) -> Vec<ResolvedUrl> {
    urls.iter().map(|url| ResolvedUrl::new(*url)).collect()
}

pub async fn build_with(
    files: &[(&str, &str)],
    entrypoints: &[&str],
    options: BundlerOptions,
    strategy: &dyn BundleStrategy,
) -> BuildOutput {
    Bundler::new(analyzer(files), options)
        .build(&urls(entrypoints), strategy)
        .await
        .expect("build should succeed")
}

pub async fn build(files: &[(&str, &str)], entrypoints: &[&str]) -> BuildOutput {
    build_with(
        files,
        entrypoints,
        BundlerOptions::default(),
        &SharedByEntrypointSet::default(),
    )
    .await
}

/// Content of the bundle at `url`.
pub fn content<'a>(output: &'a BuildOutput, url: &str) -> &'a str {
    output
        .bundle(&ResolvedUrl::new(url))
        .map(|bundle| bundle.content.as_str())
        .unwrap_or_else(|| panic!("no bundle at {url}"))
}

/// Assert that `needles` occur in `haystack` in the given order.
pub fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(index) => from += index + needle.len(),
            None => panic!("expected '{needle}' after byte {from} in:\n{haystack}"),
        }
    }
}
