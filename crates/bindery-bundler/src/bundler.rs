//! Build orchestration.
//!
//! Discovery runs to completion first, then the strategy assigns files to
//! bundles, then every bundle is built as an independent job. Jobs only read
//! the manifest, the deps index and the analyzer cache, so they fan out over
//! a `JoinSet` bounded by a semaphore.

use std::sync::Arc;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use bindery_graph::analysis::scan::{
    css_imports, is_path_specifier, module_specifiers, remove_statements, rewrite_specifiers,
};
use bindery_graph::url::{rebase_href, relativize};
use bindery_graph::{
    Analyzer, AssignedBundle, Bundle, BundleKind, BundleManifest, BundleStrategy, DepsIndex,
    ResolvedUrl, build_deps_index,
};

use crate::assembler::HtmlAssembler;
use crate::error::{BundleError, Result};
use crate::inliner::Contents;
use crate::module_entry::{
    ConcatModuleBundler, ModuleBundler, ModuleSources, SyntheticEntry, protect_dynamic_imports,
    restore_dynamic_imports,
};
use crate::options::BundlerOptions;
use crate::rebase::{module_specifier, relocate_css};

/// One written bundle.
#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub url: ResolvedUrl,
    pub kind: BundleKind,
    pub content: String,
    /// The bundle with its bookkeeping filled in.
    pub bundle: Bundle,
    /// Files of the bundle that are still loaded from their own location:
    /// neither the primary document nor inlined.
    pub passthrough: Vec<ResolvedUrl>,
}

/// Result of a build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub manifest: BundleManifest,
    pub deps: DepsIndex,
    /// Sorted by url.
    pub bundles: Vec<BundleOutput>,
    /// Every reference no bundle could satisfy.
    pub missing: IndexSet<ResolvedUrl>,
    /// Files that must be copied next to the bundles.
    pub passthrough: IndexSet<ResolvedUrl>,
}

impl BuildOutput {
    pub fn bundle(&self, url: &ResolvedUrl) -> Option<&BundleOutput> {
        self.bundles.iter().find(|output| output.url == *url)
    }
}

/// State shared by the jobs of one build.
#[derive(Debug)]
struct BuildContext {
    analyzer: Arc<dyn Analyzer>,
    module_bundler: Arc<dyn ModuleBundler>,
    options: BundlerOptions,
    manifest: BundleManifest,
    deps: DepsIndex,
}

#[derive(Debug, Clone)]
pub struct Bundler {
    analyzer: Arc<dyn Analyzer>,
    module_bundler: Arc<dyn ModuleBundler>,
    options: BundlerOptions,
}

impl Bundler {
    pub fn new(analyzer: Arc<dyn Analyzer>, options: BundlerOptions) -> Self {
        Self {
            analyzer,
            module_bundler: Arc::new(ConcatModuleBundler),
            options,
        }
    }

    /// Use another module bundler for Script bundles.
    pub fn with_module_bundler(mut self, module_bundler: Arc<dyn ModuleBundler>) -> Self {
        self.module_bundler = module_bundler;
        self
    }

    pub fn options(&self) -> &BundlerOptions {
        &self.options
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    /// Discover the dependencies of `entrypoints`.
    pub async fn deps(&self, entrypoints: &[ResolvedUrl]) -> Result<DepsIndex> {
        self.options.validate()?;
        let deps =
            build_deps_index(entrypoints, self.analyzer.as_ref(), &self.options.excludes).await?;
        Ok(deps)
    }

    /// Discover, assign and bundle.
    pub async fn build(
        &self,
        entrypoints: &[ResolvedUrl],
        strategy: &dyn BundleStrategy,
    ) -> Result<BuildOutput> {
        let deps = self.deps(entrypoints).await?;
        let manifest = strategy.assign(&deps)?;
        info!(
            entrypoints = deps.len(),
            bundles = manifest.len(),
            "assigned bundles"
        );
        self.bundle(manifest, deps).await
    }

    /// Build every bundle of `manifest`.
    pub async fn bundle(&self, manifest: BundleManifest, deps: DepsIndex) -> Result<BuildOutput> {
        self.options.validate()?;
        let urls: Vec<ResolvedUrl> = manifest.bundles().map(|bundle| bundle.url.clone()).collect();
        let context = Arc::new(BuildContext {
            analyzer: Arc::clone(&self.analyzer),
            module_bundler: Arc::clone(&self.module_bundler),
            options: self.options.clone(),
            manifest,
            deps,
        });

        let results = run_jobs(&context, &urls, self.options.parallelism()).await?;

        let mut results: FxHashMap<ResolvedUrl, Result<BundleOutput>> =
            results.into_iter().collect();
        let mut bundles = Vec::with_capacity(urls.len());
        for url in &urls {
            match results.remove(url) {
                Some(result) => bundles.push(result?),
                None => {
                    return Err(BundleError::TaskPanicked(format!("no result for {url}")));
                }
            }
        }
        bundles.sort_by(|a, b| a.url.cmp(&b.url));

        let mut missing = IndexSet::new();
        let mut passthrough = IndexSet::new();
        for output in &bundles {
            missing.extend(output.bundle.missing_imports.iter().cloned());
            passthrough.extend(output.passthrough.iter().cloned());
        }
        for url in &missing {
            warn!(url = %url, "missing import");
        }

        let context = Arc::try_unwrap(context).map_err(|_| {
            BundleError::TaskPanicked("bundle jobs still hold the build context".to_string())
        })?;
        Ok(BuildOutput {
            manifest: context.manifest,
            deps: context.deps,
            bundles,
            missing,
            passthrough,
        })
    }

    /// Build a single bundle of `manifest`.
    pub async fn bundle_one(
        &self,
        assigned: AssignedBundle,
        manifest: &BundleManifest,
        deps: &DepsIndex,
    ) -> Result<BundleOutput> {
        build_bundle(
            self.analyzer.as_ref(),
            self.module_bundler.as_ref(),
            &self.options,
            manifest,
            deps,
            assigned,
        )
        .await
    }
}

/// Run one job per bundle, at most `max_parallel` at a time.
#[cfg(not(target_family = "wasm"))]
async fn run_jobs(
    context: &Arc<BuildContext>,
    urls: &[ResolvedUrl],
    max_parallel: usize,
) -> Result<Vec<(ResolvedUrl, Result<BundleOutput>)>> {
    use tokio::sync::Semaphore;
    use tokio::task::JoinSet;

    let mut join_set = JoinSet::new();
    let semaphore = Arc::new(Semaphore::new(max_parallel));

    for url in urls {
        let url = url.clone();
        let context = Arc::clone(context);
        let permit = Arc::clone(&semaphore);

        join_set.spawn(async move {
            let result = match permit.acquire().await {
                Ok(_permit) => build_assigned(&context, &url).await,
                Err(err) => Err(BundleError::TaskPanicked(err.to_string())),
            };
            (url, result)
        });
    }

    let mut results = Vec::with_capacity(urls.len());
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(result) => results.push(result),
            Err(join_err) => {
                return Err(BundleError::TaskPanicked(format!(
                    "Bundle task panicked: {}",
                    join_err
                )));
            }
        }
    }
    Ok(results)
}

/// Sequential fallback for WASM (single-threaded).
#[cfg(target_family = "wasm")]
async fn run_jobs(
    context: &Arc<BuildContext>,
    urls: &[ResolvedUrl],
    _max_parallel: usize,
) -> Result<Vec<(ResolvedUrl, Result<BundleOutput>)>> {
    let mut results = Vec::with_capacity(urls.len());
    for url in urls {
        results.push((url.clone(), build_assigned(context, url).await));
    }
    Ok(results)
}

async fn build_assigned(context: &BuildContext, url: &ResolvedUrl) -> Result<BundleOutput> {
    let assigned = context
        .manifest
        .assign(url)
        .ok_or_else(|| BundleError::Options(format!("{url} is not in the manifest")))?;
    build_bundle(
        context.analyzer.as_ref(),
        context.module_bundler.as_ref(),
        &context.options,
        &context.manifest,
        &context.deps,
        assigned,
    )
    .await
}

async fn build_bundle(
    analyzer: &dyn Analyzer,
    module_bundler: &dyn ModuleBundler,
    options: &BundlerOptions,
    manifest: &BundleManifest,
    deps: &DepsIndex,
    assigned: AssignedBundle,
) -> Result<BundleOutput> {
    let mut bundle = assigned.bundle;
    let contents = prefetch(analyzer, &bundle).await;

    let content = match bundle.kind {
        BundleKind::Html => {
            if bundle.is_file_backed() && !contents.contains_key(&bundle.url) {
                // Surface why the primary document is unusable.
                analyzer.content_of(&bundle.url).await?;
            }
            HtmlAssembler {
                manifest,
                deps,
                contents: &contents,
                analyzer,
                options,
            }
            .assemble(&mut bundle)?
        }
        BundleKind::Style => style_bundle(&mut bundle, &contents, manifest, deps, analyzer, options),
        BundleKind::Script => {
            script_bundle(&mut bundle, &contents, manifest, analyzer, options, module_bundler)?
        }
    };

    let passthrough = match bundle.kind {
        BundleKind::Html => bundle
            .files
            .iter()
            .filter(|file| {
                **file != bundle.url
                    && !bundle.inlined_imports.contains(*file)
                    && !bundle.inlined_scripts.contains(*file)
                    && !bundle.inlined_styles.contains(*file)
                    && contents.contains_key(*file)
            })
            .cloned()
            .collect(),
        _ => Vec::new(),
    };

    info!(
        bundle = %bundle.url,
        kind = ?bundle.kind,
        files = bundle.files.len(),
        missing = bundle.missing_imports.len(),
        "bundled"
    );
    Ok(BundleOutput {
        url: bundle.url.clone(),
        kind: bundle.kind,
        content,
        bundle,
        passthrough,
    })
}

/// Load every file of `bundle`. Files that fail are left out and reported
/// by whichever step needs them.
async fn prefetch(analyzer: &dyn Analyzer, bundle: &Bundle) -> Contents {
    let mut contents = Contents::default();
    for file in &bundle.files {
        match analyzer.content_of(file).await {
            Ok(content) => {
                contents.insert(file.clone(), content);
            }
            Err(err) => debug!(bundle = %bundle.url, error = %err, "could not load bundle file"),
        }
    }
    contents
}

/// Owner of `url` when it is a different bundle than `bundle`.
fn other_owner(
    manifest: &BundleManifest,
    bundle: &ResolvedUrl,
    url: &ResolvedUrl,
) -> Option<ResolvedUrl> {
    manifest
        .bundle_for_file(url)
        .filter(|owner| owner.url != *bundle)
        .map(|owner| owner.url.clone())
}

/// In-bundle `@import` order: every stylesheet after the ones it imports.
fn style_order(bundle: &Bundle, deps: &DepsIndex) -> Vec<ResolvedUrl> {
    fn visit(
        url: &ResolvedUrl,
        bundle: &Bundle,
        deps: &DepsIndex,
        seen: &mut IndexSet<ResolvedUrl>,
        order: &mut Vec<ResolvedUrl>,
    ) {
        if !seen.insert(url.clone()) {
            return;
        }
        for edge in deps.edges_of(url) {
            if bundle.files.contains(&edge.target) {
                visit(&edge.target, bundle, deps, seen, order);
            }
        }
        order.push(url.clone());
    }

    let mut seen = IndexSet::new();
    let mut order = Vec::new();
    for file in &bundle.files {
        visit(file, bundle, deps, &mut seen, &mut order);
    }
    order
}

fn style_bundle(
    bundle: &mut Bundle,
    contents: &Contents,
    manifest: &BundleManifest,
    deps: &DepsIndex,
    analyzer: &dyn Analyzer,
    options: &BundlerOptions,
) -> String {
    let mut parts = Vec::new();
    for file in style_order(bundle, deps) {
        let Some(content) = contents.get(&file) else {
            bundle.missing_imports.insert(file);
            continue;
        };

        let imports = css_imports(&content.source);
        let base = content.base_url();
        let css = remove_statements(&content.source, &imports, |import| {
            analyzer.resolve(&import.value, &base).is_some_and(|target| {
                bundle.files.contains(&target) && !options.excludes.matches(&target)
            })
        });
        let bundle_url = bundle.url.clone();
        let css = relocate_css(&css, base.as_str(), bundle_url.as_str(), |url| {
            if options.excludes.matches(url) {
                return None;
            }
            other_owner(manifest, &bundle_url, url)
        });
        parts.push(css.trim_matches('\n').to_string());
        bundle.inlined_styles.insert(file);
    }
    let mut out = parts.join("\n");
    out.push('\n');
    out
}

fn script_bundle(
    bundle: &mut Bundle,
    contents: &Contents,
    manifest: &BundleManifest,
    analyzer: &dyn Analyzer,
    options: &BundlerOptions,
    module_bundler: &dyn ModuleBundler,
) -> Result<String> {
    let bundle_url = bundle.url.clone();
    let mut modules = ModuleSources::new();

    for file in &bundle.files {
        let Some(content) = contents.get(file) else {
            bundle.missing_imports.insert(file.clone());
            continue;
        };
        let base = content.base_url();
        let relative_to_bundle = |value: &str, target: &ResolvedUrl| {
            match other_owner(manifest, &bundle_url, target) {
                Some(owner) => module_specifier(&relativize(bundle_url.as_str(), owner.as_str())),
                None => module_specifier(&rebase_href(value, base.as_str(), bundle_url.as_str())),
            }
        };

        let protected = protect_dynamic_imports(&content.source, |value| {
            let target = analyzer.resolve(value, &base)?;
            Some(relative_to_bundle(value, &target))
        });

        let specifiers = module_specifiers(&protected);
        let source = rewrite_specifiers(&protected, &specifiers, |specifier| {
            if specifier.dynamic || !is_path_specifier(&specifier.value) {
                return None;
            }
            let target = analyzer.resolve(&specifier.value, &base)?;
            if options.excludes.matches(&target) {
                let relative = !specifier.value.starts_with('/');
                return relative.then(|| {
                    module_specifier(&rebase_href(
                        &specifier.value,
                        base.as_str(),
                        bundle_url.as_str(),
                    ))
                });
            }
            if bundle.files.contains(&target) {
                return Some(target.to_string());
            }
            Some(relative_to_bundle(&specifier.value, &target))
        });
        modules.insert(file.clone(), source);
    }

    let entry = SyntheticEntry::for_bundle(bundle);
    let code = module_bundler
        .bundle(&entry, &modules)
        .map_err(|err| match err {
            BundleError::ModuleBundler { .. } => err,
            other => BundleError::ModuleBundler {
                url: bundle_url.clone(),
                reason: other.to_string(),
            },
        })?;
    bundle.inlined_scripts.extend(modules.keys().cloned());
    Ok(restore_dynamic_imports(&code))
}
