//! Dependency discovery.
//!
//! [`build_deps_index`] walks the edge graph from every entrypoint and
//! records what each one needs eagerly, what it can reach at all, and which
//! lazy edges it declares. Targets of lazy edges join the worklist as
//! entrypoints of their own, so every lazily loaded chunk ends up with an
//! independent [`DependencyRecord`].

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::Analyzer;
use crate::edge::{Edge, ResourceKind};
use crate::excludes::ExcludePatterns;
use crate::url::ResolvedUrl;

#[derive(Debug, thiserror::Error)]
pub enum DepsError {
    #[error("no entrypoints given")]
    NoEntrypoints,

    #[error("none of the entrypoints could be loaded: {}", .0.join(", "))]
    NoneLoaded(Vec<String>),
}

/// Dependencies of one entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    pub entrypoint: ResolvedUrl,
    /// Everything reachable, eagerly or not. Contains the entrypoint.
    pub deps: IndexSet<ResolvedUrl>,
    /// Everything needed before first render. Contains the entrypoint.
    pub eager_deps: IndexSet<ResolvedUrl>,
    /// Targets of lazy edges found on eager paths.
    pub lazy_roots: IndexSet<ResolvedUrl>,
}

impl DependencyRecord {
    /// A record whose `deps` equal its `eager_deps`.
    pub fn eager<I>(entrypoint: impl Into<ResolvedUrl>, deps: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ResolvedUrl>,
    {
        let entrypoint = entrypoint.into();
        let mut eager_deps: IndexSet<ResolvedUrl> = IndexSet::new();
        eager_deps.insert(entrypoint.clone());
        eager_deps.extend(deps.into_iter().map(Into::into));
        Self {
            entrypoint,
            deps: eager_deps.clone(),
            eager_deps,
            lazy_roots: IndexSet::new(),
        }
    }
}

/// Dependency records of every entrypoint, in discovery order, plus the edge
/// data observed while building them.
#[derive(Debug, Clone, Default)]
pub struct DepsIndex {
    records: IndexMap<ResolvedUrl, DependencyRecord>,
    edges: FxHashMap<ResolvedUrl, Vec<Edge>>,
    kinds: FxHashMap<ResolvedUrl, ResourceKind>,
}

impl DepsIndex {
    /// Index over hand-made records. Kinds come from file extensions.
    pub fn from_records(records: impl IntoIterator<Item = DependencyRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    fn insert(&mut self, record: DependencyRecord) {
        for url in &record.deps {
            self.kinds
                .entry(url.clone())
                .or_insert_with(|| ResourceKind::from_url(url));
        }
        self.records.insert(record.entrypoint.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, entrypoint: &ResolvedUrl) -> Option<&DependencyRecord> {
        self.records.get(entrypoint)
    }

    pub fn contains(&self, entrypoint: &ResolvedUrl) -> bool {
        self.records.contains_key(entrypoint)
    }

    pub fn records(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.records.values()
    }

    pub fn entrypoints(&self) -> impl Iterator<Item = &ResolvedUrl> {
        self.records.keys()
    }

    /// Edges of `url` as seen during discovery (empty when never loaded).
    pub fn edges_of(&self, url: &ResolvedUrl) -> &[Edge] {
        self.edges.get(url).map(Vec::as_slice).unwrap_or_default()
    }

    /// Kind of a discovered resource. Unknown urls fall back to their
    /// extension.
    pub fn kind_of(&self, url: &ResolvedUrl) -> ResourceKind {
        self.kinds
            .get(url)
            .copied()
            .unwrap_or_else(|| ResourceKind::from_url(url))
    }

    /// Every file that is an eager dependency of some entrypoint, in
    /// discovery order.
    pub fn eager_files(&self) -> IndexSet<ResolvedUrl> {
        self.records
            .values()
            .flat_map(|record| record.eager_deps.iter().cloned())
            .collect()
    }

    /// Entrypoints that eagerly depend on `url`, in discovery order.
    pub fn dependents_of(&self, url: &ResolvedUrl) -> Vec<ResolvedUrl> {
        self.records
            .values()
            .filter(|record| record.eager_deps.contains(url))
            .map(|record| record.entrypoint.clone())
            .collect()
    }

    /// `url` plus everything reachable from it over eager edges.
    pub fn transitive_eager_deps(&self, url: &ResolvedUrl) -> IndexSet<ResolvedUrl> {
        let mut seen = IndexSet::new();
        let mut stack = vec![url.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for edge in self.edges_of(&current).iter().rev() {
                if !edge.lazy && !seen.contains(&edge.target) {
                    stack.push(edge.target.clone());
                }
            }
        }
        seen
    }

    /// `{entrypoint: {deps, eagerDeps, lazyRoots}}` as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let map: IndexMap<&str, serde_json::Value> = self
            .records
            .values()
            .map(|record| {
                (
                    record.entrypoint.as_str(),
                    serde_json::json!({
                        "deps": record.deps,
                        "eagerDeps": record.eager_deps,
                        "lazyRoots": record.lazy_roots,
                    }),
                )
            })
            .collect();
        serde_json::to_value(map).unwrap_or_default()
    }
}

/// Build the dependency index for `entrypoints`.
///
/// Discovery is sequential and completes before anything else looks at the
/// result. Resources the analyzer cannot load are logged and left out of
/// every record; excluded resources are never followed.
pub async fn build_deps_index(
    entrypoints: &[ResolvedUrl],
    analyzer: &dyn Analyzer,
    excludes: &ExcludePatterns,
) -> Result<DepsIndex, DepsError> {
    if entrypoints.is_empty() {
        return Err(DepsError::NoEntrypoints);
    }

    let mut index = DepsIndex::default();
    let mut failed: Vec<String> = Vec::new();
    let mut worklist: VecDeque<ResolvedUrl> = entrypoints.iter().cloned().collect();
    let mut queued: IndexSet<ResolvedUrl> = worklist.iter().cloned().collect();

    for entrypoint in entrypoints {
        index
            .kinds
            .entry(entrypoint.clone())
            .or_insert_with(|| ResourceKind::from_url(entrypoint));
    }

    while let Some(entrypoint) = worklist.pop_front() {
        if index.records.contains_key(&entrypoint) {
            continue;
        }
        if excludes.matches(&entrypoint) {
            warn!(entrypoint = %entrypoint, "entrypoint is excluded, skipping");
            continue;
        }

        match walk(&entrypoint, analyzer, excludes, &mut index).await {
            Some(record) => {
                for lazy in &record.lazy_roots {
                    if queued.insert(lazy.clone()) {
                        debug!(from = %entrypoint, lazy = %lazy, "new lazy entrypoint");
                        worklist.push_back(lazy.clone());
                    }
                }
                index.records.insert(entrypoint, record);
            }
            None => failed.push(entrypoint.to_string()),
        }
    }

    if index.records.is_empty() {
        return Err(DepsError::NoneLoaded(failed));
    }
    Ok(index)
}

/// Eager-first walk from one entrypoint. `None` when the entrypoint itself
/// cannot be loaded.
async fn walk(
    entrypoint: &ResolvedUrl,
    analyzer: &dyn Analyzer,
    excludes: &ExcludePatterns,
    index: &mut DepsIndex,
) -> Option<DependencyRecord> {
    let mut eager_deps: IndexSet<ResolvedUrl> = IndexSet::new();
    let mut deps: IndexSet<ResolvedUrl> = IndexSet::new();
    let mut lazy_roots: IndexSet<ResolvedUrl> = IndexSet::new();

    // (url, reached over an eager path)
    let mut stack: Vec<(ResolvedUrl, bool)> = vec![(entrypoint.clone(), true)];
    while let Some((url, eager)) = stack.pop() {
        // Eager reachability wins: a resource seen only lazily is walked
        // again once an eager path reaches it.
        let already = if eager {
            eager_deps.contains(&url)
        } else {
            deps.contains(&url)
        };
        if already {
            continue;
        }

        let edges = match cached_edges(&url, analyzer, index).await {
            Ok(edges) => edges,
            Err(err) => {
                if &url == entrypoint {
                    warn!(entrypoint = %url, error = %err, "could not load entrypoint");
                    return None;
                }
                warn!(url = %url, error = %err, "could not load dependency, leaving it out");
                continue;
            }
        };

        if eager {
            eager_deps.insert(url.clone());
        }
        deps.insert(url.clone());

        let followed: Vec<&Edge> = edges
            .iter()
            .filter(|edge| !excludes.matches(&edge.target))
            .collect();
        for edge in &followed {
            index
                .kinds
                .entry(edge.target.clone())
                .or_insert_with(|| edge.kind.into());
            if edge.lazy && eager {
                lazy_roots.insert(edge.target.clone());
            }
        }
        // Reversed so the stack pops them in source order.
        for edge in followed.into_iter().rev() {
            stack.push((edge.target.clone(), eager && !edge.lazy));
        }
    }

    Some(DependencyRecord {
        entrypoint: entrypoint.clone(),
        deps,
        eager_deps,
        lazy_roots,
    })
}

async fn cached_edges(
    url: &ResolvedUrl,
    analyzer: &dyn Analyzer,
    index: &mut DepsIndex,
) -> Result<Vec<Edge>, crate::analysis::AnalyzerError> {
    if let Some(edges) = index.edges.get(url) {
        return Ok(edges.clone());
    }
    let edges = analyzer.edges_of(url).await?;
    index.edges.insert(url.clone(), edges.clone());
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FsAnalyzer;
    use crate::runtime::memory::MemoryRuntime;
    use std::sync::Arc;

    fn analyzer(files: &[(&str, &str)]) -> FsAnalyzer {
        FsAnalyzer::new(
            Arc::new(MemoryRuntime::with_files("/", files.iter().copied())),
            "/",
        )
    }

    fn urls(set: &IndexSet<ResolvedUrl>) -> Vec<&str> {
        set.iter().map(ResolvedUrl::as_str).collect()
    }

    #[tokio::test]
    async fn empty_entrypoints_is_an_error() {
        let analyzer = analyzer(&[]);
        let err = build_deps_index(&[], &analyzer, &ExcludePatterns::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DepsError::NoEntrypoints));
    }

    #[tokio::test]
    async fn lazy_targets_become_entrypoints() {
        let analyzer = analyzer(&[
            (
                "/shell.html",
                r#"<link rel="import" href="a.html"><link rel="lazy-import" href="view.html">"#,
            ),
            ("/a.html", "<p>a</p>"),
            ("/view.html", r#"<link rel="import" href="b.html">"#),
            ("/b.html", "<p>b</p>"),
        ]);
        let index = build_deps_index(&["/shell.html".into()], &analyzer, &ExcludePatterns::default())
            .await
            .unwrap();

        let shell = index.get(&"/shell.html".into()).unwrap();
        assert_eq!(urls(&shell.eager_deps), vec!["/shell.html", "/a.html"]);
        assert_eq!(
            urls(&shell.deps),
            vec!["/shell.html", "/a.html", "/view.html", "/b.html"]
        );
        assert_eq!(urls(&shell.lazy_roots), vec!["/view.html"]);

        let view = index.get(&"/view.html".into()).unwrap();
        assert_eq!(urls(&view.eager_deps), vec!["/view.html", "/b.html"]);
        assert_eq!(index.kind_of(&"/view.html".into()), ResourceKind::Document);
    }

    #[tokio::test]
    async fn eager_path_promotes_lazily_seen_resources() {
        let analyzer = analyzer(&[
            (
                "/entry.html",
                r#"<link rel="lazy-import" href="x.html"><link rel="import" href="y.html">"#,
            ),
            ("/x.html", r#"<link rel="import" href="z.html">"#),
            ("/y.html", r#"<link rel="import" href="x.html">"#),
            ("/z.html", ""),
        ]);
        let index = build_deps_index(&["/entry.html".into()], &analyzer, &ExcludePatterns::default())
            .await
            .unwrap();
        let entry = index.get(&"/entry.html".into()).unwrap();
        assert!(entry.eager_deps.contains(&ResolvedUrl::new("/x.html")));
        assert!(entry.eager_deps.contains(&ResolvedUrl::new("/z.html")));
    }

    #[tokio::test]
    async fn missing_and_excluded_resources_are_left_out() {
        let analyzer = analyzer(&[(
            "/entry.html",
            r#"<link rel="import" href="gone.html"><link rel="import" href="vendor/x.html">"#,
        )]);
        let excludes = ExcludePatterns::new(["/vendor"]).unwrap();
        let index = build_deps_index(&["/entry.html".into()], &analyzer, &excludes)
            .await
            .unwrap();
        let entry = index.get(&"/entry.html".into()).unwrap();
        assert_eq!(urls(&entry.deps), vec!["/entry.html"]);

        let err = build_deps_index(&["/nope.html".into()], &analyzer, &ExcludePatterns::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DepsError::NoneLoaded(_)));
    }

    #[test]
    fn transitive_eager_deps_follow_recorded_edges() {
        let mut index = DepsIndex::default();
        index.edges.insert(
            "/a.html".into(),
            vec![
                Edge::eager("/b.html", crate::edge::EdgeKind::DocumentImport),
                Edge::lazy("/c.html", crate::edge::EdgeKind::DocumentImport),
            ],
        );
        index.edges.insert(
            "/b.html".into(),
            vec![Edge::eager("/d.css", crate::edge::EdgeKind::StyleImport)],
        );
        let deps = index.transitive_eager_deps(&"/a.html".into());
        assert_eq!(urls(&deps), vec!["/a.html", "/b.html", "/d.css"]);
    }
}
