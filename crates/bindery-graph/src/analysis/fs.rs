use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use path_clean::PathClean;
use tracing::{debug, trace};

use super::scan::{css_imports, is_path_specifier, module_specifiers};
use super::{Analyzer, AnalyzerError, ParsedContent};
use crate::document::{Document, NodeId};
use crate::edge::{Edge, EdgeKind, ResourceKind, links_in};
use crate::runtime::{Runtime, read_to_string};
use crate::url::{self, ResolvedUrl, is_templated};

/// Analyzer over a project directory.
///
/// Root-absolute urls map onto files below `root` (`/src/a.html` is
/// `<root>/src/a.html`). Content and edges are cached per url, so repeated
/// requests never touch the runtime again.
#[derive(Debug)]
pub struct FsAnalyzer {
    runtime: Arc<dyn Runtime>,
    root: PathBuf,
    contents: DashMap<ResolvedUrl, Arc<ParsedContent>>,
    edges: DashMap<ResolvedUrl, Arc<Vec<Edge>>>,
}

impl FsAnalyzer {
    pub fn new(runtime: Arc<dyn Runtime>, root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            root: root.into().clean(),
            contents: DashMap::new(),
            edges: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Url of a file inside the project. Relative paths are taken relative to
    /// the project root; paths outside it have no url.
    pub fn url_for_path(&self, path: &Path) -> Option<ResolvedUrl> {
        let absolute = if path.is_absolute() {
            path.clean()
        } else {
            self.root.join(path).clean()
        };
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(ResolvedUrl::new(format!("/{}", segments.join("/"))))
    }

    /// File backing a root-absolute url. Query strings are ignored; urls that
    /// would escape the root have no file.
    pub fn path_for(&self, url: &ResolvedUrl) -> Option<PathBuf> {
        let path = url.as_str().split(['?', '#']).next().unwrap_or_default();
        let relative = path.strip_prefix('/')?;
        if relative.starts_with('/') {
            return None;
        }
        let decoded = relative.replace("%20", " ");
        let full = self.root.join(decoded).clean();
        full.starts_with(&self.root).then_some(full)
    }

    async fn load(&self, url: &ResolvedUrl) -> Result<Arc<ParsedContent>, AnalyzerError> {
        let cached = self.contents.get(url).map(|entry| Arc::clone(entry.value()));
        if let Some(content) = cached {
            return Ok(content);
        }

        let not_loaded = |reason: String| AnalyzerError::NotLoaded {
            url: url.clone(),
            reason,
        };
        let path = self
            .path_for(url)
            .ok_or_else(|| not_loaded("url does not map into the project root".to_string()))?;
        let source = read_to_string(self.runtime.as_ref(), &path)
            .await
            .map_err(|err| not_loaded(err.to_string()))?;

        trace!(url = %url, bytes = source.len(), "loaded");
        let content = Arc::new(ParsedContent::new(
            url.clone(),
            ResourceKind::from_url(url),
            source,
        ));
        // Another task may have loaded the same url meanwhile; keep the first.
        Ok(Arc::clone(
            self.contents.entry(url.clone()).or_insert(content).value(),
        ))
    }

    fn extract_edges(&self, content: &ParsedContent) -> Vec<Edge> {
        let base = content.base_url();
        let mut edges: Vec<Edge> = Vec::new();
        let mut push = |edge: Edge| {
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        };

        match content.kind {
            ResourceKind::Document => {
                let Some(doc) = content.fragment.as_ref() else {
                    return Vec::new();
                };
                for link in links_in(doc, doc.root()) {
                    // Links inside templates are inert until stamped.
                    if doc.has_ancestor(link.node, |doc, node| doc.is_element(node, "template")) {
                        continue;
                    }
                    match self.resolve(&link.href, &base) {
                        Some(target) => push(Edge {
                            target,
                            kind: link.kind,
                            lazy: link.lazy,
                        }),
                        None => debug!(from = %content.url, href = %link.href, "skipping unresolvable link"),
                    }
                }
                for script in inline_module_scripts(doc) {
                    for specifier in module_specifiers(&doc.text_content(script)) {
                        if !is_path_specifier(&specifier.value) {
                            continue;
                        }
                        if let Some(target) = self.resolve(&specifier.value, &base) {
                            push(Edge {
                                target,
                                kind: EdgeKind::ScriptImport,
                                lazy: specifier.dynamic,
                            });
                        }
                    }
                }
            }
            ResourceKind::Script => {
                for specifier in module_specifiers(&content.source) {
                    if !is_path_specifier(&specifier.value) {
                        debug!(from = %content.url, specifier = %specifier.value, "skipping bare specifier");
                        continue;
                    }
                    if let Some(target) = self.resolve(&specifier.value, &base) {
                        push(Edge {
                            target,
                            kind: EdgeKind::ScriptImport,
                            lazy: specifier.dynamic,
                        });
                    }
                }
            }
            ResourceKind::Style => {
                for specifier in css_imports(&content.source) {
                    if let Some(target) = self.resolve(&specifier.value, &base) {
                        push(Edge::eager(target, EdgeKind::StyleImport));
                    }
                }
            }
        }
        edges
    }
}

/// `<script type="module">` elements without `src`, outside templates.
fn inline_module_scripts(doc: &Document) -> Vec<NodeId> {
    doc.query_all(doc.root(), |doc, node| {
        doc.is_element(node, "script")
            && !doc.has_attr(node, "src")
            && doc
                .attr(node, "type")
                .is_some_and(|value| value.eq_ignore_ascii_case("module"))
            && !doc.has_ancestor(node, |doc, ancestor| doc.is_element(ancestor, "template"))
    })
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl Analyzer for FsAnalyzer {
    fn resolve(&self, reference: &str, base: &ResolvedUrl) -> Option<ResolvedUrl> {
        let reference = reference.trim();
        if reference.is_empty() || reference.starts_with('#') || is_templated(reference) {
            return None;
        }
        let resolved = url::resolve(base.as_str(), reference)?;
        let same_origin =
            resolved.as_str().starts_with('/') && !resolved.as_str().starts_with("//");
        same_origin.then_some(resolved)
    }

    async fn edges_of(&self, url: &ResolvedUrl) -> Result<Vec<Edge>, AnalyzerError> {
        let cached = self.edges.get(url).map(|entry| Arc::clone(entry.value()));
        if let Some(edges) = cached {
            return Ok(edges.as_ref().clone());
        }
        let content = self.load(url).await?;
        let edges = Arc::new(self.extract_edges(&content));
        let stored = Arc::clone(self.edges.entry(url.clone()).or_insert(edges).value());
        Ok(stored.as_ref().clone())
    }

    async fn content_of(&self, url: &ResolvedUrl) -> Result<Arc<ParsedContent>, AnalyzerError> {
        self.load(url).await
    }
}
