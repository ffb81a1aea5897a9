//! Content analysis: loading resources and extracting their edges.
//!
//! The bundling pipeline never reads files or parses text itself. It asks an
//! [`Analyzer`] for the parsed content of a [`ResolvedUrl`] and for the edges
//! it declares. Implementations must behave like a cache: asking twice for the
//! same url returns the same content and has no further side effects, since
//! several bundles may request a shared resource concurrently.

mod fs;
pub mod scan;

pub use fs::FsAnalyzer;

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::Document;
use crate::edge::{Edge, ResourceKind};
use crate::url::ResolvedUrl;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzerError {
    /// Content could not be fetched or parsed.
    #[error("could not load {url}: {reason}")]
    NotLoaded { url: ResolvedUrl, reason: String },

    #[error("could not resolve '{reference}' from {base}")]
    Unresolved { reference: String, base: ResolvedUrl },
}

/// A loaded resource.
#[derive(Debug, Clone)]
pub struct ParsedContent {
    pub url: ResolvedUrl,
    pub kind: ResourceKind,
    pub source: String,
    /// Fragment tree, present for documents.
    pub fragment: Option<Document>,
}

impl ParsedContent {
    pub fn new(url: ResolvedUrl, kind: ResourceKind, source: String) -> Self {
        let fragment = (kind == ResourceKind::Document).then(|| Document::parse_fragment(&source));
        Self {
            url,
            kind,
            source,
            fragment,
        }
    }

    /// Base url for references inside this resource: the `<base href>` of a
    /// document if it has one, the resource url otherwise.
    pub fn base_url(&self) -> ResolvedUrl {
        self.fragment
            .as_ref()
            .and_then(|doc| {
                let base = doc.find_element("base")?;
                let href = doc.attr(base, "href")?;
                crate::url::resolve(self.url.as_str(), href)
            })
            .unwrap_or_else(|| self.url.clone())
    }
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Resolve `reference` as written inside `base`. `None` for references
    /// the analyzer cannot follow (external origins, bare specifiers).
    fn resolve(&self, reference: &str, base: &ResolvedUrl) -> Option<ResolvedUrl>;

    /// Outgoing edges of `url`, in source order.
    async fn edges_of(&self, url: &ResolvedUrl) -> Result<Vec<Edge>, AnalyzerError>;

    /// Parsed content of `url`.
    async fn content_of(&self, url: &ResolvedUrl) -> Result<Arc<ParsedContent>, AnalyzerError>;
}
