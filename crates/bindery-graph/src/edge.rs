//! Edges between resources and the link nodes that declare them.

use serde::{Deserialize, Serialize};

use crate::document::{Document, NodeId};
use crate::url::ResolvedUrl;

/// What kind of resource a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    DocumentImport,
    ScriptImport,
    StyleImport,
}

/// Kind of a resource itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    Script,
    Style,
}

impl ResourceKind {
    /// Guess the kind from a url's file extension. Unknown extensions are
    /// treated as documents.
    pub fn from_url(url: &ResolvedUrl) -> Self {
        match url.extension().as_deref() {
            Some("js" | "mjs" | "cjs") => ResourceKind::Script,
            Some("css") => ResourceKind::Style,
            _ => ResourceKind::Document,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Document => "html",
            ResourceKind::Script => "js",
            ResourceKind::Style => "css",
        }
    }
}

impl From<EdgeKind> for ResourceKind {
    fn from(kind: EdgeKind) -> Self {
        match kind {
            EdgeKind::DocumentImport => ResourceKind::Document,
            EdgeKind::ScriptImport => ResourceKind::Script,
            EdgeKind::StyleImport => ResourceKind::Style,
        }
    }
}

/// A directed, resolved reference from one resource to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub target: ResolvedUrl,
    pub kind: EdgeKind,
    /// Conditionally or deferred loaded (`lazy-import` links, `import()` calls).
    pub lazy: bool,
}

impl Edge {
    pub fn eager(target: impl Into<ResolvedUrl>, kind: EdgeKind) -> Self {
        Self {
            target: target.into(),
            kind,
            lazy: false,
        }
    }

    pub fn lazy(target: impl Into<ResolvedUrl>, kind: EdgeKind) -> Self {
        Self {
            target: target.into(),
            kind,
            lazy: true,
        }
    }
}

/// A link element found in a document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub node: NodeId,
    pub kind: EdgeKind,
    pub lazy: bool,
    /// `type="module"` on a script.
    pub module: bool,
    /// Attribute carrying the reference (`href` or `src`).
    pub attr: &'static str,
    pub href: String,
}

impl LinkRef {
    /// Classify `node` as a link, or `None` when it declares no edge.
    pub fn classify(doc: &Document, node: NodeId) -> Option<LinkRef> {
        let tag = doc.tag_name(node)?;
        let (kind, lazy, attr) = match tag {
            "link" => {
                let rel = doc.attr(node, "rel")?.to_ascii_lowercase();
                let rels: Vec<&str> = rel.split_ascii_whitespace().collect();
                let is_css_type = doc
                    .attr(node, "type")
                    .is_some_and(|value| value.eq_ignore_ascii_case("css"));
                if rels.contains(&"lazy-import") {
                    (EdgeKind::DocumentImport, true, "href")
                } else if rels.contains(&"import") && is_css_type {
                    (EdgeKind::StyleImport, false, "href")
                } else if rels.contains(&"import") {
                    (EdgeKind::DocumentImport, false, "href")
                } else if rels.contains(&"stylesheet") {
                    (EdgeKind::StyleImport, false, "href")
                } else {
                    return None;
                }
            }
            "script" => (EdgeKind::ScriptImport, false, "src"),
            _ => return None,
        };

        let href = doc.attr(node, attr)?.trim().to_string();
        if href.is_empty() {
            return None;
        }
        let module = kind == EdgeKind::ScriptImport
            && doc
                .attr(node, "type")
                .is_some_and(|value| value.eq_ignore_ascii_case("module"));

        Some(LinkRef {
            node,
            kind,
            lazy,
            module,
            attr,
            href,
        })
    }

    /// Eager document import, the only link kind that is relocated into the
    /// synthetic container.
    pub fn is_eager_import(&self) -> bool {
        self.kind == EdgeKind::DocumentImport && !self.lazy
    }
}

/// Every link below `root`, in document order.
pub fn links_in(doc: &Document, root: NodeId) -> Vec<LinkRef> {
    doc.descendants(root)
        .into_iter()
        .filter_map(|node| LinkRef::classify(doc, node))
        .collect()
}
