//! Html bundle assembly.
//!
//! Turns the primary document of a bundle (or an empty document for bundles
//! that are not written over one of their own files) into the bundle's
//! output:
//!
//! ```text
//!  load ─► base tag ─► inject links ─► hide imports ─► inline ─► comments ─► serialize
//! ```

use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use tracing::trace;

use bindery_graph::analysis::scan::has_module_syntax;
use bindery_graph::edge::{EdgeKind, LinkRef, links_in};
use bindery_graph::url::relativize;
use bindery_graph::{
    Analyzer, Bundle, BundleManifest, DepsIndex, Document, NodeId, ResolvedUrl, ResourceKind,
};

use crate::error::Result;
use crate::inliner::{Contents, Inliner, check_legacy, is_template};
use crate::options::{BundlerOptions, InjectionPolicy};
use crate::rebase::rebase_nodes;

/// Marker attribute of the container holding relocated imports.
pub const HIDDEN_CONTAINER_ATTR: &str = "by-bindery";

pub(crate) struct HtmlAssembler<'a> {
    pub manifest: &'a BundleManifest,
    pub deps: &'a DepsIndex,
    pub contents: &'a Contents,
    pub analyzer: &'a dyn Analyzer,
    pub options: &'a BundlerOptions,
}

impl HtmlAssembler<'_> {
    /// Assemble `bundle`, filling in its bookkeeping sets. Returns the
    /// serialized document.
    pub fn assemble(&self, bundle: &mut Bundle) -> Result<String> {
        let url = bundle.url.clone();
        let (mut doc, template_base) = match self.contents.get(&url) {
            Some(content) if bundle.is_file_backed() => {
                (Document::parse(&content.source), content.base_url())
            }
            _ => (Document::parse(""), url.clone()),
        };
        check_legacy(&doc, &url)?;

        self.emulate_base_tag(&mut doc, &url);
        self.inject_bundle_links(&mut doc, bundle);
        move_ordered_imperatives(&mut doc);
        move_unhidden_imports(&mut doc);

        Inliner {
            bundle: &mut *bundle,
            manifest: self.manifest,
            contents: self.contents,
            analyzer: self.analyzer,
            options: self.options,
            lazy_links: FxHashSet::default(),
        }
        .run(&mut doc, &template_base)?;

        if self.options.strip_comments {
            strip_comments(&mut doc);
        }
        remove_empty_containers(&mut doc);
        Ok(doc.serialize())
    }

    /// Remove the document's `<base>` and make every reference it affected
    /// relative to the document url instead. A `target` on the base element
    /// is copied onto links and forms that have none.
    fn emulate_base_tag(&self, doc: &mut Document, url: &ResolvedUrl) {
        let Some(base) = doc.find_element("base") else {
            return;
        };
        let href = doc.attr(base, "href").map(str::to_string);
        let target = doc.attr(base, "target").map(str::to_string);
        doc.remove_with_newline(base);

        if let Some(href) = href {
            if let Some(base_url) = self.analyzer.resolve(&href, url) {
                let nodes = doc.children(doc.root()).to_vec();
                rebase_nodes(
                    doc,
                    &nodes,
                    base_url.as_str(),
                    url.as_str(),
                    self.options.rewrite_urls_in_templates,
                );
            }
        }
        if let Some(target) = target {
            let root = doc.root();
            let anchors = doc.query_all(root, |doc, node| {
                (doc.is_element(node, "a") || doc.is_element(node, "form"))
                    && !doc.has_attr(node, "target")
                    && !doc.has_ancestor(node, is_template)
            });
            for anchor in anchors {
                doc.set_attr(anchor, "target", &target);
            }
        }
    }

    /// Add links for bundle files that nothing in the document loads yet.
    ///
    /// Documents always get a link. Scripts and styles only get one when no
    /// other file of the bundle loads them, since they are otherwise reached
    /// through that file.
    fn inject_bundle_links(&self, doc: &mut Document, bundle: &Bundle) {
        let url = &bundle.url;
        let direct: Vec<(LinkRef, ResolvedUrl)> = links_in(doc, doc.root())
            .into_iter()
            .filter(|link| !doc.has_ancestor(link.node, is_template))
            .filter_map(|link| {
                let target = self.analyzer.resolve(&link.href, url)?;
                Some((link, target))
            })
            .collect();
        let linked: IndexSet<&ResolvedUrl> = direct.iter().map(|(_, target)| target).collect();

        let mut injected = Vec::new();
        for file in &bundle.files {
            if file == url || linked.contains(file) {
                continue;
            }
            let kind = self.deps.kind_of(file);
            if kind != ResourceKind::Document && self.loaded_within_bundle(bundle, file) {
                continue;
            }
            injected.push((file.clone(), kind));
        }
        if injected.is_empty() {
            return;
        }

        // What each eager import in the document pulls in.
        let reach: Vec<(NodeId, IndexSet<ResolvedUrl>)> = direct
            .iter()
            .filter(|(link, _)| link.is_eager_import())
            .map(|(link, target)| {
                let mut deps = self.deps.transitive_eager_deps(target);
                deps.insert(target.clone());
                (link.node, deps)
            })
            .collect();

        for (file, kind) in injected {
            let href = relativize(url.as_str(), file.as_str());
            let node = match kind {
                ResourceKind::Document => {
                    doc.create_element_with_attrs("link", &[("rel", "import"), ("href", &href)])
                }
                ResourceKind::Style => {
                    doc.create_element_with_attrs("link", &[("rel", "stylesheet"), ("href", &href)])
                }
                ResourceKind::Script if self.is_module(&file) => {
                    doc.create_element_with_attrs("script", &[("type", "module"), ("src", &href)])
                }
                ResourceKind::Script => doc.create_element_with_attrs("script", &[("src", &href)]),
            };

            let dependents: Vec<NodeId> = reach
                .iter()
                .filter(|(_, deps)| deps.contains(&file))
                .map(|(node, _)| *node)
                .collect();
            let anchor = match self.options.injection_policy {
                InjectionPolicy::FirstDependent => dependents.first().copied(),
                InjectionPolicy::LastDependent => dependents.last().copied(),
                InjectionPolicy::Container => None,
            };
            match anchor {
                Some(anchor) => doc.insert_before(anchor, node),
                None => {
                    let container = hidden_container(doc);
                    doc.append(container, node);
                }
            }
            trace!(bundle = %url, url = %file, "injected link");
        }
    }

    /// A script is a module when another script imports it, or when it
    /// imports or exports anything itself.
    fn is_module(&self, file: &ResolvedUrl) -> bool {
        let imported_by_script = self.deps.records().any(|record| {
            record.deps.iter().any(|dep| {
                self.deps.kind_of(dep) == ResourceKind::Script
                    && self.deps.edges_of(dep).iter().any(|edge| edge.target == *file)
            })
        });
        imported_by_script
            || !self.deps.edges_of(file).is_empty()
            || self
                .contents
                .get(file)
                .is_some_and(|content| has_module_syntax(&content.source))
    }

    fn loaded_within_bundle(&self, bundle: &Bundle, file: &ResolvedUrl) -> bool {
        bundle.files.iter().any(|other| {
            other != file
                && self
                    .deps
                    .edges_of(other)
                    .iter()
                    .any(|edge| edge.target == *file && !edge.lazy)
        })
    }
}

fn eager_imports(doc: &Document, root: NodeId) -> Vec<LinkRef> {
    links_in(doc, root)
        .into_iter()
        .filter(|link| link.is_eager_import() && !doc.has_ancestor(link.node, is_template))
        .collect()
}

fn is_hidden_container(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node, "div") && doc.has_attr(node, "hidden")
}

/// The `<div hidden by-bindery>` of `doc`, created on first use: before the
/// first eager import in the body, else at the start of the body, else at
/// the end of the document.
fn hidden_container(doc: &mut Document) -> NodeId {
    let root = doc.root();
    if let Some(existing) = doc.query(root, |doc, node| {
        doc.is_element(node, "div") && doc.has_attr(node, HIDDEN_CONTAINER_ATTR)
    }) {
        return existing;
    }

    let container =
        doc.create_element_with_attrs("div", &[("hidden", ""), (HIDDEN_CONTAINER_ATTR, "")]);
    match doc.body() {
        Some(body) => {
            match eager_imports(doc, body).into_iter().next() {
                Some(link) => doc.insert_before(link.node, container),
                None => doc.prepend(body, container),
            }
        }
        None => doc.append(root, container),
    }
    container
}

/// Imports in `<head>` and everything order-sensitive after the first one
/// move into the hidden container together, so scripts and styles keep
/// running after the imports they follow.
fn move_ordered_imperatives(doc: &mut Document) {
    let Some(head) = doc.head() else {
        return;
    };
    let Some(first) = doc
        .children(head)
        .iter()
        .copied()
        .find(|node| LinkRef::classify(doc, *node).is_some_and(|link| link.is_eager_import()))
    else {
        return;
    };

    let mut moving = vec![first];
    moving.extend(
        doc.following_siblings(first)
            .into_iter()
            .filter(|node| is_ordered_imperative(doc, *node)),
    );
    let container = hidden_container(doc);
    for node in moving {
        doc.remove_with_newline(node);
        doc.append(container, node);
    }
}

fn is_ordered_imperative(doc: &Document, node: NodeId) -> bool {
    match doc.tag_name(node) {
        Some("script" | "style") => true,
        Some("link") => LinkRef::classify(doc, node).is_some_and(|link| {
            link.is_eager_import() || link.kind == EdgeKind::StyleImport
        }),
        _ => false,
    }
}

/// Eager imports not already hidden move into the hidden container.
fn move_unhidden_imports(doc: &mut Document) {
    let root = doc.root();
    let unhidden: Vec<NodeId> = eager_imports(doc, root)
        .into_iter()
        .filter(|link| !doc.has_ancestor(link.node, is_hidden_container))
        .map(|link| link.node)
        .collect();
    if unhidden.is_empty() {
        return;
    }
    let container = hidden_container(doc);
    for node in unhidden {
        doc.remove_with_newline(node);
        doc.append(container, node);
    }
}

/// Drop every comment. `@license` comments are kept once each, moved to the
/// start of `<head>` (or of the document).
fn strip_comments(doc: &mut Document) {
    let root = doc.root();
    let comments = doc.query_all(root, |doc, node| doc.comment_text(node).is_some());
    let mut licenses: IndexSet<String> = IndexSet::new();
    for comment in comments {
        if let Some(text) = doc.comment_text(comment) {
            if text.contains("@license") {
                licenses.insert(text.trim().to_string());
            }
        }
        doc.remove_with_newline(comment);
    }

    let parent = doc.head().unwrap_or(root);
    for text in licenses.iter().rev() {
        let comment = doc.create_comment(&format!(" {text} "));
        doc.prepend(parent, comment);
    }
}

/// Remove hidden containers left with nothing but whitespace.
fn remove_empty_containers(doc: &mut Document) {
    let root = doc.root();
    let containers = doc.query_all(root, |doc, node| {
        doc.is_element(node, "div") && doc.has_attr(node, HIDDEN_CONTAINER_ATTR)
    });
    for container in containers {
        let empty = doc
            .children(container)
            .iter()
            .all(|child| doc.is_blank_text(*child));
        if empty {
            doc.remove_with_newline(container);
        }
    }
}
