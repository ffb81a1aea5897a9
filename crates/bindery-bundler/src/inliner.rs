//! Inlining of in-bundle resources into a bundle document.
//!
//! One pass over the document in tree order. Each link is either spliced in
//! (same bundle), pointed at the bundle that owns its target (other bundle),
//! dropped (already handled), or left alone and recorded as missing (no
//! bundle). Spliced document content is processed recursively at the point
//! of insertion, so the order of effects matches the source order.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use bindery_graph::edge::{EdgeKind, LinkRef, links_in};
use bindery_graph::url::relativize;
use bindery_graph::{
    Analyzer, Bundle, BundleKind, BundleManifest, Document, NodeId, ParsedContent, ResolvedUrl,
};

use crate::error::{BundleError, Result};
use crate::options::BundlerOptions;
use crate::rebase::{relocate_css, relocate_module_imports, rebase_nodes};

/// Loaded content of the files of the bundle being built.
pub(crate) type Contents = FxHashMap<ResolvedUrl, Arc<ParsedContent>>;

pub(crate) fn is_template(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node, "template")
}

/// Fail on `<polymer-element>`, which cannot be bundled correctly.
pub(crate) fn check_legacy(doc: &Document, url: &ResolvedUrl) -> Result<()> {
    match doc.find_element("polymer-element") {
        Some(_) => Err(BundleError::LegacyConstruct { url: url.clone() }),
        None => Ok(()),
    }
}

pub(crate) struct Inliner<'a> {
    pub bundle: &'a mut Bundle,
    pub manifest: &'a BundleManifest,
    pub contents: &'a Contents,
    pub analyzer: &'a dyn Analyzer,
    pub options: &'a BundlerOptions,
    /// Hrefs of the lazy links already kept in the document.
    pub lazy_links: FxHashSet<ResolvedUrl>,
}

impl<'a> Inliner<'a> {
    /// Process every link of `doc`. References outside templates are
    /// expected to be relative to the bundle url already; those inside
    /// templates are relative to `template_base`.
    pub fn run(&mut self, doc: &mut Document, template_base: &ResolvedUrl) -> Result<()> {
        let root = doc.root();
        self.bundle.strip_imports.insert(self.bundle.url.clone());
        self.process(doc, &[root], template_base)
    }

    fn process(
        &mut self,
        doc: &mut Document,
        roots: &[NodeId],
        template_base: &ResolvedUrl,
    ) -> Result<()> {
        let mut links = Vec::new();
        for root in roots {
            links.extend(LinkRef::classify(doc, *root));
            links.extend(links_in(doc, *root));
        }

        for link in links {
            if !doc.is_attached(link.node) {
                continue;
            }
            let in_template = doc.has_ancestor(link.node, is_template);
            if in_template && link.kind != EdgeKind::StyleImport {
                continue;
            }
            let base = if in_template && !self.options.rewrite_urls_in_templates {
                template_base.clone()
            } else {
                self.bundle.url.clone()
            };
            let Some(target) = self.analyzer.resolve(&link.href, &base) else {
                continue;
            };
            if self.options.excludes.matches(&target) {
                trace!(url = %target, "excluded, left as is");
                continue;
            }

            match link.kind {
                EdgeKind::DocumentImport => self.document_import(doc, &link, &target, &base)?,
                EdgeKind::ScriptImport => self.script(doc, &link, &target, &base),
                EdgeKind::StyleImport => self.style(doc, &link, &target, &base, in_template),
            }
        }
        Ok(())
    }

    fn owner(&self, target: &ResolvedUrl) -> Option<&'a Bundle> {
        self.manifest.bundle_for_file(target)
    }

    fn missing(&mut self, target: &ResolvedUrl) {
        debug!(bundle = %self.bundle.url, url = %target, "missing import");
        self.bundle.missing_imports.insert(target.clone());
    }

    /// Point `node` at another bundle, once. Returns false when the node was
    /// dropped because that bundle is already linked.
    fn link_to_bundle(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        attr: &str,
        owner: &ResolvedUrl,
        base: &ResolvedUrl,
    ) -> bool {
        if self.bundle.strip_imports.contains(owner) {
            doc.remove_with_newline(node);
            return false;
        }
        doc.set_attr(node, attr, &relativize(base.as_str(), owner.as_str()));
        self.bundle.strip_imports.insert(owner.clone());
        true
    }

    fn document_import(
        &mut self,
        doc: &mut Document,
        link: &LinkRef,
        target: &ResolvedUrl,
        base: &ResolvedUrl,
    ) -> Result<()> {
        let Some(owner) = self.owner(target) else {
            self.missing(target);
            return Ok(());
        };

        if link.lazy {
            let href = if owner.url != self.bundle.url {
                owner.url.clone()
            } else {
                target.clone()
            };
            if !self.lazy_links.insert(href.clone()) {
                doc.remove_with_newline(link.node);
            } else if href != *target {
                doc.set_attr(link.node, "href", &relativize(base.as_str(), href.as_str()));
            }
            return Ok(());
        }
        if owner.url != self.bundle.url {
            self.bundle.strip_imports.insert(target.clone());
            self.link_to_bundle(doc, link.node, "href", &owner.url, base);
            return Ok(());
        }
        if !self.bundle.strip_imports.insert(target.clone()) {
            doc.remove_with_newline(link.node);
            return Ok(());
        }
        let Some(content) = self.contents.get(target) else {
            self.missing(target);
            return Ok(());
        };
        let Some(fragment) = content.fragment.as_ref() else {
            return Ok(());
        };
        check_legacy(fragment, target)?;

        let spliced = doc.import_children(fragment, fragment.root());
        let content_base = content.base_url();
        remove_base_elements(doc, &spliced);
        rebase_nodes(
            doc,
            &spliced,
            content_base.as_str(),
            self.bundle.url.as_str(),
            self.options.rewrite_urls_in_templates,
        );
        doc.insert_all_before(link.node, &spliced);
        doc.remove(link.node);
        self.bundle.inlined_imports.insert(target.clone());
        trace!(bundle = %self.bundle.url, url = %target, "inlined import");

        let template_base = if self.options.rewrite_urls_in_templates {
            self.bundle.url.clone()
        } else {
            content_base
        };
        self.process(doc, &spliced, &template_base)
    }

    fn script(&mut self, doc: &mut Document, link: &LinkRef, target: &ResolvedUrl, base: &ResolvedUrl) {
        let Some(owner) = self.owner(target) else {
            self.missing(target);
            return;
        };

        if owner.url != self.bundle.url {
            self.bundle.strip_imports.insert(target.clone());
            if owner.kind == BundleKind::Html {
                let import = doc.create_element_with_attrs("link", &[("rel", "import"), ("href", "")]);
                doc.replace(link.node, import);
                self.link_to_bundle(doc, import, "href", &owner.url, base);
            } else {
                self.link_to_bundle(doc, link.node, "src", &owner.url, base);
            }
            return;
        }
        if !self.bundle.strip_imports.insert(target.clone()) {
            doc.remove_with_newline(link.node);
            return;
        }
        if !self.options.inline_scripts {
            return;
        }
        let Some(content) = self.contents.get(target) else {
            self.missing(target);
            return;
        };

        let source = if link.module {
            let manifest = self.manifest;
            let bundle_url = &self.bundle.url;
            relocate_module_imports(&content.source, target.as_str(), base.as_str(), |url| {
                manifest
                    .bundle_for_file(url)
                    .filter(|owner| owner.url != *bundle_url)
                    .map(|owner| owner.url.clone())
            })
        } else {
            content.source.clone()
        };

        let script = doc.create_element("script");
        for attr in doc.attrs(link.node).to_vec() {
            if attr.name != "src" {
                doc.set_attr(script, &attr.name, &attr.value);
            }
        }
        doc.set_text_content(script, &escape_script_end(&source));
        doc.replace(link.node, script);
        self.bundle.inlined_scripts.insert(target.clone());
        trace!(bundle = %self.bundle.url, url = %target, "inlined script");
    }

    fn style(
        &mut self,
        doc: &mut Document,
        link: &LinkRef,
        target: &ResolvedUrl,
        base: &ResolvedUrl,
        in_template: bool,
    ) {
        let Some(owner) = self.owner(target) else {
            self.missing(target);
            return;
        };

        if owner.url != self.bundle.url {
            self.bundle.strip_imports.insert(target.clone());
            if owner.kind == BundleKind::Html {
                let import = doc.create_element_with_attrs("link", &[("rel", "import"), ("href", "")]);
                doc.replace(link.node, import);
                self.link_to_bundle(doc, import, "href", &owner.url, base);
            } else {
                self.link_to_bundle(doc, link.node, "href", &owner.url, base);
            }
            return;
        }
        if !self.bundle.strip_imports.insert(target.clone()) {
            doc.remove_with_newline(link.node);
            return;
        }
        if !self.options.inline_css {
            return;
        }
        let Some(content) = self.contents.get(target) else {
            self.missing(target);
            return;
        };

        let manifest = self.manifest;
        let bundle_url = &self.bundle.url;
        let css = relocate_css(&content.source, target.as_str(), base.as_str(), |url| {
            manifest
                .bundle_for_file(url)
                .filter(|owner| owner.url != *bundle_url)
                .map(|owner| owner.url.clone())
        });

        let style = doc.create_element("style");
        if let Some(media) = doc.attr(link.node, "media").map(str::to_string) {
            doc.set_attr(style, "media", &media);
        }
        doc.set_text_content(style, &css);

        let dom_module = (!in_template && is_css_import(doc, link.node))
            .then(|| {
                doc.ancestors(link.node)
                    .find(|node| doc.is_element(*node, "dom-module"))
            })
            .flatten();
        match dom_module {
            Some(module) => {
                let template = module_template(doc, module);
                doc.prepend(template, style);
                doc.remove_with_newline(link.node);
            }
            None => doc.replace(link.node, style),
        }
        self.bundle.inlined_styles.insert(target.clone());
        trace!(bundle = %self.bundle.url, url = %target, "inlined style");
    }
}

/// `<link rel="import" type="css">`, the dom-module style include.
fn is_css_import(doc: &Document, node: NodeId) -> bool {
    doc.attr(node, "rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("import"))
    })
}

/// The `<template>` child of a dom-module, created when missing.
fn module_template(doc: &mut Document, module: NodeId) -> NodeId {
    let existing = doc
        .children(module)
        .iter()
        .copied()
        .find(|child| is_template(doc, *child));
    match existing {
        Some(template) => template,
        None => {
            let template = doc.create_element("template");
            doc.append(module, template);
            template
        }
    }
}

fn remove_base_elements(doc: &mut Document, nodes: &[NodeId]) {
    for node in nodes {
        let mut bases = doc.query_all(*node, |doc, node| doc.is_element(node, "base"));
        if doc.is_element(*node, "base") {
            bases.push(*node);
        }
        for base in bases {
            doc.remove(base);
        }
    }
}

/// Keep inline script text from closing its element early.
pub(crate) fn escape_script_end(source: &str) -> String {
    const END: &str = "</script";
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(index) = find_ignore_ascii_case(rest, END) {
        out.push_str(&rest[..index]);
        out.push_str("<\\/");
        out.push_str(&rest[index + 2..index + END.len()]);
        rest = &rest[index + END.len()..];
    }
    out.push_str(rest);
    out
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_end_tags_are_escaped() {
        assert_eq!(
            escape_script_end("a = '</script>'; b = '</SCRIPT>';"),
            "a = '<\\/script>'; b = '<\\/SCRIPT>';"
        );
        assert_eq!(escape_script_end("plain"), "plain");
    }

    #[test]
    fn legacy_elements_are_rejected() {
        let doc = Document::parse_fragment("<polymer-element name=\"x-a\"></polymer-element>");
        let err = check_legacy(&doc, &"/x-a.html".into()).unwrap_err();
        assert!(matches!(err, BundleError::LegacyConstruct { .. }));
    }

    #[test]
    fn dom_module_templates_are_created_on_demand() {
        let mut doc = Document::parse_fragment("<dom-module id=\"x-a\"></dom-module>");
        let module = doc.find_element("dom-module").unwrap();
        let template = module_template(&mut doc, module);
        assert_eq!(module_template(&mut doc, module), template);
        assert_eq!(
            doc.serialize(),
            "<dom-module id=\"x-a\"><template></template></dom-module>"
        );
    }
}
