//! Rebasing content that moves to a new base url.
//!
//! When an imported document is spliced into a bundle, or a stylesheet is
//! turned into a `<style>`, every relative reference inside it must still
//! point at the same resource when read from the bundle's location.

use bindery_graph::analysis::scan::{
    css_references, is_path_specifier, module_specifiers, rewrite_specifiers,
};
use bindery_graph::url::{
    is_absolute_or_external, rebase_href, relativize, resolve, strip_file_search_hash,
};
use bindery_graph::{Document, NodeId, ResolvedUrl};

/// Attributes holding a url.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "assetpath"];

/// Rebase `url()` and `@import` references of a stylesheet.
pub fn rebase_css(css: &str, old_base: &str, new_base: &str) -> String {
    relocate_css(css, old_base, new_base, |_| None)
}

/// Rebase a stylesheet, pointing every reference for which `retarget`
/// returns a url at that url instead (relative to `new_base`).
pub fn relocate_css(
    css: &str,
    old_base: &str,
    new_base: &str,
    mut retarget: impl FnMut(&ResolvedUrl) -> Option<ResolvedUrl>,
) -> String {
    let references = css_references(css);
    rewrite_specifiers(css, &references, |reference| {
        if is_external(&reference.value) {
            return None;
        }
        let resolved = resolve(old_base, &reference.value)?;
        if let Some(target) = retarget(&resolved) {
            return Some(relativize(new_base, target.as_str()));
        }
        (old_base != new_base && !is_absolute_or_external(&reference.value))
            .then(|| rebase_href(&reference.value, old_base, new_base))
    })
}

/// Scheme-qualified, protocol-relative, fragment-only or templated: never
/// resolved against a base.
fn is_external(reference: &str) -> bool {
    is_absolute_or_external(reference) && !(reference.starts_with('/') && !reference.starts_with("//"))
}

/// A relative url usable as a module specifier: bare names would be taken as
/// package imports, so they get a `./` prefix.
pub fn module_specifier(relative: &str) -> String {
    if relative.is_empty() {
        "./".to_string()
    } else if is_path_specifier(relative) || is_absolute_or_external(relative) {
        relative.to_string()
    } else {
        format!("./{relative}")
    }
}

/// Rebase the relative import specifiers of a module.
pub fn rebase_module_imports(source: &str, old_base: &str, new_base: &str) -> String {
    relocate_module_imports(source, old_base, new_base, |_| None)
}

/// Rebase the path specifiers of a module, static and dynamic, pointing
/// every specifier for which `retarget` returns a url at that url instead.
/// Bare specifiers are left alone.
pub fn relocate_module_imports(
    source: &str,
    old_base: &str,
    new_base: &str,
    mut retarget: impl FnMut(&ResolvedUrl) -> Option<ResolvedUrl>,
) -> String {
    let specifiers = module_specifiers(source);
    rewrite_specifiers(source, &specifiers, |specifier| {
        if !is_path_specifier(&specifier.value) || is_external(&specifier.value) {
            return None;
        }
        let resolved = resolve(old_base, &specifier.value)?;
        if let Some(target) = retarget(&resolved) {
            return Some(module_specifier(&relativize(new_base, target.as_str())));
        }
        let relative = specifier.value.starts_with("./") || specifier.value.starts_with("../");
        (relative && old_base != new_base)
            .then(|| module_specifier(&rebase_href(&specifier.value, old_base, new_base)))
    })
}

fn in_template(doc: &Document, node: NodeId) -> bool {
    doc.has_ancestor(node, |doc, ancestor| doc.is_element(ancestor, "template"))
}

/// Rebase every url-bearing attribute, inline style and inline module
/// script in `nodes` and their subtrees from `old_base` to `new_base`.
///
/// Content inside `<template>` is left alone unless `rewrite_templates` is
/// set; `<dom-module>` elements get an `assetpath` instead, so templates can
/// resolve their urls at runtime.
pub fn rebase_nodes(
    doc: &mut Document,
    nodes: &[NodeId],
    old_base: &str,
    new_base: &str,
    rewrite_templates: bool,
) {
    if old_base == new_base {
        return;
    }

    let mut targets = Vec::new();
    for node in nodes {
        targets.push(*node);
        targets.extend(doc.descendants(*node));
    }

    for node in targets {
        let Some(tag) = doc.tag_name(node).map(str::to_string) else {
            continue;
        };
        if !rewrite_templates && in_template(doc, node) {
            continue;
        }

        for attr in URL_ATTRIBUTES {
            if let Some(value) = doc.attr(node, attr) {
                let rebased = rebase_href(value, old_base, new_base);
                doc.set_attr(node, attr, &rebased);
            }
        }
        if let Some(style) = doc.attr(node, "style") {
            let rebased = rebase_css(style, old_base, new_base);
            doc.set_attr(node, "style", &rebased);
        }

        match tag.as_str() {
            "style" => {
                let css = doc.text_content(node);
                doc.set_text_content(node, &rebase_css(&css, old_base, new_base));
            }
            "script" if is_inline_module(doc, node) => {
                let source = doc.text_content(node);
                doc.set_text_content(node, &rebase_module_imports(&source, old_base, new_base));
            }
            "dom-module" if !doc.has_attr(node, "assetpath") => {
                let directory = strip_file_search_hash(old_base);
                let assetpath = relativize(new_base, directory.as_str());
                if !assetpath.is_empty() {
                    doc.set_attr(node, "assetpath", &assetpath);
                }
            }
            _ => {}
        }
    }
}

fn is_inline_module(doc: &Document, node: NodeId) -> bool {
    !doc.has_attr(node, "src")
        && doc
            .attr(node, "type")
            .is_some_and(|value| value.eq_ignore_ascii_case("module"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_urls_follow_the_move() {
        let css = r#"@import "theme.css"; .a { background: url('img/a.png') } .b { background: url(data:image/png;base64,xx) }"#;
        assert_eq!(
            rebase_css(css, "/components/x/x.css", "/index.html"),
            r#"@import "components/x/theme.css"; .a { background: url('components/x/img/a.png') } .b { background: url(data:image/png;base64,xx) }"#
        );
    }

    #[test]
    fn module_specifiers_stay_relative() {
        let js = "import a from './a.js';\nimport x from 'pkg';\nimport('../lazy.js');";
        assert_eq!(
            rebase_module_imports(js, "/lib/m/main.js", "/index.html"),
            "import a from './lib/m/a.js';\nimport x from 'pkg';\nimport('./lib/lazy.js');"
        );
    }

    #[test]
    fn retargeted_references_point_at_their_bundle() {
        let css = "@import 'shared.css';\n.a { background: url(a.png) }";
        let relocated = relocate_css(css, "/app/theme.css", "/app/index.html", |url| {
            (url.as_str() == "/app/shared.css").then(|| ResolvedUrl::new("/shared_bundle_1.css"))
        });
        assert_eq!(
            relocated,
            "@import '../shared_bundle_1.css';\n.a { background: url(a.png) }"
        );

        let js = "import { a } from '/lib/a.js';\nimport b from './b.js';\nimport('./c.js');";
        let relocated = relocate_module_imports(js, "/app/main.js", "/app/main.js", |url| {
            (url.as_str() != "/app/b.js").then(|| ResolvedUrl::new("/shared_bundle_2.js"))
        });
        assert_eq!(
            relocated,
            "import { a } from '../shared_bundle_2.js';\nimport b from './b.js';\nimport('../shared_bundle_2.js');"
        );
    }

    #[test]
    fn document_attributes_rebased_outside_templates() {
        let mut doc = Document::parse_fragment(
            r##"<dom-module id="x-a"><template><img src="in-template.png"></template></dom-module><img src="a.png" style="background: url(b.png)"><a href="#top">top</a><form action="go"></form><style>.c { background: url(c.png) }</style>"##,
        );
        let nodes = doc.children(doc.root()).to_vec();
        rebase_nodes(&mut doc, &nodes, "/components/x/x.html", "/index.html", false);
        assert_eq!(
            doc.serialize(),
            r##"<dom-module id="x-a" assetpath="components/x/"><template><img src="in-template.png"></template></dom-module><img src="components/x/a.png" style="background: url(components/x/b.png)"><a href="#top">top</a><form action="components/x/go"></form><style>.c { background: url(components/x/c.png) }</style>"##
        );
    }

    #[test]
    fn templates_rebased_on_request() {
        let mut doc = Document::parse_fragment(r#"<template><img src="a.png"></template>"#);
        let nodes = doc.children(doc.root()).to_vec();
        rebase_nodes(&mut doc, &nodes, "/x/y.html", "/index.html", true);
        assert_eq!(doc.serialize(), r#"<template><img src="x/a.png"></template>"#);
    }
}
