//! html5ever adapter: parse into an `RcDom`, then copy into the arena.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, QualName, local_name, namespace_url, ns, parse_document, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::{Attribute, Document, NodeData, NodeId};

impl Document {
    /// Parse a complete document. The result always has `html`, `head` and
    /// `body` elements, implied if the source omits them.
    pub fn parse(html: &str) -> Document {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        let mut doc = Document::new();
        let root = doc.root();
        for child in dom.document.children.borrow().iter() {
            copy_node(&mut doc, root, child);
        }
        doc
    }

    /// Parse an imported document as a fragment in `body` context, so no
    /// `html`/`head`/`body` wrappers are implied. Head-only elements such as
    /// `<link>`, `<meta>` and `<style>` are kept where they appear.
    pub fn parse_fragment(html: &str) -> Document {
        let context = QualName::new(None, ns!(html), local_name!("body"));
        let dom =
            parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new()).one(html);
        let mut doc = Document::new();
        let root = doc.root();
        // The fragment parser hangs its output off a synthetic <html> element.
        for child in dom.document.children.borrow().iter() {
            match &child.data {
                RcNodeData::Element { .. } => {
                    for grandchild in child.children.borrow().iter() {
                        copy_node(&mut doc, root, grandchild);
                    }
                }
                _ => copy_node(&mut doc, root, child),
            }
        }
        doc
    }
}

fn copy_node(doc: &mut Document, parent: NodeId, handle: &Handle) {
    let id = match &handle.data {
        RcNodeData::Document => {
            for child in handle.children.borrow().iter() {
                copy_node(doc, parent, child);
            }
            return;
        }
        RcNodeData::Doctype { name, .. } => doc.create_doctype(name),
        RcNodeData::Text { contents } => doc.create_text(&contents.borrow()),
        RcNodeData::Comment { contents } => doc.create_comment(contents),
        RcNodeData::ProcessingInstruction { .. } => return,
        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| Attribute {
                    name: match &attr.name.prefix {
                        Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                        None => attr.name.local.to_string(),
                    },
                    value: attr.value.to_string(),
                })
                .collect();
            let id = doc.push(NodeData::Element {
                name: name.local.to_string(),
                attrs,
            });
            // Template contents are kept as ordinary children.
            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter() {
                    copy_node(doc, id, child);
                }
            }
            id
        }
    };
    doc.append(parent, id);
    for child in handle.children.borrow().iter() {
        copy_node(doc, id, child);
    }
}
