//! Arena-backed document tree.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]; a
//! node removed from the tree stays in the arena, detached. All mutation is
//! index based (splice, insert, remove), so a tree can be freely rewritten
//! while the caller holds ids of other nodes.
//!
//! Parsing is delegated to `html5ever` (see [`Document::parse`] and
//! [`Document::parse_fragment`]); serialization lives in [`serialize`].

mod parse;
pub mod serialize;

use std::fmt;

/// Handle to a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype { name: String },
    Element { name: String, attrs: Vec<Attribute> },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(name);
        for (attr, value) in attrs {
            self.set_attr(id, attr, value);
        }
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Doctype {
            name: name.to_string(),
        })
    }

    /// Detach `id` from its parent. The node and its subtree stay usable.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Insert `child` as the previous sibling of `reference`. Does nothing
    /// when `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if reference == child {
            return;
        }
        self.remove(child);
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        let index = self.index_in_parent(reference).unwrap_or(0);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
    }

    /// Insert every node of `children`, in order, before `reference`.
    pub fn insert_all_before(&mut self, reference: NodeId, children: &[NodeId]) {
        for child in children {
            self.insert_before(reference, *child);
        }
    }

    /// Put `replacement` where `old` was and detach `old`.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) {
        self.insert_before(old, replacement);
        self.remove(old);
    }

    fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id.0].parent?;
        self.nodes[parent.0]
            .children
            .iter()
            .position(|child| *child == id)
    }

    /// Siblings that follow `id`, in order.
    pub fn following_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match (self.parent(id), self.index_in_parent(id)) {
            (Some(parent), Some(index)) => self.nodes[parent.0].children[index + 1..].to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .map(|previous| self.nodes[parent.0].children[previous])
    }

    /// True when `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |node| self.parent(*node))
    }

    pub fn has_ancestor(&self, id: NodeId, predicate: impl Fn(&Document, NodeId) -> bool) -> bool {
        self.ancestors(id).any(|ancestor| predicate(self, ancestor))
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn query(&self, root: NodeId, predicate: impl Fn(&Document, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|node| predicate(self, *node))
    }

    pub fn query_all(
        &self,
        root: NodeId,
        predicate: impl Fn(&Document, NodeId) -> bool,
    ) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| predicate(self, *node))
            .collect()
    }

    /// First element called `name` anywhere in the tree.
    pub fn find_element(&self, name: &str) -> Option<NodeId> {
        self.query(self.root, |doc, node| doc.is_element(node, name))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.find_element("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_element("body")
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.tag_name(id) == Some(name)
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.data(id) {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs.iter_mut().find(|attr| attr.name == name) {
                Some(attr) => attr.value = value.to_string(),
                None => attrs.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            attrs.retain(|attr| attr.name != name);
        }
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeData::Text(text) = self.data(id) {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match self.data(node) {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(existing) = &mut self.nodes[id.0].data {
            *existing = text.to_string();
            return;
        }
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append(id, node);
        }
    }

    pub fn comment_text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Comment(text) => Some(text),
            _ => None,
        }
    }

    /// True for text nodes holding only whitespace.
    pub fn is_blank_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Text(text) if text.trim().is_empty())
    }

    /// Deep copy `node` (and its subtree) out of `other` into this arena.
    /// The copy is returned detached.
    pub fn import_subtree(&mut self, other: &Document, node: NodeId) -> NodeId {
        let copy = self.push(other.data(node).clone());
        for child in other.children(node) {
            let child_copy = self.import_subtree(other, *child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Deep copy every child of `node` in `other`; returns the detached copies.
    pub fn import_children(&mut self, other: &Document, node: NodeId) -> Vec<NodeId> {
        other
            .children(node)
            .iter()
            .map(|child| self.import_subtree(other, *child))
            .collect()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.nodes[parent.0].children.get(index + 1).copied()
    }

    /// Remove `id` together with the whitespace text right after it, so
    /// removed or relocated nodes don't leave blank lines behind.
    pub fn remove_with_newline(&mut self, id: NodeId) {
        if let Some(next) = self.next_sibling(id) {
            if self.is_blank_text(next) {
                self.remove(next);
            }
        }
        self.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_insert_and_remove_keep_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        doc.append(root, a);
        doc.append(root, c);
        doc.insert_before(c, b);
        assert_eq!(doc.children(root), &[a, b, c]);

        doc.remove(b);
        assert_eq!(doc.children(root), &[a, c]);
        assert!(!doc.is_attached(b));

        doc.prepend(root, b);
        assert_eq!(doc.children(root), &[b, a, c]);
        assert_eq!(doc.following_siblings(b), vec![a, c]);
    }

    #[test]
    fn moving_a_node_detaches_it_first() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append(root, outer);
        doc.append(root, inner);
        doc.append(outer, inner);
        assert_eq!(doc.children(root), &[outer]);
        assert_eq!(doc.children(outer), &[inner]);
        assert_eq!(doc.parent(inner), Some(outer));
    }

    #[test]
    fn attributes_and_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let style = doc.create_element_with_attrs("style", &[("media", "print")]);
        doc.append(root, style);
        doc.set_text_content(style, "a { color: red }");
        assert_eq!(doc.attr(style, "media"), Some("print"));
        assert_eq!(doc.text_content(style), "a { color: red }");

        doc.set_attr(style, "media", "screen");
        doc.remove_attr(style, "nope");
        assert_eq!(doc.attrs(style).len(), 1);
        assert_eq!(doc.attr(style, "media"), Some("screen"));
    }

    #[test]
    fn import_subtree_copies_deeply() {
        let source = Document::parse_fragment("<div id=x><p>hi</p></div>");
        let mut target = Document::new();
        let copies = target.import_children(&source, source.root());
        let root = target.root();
        for node in &copies {
            target.append(root, *node);
        }
        let div = target.find_element("div").unwrap();
        assert_eq!(target.attr(div, "id"), Some("x"));
        assert_eq!(target.text_content(div), "hi");
    }

    #[test]
    fn descendants_are_in_document_order() {
        let doc = Document::parse_fragment("<a><b></b><c><d></d></c></a><e></e>");
        let names: Vec<&str> = doc
            .descendants(doc.root())
            .into_iter()
            .filter_map(|node| doc.tag_name(node))
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }
}
