//! HTML5 serialization of the arena tree.

use super::{Document, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

impl Document {
    /// Serialize the whole tree.
    pub fn serialize(&self) -> String {
        self.serialize_children(self.root)
    }

    /// Serialize `node` including its own tag.
    pub fn serialize_node(&self, node: NodeId) -> String {
        let mut out = String::new();
        write_node(self, node, &mut out);
        out
    }

    /// Serialize only the children of `node`.
    pub fn serialize_children(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            write_node(self, *child, &mut out);
        }
        out
    }
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    match doc.data(node) {
        NodeData::Document => {
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
        }
        NodeData::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) => {
            let raw = doc
                .parent(node)
                .and_then(|parent| doc.tag_name(parent))
                .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
            if raw {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Element { name, attrs } => {
            out.push('<');
            out.push_str(name);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                // Boolean attributes are written bare.
                if !attr.value.is_empty() {
                    out.push_str("=\"");
                    escape_attr(&attr.value, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_voids_raw_text_and_escapes() {
        let doc = Document::parse_fragment(
            r#"<link rel="import" href="a&amp;b.html"><script>if (a < b) {}</script><p title='say "hi"'>1 &lt; 2</p><div hidden></div>"#,
        );
        assert_eq!(
            doc.serialize(),
            r#"<link rel="import" href="a&amp;b.html"><script>if (a < b) {}</script><p title="say &quot;hi&quot;">1 &lt; 2</p><div hidden></div>"#
        );
    }

    #[test]
    fn full_document_round_trips_structure() {
        let doc = Document::parse("<!DOCTYPE html><html><head></head><body><!-- c --></body></html>");
        assert_eq!(
            doc.serialize(),
            "<!DOCTYPE html><html><head></head><body><!-- c --></body></html>"
        );
    }
}
