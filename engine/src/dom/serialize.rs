use super::{Dom, NodeId, NodeType};
use crate::parser::html::tokenizer::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};

impl Dom {
    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].node_type {
            NodeType::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeType::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeType::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeType::Text(text) => {
                let raw = self
                    .parent(id)
                    .and_then(|p| self.tag_name(p))
                    .is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
                if raw {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            NodeType::Element(el) => {
                out.push('<');
                out.push_str(&el.tag_name);
                for (name, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&el.tag_name.as_str()) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag_name);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
