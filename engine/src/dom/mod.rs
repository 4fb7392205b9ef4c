mod node;
mod query;
mod serialize;

pub use node::{ElementData, Node, NodeId, NodeType};

use crate::parser::html::tree_builder::HtmlParser;

/// Arena-backed document tree. Node 0 is always the document node.
///
/// Detached nodes stay in the arena; they are simply unreachable from the
/// root and never show up in queries or serialization.
#[derive(Debug, Clone)]
pub struct Dom {
    pub nodes: Vec<Node>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                children: vec![],
                parent: None,
                node_type: NodeType::Document,
            }],
        }
    }

    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        HtmlParser::new(html).parse()
    }

    pub fn root(&self) -> NodeId {
        0
    }

    fn push_node(&mut self, node_type: NodeType, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            children: vec![],
            parent,
            node_type,
        });
        if let Some(pid) = parent {
            self.nodes[pid].children.push(id);
        }
        id
    }

    pub fn create_element(&mut self, tag_name: &str, attrs: Vec<(String, String)>, parent: Option<NodeId>) -> NodeId {
        self.push_node(NodeType::Element(ElementData::new(tag_name, attrs)), parent)
    }

    pub fn create_text(&mut self, text: &str, parent: Option<NodeId>) -> NodeId {
        self.push_node(NodeType::Text(text.to_string()), parent)
    }

    pub fn create_comment(&mut self, text: &str, parent: Option<NodeId>) -> NodeId {
        self.push_node(NodeType::Comment(text.to_string()), parent)
    }

    pub fn create_doctype(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        self.push_node(NodeType::Doctype(name.to_string()), parent)
    }

    /// Create a detached element carrying the given attributes.
    pub fn create_tag(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.create_element(name, attrs, None)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id).and_then(Node::element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.nodes.get_mut(id).and_then(Node::element_mut)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag_name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].is_element())
            .collect()
    }

    /// Unlink a node from its parent. The subtree stays intact and arena
    /// slots are never reclaimed.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(pid) = self.nodes[id].parent.take() {
            self.nodes[pid].children.retain(|&c| c != id);
        }
    }

    /// Move `child` (from wherever it is) to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.is_ancestor_of(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    fn is_ancestor_of(&self, candidate: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == candidate)
    }

    /// Parents of `id`, nearest first, up to and including the document.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id].parent, move |&p| self.nodes[p].parent)
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    pub fn find_first(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.tag_name(id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.find_first("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_first("body")
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.add_class(class);
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.remove_class(class);
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.element(id)
            .map(|el| el.classes().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|d| match &self.nodes[d].node_type {
                NodeType::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace the children of `id` with the nodes parsed from `html`.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        for child in self.nodes[id].children.clone() {
            self.detach(child);
        }
        HtmlParser::new(html).parse_fragment(self, id);
    }
}
