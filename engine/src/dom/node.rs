pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag_name: &str, attributes: Vec<(String, String)>) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value in place, or append the attribute if absent.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(idx) => self.attributes[idx].1 = value.to_string(),
            None => self.attributes.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(idx).1)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    /// Class tokens in source order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Adds a class token unless it is already present.
    pub fn add_class(&mut self, class: &str) {
        if class.is_empty() || self.has_class(class) {
            return;
        }
        let mut tokens: Vec<&str> = self.classes().collect();
        tokens.push(class);
        let joined = tokens.join(" ");
        self.set_attr("class", &joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let joined = self
            .classes()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr("class", &joined);
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub node_type: NodeType,
}

impl Node {
    pub fn element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.node_type {
            NodeType::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }
}
