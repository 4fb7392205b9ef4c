// HTML tree builder
// Reference: https://html.spec.whatwg.org/multipage/parsing.html#tree-construction
//
// IMPLEMENTATION STATUS:
// ✅ Initial / BeforeHtml / BeforeHead - implicit html, head, body
// ✅ InHead - meta, link, title, style, script, base, noscript
// ✅ InBody - element creation, void elements, auto-closing of p/li/dd/dt/option/tr/td/th
// ⚠️ End tags - close up to the nearest match, never past body
// ❌ Adoption agency, foster parenting, table modes - not implemented

use super::tokenizer::{Attribute, Token, Tokenizer, VOID_ELEMENTS};
use crate::dom::{Dom, NodeId, NodeType};
use tracing::trace;

#[derive(Debug, Copy, Clone, PartialEq)]
enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    AfterHead,
    InBody,
    AfterBody,
}

const HEAD_ELEMENTS: &[&str] = &["meta", "link", "title", "style", "script", "base", "noscript"];

// Opening one of these implicitly closes an open element of the same name.
const AUTO_CLOSING_TAGS: &[&str] = &["p", "li", "dd", "dt", "option", "tr", "td", "th"];

// Block-level starts that close an open <p>.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

// End tags never pop past these.
const SCOPE_BOUNDARIES: &[&str] = &["body", "html"];

pub struct HtmlParser {
    tokenizer: Tokenizer,
}

struct TreeBuilder {
    stack: Vec<NodeId>,
    mode: InsertionMode,
    html: Option<NodeId>,
    head: Option<NodeId>,
    body: Option<NodeId>,
    fragment: bool,
}

impl HtmlParser {
    pub fn new(input: &str) -> Self {
        Self {
            tokenizer: Tokenizer::new(input),
        }
    }

    pub fn parse(mut self) -> Dom {
        let mut dom = Dom::new();
        let mut builder = TreeBuilder {
            stack: vec![dom.root()],
            mode: InsertionMode::Initial,
            html: None,
            head: None,
            body: None,
            fragment: false,
        };
        while let Some(token) = self.tokenizer.next_token() {
            builder.process(&mut dom, token);
        }
        dom
    }

    /// Parse `self` as the content of `context`, appending to its children.
    pub fn parse_fragment(mut self, dom: &mut Dom, context: NodeId) {
        let mut builder = TreeBuilder {
            stack: vec![context],
            mode: InsertionMode::InBody,
            html: None,
            head: None,
            body: Some(context),
            fragment: true,
        };
        while let Some(token) = self.tokenizer.next_token() {
            builder.process(dom, token);
        }
    }
}

fn convert_attributes(attributes: Vec<Attribute>) -> Vec<(String, String)> {
    attributes.into_iter().map(|a| (a.name, a.value)).collect()
}

impl TreeBuilder {
    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(0)
    }

    fn current_tag<'d>(&self, dom: &'d Dom) -> Option<&'d str> {
        dom.tag_name(self.current())
    }

    fn ensure_html(&mut self, dom: &mut Dom) -> NodeId {
        if let Some(html) = self.html {
            return html;
        }
        let html = dom.create_element("html", vec![], Some(dom.root()));
        self.html = Some(html);
        self.stack.push(html);
        self.mode = InsertionMode::BeforeHead;
        html
    }

    fn ensure_head(&mut self, dom: &mut Dom) -> NodeId {
        if let Some(head) = self.head {
            return head;
        }
        let html = self.ensure_html(dom);
        let head = dom.create_element("head", vec![], Some(html));
        self.head = Some(head);
        self.stack.push(head);
        self.mode = InsertionMode::InHead;
        head
    }

    fn close_head(&mut self) {
        if let Some(head) = self.head {
            if let Some(pos) = self.stack.iter().position(|&n| n == head) {
                self.stack.truncate(pos);
            }
        }
        self.mode = InsertionMode::AfterHead;
    }

    fn ensure_body(&mut self, dom: &mut Dom) -> NodeId {
        if self.fragment {
            return self.current();
        }
        if self.mode == InsertionMode::InHead {
            self.close_head();
        }
        if let Some(body) = self.body {
            if self.mode == InsertionMode::AfterBody {
                self.mode = InsertionMode::InBody;
            }
            return body;
        }
        let html = self.ensure_html(dom);
        if self.head.is_none() {
            let head = dom.create_element("head", vec![], Some(html));
            self.head = Some(head);
        }
        let body = dom.create_element("body", vec![], Some(html));
        self.body = Some(body);
        self.stack.push(body);
        self.mode = InsertionMode::InBody;
        body
    }

    fn append_text(&mut self, dom: &mut Dom, parent: NodeId, text: &str) {
        if let Some(&last) = dom.children(parent).last() {
            if let NodeType::Text(existing) = &mut dom.nodes[last].node_type {
                existing.push_str(text);
                return;
            }
        }
        dom.create_text(text, Some(parent));
    }

    fn before_body(&self) -> bool {
        matches!(
            self.mode,
            InsertionMode::Initial
                | InsertionMode::BeforeHtml
                | InsertionMode::BeforeHead
                | InsertionMode::InHead
                | InsertionMode::AfterHead
        )
    }

    fn process(&mut self, dom: &mut Dom, token: Token) {
        trace!(mode = ?self.mode, ?token, "tree builder");
        match token {
            Token::Eof => {}
            Token::Doctype { name } => {
                if self.mode == InsertionMode::Initial && !self.fragment {
                    dom.create_doctype(name.as_deref().unwrap_or("html"), Some(dom.root()));
                    self.mode = InsertionMode::BeforeHtml;
                }
            }
            Token::Comment(text) => {
                let parent = self.current();
                dom.create_comment(&text, Some(parent));
            }
            Token::Text(text) => self.text(dom, &text),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => self.start_tag(dom, &name, convert_attributes(attributes), self_closing),
            Token::EndTag { name } => self.end_tag(dom, &name),
        }
    }

    fn text(&mut self, dom: &mut Dom, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.before_body() {
            // Content of a head element such as <title> or <style>.
            let in_head_child = self
                .current_tag(dom)
                .is_some_and(|t| HEAD_ELEMENTS.contains(&t));
            if in_head_child {
                let parent = self.current();
                self.append_text(dom, parent, text);
                return;
            }
            if text.trim().is_empty() {
                return;
            }
        }
        let parent = if self.fragment {
            self.current()
        } else {
            self.ensure_body(dom);
            self.current()
        };
        self.append_text(dom, parent, text);
    }

    fn start_tag(&mut self, dom: &mut Dom, tag: &str, attrs: Vec<(String, String)>, self_closing: bool) {
        if self.fragment && matches!(tag, "html" | "head" | "body") {
            return;
        }

        match tag {
            "html" => {
                if self.html.is_none() {
                    let html = dom.create_element("html", attrs, Some(dom.root()));
                    self.html = Some(html);
                    self.stack.push(html);
                    self.mode = InsertionMode::BeforeHead;
                }
                return;
            }
            "head" => {
                if self.head.is_none() {
                    let html = self.ensure_html(dom);
                    let head = dom.create_element("head", attrs, Some(html));
                    self.head = Some(head);
                    self.stack.push(head);
                    self.mode = InsertionMode::InHead;
                }
                return;
            }
            "body" => {
                if self.body.is_none() {
                    if self.mode == InsertionMode::InHead {
                        self.close_head();
                    }
                    let html = self.ensure_html(dom);
                    if self.head.is_none() {
                        let head = dom.create_element("head", vec![], Some(html));
                        self.head = Some(head);
                    }
                    let body = dom.create_element("body", attrs, Some(html));
                    self.body = Some(body);
                    self.stack.push(body);
                }
                self.mode = InsertionMode::InBody;
                return;
            }
            _ => {}
        }

        if self.before_body() && HEAD_ELEMENTS.contains(&tag) {
            let head = self.ensure_head(dom);
            let parent = if self.mode == InsertionMode::InHead { self.current() } else { head };
            let id = dom.create_element(tag, attrs, Some(parent));
            if !self_closing && !VOID_ELEMENTS.contains(&tag) {
                self.stack.push(id);
            }
            return;
        }

        self.ensure_body(dom);

        if AUTO_CLOSING_TAGS.contains(&tag) {
            self.close_same_tag(dom, tag);
        }
        if CLOSES_P.contains(&tag) && self.current_tag(dom) == Some("p") {
            self.stack.pop();
        }

        let parent = self.current();
        let id = dom.create_element(tag, attrs, Some(parent));
        if !self_closing && !VOID_ELEMENTS.contains(&tag) {
            self.stack.push(id);
        }
    }

    /// Pop an open element of the same name, stopping at containers that
    /// scope it (lists for li, dl for dt/dd, table rows for cells).
    fn close_same_tag(&mut self, dom: &Dom, tag: &str) {
        let limits: &[&str] = match tag {
            "li" => &["ul", "ol"],
            "dt" | "dd" => &["dl"],
            "td" | "th" => &["tr", "table"],
            "tr" => &["table", "tbody", "thead", "tfoot"],
            "option" => &["select", "datalist"],
            _ => &[],
        };
        for idx in (0..self.stack.len()).rev() {
            let Some(name) = dom.tag_name(self.stack[idx]) else {
                return;
            };
            if name == tag {
                self.stack.truncate(idx);
                return;
            }
            if SCOPE_BOUNDARIES.contains(&name) || limits.contains(&name) {
                return;
            }
            // Only inline content may sit between a <p> and a new <p>.
            if tag == "p" && CLOSES_P.contains(&name) {
                return;
            }
        }
    }

    fn end_tag(&mut self, dom: &mut Dom, tag: &str) {
        match tag {
            "head" => {
                if self.mode == InsertionMode::InHead {
                    self.close_head();
                }
                return;
            }
            "body" | "html" => {
                if !self.fragment && self.body.is_some() {
                    self.mode = InsertionMode::AfterBody;
                }
                return;
            }
            _ => {}
        }

        // Never pop the fragment context or anything below it.
        let floor = if self.fragment { 1 } else { 0 };
        for idx in (floor..self.stack.len()).rev() {
            let Some(name) = dom.tag_name(self.stack[idx]) else {
                return;
            };
            if name == tag {
                self.stack.truncate(idx);
                return;
            }
            if SCOPE_BOUNDARIES.contains(&name) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(dom: &Dom, id: NodeId) -> Vec<String> {
        dom.element_children(id)
            .into_iter()
            .filter_map(|c| dom.tag_name(c).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_implicit_html_head_body() {
        let dom = HtmlParser::new("<title>x</title><p>hello").parse();
        let html = dom.find_first("html").unwrap();
        assert_eq!(tags(&dom, html), vec!["head", "body"]);
        let head = dom.head().unwrap();
        assert_eq!(tags(&dom, head), vec!["title"]);
        let body = dom.body().unwrap();
        assert_eq!(tags(&dom, body), vec!["p"]);
        assert_eq!(dom.text_content(body), "hello");
    }

    #[test]
    fn test_void_elements_are_not_containers() {
        let dom = HtmlParser::new("<body><picture><source srcset=a.webp><img src=a.png></picture><p>after</p></body>").parse();
        let picture = dom.find_first("picture").unwrap();
        assert_eq!(tags(&dom, picture), vec!["source", "img"]);
        let body = dom.body().unwrap();
        assert_eq!(tags(&dom, body), vec!["picture", "p"]);
    }

    #[test]
    fn test_auto_closing_list_items_and_paragraphs() {
        let dom = HtmlParser::new("<body><ul><li>a<li>b</ul><p>one<p>two<div>x</div></body>").parse();
        let ul = dom.find_first("ul").unwrap();
        assert_eq!(tags(&dom, ul), vec!["li", "li"]);
        let body = dom.body().unwrap();
        assert_eq!(tags(&dom, body), vec!["ul", "p", "p", "div"]);
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let dom = HtmlParser::new("<body><div><span>x</div></span><em>y</em></body>").parse();
        let body = dom.body().unwrap();
        assert_eq!(tags(&dom, body), vec!["div", "em"]);
    }

    #[test]
    fn test_content_after_body_end_lands_in_body() {
        let dom = HtmlParser::new("<html><body><main></main></body></html><div>late</div>").parse();
        let body = dom.body().unwrap();
        assert_eq!(tags(&dom, body), vec!["main", "div"]);
    }

    #[test]
    fn test_fragment_ignores_document_tags() {
        let mut dom = Dom::new();
        let div = dom.create_element("div", vec![], Some(dom.root()));
        HtmlParser::new("<html><body><div>a</div></div></div><div>b</div>").parse_fragment(&mut dom, div);
        assert_eq!(tags(&dom, div), vec!["div", "div"]);
        assert_eq!(dom.parent(div), Some(dom.root()));
    }

    #[test]
    fn test_old_uppercase_markup() {
        let html = r#"<TITLE>What is Hypertext?</TITLE>
<H1>What is HyperText</H1>Hypertext is text.<P>
See also:
<UL>
<LI><A NAME=2 HREF=Terms.html>A list of terms</A>
<LI><A NAME=19 HREF=../Conferences/Overview.html>Conferences</A>
</UL>"#;
        let dom = HtmlParser::new(html).parse();
        let body = dom.body().unwrap();
        assert_eq!(tags(&dom, body), vec!["h1", "p", "ul"]);
        let ul = dom.find_first("ul").unwrap();
        assert_eq!(tags(&dom, ul), vec!["li", "li"]);
        let anchors = dom.query_selector_all(dom.root(), "a").unwrap();
        assert_eq!(dom.attr(anchors[1], "href"), Some("../Conferences/Overview.html"));
    }
}
