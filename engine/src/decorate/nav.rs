use tracing::debug;

use crate::dom::{Dom, NodeId};

const TOP_LEVEL: &[&str] = &["nav-top", "nav-bottom"];
const TOP_GROUP: &[&str] = &["nav-global", "nav-items"];
const BOTTOM_GROUP: &[&str] = &["nav-left", "nav-center", "nav-right"];

/// Class the i-th element with the i-th name; extra elements are left alone.
fn add_positional_classes(dom: &mut Dom, elems: &[NodeId], classes: &[&str]) {
    for (&el, class) in elems.iter().zip(classes) {
        dom.add_class(el, class);
    }
}

/// Parse `markup` into a `div.nav`, apply the positional classes and append
/// it to `header`. Returns `false` when the document has no header.
pub fn decorate_header(dom: &mut Dom, markup: &str) -> bool {
    let Some(header) = dom.find_first("header") else {
        debug!("no header, navigation skipped");
        return false;
    };

    let nav = dom.create_tag("div", &[("class", "nav")]);
    dom.set_inner_html(nav, markup);

    let groups = dom.element_children(nav);
    add_positional_classes(dom, &groups, TOP_LEVEL);
    if let Some(&top) = groups.first() {
        let items = dom.element_children(top);
        add_positional_classes(dom, &items, TOP_GROUP);
    }
    if let Some(&bottom) = groups.get(1) {
        let items = dom.element_children(bottom);
        add_positional_classes(dom, &items, BOTTOM_GROUP);
    }

    dom.append_child(header, nav);
    debug!(groups = groups.len(), "navigation injected");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV: &str = r#"<div><div>Global</div><div>Items</div></div>
<div><div>Left</div><div>Center</div><div>Right</div></div>"#;

    #[test]
    fn test_nav_gets_positional_classes() {
        let mut dom = Dom::parse("<header></header><main></main>");
        assert!(decorate_header(&mut dom, NAV));

        let root = dom.root();
        let expect = [
            ("header > .nav > .nav-top > .nav-global", "Global"),
            ("header > .nav > .nav-top > .nav-items", "Items"),
            ("header > .nav > .nav-bottom > .nav-left", "Left"),
            (".nav-bottom > .nav-center", "Center"),
            (".nav-bottom > .nav-right", "Right"),
        ];
        for (selector, text) in expect {
            let node = dom.query_selector(root, selector).unwrap().unwrap();
            assert_eq!(dom.text_content(node), text, "{selector}");
        }
    }

    #[test]
    fn test_short_markup_classes_what_exists() {
        let mut dom = Dom::parse("<header></header>");
        assert!(decorate_header(&mut dom, "<ul><li>Home</li></ul>"));
        let root = dom.root();
        let top = dom.query_selector(root, ".nav-top").unwrap().unwrap();
        assert_eq!(dom.tag_name(top), Some("ul"));
        assert!(dom.query_selector(root, ".nav-bottom").unwrap().is_none());
        assert!(dom.query_selector(root, "li.nav-global").unwrap().is_some());
    }

    #[test]
    fn test_missing_header_is_skipped() {
        let mut dom = Dom::parse("<main></main>");
        assert!(!decorate_header(&mut dom, NAV));
        assert!(!dom.to_html().contains("nav"));
    }
}
