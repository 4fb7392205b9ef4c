use tracing::debug;

use super::{BlockDecorator, BlockError};
use crate::dom::{Dom, NodeId};

/// Shows the first slide, hides the rest and appends one nav item per slide.
#[derive(Debug, Clone, Copy, Default)]
pub struct Carousel;

impl BlockDecorator for Carousel {
    fn decorate(&self, dom: &mut Dom, block: NodeId, name: &str) -> Result<(), BlockError> {
        if dom.element(block).is_none() {
            return Err(BlockError::Malformed {
                name: name.to_string(),
                reason: format!("node {block} is not an element"),
            });
        }

        let slides = dom.element_children(block);
        let nav = dom.create_tag("div", &[("class", "carousel-nav")]);

        for (i, &slide) in slides.iter().enumerate() {
            let item = dom.create_tag("div", &[("class", "carousel-nav-item")]);
            if i == 0 {
                dom.add_class(item, "selected");
            } else {
                dom.add_class(slide, "hidden");
            }
            dom.append_child(nav, item);
        }
        dom.append_child(block, nav);

        debug!(block, slides = slides.len(), "carousel decorated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carousel_hides_all_but_first_slide() {
        let mut dom = Dom::parse(
            r#"<div class="carousel block"><div>one</div><div>two</div><div>three</div></div>"#,
        );
        let block = dom.find_first("div").unwrap();
        Carousel.decorate(&mut dom, block, "carousel").unwrap();

        let root = dom.root();
        let hidden = dom.query_selector_all(root, ".carousel > .hidden").unwrap();
        assert_eq!(hidden.len(), 2);
        let items = dom.query_selector_all(root, ".carousel-nav > .carousel-nav-item").unwrap();
        assert_eq!(items.len(), 3);
        assert!(dom.has_class(items[0], "selected"));
        assert!(!dom.has_class(items[1], "selected"));

        let children = dom.element_children(block);
        assert_eq!(children.len(), 4);
        assert!(dom.has_class(children[3], "carousel-nav"));
    }

    #[test]
    fn test_empty_carousel_gets_empty_nav() {
        let mut dom = Dom::parse(r#"<div class="carousel"></div>"#);
        let block = dom.find_first("div").unwrap();
        Carousel.decorate(&mut dom, block, "carousel").unwrap();
        assert_eq!(dom.inner_html(block), r#"<div class="carousel-nav"></div>"#);
    }

    #[test]
    fn test_text_node_is_malformed() {
        let mut dom = Dom::new();
        let text = dom.create_text("loose", None);
        assert!(matches!(
            Carousel.decorate(&mut dom, text, "carousel"),
            Err(BlockError::Malformed { .. })
        ));
    }
}
