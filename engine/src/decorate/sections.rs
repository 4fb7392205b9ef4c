use tracing::debug;

use crate::dom::Dom;
use crate::parser::css::SelectorError;

pub const SECTION_WRAPPER_CLASS: &str = "section-wrapper";

/// Wrap every element matching `selector` that has no id in a
/// `div.section-wrapper` appended to the element's parent.
///
/// The wrapper carries no id, so running this twice over the same document
/// wraps the wrappers.
pub fn wrap_sections(dom: &mut Dom, selector: &str) -> Result<usize, SelectorError> {
    let root = dom.root();
    let targets = dom.query_selector_all(root, selector)?;
    let mut wrapped = 0;

    for div in targets {
        if dom.element(div).and_then(|el| el.id()).is_some() {
            continue;
        }
        let Some(parent) = dom.parent(div) else {
            continue;
        };
        let wrapper = dom.create_tag("div", &[("class", SECTION_WRAPPER_CLASS)]);
        dom.append_child(parent, wrapper);
        dom.append_child(wrapper, div);
        wrapped += 1;
    }

    debug!(wrapped, selector, "sections wrapped");
    Ok(wrapped)
}
