use tracing::debug;

use crate::dom::Dom;
use crate::parser::css::SelectorError;

use super::sections::SECTION_WRAPPER_CLASS;

pub const HERO_IMAGE_SELECTOR: &str = "main > div:first-of-type > div > :first-child > picture > img";
pub const HERO_CLASS: &str = "hero";

/// Turn the leading picture into the background of its section.
///
/// Returns `true` when a hero was created. The picture element is removed.
pub fn create_hero_section(dom: &mut Dom) -> Result<bool, SelectorError> {
    let root = dom.root();
    let Some(img) = dom.query_selector(root, HERO_IMAGE_SELECTOR)? else {
        return Ok(false);
    };
    let src = dom.attr(img, "src").unwrap_or_default().to_string();
    let Some(wrapper) = dom.closest(img, &format!(".{SECTION_WRAPPER_CLASS}"))? else {
        debug!(%src, "hero image outside a section");
        return Ok(false);
    };

    let background = format!("background-image: url({src})");
    let style = match dom.attr(wrapper, "style").map(str::trim) {
        Some(existing) if !existing.is_empty() => {
            format!("{}; {background}", existing.trim_end_matches(';'))
        }
        _ => background,
    };
    dom.set_attr(wrapper, "style", &style);
    dom.add_class(wrapper, HERO_CLASS);

    if let Some(picture) = dom.parent(img) {
        dom.detach(picture);
    }
    debug!(%src, "hero section created");
    Ok(true)
}
