use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::blocks::{BlockError, BlockRegistry};
use crate::dom::{Dom, NodeId};
use crate::parser::css::SelectorError;

use super::classify::BLOCK_NAME_ATTR;

pub const LOADABLE_BLOCK_SELECTOR: &str = "main div.section-wrapper > div > .block";

/// What happened to one block during loading.
#[derive(Debug)]
pub struct BlockOutcome {
    pub node: NodeId,
    pub name: String,
    pub module: String,
    pub stylesheet_inserted: bool,
    pub result: Result<(), BlockError>,
}

impl BlockOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Add a low-priority stylesheet link to `head` unless one with the same
/// `href` is already there. Returns whether a link was added.
pub fn load_css(dom: &mut Dom, href: &str) -> bool {
    let Some(head) = dom.head() else {
        debug!(href, "no head, stylesheet skipped");
        return false;
    };
    let present = dom
        .element_children(head)
        .into_iter()
        .any(|c| dom.tag_name(c) == Some("link") && dom.attr(c, "href") == Some(href));
    if present {
        return false;
    }

    let link = dom.create_tag("link", &[("rel", "stylesheet"), ("href", href), ("importance", "low")]);
    dom.append_child(head, link);
    debug!(href, "stylesheet linked");
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub fn block_module_path(blocks_root: &str, name: &str) -> String {
    format!("{}/{name}/{name}.js", blocks_root.trim_end_matches('/'))
}

pub fn block_stylesheet_path(blocks_root: &str, name: &str) -> String {
    format!("{}/{name}/{name}.css", blocks_root.trim_end_matches('/'))
}

/// Run the registered decorator of every classified block and link its
/// stylesheet. A failing block is recorded and never stops its siblings.
pub fn load_blocks(dom: &mut Dom, registry: &BlockRegistry, blocks_root: &str) -> Result<Vec<BlockOutcome>, SelectorError> {
    let root = dom.root();
    let blocks = dom.query_selector_all(root, LOADABLE_BLOCK_SELECTOR)?;
    let mut outcomes = Vec::with_capacity(blocks.len());

    for node in blocks {
        let Some(name) = dom.attr(node, BLOCK_NAME_ATTR).map(str::to_string) else {
            debug!(node, "block without a name");
            continue;
        };
        let module = block_module_path(blocks_root, &name);
        debug!(block = %name, %module, "loading block");

        let result = match registry.get(&name) {
            Some(decorator) => catch_unwind(AssertUnwindSafe(|| decorator.decorate(dom, node, &name)))
                .unwrap_or_else(|payload| {
                    Err(BlockError::Panicked {
                        name: name.clone(),
                        message: panic_message(payload.as_ref()),
                    })
                }),
            None => Err(BlockError::NotRegistered {
                name: name.clone(),
                module: module.clone(),
            }),
        };
        if let Err(e) = &result {
            warn!(block = %name, error = %e, "failed to load module for block");
        }

        let stylesheet_inserted = load_css(dom, &block_stylesheet_path(blocks_root, &name));
        outcomes.push(BlockOutcome {
            node,
            name,
            module,
            stylesheet_inserted,
            result,
        });
    }

    Ok(outcomes)
}
