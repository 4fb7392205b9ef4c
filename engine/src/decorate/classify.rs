use std::collections::BTreeMap;

use tracing::debug;

use crate::dom::{Dom, NodeId};
use crate::parser::css::SelectorError;

use super::sections::SECTION_WRAPPER_CLASS;

pub const BLOCK_SELECTOR: &str = "main div.section-wrapper > div > div";
pub const BLOCK_CLASS: &str = "block";
pub const BLOCK_NAME_ATTR: &str = "data-block-name";

/// Block names that carry options as dash-separated suffixes. Each entry
/// maps an alias prefix to the block it names: `cols-wide-dark` with alias
/// `cols` for `columns` becomes block `columns` with options `wide` and
/// `dark`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOptions {
    aliases: Vec<(String, String)>,
}

impl BlockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A block whose own name is its option prefix.
    pub fn with_base(self, base: &str) -> Self {
        self.with_alias(base, base)
    }

    pub fn with_alias(mut self, alias: &str, block: &str) -> Self {
        self.aliases.push((alias.to_string(), block.to_string()));
        self
    }

    /// Table keys are block names; values are the prefixes that select them.
    pub fn from_table(table: &BTreeMap<String, Vec<String>>) -> Self {
        let aliases = table
            .iter()
            .flat_map(|(block, aliases)| aliases.iter().map(move |alias| (alias.clone(), block.clone())))
            .collect();
        Self { aliases }
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Split `name` into a block name, the block classes to add and its
    /// options. Each matching alias is applied in table order against the
    /// running name.
    pub fn split(&self, name: &str) -> (String, Vec<String>, Vec<String>) {
        let mut block_name = name.to_string();
        let mut added = Vec::new();
        let mut options = Vec::new();
        for (alias, block) in &self.aliases {
            let Some(rest) = block_name.strip_prefix(&format!("{alias}-")) else {
                continue;
            };
            options.extend(rest.split('-').filter(|o| !o.is_empty()).map(str::to_string));
            added.push(block.clone());
            block_name = block.clone();
        }
        (block_name, added, options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedBlock {
    pub node: NodeId,
    pub name: String,
    pub options: Vec<String>,
}

/// Lowercase `name` and replace every character outside `[0-9a-z]` with `-`.
pub fn to_class_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_digit() || c.is_ascii_lowercase() { c } else { '-' })
        .collect()
}

fn container_class(name: &str) -> String {
    format!("{name}-container").replace("--", "-")
}

/// Name every block inside a wrapped section and tag its section with a
/// `<name>-container` class.
pub fn decorate_blocks(dom: &mut Dom, options: &BlockOptions) -> Result<Vec<ClassifiedBlock>, SelectorError> {
    let root = dom.root();
    let candidates = dom.query_selector_all(root, BLOCK_SELECTOR)?;
    let section_selector = format!(".{SECTION_WRAPPER_CLASS}");
    let mut blocks = Vec::with_capacity(candidates.len());

    for node in candidates {
        let Some(first_class) = dom.classes(node).into_iter().next() else {
            debug!(node, "skipping unclassed division");
            continue;
        };

        if let Some(section) = dom.closest(node, &section_selector)? {
            dom.add_class(section, &container_class(&first_class));
        }

        let (name, bases, opts) = options.split(&first_class);
        for class in bases.iter().chain(opts.iter()) {
            dom.add_class(node, class);
        }
        dom.add_class(node, BLOCK_CLASS);
        dom.set_attr(node, BLOCK_NAME_ATTR, &name);

        debug!(node, block = %name, options = ?opts, "block classified");
        blocks.push(ClassifiedBlock { node, name, options: opts });
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<main>
        <div class="section-wrapper"><div>
            <div class="Carousel wide">slides</div>
            <div class="columns--split"></div>
            <div>plain</div>
        </div></div>
        <div><div><div class="stray"></div></div></div>
    </main>"#;

    #[test]
    fn test_first_class_names_the_block() {
        let mut dom = Dom::parse(PAGE);
        let blocks = decorate_blocks(&mut dom, &BlockOptions::new()).unwrap();
        let names: Vec<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Carousel", "columns--split"]);

        let carousel = blocks[0].node;
        assert_eq!(dom.attr(carousel, BLOCK_NAME_ATTR), Some("Carousel"));
        assert!(dom.has_class(carousel, BLOCK_CLASS));
        assert!(dom.has_class(carousel, "wide"));
    }

    #[test]
    fn test_section_gains_container_classes() {
        let mut dom = Dom::parse(PAGE);
        decorate_blocks(&mut dom, &BlockOptions::new()).unwrap();
        let root = dom.root();
        let section = dom.query_selector(root, ".section-wrapper").unwrap().unwrap();
        assert_eq!(
            dom.classes(section),
            ["section-wrapper", "Carousel-container", "columns-split-container"]
        );
        let stray = dom.query_selector(root, ".stray").unwrap().unwrap();
        assert!(!dom.has_class(stray, BLOCK_CLASS));
    }

    #[test]
    fn test_empty_options_table_keeps_name() {
        let (name, bases, opts) = BlockOptions::new().split("columns-wide-dark");
        assert_eq!(name, "columns-wide-dark");
        assert!(bases.is_empty() && opts.is_empty());
    }

    #[test]
    fn test_options_split_suffixes() {
        let options = BlockOptions::new().with_base("columns");
        let mut dom = Dom::parse(
            r#"<main><div class="section-wrapper"><div><div class="columns-wide--dark"></div></div></div></main>"#,
        );
        let blocks = decorate_blocks(&mut dom, &options).unwrap();
        assert_eq!(blocks[0].name, "columns");
        assert_eq!(blocks[0].options, ["wide", "dark"]);
        let node = blocks[0].node;
        assert_eq!(dom.classes(node), ["columns-wide--dark", "columns", "wide", "dark", "block"]);
        assert_eq!(dom.attr(node, BLOCK_NAME_ATTR), Some("columns"));
    }

    #[test]
    fn test_options_from_config_table() {
        let mut table = BTreeMap::new();
        table.insert("columns".to_string(), vec!["cols".to_string()]);
        let options = BlockOptions::from_table(&table);

        let (name, added, opts) = options.split("cols-3");
        assert_eq!(name, "columns");
        assert_eq!(added, ["columns"]);
        assert_eq!(opts, ["3"]);

        let mut dom = Dom::parse(
            r#"<main><div class="section-wrapper"><div><div class="cols-wide"></div></div></div></main>"#,
        );
        let blocks = decorate_blocks(&mut dom, &options).unwrap();
        assert_eq!(blocks[0].name, "columns");
        assert_eq!(blocks[0].options, ["wide"]);
        let node = blocks[0].node;
        assert_eq!(dom.classes(node), ["cols-wide", "columns", "wide", "block"]);
        assert_eq!(dom.attr(node, BLOCK_NAME_ATTR), Some("columns"));
    }

    #[test]
    fn test_container_class_collapses_each_pair_once() {
        assert_eq!(container_class("a--b"), "a-b-container");
        assert_eq!(container_class("a---b"), "a--b-container");
    }

    #[test]
    fn test_to_class_name() {
        assert_eq!(to_class_name("Hero Banner"), "hero-banner");
        assert_eq!(to_class_name("a_b.C9"), "a-b-c9");
        assert_eq!(to_class_name(""), "");
    }
}
