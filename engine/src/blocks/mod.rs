//! Block decorators, looked up by block name.
//!
//! A page refers to a block by the name in its `data-block-name` attribute.
//! The registry maps that name to the code that decorates it.

mod carousel;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dom::{Dom, NodeId};
use crate::parser::css::SelectorError;

pub use carousel::Carousel;

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("no decorator registered for block {name:?} (module {module})")]
    NotRegistered { name: String, module: String },
    #[error("block {name:?} is malformed: {reason}")]
    Malformed { name: String, reason: String },
    #[error("block {name:?} panicked: {message}")]
    Panicked { name: String, message: String },
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Decorates one block element in place.
///
/// Failures should come back as a [`BlockError`]. A decorator that panics
/// is recorded as [`BlockError::Panicked`] and the DOM keeps whatever it
/// had changed before the panic.
pub trait BlockDecorator: Send + Sync {
    fn decorate(&self, dom: &mut Dom, block: NodeId, name: &str) -> Result<(), BlockError>;
}

impl<F> BlockDecorator for F
where
    F: Fn(&mut Dom, NodeId, &str) -> Result<(), BlockError> + Send + Sync,
{
    fn decorate(&self, dom: &mut Dom, block: NodeId, name: &str) -> Result<(), BlockError> {
        self(dom, block, name)
    }
}

#[derive(Clone, Default)]
pub struct BlockRegistry {
    decorators: BTreeMap<String, Arc<dyn BlockDecorator>>,
}

impl std::fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every decorator that ships with the engine.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("carousel", Carousel);
        registry
    }

    /// Register `decorator` under `name`, replacing any previous one.
    pub fn register(&mut self, name: &str, decorator: impl BlockDecorator + 'static) -> &mut Self {
        self.decorators.insert(name.to_string(), Arc::new(decorator));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BlockDecorator>> {
        self.decorators.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.decorators.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_carousel() {
        let registry = BlockRegistry::builtin();
        assert_eq!(registry.names(), ["carousel"]);
        assert!(registry.get("carousel").is_some());
        assert!(registry.get("columns").is_none());
    }

    #[test]
    fn test_closures_register_as_decorators() {
        let mut registry = BlockRegistry::new();
        registry.register("quote", |dom: &mut Dom, block: NodeId, _name: &str| {
            dom.add_class(block, "quoted");
            Ok(())
        });

        let mut dom = Dom::parse("<div class=\"quote\"></div>");
        let block = dom.find_first("div").unwrap();
        registry.get("quote").unwrap().decorate(&mut dom, block, "quote").unwrap();
        assert!(dom.has_class(block, "quoted"));
    }
}
