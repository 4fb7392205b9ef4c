//! The decoration passes, in the order a page runs them:
//! section wrapping, hero promotion, block classification, then (once the
//! lead image settles) block loading, navigation and deferred styles.

pub mod classify;
pub mod hero;
pub mod loader;
pub mod nav;
pub mod page;
pub mod sections;

pub use classify::{decorate_blocks, to_class_name, BlockOptions, ClassifiedBlock};
pub use hero::create_hero_section;
pub use loader::{load_blocks, load_css, BlockOutcome};
pub use nav::decorate_header;
pub use page::{DecorationError, DecorationReport, Decorator, LcpOutcome, PageState};
pub use sections::wrap_sections;
