pub mod blocks;
pub mod config;
pub mod decorate;
pub mod dom;
pub mod net;
pub mod parser;

pub use blocks::{BlockDecorator, BlockError, BlockRegistry};
pub use config::{ConfigError, DecoratorConfig};
pub use decorate::{DecorationError, DecorationReport, Decorator, LcpOutcome, PageState};
pub use dom::{Dom, NodeId};
pub use net::{
    resolve_capabilities, FetchedResource, FileSession, FormatProbe, FsLoader, HttpLoader, ImageCapabilities,
    LoadError, Loader, MapLoader, MemorySession, NetworkConfig, SessionStore,
};
pub use parser::css::SelectorError;
