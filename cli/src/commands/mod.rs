pub mod decorate;
pub mod probe;

use std::path::Path;

use anyhow::{Context, Result};
use engine::{FileSession, MemorySession, SessionStore};

/// A file-backed session when a path is given, otherwise one that ends with
/// the process.
pub fn open_session(path: Option<&Path>) -> Result<Box<dyn SessionStore>> {
    Ok(match path {
        Some(path) => Box::new(
            FileSession::open(path).with_context(|| format!("Failed to open session {}", path.display()))?,
        ),
        None => Box::new(MemorySession::new()),
    })
}
