//! Session-scoped key/value storage.
//!
//! Mirrors what a browser's `sessionStorage` offers the decoration passes: a
//! handful of string flags that survive across page runs of one session.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not a JSON object: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
}

/// Storage that lives as long as the value does.
#[derive(Debug, Default, Clone)]
pub struct MemorySession {
    values: HashMap<String, String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage backed by a JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSession {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| SessionError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&self.values).map_err(|source| SessionError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
