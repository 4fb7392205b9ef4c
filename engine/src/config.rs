//! Decorator settings, loadable from TOML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::parser::css::SelectorError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid page_url {url:?}: {source}")]
    InvalidPageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid section_selector: {0}")]
    Selector(#[from] SelectorError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoratorConfig {
    /// Top-level content divisions to wrap.
    pub section_selector: String,
    pub nav_path: String,
    pub lazy_styles_path: String,
    /// Blocks live at `<blocks_root>/<name>/<name>.{js,css}`.
    pub blocks_root: String,
    /// Path token that marks a media URL as rewritable.
    pub media_marker: String,
    /// URL the document is served from; image references resolve against it.
    pub page_url: String,
    /// Upper bound on the lead image wait. Unbounded when unset.
    pub lcp_timeout_ms: Option<u64>,
    /// Block name to its option-carrying alias prefixes.
    pub block_options: BTreeMap<String, Vec<String>>,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            section_selector: "main > div".to_string(),
            nav_path: "/nav.plain.html".to_string(),
            lazy_styles_path: "/lazy-styles.css".to_string(),
            blocks_root: "/blocks".to_string(),
            media_marker: crate::net::DEFAULT_MEDIA_MARKER.to_string(),
            page_url: "http://localhost/".to_string(),
            lcp_timeout_ms: None,
            block_options: BTreeMap::new(),
        }
    }
}

impl DecoratorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn lcp_timeout(&self) -> Option<Duration> {
        self.lcp_timeout_ms.map(Duration::from_millis)
    }

    pub fn parsed_page_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.page_url).map_err(|source| ConfigError::InvalidPageUrl {
            url: self.page_url.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(DecoratorConfig::from_toml_str("").unwrap(), DecoratorConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let cfg = DecoratorConfig::from_toml_str(
            r#"
            page_url = "https://example.com/post"
            lcp_timeout_ms = 2500

            [block_options]
            columns = ["columns"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.section_selector, "main > div");
        assert_eq!(cfg.lcp_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(cfg.block_options["columns"], vec!["columns".to_string()]);
        assert_eq!(cfg.parsed_page_url().unwrap().host_str(), Some("example.com"));
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_urls() {
        assert!(matches!(
            DecoratorConfig::from_toml_str("sectoin_selector = \"main\""),
            Err(ConfigError::Toml(_))
        ));
        let cfg = DecoratorConfig {
            page_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.parsed_page_url(), Err(ConfigError::InvalidPageUrl { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprig.toml");
        std::fs::write(&path, "nav_path = \"/fragments/nav.html\"\n").unwrap();
        assert_eq!(DecoratorConfig::load(&path).unwrap().nav_path, "/fragments/nav.html");
        assert!(matches!(
            DecoratorConfig::load(dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
