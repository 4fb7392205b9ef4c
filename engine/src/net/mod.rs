pub mod image;
pub mod rewriter;
pub mod session;
pub mod support;
pub mod url;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use ::url::Url;
use tracing::{debug, trace};

pub use self::image::{decoded_dimensions, detect_image_type, ImageDecodeError, ImageType};
pub use rewriter::{webp_polyfill, ImageUrlRewriter};
pub use session::{FileSession, MemorySession, SessionError, SessionStore};
pub use support::{resolve_capabilities, FormatProbe, ImageCapabilities, WEBP_SUPPORT_KEY};
pub use self::url::{is_data_uri, loader_target, optimized_image_url, resolve_url, DEFAULT_MEDIA_MARKER};
use self::url::parse_data_uri;

/// Represents a fetched resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub url: String,
    pub data: Vec<u8>,
    pub content_type: String,
}

impl FetchedResource {
    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid URL {0}")]
    InvalidUrl(String),
    #[error("path escapes the site root: {0}")]
    InvalidPath(String),
    #[error("malformed data URI")]
    InvalidDataUri,
    #[error("{loader} cannot fetch {target}")]
    Unsupported { loader: &'static str, target: String },
}

/// Anything that can hand the decoration passes a site resource.
///
/// `path` is either site-absolute (`/nav.plain.html`), a `data:` URI, or an
/// absolute URL for off-origin resources.
pub trait Loader: Send + Sync {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<FetchedResource, LoadError>> + Send;
}

fn fetch_data_uri(uri: &str) -> Result<FetchedResource, LoadError> {
    let (content_type, data) = parse_data_uri(uri).ok_or(LoadError::InvalidDataUri)?;
    Ok(FetchedResource {
        url: uri.to_string(),
        data,
        content_type,
    })
}

/// Content type guessed from a file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        other => ImageType::from_extension(other).mime_type(),
    }
}

/// Extension first, then the leading bytes for extensionless images.
fn sniffed_content_type(path: &str, data: &[u8]) -> String {
    match content_type_for(path) {
        "application/octet-stream" => detect_image_type(None, data).mime_type().to_string(),
        known => known.to_string(),
    }
}

/// Serves site-absolute paths from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, target: &str) -> Result<PathBuf, LoadError> {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(LoadError::InvalidPath(target.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl Loader for FsLoader {
    async fn fetch(&self, path: &str) -> Result<FetchedResource, LoadError> {
        if is_data_uri(path) {
            return fetch_data_uri(path);
        }
        if Url::parse(path).is_ok() {
            return Err(LoadError::Unsupported {
                loader: "FsLoader",
                target: path.to_string(),
            });
        }

        let file = self.resolve(path)?;
        trace!(path = %file.display(), "reading site file");
        let data = match tokio::fs::read(&file).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(path.to_string()));
            }
            Err(source) => return Err(LoadError::Io { path: file, source }),
        };
        Ok(FetchedResource {
            url: path.to_string(),
            content_type: sniffed_content_type(&file.to_string_lossy(), &data),
            data,
        })
    }
}

/// Configuration for the HTTP loader
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of redirects to follow
    pub max_redirects: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 5,
        }
    }
}

/// Fetches site resources relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    base: Url,
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new(base: Url) -> Result<Self, LoadError> {
        Self::with_config(base, NetworkConfig::default())
    }

    pub fn with_config(base: Url, config: NetworkConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .build()?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl Loader for HttpLoader {
    async fn fetch(&self, path: &str) -> Result<FetchedResource, LoadError> {
        if is_data_uri(path) {
            return fetch_data_uri(path);
        }
        let url = self
            .base
            .join(path)
            .map_err(|_| LoadError::InvalidUrl(path.to_string()))?;

        debug!(%url, "fetching");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let declared = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().to_string();
        let data = response.bytes().await?.to_vec();
        let content_type = declared.unwrap_or_else(|| sniffed_content_type(url.path(), &data));

        Ok(FetchedResource {
            url: final_url,
            data,
            content_type,
        })
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Ok(FetchedResource),
    Fail(u16),
    Hang,
}

/// In-memory site. Unknown paths are `NotFound`.
#[derive(Debug, Default)]
pub struct MapLoader {
    entries: HashMap<String, Canned>,
    requests: Mutex<Vec<String>>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, content_type: &str, data: Vec<u8>) -> &mut Self {
        let resource = FetchedResource {
            url: path.to_string(),
            data,
            content_type: content_type.to_string(),
        };
        self.entries.insert(path.to_string(), Canned::Ok(resource));
        self
    }

    pub fn insert_text(&mut self, path: &str, text: &str) -> &mut Self {
        self.insert(path, content_type_for(path), text.as_bytes().to_vec())
    }

    /// Answer `path` with an HTTP error status.
    pub fn fail(&mut self, path: &str, status: u16) -> &mut Self {
        self.entries.insert(path.to_string(), Canned::Fail(status));
        self
    }

    /// Never answer `path`.
    pub fn hang(&mut self, path: &str) -> &mut Self {
        self.entries.insert(path.to_string(), Canned::Hang);
        self
    }

    /// Paths requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Loader for MapLoader {
    async fn fetch(&self, path: &str) -> Result<FetchedResource, LoadError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(path.to_string());
        }
        if is_data_uri(path) {
            return fetch_data_uri(path);
        }
        match self.entries.get(path).cloned() {
            Some(Canned::Ok(resource)) => Ok(resource),
            Some(Canned::Fail(status)) => Err(LoadError::Status {
                url: path.to_string(),
                status,
            }),
            Some(Canned::Hang) => std::future::pending().await,
            None => Err(LoadError::NotFound(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_loader_reads_site_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nav.plain.html"), "<ul><li>Home</li></ul>").unwrap();
        let loader = FsLoader::new(dir.path());

        let nav = loader.fetch("/nav.plain.html?v=2").await.unwrap();
        assert_eq!(nav.text(), "<ul><li>Home</li></ul>");
        assert_eq!(nav.content_type, "text/html; charset=utf-8");

        std::fs::write(dir.path().join("logo"), b"GIF89a\x01\x00").unwrap();
        assert_eq!(loader.fetch("/logo").await.unwrap().content_type, "image/gif");

        assert!(matches!(loader.fetch("/missing.css").await, Err(LoadError::NotFound(_))));
        assert!(matches!(loader.fetch("/../secret").await, Err(LoadError::InvalidPath(_))));
        assert!(matches!(
            loader.fetch("https://cdn.example.com/a.png").await,
            Err(LoadError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_loaders_decode_data_uris() {
        let loader = FsLoader::new("/nonexistent");
        let res = loader.fetch("data:text/plain,hi").await.unwrap();
        assert_eq!(res.data, b"hi");
        assert!(matches!(loader.fetch("data:nothing").await, Err(LoadError::InvalidDataUri)));
    }

    #[tokio::test]
    async fn test_map_loader_records_requests() {
        let mut loader = MapLoader::new();
        loader.insert_text("/a.css", "body{}").fail("/b.css", 500);

        assert_eq!(loader.fetch("/a.css").await.unwrap().content_type, "text/css");
        assert!(matches!(
            loader.fetch("/b.css").await,
            Err(LoadError::Status { status: 500, .. })
        ));
        assert!(matches!(loader.fetch("/c.css").await, Err(LoadError::NotFound(_))));
        assert_eq!(loader.requests(), ["/a.css", "/b.css", "/c.css"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_loader_hang_never_resolves() {
        let mut loader = MapLoader::new();
        loader.hang("/slow.png");
        let result = tokio::time::timeout(Duration::from_secs(5), loader.fetch("/slow.png")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("/blocks/hero/hero.css"), "text/css");
        assert_eq!(content_type_for("/media_1.WEBP"), "image/webp");
        assert_eq!(content_type_for("/file"), "application/octet-stream");
    }
}
