use engine::{FetchedResource, FsLoader, HttpLoader, LoadError, Loader};

/// Where the page's site resources come from.
pub enum SiteLoader {
    Fs(FsLoader),
    Http(HttpLoader),
}

impl Loader for SiteLoader {
    async fn fetch(&self, path: &str) -> Result<FetchedResource, LoadError> {
        match self {
            Self::Fs(loader) => loader.fetch(path).await,
            Self::Http(loader) => loader.fetch(path).await,
        }
    }
}
