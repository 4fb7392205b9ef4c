use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use engine::{
    resolve_capabilities, BlockRegistry, DecoratorConfig, Decorator, Dom, FormatProbe, FsLoader, HttpLoader, Loader,
};
use tracing::{info, warn};
use url::Url;

use crate::site::SiteLoader;

pub struct DecorateArgs {
    pub input: String,
    pub output: Option<PathBuf>,
    pub site_root: Option<PathBuf>,
    pub base_url: Option<String>,
    pub config: Option<PathBuf>,
    pub session: Option<PathBuf>,
    pub page_url: Option<String>,
}

fn input_url(input: &str) -> Option<Url> {
    Url::parse(input)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

fn site_loader(args: &DecorateArgs, page: Option<&Url>) -> Result<SiteLoader> {
    if let Some(base) = &args.base_url {
        let base = Url::parse(base).with_context(|| format!("Invalid base URL {base}"))?;
        return Ok(SiteLoader::Http(HttpLoader::new(base)?));
    }
    if let Some(root) = &args.site_root {
        if !root.is_dir() {
            bail!("Site root {} is not a directory", root.display());
        }
        return Ok(SiteLoader::Fs(FsLoader::new(root)));
    }
    match page {
        Some(url) => Ok(SiteLoader::Http(HttpLoader::new(url.clone())?)),
        None => {
            let dir = Path::new(&args.input)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            Ok(SiteLoader::Fs(FsLoader::new(dir)))
        }
    }
}

pub async fn execute(args: DecorateArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => DecoratorConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DecoratorConfig::default(),
    };

    let page = input_url(&args.input);
    if let Some(url) = &args.page_url {
        config.page_url = url.clone();
    } else if let Some(url) = &page {
        config.page_url = url.to_string();
    }

    let loader = site_loader(&args, page.as_ref())?;

    let html = match &page {
        Some(url) => loader
            .fetch(url.as_str())
            .await
            .with_context(|| format!("Failed to fetch {url}"))?
            .text(),
        None => std::fs::read_to_string(&args.input).with_context(|| format!("Failed to read {}", args.input))?,
    };
    info!("Read {} bytes from {}", html.len(), args.input);

    let mut session = super::open_session(args.session.as_deref())?;
    let caps = resolve_capabilities(session.as_mut(), &FormatProbe::webp()).context("Failed to persist capability")?;

    let decorator = Decorator::new(loader, BlockRegistry::builtin(), config).context("Invalid decorator config")?;
    let mut dom = Dom::parse(&html);
    let report = decorator.decorate(&mut dom, caps).await.context("Decoration failed")?;

    info!(
        "Decorated: {} sections, {} blocks, hero: {}, nav: {}",
        report.sections_wrapped,
        report.blocks.len(),
        report.hero,
        report.nav_injected
    );
    if let Some(lcp) = &report.lcp {
        info!("Lead image: {:?}", lcp);
    }
    for failed in report.failed_blocks() {
        if let Err(e) = &failed.result {
            warn!("Block {} failed: {}", failed.name, e);
        }
    }
    for error in &report.errors {
        warn!("{}", error);
    }

    let out = dom.to_html();
    match &args.output {
        Some(path) => {
            std::fs::write(path, &out).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} bytes to {}", out.len(), path.display());
        }
        None => println!("{out}"),
    }
    Ok(())
}
