use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::blocks::BlockRegistry;
use crate::config::{ConfigError, DecoratorConfig};
use crate::dom::Dom;
use crate::net::{
    detect_image_type, is_data_uri, loader_target, webp_polyfill, ImageCapabilities, ImageType, LoadError, Loader,
};
use crate::parser::css::{parse_selector, SelectorError};

use super::classify::{decorate_blocks, BlockOptions, ClassifiedBlock};
use super::hero::create_hero_section;
use super::loader::{block_stylesheet_path, load_blocks, load_css, BlockOutcome};
use super::nav::decorate_header;
use super::sections::wrap_sections;

pub const LCP_CANDIDATE_SELECTOR: &str = "main > div:first-of-type img";
pub const APPEAR_CLASS: &str = "appear";

/// How far decoration got. Variants are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PageState {
    #[default]
    Unwrapped,
    Wrapped,
    HeroResolved,
    BlocksClassified,
    AwaitingLcp,
    PostLcp,
}

/// How the wait on the lead image ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LcpOutcome {
    NoCandidate,
    /// No `src`, or inline data.
    AlreadyComplete,
    Loaded { src: String },
    Failed { src: String, reason: String },
    TimedOut { src: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DecorationError {
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error("navigation fragment: {0}")]
    Navigation(#[source] LoadError),
}

#[derive(Debug, Default)]
pub struct DecorationReport {
    pub state: PageState,
    pub sections_wrapped: usize,
    pub images_rewritten: usize,
    pub hero: bool,
    pub blocks: Vec<ClassifiedBlock>,
    pub lcp: Option<LcpOutcome>,
    pub loaded: Vec<BlockOutcome>,
    pub nav_injected: bool,
    /// Stylesheets linked into `head`, in insertion order.
    pub stylesheets: Vec<String>,
    /// Failures that did not stop decoration.
    pub errors: Vec<DecorationError>,
}

impl DecorationReport {
    pub fn failed_blocks(&self) -> impl Iterator<Item = &BlockOutcome> {
        self.loaded.iter().filter(|o| !o.is_ok())
    }
}

/// Runs the decoration passes over a document, fetching what it needs
/// through `L`.
pub struct Decorator<L> {
    loader: L,
    registry: BlockRegistry,
    config: DecoratorConfig,
    page_url: Url,
    options: BlockOptions,
}

impl<L: Loader> Decorator<L> {
    pub fn new(loader: L, registry: BlockRegistry, config: DecoratorConfig) -> Result<Self, ConfigError> {
        parse_selector(&config.section_selector)?;
        let page_url = config.parsed_page_url()?;
        let options = BlockOptions::from_table(&config.block_options);
        Ok(Self {
            loader,
            registry,
            config,
            page_url,
            options,
        })
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DecoratorConfig {
        &self.config
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub async fn decorate(&self, dom: &mut Dom, caps: ImageCapabilities) -> Result<DecorationReport, DecorationError> {
        let started = Instant::now();
        let stamp = |stage: &str| {
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, stage, "decoration stage");
        };
        let mut report = DecorationReport::default();
        let root = dom.root();

        report.sections_wrapped = wrap_sections(dom, &self.config.section_selector)?;
        report.state = PageState::Wrapped;
        stamp("sections wrapped");

        report.images_rewritten = webp_polyfill(dom, root, caps, &self.page_url, &self.config.media_marker);

        report.hero = create_hero_section(dom)?;
        report.state = PageState::HeroResolved;
        stamp("hero resolved");

        report.blocks = decorate_blocks(dom, &self.options)?;
        report.state = PageState::BlocksClassified;
        stamp("blocks classified");

        if let Some(main) = dom.find_first("main") {
            dom.add_class(main, APPEAR_CLASS);
        }

        report.state = PageState::AwaitingLcp;
        let lcp = self.await_lcp(dom).await?;
        stamp("lcp settled");
        report.lcp = Some(lcp);

        self.post_lcp(dom, &mut report).await?;
        report.state = PageState::PostLcp;
        stamp("post-lcp done");

        info!(
            sections = report.sections_wrapped,
            blocks = report.blocks.len(),
            failed = report.failed_blocks().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "page decorated"
        );
        Ok(report)
    }

    async fn await_lcp(&self, dom: &Dom) -> Result<LcpOutcome, DecorationError> {
        let Some(img) = dom.query_selector(dom.root(), LCP_CANDIDATE_SELECTOR)? else {
            return Ok(LcpOutcome::NoCandidate);
        };
        let src = match dom.attr(img, "src") {
            Some(src) if !src.trim().is_empty() && !is_data_uri(src) => src.to_string(),
            _ => return Ok(LcpOutcome::AlreadyComplete),
        };
        let Some(target) = loader_target(&self.page_url, &src) else {
            return Ok(LcpOutcome::Failed {
                reason: LoadError::InvalidUrl(src.clone()).to_string(),
                src,
            });
        };

        debug!(%src, %target, "waiting for lcp candidate");
        let fetch = self.loader.fetch(&target);
        let result = match self.config.lcp_timeout() {
            Some(limit) => match tokio::time::timeout(limit, fetch).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(%src, timeout_ms = limit.as_millis() as u64, "lcp candidate timed out");
                    return Ok(LcpOutcome::TimedOut { src });
                }
            },
            None => fetch.await,
        };

        Ok(match result {
            Ok(resource) if detect_image_type(Some(&resource.content_type), &resource.data) == ImageType::Unknown => {
                debug!(%src, content_type = %resource.content_type, "lcp candidate is not an image");
                LcpOutcome::Failed {
                    src,
                    reason: format!("not an image: {}", resource.content_type),
                }
            }
            Ok(_) => LcpOutcome::Loaded { src },
            Err(e) => {
                debug!(%src, error = %e, "lcp candidate failed to load");
                LcpOutcome::Failed {
                    src,
                    reason: e.to_string(),
                }
            }
        })
    }

    async fn post_lcp(&self, dom: &mut Dom, report: &mut DecorationReport) -> Result<(), DecorationError> {
        let (nav, loaded) = tokio::join!(self.loader.fetch(&self.config.nav_path), async {
            load_blocks(dom, &self.registry, &self.config.blocks_root)
        });

        report.loaded = loaded?;
        report.stylesheets.extend(
            report
                .loaded
                .iter()
                .filter(|o| o.stylesheet_inserted)
                .map(|o| block_stylesheet_path(&self.config.blocks_root, &o.name)),
        );

        match nav {
            Ok(resource) => report.nav_injected = decorate_header(dom, &resource.text()),
            Err(e) => {
                warn!(path = %self.config.nav_path, error = %e, "navigation fetch failed");
                report.errors.push(DecorationError::Navigation(e));
            }
        }

        if load_css(dom, &self.config.lazy_styles_path) {
            report.stylesheets.push(self.config.lazy_styles_path.clone());
        }
        Ok(())
    }
}
