// Image reference rewriter
//
// When the client cannot decode WebP, managed media URLs in `img[src]` and
// `picture > source[srcset]` are rewritten to request a legacy format.

use tracing::debug;
use url::Url;

use crate::dom::{Dom, NodeId};
use crate::net::support::ImageCapabilities;
use crate::net::url::optimized_image_url;

/// Rewrites image references below `root` for a fixed set of capabilities.
pub struct ImageUrlRewriter<'a> {
    page_url: &'a Url,
    caps: ImageCapabilities,
    marker: &'a str,
    rewritten: usize,
}

impl<'a> ImageUrlRewriter<'a> {
    pub fn new(page_url: &'a Url, caps: ImageCapabilities, marker: &'a str) -> Self {
        Self {
            page_url,
            caps,
            marker,
            rewritten: 0,
        }
    }

    /// Rewrite every eligible attribute below `root`. Returns the number of
    /// attributes whose value changed.
    pub fn rewrite(mut self, dom: &mut Dom, root: NodeId) -> usize {
        for id in dom.descendants(root) {
            let tag = dom.tag_name(id).map(str::to_string);
            match tag.as_deref() {
                Some("img") => self.rewrite_img(dom, id),
                Some("source") if self.inside_picture(dom, id) => self.rewrite_source(dom, id),
                _ => {}
            }
        }
        self.rewritten
    }

    fn inside_picture(&self, dom: &Dom, id: NodeId) -> bool {
        dom.ancestors(id).any(|a| dom.tag_name(a) == Some("picture"))
    }

    fn rewrite_img(&mut self, dom: &mut Dom, id: NodeId) {
        let Some(src) = dom.attr(id, "src").map(str::to_string) else {
            return;
        };
        let optimized = optimized_image_url(&src, self.page_url, self.caps, self.marker);
        if optimized != src {
            debug!(node = id, from = %src, to = %optimized, "rewrote img src");
            dom.set_attr(id, "src", &optimized);
            self.rewritten += 1;
        }
    }

    fn rewrite_source(&mut self, dom: &mut Dom, id: NodeId) {
        let Some(srcset) = dom.attr(id, "srcset").map(str::to_string) else {
            return;
        };
        let rewritten = self.rewrite_srcset(&srcset);
        if rewritten != srcset {
            debug!(node = id, from = %srcset, to = %rewritten, "rewrote source srcset");
            dom.set_attr(id, "srcset", &rewritten);
            self.rewritten += 1;
        }
    }

    /// Candidates keep their descriptors; unchanged candidates are kept
    /// byte for byte so an untouched srcset compares equal.
    fn rewrite_srcset(&self, srcset: &str) -> String {
        let mut changed = false;
        let mut parts = Vec::new();

        for entry in srcset.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let mut tokens = entry.split_whitespace();
            let Some(url) = tokens.next() else {
                continue;
            };
            let descriptor: Vec<&str> = tokens.collect();

            let optimized = optimized_image_url(url, self.page_url, self.caps, self.marker);
            if optimized == url {
                parts.push(entry.to_string());
                continue;
            }
            changed = true;
            if descriptor.is_empty() {
                parts.push(optimized);
            } else {
                parts.push(format!("{} {}", optimized, descriptor.join(" ")));
            }
        }

        if changed {
            parts.join(", ")
        } else {
            srcset.to_string()
        }
    }
}

/// Legacy-format fallback for clients without WebP support. A no-op when
/// `caps.webp` is set.
pub fn webp_polyfill(dom: &mut Dom, root: NodeId, caps: ImageCapabilities, page_url: &Url, marker: &str) -> usize {
    if caps.webp {
        return 0;
    }
    ImageUrlRewriter::new(page_url, caps, marker).rewrite(dom, root)
}
