//! Next-gen image format support.
//!
//! Support is decided once per session by decoding a tiny probe image, then
//! persisted in the session store and handed around as an
//! [`ImageCapabilities`] value. Nothing reads a global.

use base64::Engine;
use tracing::{debug, info};

use crate::net::image::{decoded_dimensions, ImageType};
use crate::net::session::{SessionError, SessionStore};

/// Session key holding `"true"` / `"false"`.
pub const WEBP_SUPPORT_KEY: &str = "webpSupport";

/// 1x1 lossy WebP.
pub const WEBP_PROBE_BASE64: &str = "UklGRiIAAABXRUJQVlA4IBYAAAAwAQCdASoBAAEADsD+JaQAA3AAAAAA";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCapabilities {
    pub webp: bool,
}

/// A known-good image used to test whether a decoder is available.
#[derive(Debug, Clone)]
pub struct FormatProbe {
    pub image_type: ImageType,
    pub payload: Vec<u8>,
}

impl FormatProbe {
    pub fn new(image_type: ImageType, payload: Vec<u8>) -> Self {
        Self { image_type, payload }
    }

    pub fn webp() -> Self {
        let payload = base64::engine::general_purpose::STANDARD
            .decode(WEBP_PROBE_BASE64)
            .unwrap_or_default();
        Self::new(ImageType::WebP, payload)
    }

    /// Supported only when the payload decodes to a non-empty image.
    pub fn run(&self) -> bool {
        match decoded_dimensions(&self.payload, self.image_type) {
            Ok((w, h)) => w > 0 && h > 0,
            Err(e) => {
                debug!(format = ?self.image_type, error = %e, "format probe failed to decode");
                false
            }
        }
    }
}

impl Default for FormatProbe {
    fn default() -> Self {
        Self::webp()
    }
}

/// Resolve WebP support for this session.
///
/// A persisted answer is reused as is; otherwise the probe runs and its
/// result is written back before returning.
pub fn resolve_capabilities(
    session: &mut dyn SessionStore,
    probe: &FormatProbe,
) -> Result<ImageCapabilities, SessionError> {
    if let Some(stored) = session.get(WEBP_SUPPORT_KEY) {
        let webp = stored == "true";
        debug!(webp, "image capabilities from session");
        return Ok(ImageCapabilities { webp });
    }

    let webp = probe.run();
    session.set(WEBP_SUPPORT_KEY, if webp { "true" } else { "false" })?;
    info!(webp, "image capabilities probed");
    Ok(ImageCapabilities { webp })
}
