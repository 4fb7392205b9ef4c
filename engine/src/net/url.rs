// URL utilities
//
// This module handles:
// - Resolving image and resource references against the page URL
// - Data URI detection and decoding
// - Rewriting managed media URLs for the negotiated image format

use base64::Engine;
use url::{form_urlencoded, Url};

use crate::net::support::ImageCapabilities;

/// Path token marking a rewritable media asset.
pub const DEFAULT_MEDIA_MARKER: &str = "media_";

/// Resolve a potentially relative URL against the page URL.
pub fn resolve_url(base: &Url, relative_url: &str) -> Option<Url> {
    base.join(relative_url.trim()).ok()
}

/// What a loader should be asked for: the path (plus query) when the
/// resource lives on the page's origin, the absolute URL otherwise.
pub fn loader_target(base: &Url, reference: &str) -> Option<String> {
    let resolved = resolve_url(base, reference)?;
    if resolved.origin() == base.origin() {
        let mut target = resolved.path().to_string();
        if let Some(query) = resolved.query() {
            target.push('?');
            target.push_str(query);
        }
        Some(target)
    } else {
        Some(resolved.to_string())
    }
}

/// Check if a URL is a data URI
pub fn is_data_uri(url: &str) -> bool {
    url.trim()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Parse a data URI and extract the content type and data
pub(crate) fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let uri = uri.trim();
    if !is_data_uri(uri) {
        return None;
    }

    let (meta, data) = uri[5..].split_once(',')?;

    let is_base64 = meta.ends_with(";base64");
    let content_type = meta.trim_end_matches(";base64");
    let content_type = if content_type.is_empty() {
        "text/plain"
    } else {
        content_type
    };

    let bytes = if is_base64 {
        let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD.decode(cleaned).ok()?
    } else {
        percent_decode(data)
    };

    Some((content_type.to_string(), bytes))
}

fn percent_decode(data: &str) -> Vec<u8> {
    form_urlencoded::parse(format!("x={}", data.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned().into_bytes())
        .unwrap_or_default()
}

/// Rewrite a managed media URL so the server delivers a format the client
/// can decode.
///
/// URLs whose resolved path does not contain `marker` come back unchanged,
/// as do references that cannot be resolved against `page_url`.
pub fn optimized_image_url(src: &str, page_url: &Url, caps: ImageCapabilities, marker: &str) -> String {
    let Some(url) = resolve_url(page_url, src) else {
        return src.to_string();
    };
    let path = url.path();
    if !path.contains(marker) {
        return src.to_string();
    }

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .filter(|(k, _)| k != "auto")
        .collect();

    let format = if caps.webp {
        "webply"
    } else if path.ends_with(".png") {
        "png"
    } else if path.ends_with(".gif") {
        "gif"
    } else {
        "pjpg"
    };
    set_param(&mut params, "format", format);

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish();
    let prefix = src.split('?').next().unwrap_or(src);
    format!("{}?{}", prefix, query)
}

/// `URLSearchParams.set`: replace the first occurrence in place and drop the
/// rest, or append when absent.
fn set_param(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    match params.iter().position(|(k, _)| k == key) {
        Some(first) => {
            params[first].1 = value.to_string();
            let mut idx = 0;
            params.retain(|(k, _)| {
                let keep = k != key || idx == first;
                idx += 1;
                keep
            });
        }
        None => params.push((key.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://site/blog/post.html").unwrap()
    }

    const NO_WEBP: ImageCapabilities = ImageCapabilities { webp: false };
    const WEBP: ImageCapabilities = ImageCapabilities { webp: true };

    #[test]
    fn test_png_without_webp_support() {
        let out = optimized_image_url("https://site/media_123.png?auto=webp", &page(), NO_WEBP, DEFAULT_MEDIA_MARKER);
        assert_eq!(out, "https://site/media_123.png?format=png");
    }

    #[test]
    fn test_webp_supported_selects_webply() {
        let out = optimized_image_url("https://site/media_123.png?auto=webp", &page(), WEBP, DEFAULT_MEDIA_MARKER);
        assert_eq!(out, "https://site/media_123.png?format=webply");
    }

    #[test]
    fn test_legacy_format_by_extension() {
        let gif = optimized_image_url("/media_1.gif", &page(), NO_WEBP, DEFAULT_MEDIA_MARKER);
        assert_eq!(gif, "/media_1.gif?format=gif");
        let jpg = optimized_image_url("./media_1.jpeg?width=750", &page(), NO_WEBP, DEFAULT_MEDIA_MARKER);
        assert_eq!(jpg, "./media_1.jpeg?width=750&format=pjpg");
    }

    #[test]
    fn test_existing_format_replaced_in_place() {
        let out = optimized_image_url(
            "/media_1.png?format=jpg&width=2000&auto=webp&format=webp",
            &page(),
            NO_WEBP,
            DEFAULT_MEDIA_MARKER,
        );
        assert_eq!(out, "/media_1.png?format=png&width=2000");
    }

    #[test]
    fn test_non_media_url_unchanged() {
        let src = "https://cdn.example.com/logo.png?auto=webp";
        assert_eq!(optimized_image_url(src, &page(), NO_WEBP, DEFAULT_MEDIA_MARKER), src);
        assert_eq!(optimized_image_url(src, &page(), WEBP, DEFAULT_MEDIA_MARKER), src);
    }

    #[test]
    fn test_loader_target_same_origin_is_path() {
        let base = page();
        assert_eq!(loader_target(&base, "img/a.png?w=1").as_deref(), Some("/blog/img/a.png?w=1"));
        assert_eq!(
            loader_target(&base, "https://cdn.example.com/a.png").as_deref(),
            Some("https://cdn.example.com/a.png")
        );
    }

    #[test]
    fn test_parse_data_uri() {
        let (ct, bytes) = parse_data_uri("data:image/webp;base64,UklGRg==").unwrap();
        assert_eq!(ct, "image/webp");
        assert_eq!(bytes, b"RIFF");

        let (ct, bytes) = parse_data_uri("data:,hello%20world").unwrap();
        assert_eq!(ct, "text/plain");
        assert_eq!(bytes, b"hello world");

        assert!(parse_data_uri("https://example.com").is_none());
        assert!(is_data_uri("DATA:image/png;base64,"));
    }
}
