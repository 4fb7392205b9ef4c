// Image type detection and dimension probing

use image::ImageFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
    WebP,
    Svg,
    Bmp,
    Ico,
    Unknown,
}

impl ImageType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpeg => "image/jpeg",
            ImageType::Gif => "image/gif",
            ImageType::WebP => "image/webp",
            ImageType::Svg => "image/svg+xml",
            ImageType::Bmp => "image/bmp",
            ImageType::Ico => "image/x-icon",
            ImageType::Unknown => "application/octet-stream",
        }
    }

    pub fn from_extension(ext: &str) -> ImageType {
        match ext.to_ascii_lowercase().as_str() {
            "png" => ImageType::Png,
            "jpg" | "jpeg" => ImageType::Jpeg,
            "gif" => ImageType::Gif,
            "webp" => ImageType::WebP,
            "svg" => ImageType::Svg,
            "bmp" => ImageType::Bmp,
            "ico" => ImageType::Ico,
            _ => ImageType::Unknown,
        }
    }

    /// Decoder to use for raster formats; `None` for SVG and unknown data.
    fn image_format(&self) -> Option<ImageFormat> {
        match self {
            ImageType::Png => Some(ImageFormat::Png),
            ImageType::Jpeg => Some(ImageFormat::Jpeg),
            ImageType::Gif => Some(ImageFormat::Gif),
            ImageType::WebP => Some(ImageFormat::WebP),
            ImageType::Bmp => Some(ImageFormat::Bmp),
            ImageType::Ico => Some(ImageFormat::Ico),
            ImageType::Svg | ImageType::Unknown => None,
        }
    }
}

/// Image type named by a `Content-Type` value, parameters ignored.
pub fn detect_from_content_type(content_type: &str) -> ImageType {
    let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => ImageType::Png,
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ImageType::Jpeg,
        "image/gif" => ImageType::Gif,
        "image/webp" => ImageType::WebP,
        "image/svg+xml" => ImageType::Svg,
        "image/bmp" | "image/x-bmp" => ImageType::Bmp,
        "image/x-icon" | "image/vnd.microsoft.icon" => ImageType::Ico,
        _ => ImageType::Unknown,
    }
}

// (type, byte offset, signature)
const SIGNATURES: &[(ImageType, usize, &[u8])] = &[
    (ImageType::Png, 0, b"\x89PNG\r\n\x1a\n"),
    (ImageType::Jpeg, 0, b"\xFF\xD8\xFF"),
    (ImageType::Gif, 0, b"GIF87a"),
    (ImageType::Gif, 0, b"GIF89a"),
    (ImageType::WebP, 8, b"WEBP"),
    (ImageType::Bmp, 0, b"BM"),
    (ImageType::Ico, 0, b"\0\0\x01\0"),
];

/// Sniff the image type from leading bytes.
pub fn detect_from_magic_bytes(data: &[u8]) -> ImageType {
    for &(image_type, offset, signature) in SIGNATURES {
        let matched = data.get(offset..offset + signature.len()) == Some(signature);
        // WebP also needs the RIFF container header
        if matched && (image_type != ImageType::WebP || data.starts_with(b"RIFF")) {
            return image_type;
        }
    }

    let head = String::from_utf8_lossy(&data[..data.len().min(256)]).to_ascii_lowercase();
    let head = head.trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return ImageType::Svg;
    }
    ImageType::Unknown
}

/// Prefer the declared content type; fall back to sniffing.
pub fn detect_image_type(content_type: Option<&str>, data: &[u8]) -> ImageType {
    match content_type.map(detect_from_content_type) {
        Some(declared) if declared != ImageType::Unknown => declared,
        _ => detect_from_magic_bytes(data),
    }
}

/// Decode `data` as `image_type` and report its dimensions.
pub fn decoded_dimensions(data: &[u8], image_type: ImageType) -> Result<(u32, u32), ImageDecodeError> {
    let format = image_type
        .image_format()
        .ok_or(ImageDecodeError::UnsupportedFormat(image_type))?;
    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| ImageDecodeError::DecodeFailed(e.to_string()))?;
    Ok((img.width(), img.height()))
}

/// Errors that can occur during image decoding
#[derive(Debug, thiserror::Error)]
pub enum ImageDecodeError {
    #[error("Image decode failed: {0}")]
    DecodeFailed(String),
    #[error("Unsupported format: {0:?}")]
    UnsupportedFormat(ImageType),
}
