//! Output encodings.

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Encodings a transform can produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy, honours the quality setting
    #[display("jpeg")]
    Jpeg,
    /// Lossless, maximum compression
    #[display("png")]
    Png,
    /// Palette-based
    #[display("gif")]
    Gif,
    /// Lossless WebP
    #[display("webp")]
    WebP,
    /// Uncompressed bitmap
    #[display("bmp")]
    Bmp,
}

impl OutputFormat {
    /// Format for a MIME type, if it is one we can encode.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            "image/bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// MIME type of the encoded output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
        }
    }

    /// Whether the quality setting affects the output.
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg)
    }

    pub(crate) fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}
