//! Coarse media category.

use serde::{Deserialize, Serialize};

/// Coarse category derived from a MIME type.
///
/// Audio is folded into [`MediaCategory::Video`]; the engine only needs to
/// know "time-based media" versus stills and documents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    /// Still images
    #[display("image")]
    Image,
    /// Video and audio
    #[display("video")]
    Video,
    /// PDFs, text, office documents
    #[display("document")]
    Document,
    /// Anything else
    #[display("other")]
    Other,
}

impl MediaCategory {
    /// Convert to string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Document => "document",
            MediaCategory::Other => "other",
        }
    }

    /// Map a MIME type onto its coarse category.
    ///
    /// ```
    /// use vellum_core::MediaCategory;
    ///
    /// assert_eq!(MediaCategory::from_mime("image/png"), MediaCategory::Image);
    /// assert_eq!(MediaCategory::from_mime("audio/mpeg"), MediaCategory::Video);
    /// assert_eq!(MediaCategory::from_mime("application/pdf"), MediaCategory::Document);
    /// assert_eq!(MediaCategory::from_mime("application/zip"), MediaCategory::Other);
    /// ```
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            return MediaCategory::Image;
        }
        if mime.starts_with("video/") || mime.starts_with("audio/") {
            return MediaCategory::Video;
        }
        const DOCUMENT_MARKERS: [&str; 5] =
            ["document", "pdf", "text", "spreadsheet", "presentation"];
        if DOCUMENT_MARKERS.iter().any(|marker| mime.contains(marker)) {
            return MediaCategory::Document;
        }
        MediaCategory::Other
    }
}

impl std::str::FromStr for MediaCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaCategory::Image),
            "video" => Ok(MediaCategory::Video),
            "document" => Ok(MediaCategory::Document),
            "other" => Ok(MediaCategory::Other),
            _ => Err(format!("Unknown media category: {}", s)),
        }
    }
}
