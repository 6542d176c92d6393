//! MIME type and category detection.

use vellum_core::{MediaCategory, MediaConfig};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// Detected MIME type and coarse category of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// MIME essence, lowercase, without parameters
    pub mime_type: String,
    /// Category derived from `mime_type`
    pub category: MediaCategory,
}

impl Classification {
    fn from_mime(mime_type: &str) -> Self {
        let mime_type = normalize(mime_type);
        Self {
            category: MediaCategory::from_mime(&mime_type),
            mime_type,
        }
    }
}

/// Extension table, lowercase without the dot.
const EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("avif", "image/avif"),
    ("heic", "image/heic"),
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
];

/// Look up the MIME type for a filename's extension.
///
/// ```
/// use vellum_storage::mime_from_extension;
///
/// assert_eq!(mime_from_extension("Photo.JPG"), Some("image/jpeg"));
/// assert_eq!(mime_from_extension("archive"), None);
/// ```
pub fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

/// Identify content by its leading bytes.
///
/// Falls back to `text/plain` for valid UTF-8 without control characters and
/// `application/octet-stream` for everything else.
pub fn sniff(content: &[u8]) -> &'static str {
    sniff_signature(content).unwrap_or_else(|| {
        if looks_like_text(content) {
            "text/plain"
        } else {
            "application/octet-stream"
        }
    })
}

fn sniff_signature(content: &[u8]) -> Option<&'static str> {
    let starts = |magic: &[u8]| content.starts_with(magic);
    let riff_form = |form: &[u8]| starts(b"RIFF") && content.get(8..12) == Some(form);

    if starts(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if starts(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if starts(b"GIF87a") || starts(b"GIF89a") {
        Some("image/gif")
    } else if riff_form(b"WEBP") {
        Some("image/webp")
    } else if starts(b"BM") && content.len() >= 14 {
        Some("image/bmp")
    } else if starts(b"II*\0") || starts(b"MM\0*") {
        Some("image/tiff")
    } else if starts(&[0x00, 0x00, 0x01, 0x00]) {
        Some("image/x-icon")
    } else if starts(b"%PDF-") {
        Some("application/pdf")
    } else if content.get(4..8) == Some(b"ftyp") {
        match content.get(8..12) {
            Some(b"qt  ") => Some("video/quicktime"),
            Some(b"M4A ") => Some("audio/mp4"),
            Some(b"avif") => Some("image/avif"),
            _ => Some("video/mp4"),
        }
    } else if starts(&[0x1A, 0x45, 0xDF, 0xA3]) {
        Some("video/webm")
    } else if riff_form(b"AVI ") {
        Some("video/x-msvideo")
    } else if riff_form(b"WAVE") {
        Some("audio/wav")
    } else if starts(b"OggS") {
        Some("audio/ogg")
    } else if starts(b"fLaC") {
        Some("audio/flac")
    } else if starts(b"ID3") || starts(&[0xFF, 0xFB]) {
        Some("audio/mpeg")
    } else if starts(b"PK\x03\x04") {
        Some("application/zip")
    } else if starts(&[0x1F, 0x8B]) {
        Some("application/gzip")
    } else if looks_like_html(content) {
        Some("text/html")
    } else {
        None
    }
}

fn looks_like_html(content: &[u8]) -> bool {
    let head = &content[..content.len().min(64)];
    let head = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn looks_like_text(content: &[u8]) -> bool {
    !content.is_empty()
        && std::str::from_utf8(content)
            .map(|text| {
                text.chars()
                    .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
            })
            .unwrap_or(false)
}

/// Strip parameters and lowercase; unparseable input becomes octet-stream.
fn normalize(mime_type: &str) -> String {
    mime_type
        .parse::<mime::Mime>()
        .map(|m| m.essence_str().to_ascii_lowercase())
        .unwrap_or_else(|_| mime::APPLICATION_OCTET_STREAM.essence_str().to_string())
}

/// Detect the MIME type and category of an upload.
///
/// The filename extension wins when it is known, except when it names an
/// image type and the content carries a different image signature; a renamed
/// PNG is still a PNG. Unknown extensions fall back to content sniffing.
///
/// ```
/// use vellum_core::MediaCategory;
/// use vellum_storage::classify;
///
/// let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
/// let found = classify("upload.dat", &png);
/// assert_eq!(found.mime_type, "image/png");
/// assert_eq!(found.category, MediaCategory::Image);
/// ```
pub fn classify(filename: &str, content: &[u8]) -> Classification {
    let by_extension = mime_from_extension(filename);
    let by_signature = sniff_signature(content);

    let chosen = match (by_extension, by_signature) {
        (Some(ext), Some(sig))
            if ext != sig
                && MediaCategory::from_mime(ext) == MediaCategory::Image
                && MediaCategory::from_mime(sig) == MediaCategory::Image =>
        {
            tracing::debug!(filename, extension = ext, signature = sig, "Extension disagrees with content");
            sig
        }
        (Some(ext), _) => ext,
        (None, Some(sig)) => sig,
        (None, None) => sniff(content),
    };

    Classification::from_mime(chosen)
}

/// Reject a classification whose MIME type is not on the allow-list.
///
/// # Errors
///
/// Returns `UnsupportedType` naming the rejected MIME type.
pub fn ensure_allowed(classification: &Classification, config: &MediaConfig) -> VellumResult<()> {
    if config.is_mime_allowed(&classification.mime_type) {
        Ok(())
    } else {
        Err(MediaError::new(MediaErrorKind::UnsupportedType(
            classification.mime_type.clone(),
        ))
        .into())
    }
}
