//! Transform requests and their application.

use crate::codec::{decode, encode};
use crate::{OutputFormat, WatermarkRenderer, WatermarkStatus, resize_dimensions};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use vellum_core::Dimensions;
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// Quality used when the request does not name one.
pub const DEFAULT_QUALITY: u8 = 85;

/// Square edge used for thumbnails without explicit dimensions.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 200;

/// What to do to the pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformOp {
    /// Scale to the given size; a missing side keeps the aspect ratio
    Resize {
        /// Target width
        #[serde(default)]
        width: Option<u32>,
        /// Target height
        #[serde(default)]
        height: Option<u32>,
    },
    /// Re-encode without changing dimensions
    Compress,
    /// Overlay text
    Watermark {
        /// Text to draw
        text: String,
    },
    /// Small preview, 200x200 unless dimensions are given
    Thumbnail {
        /// Target width
        #[serde(default)]
        width: Option<u32>,
        /// Target height
        #[serde(default)]
        height: Option<u32>,
    },
}

impl TransformOp {
    /// Lowercase operation name, used in derived filenames and captions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resize { .. } => "resize",
            Self::Compress => "compress",
            Self::Watermark { .. } => "watermark",
            Self::Thumbnail { .. } => "thumbnail",
        }
    }
}

/// A transform plus encoding options.
///
/// # Examples
///
/// ```
/// use vellum_imaging::{OutputFormat, TransformRequest};
///
/// let request = TransformRequest::thumbnail().with_quality(70);
/// assert_eq!(request.output_format("image/png"), OutputFormat::Jpeg);
///
/// let request = TransformRequest::resize(Some(640), None);
/// assert_eq!(request.output_format("image/png"), OutputFormat::Png);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    /// The operation
    #[serde(flatten)]
    pub op: TransformOp,
    /// Output encoding; defaults to the source's (JPEG for thumbnails)
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Lossy quality 1-100; defaults to [`DEFAULT_QUALITY`]
    #[serde(default)]
    pub quality: Option<u8>,
}

impl TransformRequest {
    /// Wrap an operation with default encoding options.
    pub fn new(op: TransformOp) -> Self {
        Self {
            op,
            format: None,
            quality: None,
        }
    }

    /// Resize request.
    pub fn resize(width: Option<u32>, height: Option<u32>) -> Self {
        Self::new(TransformOp::Resize { width, height })
    }

    /// Compress request.
    pub fn compress() -> Self {
        Self::new(TransformOp::Compress)
    }

    /// Watermark request.
    pub fn watermark(text: impl Into<String>) -> Self {
        Self::new(TransformOp::Watermark { text: text.into() })
    }

    /// Default-size thumbnail request.
    pub fn thumbnail() -> Self {
        Self::new(TransformOp::Thumbnail {
            width: None,
            height: None,
        })
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the lossy quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Effective quality.
    pub fn quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_QUALITY)
    }

    /// Effective output format for a source of `source_mime`.
    ///
    /// Thumbnails default to JPEG. Sources we cannot encode (TIFF, SVG, ...)
    /// default to PNG.
    pub fn output_format(&self, source_mime: &str) -> OutputFormat {
        if let Some(format) = self.format {
            return format;
        }
        match self.op {
            TransformOp::Thumbnail { .. } => OutputFormat::Jpeg,
            _ => OutputFormat::from_mime(source_mime).unwrap_or(OutputFormat::Png),
        }
    }

    /// Check parameters that do not depend on the source image.
    ///
    /// # Errors
    ///
    /// `InvalidTransformParameters` for a resize without dimensions, a zero
    /// dimension, blank watermark text, or a quality outside 1-100.
    pub fn validate(&self) -> VellumResult<()> {
        let invalid = |message: &str| -> VellumResult<()> {
            Err(MediaError::new(MediaErrorKind::InvalidTransformParameters(message.to_string())).into())
        };

        if let Some(quality) = self.quality
            && !(1..=100).contains(&quality)
        {
            return invalid("quality must be between 1 and 100");
        }
        match &self.op {
            TransformOp::Resize {
                width: None,
                height: None,
            } => invalid("resize needs a width or a height"),
            TransformOp::Resize { width, height } | TransformOp::Thumbnail { width, height }
                if *width == Some(0) || *height == Some(0) =>
            {
                invalid("dimensions must be greater than zero")
            }
            TransformOp::Watermark { text } if text.trim().is_empty() => {
                invalid("watermark text must not be empty")
            }
            _ => Ok(()),
        }
    }
}

/// Encoded result of a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`
    pub format: OutputFormat,
    /// Pixel dimensions of the result
    pub dimensions: Dimensions,
    /// Watermark outcome
    pub watermark: WatermarkStatus,
}

/// Decode `source`, apply `request`, and encode the result.
///
/// # Errors
///
/// `InvalidTransformParameters` for unusable requests, `DecodeFailure` for
/// unreadable sources, `EncodeFailure` if encoding fails.
pub fn apply(
    source: &[u8],
    source_mime: &str,
    request: &TransformRequest,
    watermark: &dyn WatermarkRenderer,
) -> VellumResult<Rendered> {
    request.validate()?;
    let mut image = decode(source)?;
    let original = Dimensions::new(image.width(), image.height());
    let mut status = WatermarkStatus::NotRequested;

    match &request.op {
        TransformOp::Resize { width, height } => {
            let target = resize_dimensions(original, *width, *height)?;
            image = image.resize_exact(target.width, target.height, FilterType::Lanczos3);
        }
        TransformOp::Thumbnail { width, height } => {
            let (width, height) = match (width, height) {
                (None, None) => (Some(DEFAULT_THUMBNAIL_SIZE), Some(DEFAULT_THUMBNAIL_SIZE)),
                other => (*other.0, *other.1),
            };
            let target = resize_dimensions(original, width, height)?;
            image = image.resize_exact(target.width, target.height, FilterType::Triangle);
        }
        TransformOp::Compress => {}
        TransformOp::Watermark { text } => {
            status = watermark.render(&mut image, text);
            if let WatermarkStatus::NotApplied { reason } = &status {
                tracing::warn!(%reason, "Watermark not applied");
            }
        }
    }

    let format = request.output_format(source_mime);
    let bytes = encode(&image, format, request.quality())?;
    tracing::debug!(
        op = request.op.name(),
        %format,
        from = ?original,
        to = ?(image.width(), image.height()),
        size = bytes.len(),
        "Transformed image"
    );

    Ok(Rendered {
        bytes,
        format,
        dimensions: Dimensions::new(image.width(), image.height()),
        watermark: status,
    })
}
