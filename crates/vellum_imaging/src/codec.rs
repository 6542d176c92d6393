//! Decoding, encoding and header inspection.

use crate::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use vellum_core::Dimensions;
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// Decode stored bytes into pixels.
///
/// # Errors
///
/// Returns `DecodeFailure` for unreadable or corrupt images.
pub fn decode(data: &[u8]) -> VellumResult<DynamicImage> {
    image::load_from_memory(data)
        .map_err(|e| MediaError::new(MediaErrorKind::DecodeFailure(e.to_string())).into())
}

/// Read pixel dimensions from the header without decoding the image.
///
/// Returns `None` for anything that is not a recognisable image.
pub fn read_dimensions(data: &[u8]) -> Option<Dimensions> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(Dimensions::new(width, height))
}

/// Facts read from an image header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    /// Pixel dimensions
    pub dimensions: Dimensions,
    /// Decoder colour type, e.g. `Rgb8`
    pub color_type: String,
}

/// Read dimensions and colour type from the header.
///
/// # Errors
///
/// Returns `DecodeFailure` if no decoder recognises the header.
pub fn read_header(data: &[u8]) -> VellumResult<ImageHeader> {
    let decode_failure = |e: image::ImageError| MediaError::new(MediaErrorKind::DecodeFailure(e.to_string()));
    let decoder = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| MediaError::new(MediaErrorKind::DecodeFailure(e.to_string())))?
        .into_decoder()
        .map_err(decode_failure)?;
    let (width, height) = decoder.dimensions();
    Ok(ImageHeader {
        dimensions: Dimensions::new(width, height),
        color_type: format!("{:?}", decoder.color_type()),
    })
}

/// Encode pixels as `format`.
///
/// `quality` (1-100) only affects lossy formats; PNG always uses the best
/// compression level.
///
/// # Errors
///
/// Returns `EncodeFailure` if the encoder rejects the image.
pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> VellumResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive);
            image.write_with_encoder(encoder)
        }
        OutputFormat::Gif | OutputFormat::WebP | OutputFormat::Bmp => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut buffer, format.image_format())
        }
    };
    result.map_err(|e| MediaError::new(MediaErrorKind::EncodeFailure(e.to_string())))?;

    tracing::trace!(%format, size = buffer.get_ref().len(), "Encoded image");
    Ok(buffer.into_inner())
}
