//! Target-size arithmetic.

use vellum_core::Dimensions;
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// Largest width or height a transform may produce.
pub const MAX_DIMENSION: u32 = 16_384;

fn invalid(message: impl Into<String>) -> vellum_error::VellumError {
    MediaError::new(MediaErrorKind::InvalidTransformParameters(message.into())).into()
}

/// `numerator * scale / denominator`, rounded half up, at least 1.
fn scale_rounded(numerator: u32, scale: u32, denominator: u32) -> u32 {
    let (n, s, d) = (u64::from(numerator), u64::from(scale), u64::from(denominator));
    let rounded = (2 * n * s + d) / (2 * d);
    u32::try_from(rounded.max(1)).unwrap_or(u32::MAX)
}

/// Resolve a requested size against the source size.
///
/// A missing dimension is derived from the source aspect ratio as
/// `round(h0 * W / w0)` (or symmetrically for a given height), rounding halves
/// up and never below one pixel.
///
/// ```
/// use vellum_core::Dimensions;
/// use vellum_imaging::resize_dimensions;
///
/// let source = Dimensions::new(1920, 1080);
/// assert_eq!(resize_dimensions(source, Some(640), None).unwrap(), Dimensions::new(640, 360));
/// assert_eq!(resize_dimensions(source, None, Some(360)).unwrap(), Dimensions::new(640, 360));
/// ```
///
/// # Errors
///
/// `InvalidTransformParameters` when both dimensions are missing, either is
/// zero or above [`MAX_DIMENSION`], or the source has no area.
pub fn resize_dimensions(
    source: Dimensions,
    width: Option<u32>,
    height: Option<u32>,
) -> VellumResult<Dimensions> {
    for value in [width, height].into_iter().flatten() {
        if value == 0 || value > MAX_DIMENSION {
            return Err(invalid(format!(
                "dimension {} outside 1..={}",
                value, MAX_DIMENSION
            )));
        }
    }
    if source.width == 0 || source.height == 0 {
        return Err(invalid("source image has no area"));
    }

    let target = match (width, height) {
        (Some(w), Some(h)) => Dimensions::new(w, h),
        (Some(w), None) => Dimensions::new(w, scale_rounded(source.height, w, source.width)),
        (None, Some(h)) => Dimensions::new(scale_rounded(source.width, h, source.height), h),
        (None, None) => return Err(invalid("resize needs a width or a height")),
    };

    if target.width > MAX_DIMENSION || target.height > MAX_DIMENSION {
        return Err(invalid(format!(
            "derived size {}x{} exceeds {}",
            target.width, target.height, MAX_DIMENSION
        )));
    }
    Ok(target)
}
