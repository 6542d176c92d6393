//! Automatic optimization policy.

use crate::{DEFAULT_QUALITY, OutputFormat, TransformRequest};
use vellum_core::Dimensions;

/// Files above this size get aggressive compression.
pub const OPTIMIZE_SIZE_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Images wider than this are scaled down to it.
pub const OPTIMIZE_MAX_WIDTH: u32 = 2048;

/// Quality used for oversized files.
pub const OPTIMIZE_AGGRESSIVE_QUALITY: u8 = 75;

/// Choose the transform that optimizes an image of `size_bytes` with the
/// given dimensions.
///
/// Large files are compressed hard, wide images are scaled to
/// [`OPTIMIZE_MAX_WIDTH`], everything else is compressed at the default
/// quality. Output is always JPEG.
///
/// # Examples
///
/// ```
/// use vellum_core::Dimensions;
/// use vellum_imaging::{TransformOp, plan_optimization};
///
/// let plan = plan_optimization(1024, Some(Dimensions::new(4000, 3000)));
/// assert_eq!(plan.op, TransformOp::Resize { width: Some(2048), height: None });
/// ```
pub fn plan_optimization(size_bytes: u64, dimensions: Option<Dimensions>) -> TransformRequest {
    let request = if size_bytes > OPTIMIZE_SIZE_THRESHOLD {
        TransformRequest::compress().with_quality(OPTIMIZE_AGGRESSIVE_QUALITY)
    } else if dimensions.is_some_and(|d| d.width > OPTIMIZE_MAX_WIDTH) {
        TransformRequest::resize(Some(OPTIMIZE_MAX_WIDTH), None).with_quality(DEFAULT_QUALITY)
    } else {
        TransformRequest::compress().with_quality(DEFAULT_QUALITY)
    };
    request.with_format(OutputFormat::Jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransformOp;

    #[test]
    fn test_large_files_compress_aggressively() {
        let plan = plan_optimization(OPTIMIZE_SIZE_THRESHOLD + 1, Some(Dimensions::new(5000, 4000)));
        assert_eq!(plan.op, TransformOp::Compress);
        assert_eq!(plan.quality(), OPTIMIZE_AGGRESSIVE_QUALITY);
        assert_eq!(plan.format, Some(OutputFormat::Jpeg));
    }

    #[test]
    fn test_wide_images_are_scaled() {
        let plan = plan_optimization(OPTIMIZE_SIZE_THRESHOLD, Some(Dimensions::new(2049, 100)));
        assert_eq!(
            plan.op,
            TransformOp::Resize {
                width: Some(OPTIMIZE_MAX_WIDTH),
                height: None
            }
        );
    }

    #[test]
    fn test_default_is_plain_compression() {
        for dimensions in [None, Some(Dimensions::new(2048, 4000))] {
            let plan = plan_optimization(10, dimensions);
            assert_eq!(plan.op, TransformOp::Compress);
            assert_eq!(plan.quality(), DEFAULT_QUALITY);
        }
    }
}
