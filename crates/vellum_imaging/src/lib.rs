//! Image decoding, transforms and encoding for Vellum.
//!
//! Everything here is synchronous and CPU-bound; the engine runs it on its
//! transform worker pool. The entry point is [`apply`], which decodes stored
//! bytes, performs one [`TransformOp`], and encodes the result.
//!
//! # Example
//!
//! ```rust
//! use image::{DynamicImage, ImageFormat, RgbImage};
//! use vellum_imaging::{apply, NoWatermark, TransformRequest};
//!
//! let mut png = std::io::Cursor::new(Vec::new());
//! DynamicImage::ImageRgb8(RgbImage::new(400, 200))
//!     .write_to(&mut png, ImageFormat::Png)
//!     .unwrap();
//!
//! let rendered = apply(png.get_ref(), "image/png", &TransformRequest::resize(Some(100), None), &NoWatermark).unwrap();
//! assert_eq!((rendered.dimensions.width, rendered.dimensions.height), (100, 50));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod format;
mod optimize;
mod resize;
mod transform;
mod watermark;

pub use codec::{ImageHeader, decode, encode, read_dimensions, read_header};
pub use format::OutputFormat;
pub use optimize::{
    OPTIMIZE_AGGRESSIVE_QUALITY, OPTIMIZE_MAX_WIDTH, OPTIMIZE_SIZE_THRESHOLD, plan_optimization,
};
pub use resize::{MAX_DIMENSION, resize_dimensions};
pub use transform::{
    DEFAULT_QUALITY, DEFAULT_THUMBNAIL_SIZE, Rendered, TransformOp, TransformRequest, apply,
};
pub use watermark::{BitmapTextRenderer, NoWatermark, WatermarkRenderer, WatermarkStatus};
