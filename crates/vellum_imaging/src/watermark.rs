//! Watermark text rendering.

use image::{DynamicImage, Pixel, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Outcome of a watermark request.
///
/// A transform never claims a watermark it did not draw; callers inspect this
/// instead of assuming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WatermarkStatus {
    /// The transform was not a watermark
    NotRequested,
    /// Text was drawn onto the image
    Applied,
    /// The image passed through unchanged
    NotApplied {
        /// Why nothing was drawn
        reason: String,
    },
}

impl WatermarkStatus {
    /// Shorthand for [`WatermarkStatus::NotApplied`].
    pub fn not_applied(reason: impl Into<String>) -> Self {
        Self::NotApplied {
            reason: reason.into(),
        }
    }

    /// Whether a watermark was requested but not drawn.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::NotApplied { .. })
    }
}

/// Draws watermark text onto an image.
pub trait WatermarkRenderer: Send + Sync + std::fmt::Debug {
    /// Draw `text` onto `image` in place, reporting what happened.
    fn render(&self, image: &mut DynamicImage, text: &str) -> WatermarkStatus;
}

/// Renderer for deployments without text rendering; never draws anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWatermark;

impl WatermarkRenderer for NoWatermark {
    fn render(&self, _image: &mut DynamicImage, _text: &str) -> WatermarkStatus {
        WatermarkStatus::not_applied("no text renderer configured")
    }
}

/// 3x5 glyphs, one row per byte, most significant of the low three bits on the left.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        'A' => [2, 5, 7, 5, 5],
        'B' => [6, 5, 6, 5, 6],
        'C' => [3, 4, 4, 4, 3],
        'D' => [6, 5, 5, 5, 6],
        'E' => [7, 4, 6, 4, 7],
        'F' => [7, 4, 6, 4, 4],
        'G' => [3, 4, 5, 5, 3],
        'H' => [5, 5, 7, 5, 5],
        'I' => [7, 2, 2, 2, 7],
        'J' => [1, 1, 1, 5, 2],
        'K' => [5, 5, 6, 5, 5],
        'L' => [4, 4, 4, 4, 7],
        'M' => [5, 7, 7, 5, 5],
        'N' => [6, 5, 5, 5, 5],
        'O' => [2, 5, 5, 5, 2],
        'P' => [6, 5, 6, 4, 4],
        'Q' => [2, 5, 5, 6, 3],
        'R' => [6, 5, 6, 5, 5],
        'S' => [3, 4, 2, 1, 6],
        'T' => [7, 2, 2, 2, 2],
        'U' => [5, 5, 5, 5, 7],
        'V' => [5, 5, 5, 5, 2],
        'W' => [5, 5, 7, 7, 5],
        'X' => [5, 5, 2, 5, 5],
        'Y' => [5, 5, 2, 2, 2],
        'Z' => [7, 1, 2, 4, 7],
        '0' => [7, 5, 5, 5, 7],
        '1' => [2, 6, 2, 2, 7],
        '2' => [6, 1, 2, 4, 7],
        '3' => [6, 1, 2, 1, 6],
        '4' => [5, 5, 7, 1, 1],
        '5' => [7, 4, 6, 1, 6],
        '6' => [3, 4, 7, 5, 7],
        '7' => [7, 1, 2, 2, 2],
        '8' => [7, 5, 7, 5, 7],
        '9' => [7, 5, 7, 1, 6],
        ' ' => [0, 0, 0, 0, 0],
        '.' => [0, 0, 0, 0, 2],
        ',' => [0, 0, 0, 2, 4],
        '-' => [0, 0, 7, 0, 0],
        '_' => [0, 0, 0, 0, 7],
        ':' => [0, 2, 0, 2, 0],
        '/' => [1, 1, 2, 4, 4],
        '!' => [2, 2, 2, 0, 2],
        '@' => [2, 5, 7, 4, 3],
        '#' => [5, 7, 5, 7, 5],
        '&' => [2, 5, 2, 5, 3],
        '(' => [1, 2, 2, 2, 1],
        ')' => [4, 2, 2, 2, 4],
        _ => [6, 1, 2, 0, 2],
    }
}

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Built-in bitmap-font renderer.
///
/// Draws the text in the bottom-right corner, light on a dark drop shadow,
/// half transparent, scaled to roughly a third of the image width. Images too
/// small to hold the text at one pixel per glyph cell are left untouched and
/// reported as not watermarked.
#[derive(Debug, Clone, Copy)]
pub struct BitmapTextRenderer {
    /// Fraction of the image width the text aims to span
    width_fraction: f32,
    /// Text opacity, 0-255
    opacity: u8,
}

impl Default for BitmapTextRenderer {
    fn default() -> Self {
        Self {
            width_fraction: 1.0 / 3.0,
            opacity: 160,
        }
    }
}

impl BitmapTextRenderer {
    /// Create a renderer with the default size and opacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set text opacity (0-255).
    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    fn draw_text(&self, canvas: &mut RgbaImage, text: &str, origin: (u32, u32), scale: u32, color: Rgba<u8>) {
        for (index, c) in text.chars().enumerate() {
            let left = origin.0 + index as u32 * GLYPH_ADVANCE * scale;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let x0 = left + col * scale;
                    let y0 = origin.1 + row as u32 * scale;
                    for y in y0..y0 + scale {
                        for x in x0..x0 + scale {
                            if x < canvas.width() && y < canvas.height() {
                                canvas.get_pixel_mut(x, y).blend(&color);
                            }
                        }
                    }
                }
            }
        }
    }
}

impl WatermarkRenderer for BitmapTextRenderer {
    fn render(&self, image: &mut DynamicImage, text: &str) -> WatermarkStatus {
        let text = text.trim();
        let chars = text.chars().count() as u32;
        if chars == 0 {
            return WatermarkStatus::not_applied("empty watermark text");
        }

        let (width, height) = (image.width(), image.height());
        let text_cells = chars * GLYPH_ADVANCE - 1;
        let target = (width as f32 * self.width_fraction) as u32;
        let scale = (target / text_cells).min(height / (GLYPH_HEIGHT * 4)).max(1);
        let margin = scale * 2;
        let shadow = (scale / 2).max(1);

        let text_width = text_cells * scale;
        let text_height = GLYPH_HEIGHT * scale;
        if text_width + 2 * margin + shadow > width || text_height + 2 * margin + shadow > height {
            tracing::debug!(width, height, chars, "Image too small for watermark text");
            return WatermarkStatus::not_applied("image too small for watermark text");
        }

        let origin = (
            width - margin - shadow - text_width,
            height - margin - shadow - text_height,
        );
        let mut canvas = image.to_rgba8();
        self.draw_text(
            &mut canvas,
            text,
            (origin.0 + shadow, origin.1 + shadow),
            scale,
            Rgba([0, 0, 0, self.opacity / 2]),
        );
        self.draw_text(&mut canvas, text, origin, scale, Rgba([255, 255, 255, self.opacity]));
        *image = DynamicImage::ImageRgba8(canvas);

        WatermarkStatus::Applied
    }
}
