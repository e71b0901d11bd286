//! Bold fixed-width text drawn from the 8×8 bitmap glyph set.
//!
//! Glyph cells are stretched to `0.6 em` wide by `1 em` tall, the proportions
//! of a typewriter face, so every character advances by the same amount and
//! string width is a plain multiplication.

use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};

/// Glyph rows above the baseline; row 7 of the bitmap holds descenders.
const ASCENT_ROWS: f64 = 7.0;
/// Extra horizontal ink per glyph pixel, as a fraction of its width.
const BOLD_SPREAD: f64 = 0.35;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonoFont {
    pub size: f64,
}

impl MonoFont {
    pub const fn new(size: f64) -> Self {
        Self { size }
    }

    pub fn advance(&self) -> f64 {
        self.size * 3.0 / 5.0
    }

    /// Width of `text` when drawn.
    pub fn measure(&self, text: &str) -> f64 {
        text.chars().filter(|c| *c != '\n').count() as f64 * self.advance()
    }

    /// Draw `text` with its left edge at `x` and its alphabetic baseline at `y`.
    /// Ink falling outside the canvas is clipped.
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f64, y: f64, color: Rgba<u8>) {
        let cell_w = self.advance() / 8.0;
        let cell_h = self.size / 8.0;
        let top = y - ASCENT_ROWS * cell_h;

        let mut cursor_x = x;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let glyph = BASIC_FONTS
                .get(ch)
                .or_else(|| LATIN_FONTS.get(ch))
                .unwrap_or([0; 8]);
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..8 {
                    if (bits >> col) & 1 == 1 {
                        let px = cursor_x + col as f64 * cell_w;
                        let py = top + row as f64 * cell_h;
                        fill_rect(
                            canvas,
                            px,
                            py,
                            cell_w * (1.0 + BOLD_SPREAD),
                            cell_h,
                            color,
                        );
                    }
                }
            }
            cursor_x += self.advance();
        }
    }
}

/// Fill the axis-aligned rectangle, rounding edges to the nearest pixel and
/// clipping to the canvas.
pub fn fill_rect(canvas: &mut RgbaImage, x: f64, y: f64, w: f64, h: f64, color: Rgba<u8>) {
    let (cw, ch) = (canvas.width() as f64, canvas.height() as f64);
    let x0 = x.round().clamp(0.0, cw) as u32;
    let y0 = y.round().clamp(0.0, ch) as u32;
    let x1 = (x + w).round().clamp(0.0, cw) as u32;
    let y1 = (y + h).round().clamp(0.0, ch) as u32;
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px, py, color);
        }
    }
}
