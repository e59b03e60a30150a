//! Watermark text.
//!
//! The text is rasterized with `rusttype` into a coverage mask, anchored at
//! the bottom-left corner. A dilated copy of the mask is painted first as a
//! light halo, then the glyphs themselves in a dark translucent fill.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use rusttype::{point, Font, Scale};

use super::color::Color;
use crate::error::OverlayError;

const FONT_SIZE: f32 = 10.0;
const MARGIN: f32 = 5.0;
const HALO: Color = Color::rgba(255, 255, 255, 102);
const FILL: Color = Color::rgba(0, 0, 0, 102);

/// A TrueType font used for watermark text.
#[derive(Clone)]
pub struct WatermarkFont {
    font: Arc<Font<'static>>,
}

impl std::fmt::Debug for WatermarkFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkFont").finish_non_exhaustive()
    }
}

impl WatermarkFont {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, OverlayError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| OverlayError::Font(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(data)
            .ok_or_else(|| OverlayError::Font(format!("{}: not a TrueType font", path.display())))
    }

    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        Font::try_from_vec(data).map(|font| Self {
            font: Arc::new(font),
        })
    }
}

/// Coverage values in `0..=1`, row-major.
struct Mask {
    width: u32,
    height: u32,
    coverage: Vec<f32>,
}

impl Mask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0.0; (width * height) as usize],
        }
    }

    fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.coverage[(y as u64 * self.width as u64 + x as u64) as usize]
    }

    /// Max-filter with a square neighbourhood of `radius` pixels.
    fn dilate(&self, radius: i64) -> Mask {
        let mut out = Mask::new(self.width, self.height);
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let mut v = 0.0f32;
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        v = v.max(self.get(x + dx, y + dy));
                    }
                }
                out.coverage[(y as u64 * self.width as u64 + x as u64) as usize] = v;
            }
        }
        out
    }
}

fn rasterize(font: &Font<'_>, text: &str, width: u32, height: u32, ratio: f32) -> Mask {
    let mut mask = Mask::new(width, height);
    let scale = Scale::uniform(FONT_SIZE * ratio);
    let baseline = point(MARGIN * ratio, height as f32 - MARGIN * ratio);

    for glyph in font.layout(text, scale, baseline) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, v| {
            let x = bb.min.x as i64 + gx as i64;
            let y = bb.min.y as i64 + gy as i64;
            if x >= 0 && y >= 0 && x < width as i64 && y < height as i64 {
                let i = (y as u64 * width as u64 + x as u64) as usize;
                mask.coverage[i] = mask.coverage[i].max(v);
            }
        });
    }
    mask
}

/// Source-over blend of `color` scaled by the mask coverage.
fn paint(image: &mut RgbaImage, mask: &Mask, color: Color) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let coverage = mask.get(x as i64, y as i64);
        if coverage <= 0.0 {
            continue;
        }
        let src_a = color.a as f32 / 255.0 * coverage;
        let dst_a = pixel[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            continue;
        }
        let blend = |s: u8, d: u8| {
            let v = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };
        *pixel = image::Rgba([
            blend(color.r, pixel[0]),
            blend(color.g, pixel[1]),
            blend(color.b, pixel[2]),
            (out_a * 255.0).round() as u8,
        ]);
    }
}

fn composite(image: &mut RgbaImage, glyphs: &Mask, ratio: u8) {
    let halo = glyphs.dilate(ratio.max(1) as i64);
    paint(image, &halo, HALO);
    paint(image, glyphs, FILL);
}

/// Draw `text` onto a straight-alpha image rendered at `ratio` pixels per
/// CSS pixel.
pub fn draw_watermark(image: &mut RgbaImage, text: &str, font: &WatermarkFont, ratio: u8) {
    if text.is_empty() {
        return;
    }
    let glyphs = rasterize(
        &font.font,
        text,
        image.width(),
        image.height(),
        ratio.max(1) as f32,
    );
    composite(image, &glyphs, ratio);
}
