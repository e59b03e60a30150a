//! Raster post-processing and output encoders.
//!
//! # Design Decisions
//!
//! - **Straight alpha first**: engines return premultiplied pixels, every
//!   encoder here expects straight alpha, so [`unpremultiply`] always runs
//!   before cropping or compositing.
//!
//! - **WebP through libwebp**: the `image` crate only writes lossless WebP,
//!   lossy output with a quality setting goes through the `webp` crate.
//!
//! - **JPEG drops alpha**: images are flattened to RGB before JPEG encoding.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageEncoder, RgbaImage};

use crate::error::RenderError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Default WebP quality (1-100).
pub const DEFAULT_WEBP_QUALITY: u8 = 90;

// =============================================================================
// Output Format
// =============================================================================

/// Encodable raster formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    /// Parse a format name, normalizing `jpg` to `jpeg`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Format Options
// =============================================================================

/// Encoder settings shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatOptions {
    /// zlib effort, 0-9
    pub png_compression_level: u8,

    /// Per-row adaptive filtering; off writes unfiltered rows
    pub png_adaptive_filtering: bool,

    pub jpeg_quality: u8,

    pub webp_quality: u8,

    /// Lossless WebP ignores `webp_quality`
    pub webp_lossless: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            png_compression_level: 6,
            png_adaptive_filtering: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            webp_quality: DEFAULT_WEBP_QUALITY,
            webp_lossless: false,
        }
    }
}

impl FormatOptions {
    /// Override the quality for a lossy format. PNG has no quality and is
    /// left unchanged.
    pub fn with_quality(mut self, format: OutputFormat, quality: u8) -> Self {
        let quality = quality.clamp(1, 100);
        match format {
            OutputFormat::Jpeg => self.jpeg_quality = quality,
            OutputFormat::Webp => self.webp_quality = quality,
            OutputFormat::Png => {}
        }
        self
    }

    fn png_compression(&self) -> CompressionType {
        match self.png_compression_level {
            0..=3 => CompressionType::Fast,
            4..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn codec_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Codec {
        message: e.to_string(),
    }
}

/// Encode an image.
pub fn encode_image(
    image: &DynamicImage,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<Bytes, RenderError> {
    let mut output = Vec::new();

    match format {
        OutputFormat::Png => {
            let filter = if options.png_adaptive_filtering {
                PngFilter::Adaptive
            } else {
                PngFilter::NoFilter
            };
            let encoder = PngEncoder::new_with_quality(
                Cursor::new(&mut output),
                options.png_compression(),
                filter,
            );
            encoder
                .write_image(
                    image.as_bytes(),
                    image.width(),
                    image.height(),
                    image.color().into(),
                )
                .map_err(codec_error)?;
        }
        OutputFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut output, options.jpeg_quality);
            encoder.encode_image(&rgb).map_err(codec_error)?;
        }
        OutputFormat::Webp => {
            let rgba = image.to_rgba8();
            let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
            let memory = encoder
                .encode_simple(options.webp_lossless, options.webp_quality as f32)
                .map_err(|e| codec_error(format!("webp: {:?}", e)))?;
            output.extend_from_slice(&memory);
        }
    }

    if output.is_empty() {
        return Err(codec_error(format!("{} encoder produced no data", format)));
    }
    Ok(Bytes::from(output))
}

// =============================================================================
// Post-processing
// =============================================================================

/// Convert premultiplied RGBA to straight alpha in place.
///
/// Fully transparent pixels get zeroed color channels.
pub fn unpremultiply(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(4) {
        let alpha = pixel[3];
        if alpha == 0 {
            pixel[0] = 0;
            pixel[1] = 0;
            pixel[2] = 0;
        } else if alpha < 255 {
            let norm = alpha as f32 / 255.0;
            for c in &mut pixel[..3] {
                *c = (*c as f32 / norm).round().min(255.0) as u8;
            }
        }
    }
}

/// Cut a `width x height` window whose top-left corner is at `(left, top)`.
///
/// The window is clamped to the image.
pub fn crop(image: &RgbaImage, left: u32, top: u32, width: u32, height: u32) -> RgbaImage {
    let left = left.min(image.width());
    let top = top.min(image.height());
    let width = width.min(image.width() - left);
    let height = height.min(image.height() - top);
    imageops::crop_imm(image, left, top, width, height).to_image()
}

/// Resample to exactly `width x height` with a Lanczos filter.
pub fn resize(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Draw `layer` over `base` at the origin.
pub fn composite(base: &mut RgbaImage, layer: &RgbaImage) {
    imageops::overlay(base, layer, 0, 0);
}
