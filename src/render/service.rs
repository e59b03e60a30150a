//! Render request orchestration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         RenderService                            │
//! │                                                                  │
//! │  validate ──► plan ──► acquire ──► render ──► release            │
//! │  (no pool)     │        (pool)     (engine)      │               │
//! │                │                                 ▼               │
//! │                └────────► spawn_blocking: unpremultiply ─► crop  │
//! │                           ─► resize ─► overlay ─► watermark      │
//! │                           ─► encode                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pooled renderer is released as soon as the engine returns, whatever
//! the outcome, and before any post-processing. Dropping the future returned
//! by [`RenderService::render`] also releases it.

use bytes::Bytes;
use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

use super::codec::{composite, crop, encode_image, resize, unpremultiply, FormatOptions, OutputFormat};
use super::job::{RenderJob, TileSize};
use crate::engine::{RawImage, RenderMode, RenderParams};
use crate::error::RenderError;
use crate::geo::tile_margin_offset;
use crate::overlay::{draw_watermark, WatermarkFont};
use crate::style::StyleContext;

/// Default largest output side in pixels, scale included.
pub const DEFAULT_MAX_SIZE: u32 = 2048;

/// An encoded image.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub data: Bytes,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// How a job maps onto an engine render and the post-processing after it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub pool: RenderMode,
    pub params: RenderParams,
    /// Top-left corner of the output window in the raw raster
    pub crop: Option<(u32, u32)>,
    /// Raw raster is twice the output size
    pub downscale: bool,
}

/// Renders jobs against registered styles.
#[derive(Debug, Clone)]
pub struct RenderService {
    max_size: u32,
    tile_margin: u32,
    format_options: FormatOptions,
    watermark_font: Option<WatermarkFont>,
}

impl Default for RenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService {
    pub fn new() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            tile_margin: 0,
            format_options: FormatOptions::default(),
            watermark_font: None,
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Pixels rendered around each tile and cropped away afterwards.
    pub fn with_tile_margin(mut self, margin: u32) -> Self {
        self.tile_margin = margin;
        self
    }

    pub fn with_format_options(mut self, options: FormatOptions) -> Self {
        self.format_options = options;
        self
    }

    pub fn with_watermark_font(mut self, font: WatermarkFont) -> Self {
        self.watermark_font = Some(font);
        self
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn tile_margin(&self) -> u32 {
        self.tile_margin
    }

    pub fn format_options(&self) -> &FormatOptions {
        &self.format_options
    }

    pub fn has_watermark_font(&self) -> bool {
        self.watermark_font.is_some()
    }

    /// Check a job without touching any pool.
    ///
    /// Returns the normalized output format.
    pub fn validate(&self, job: &RenderJob) -> Result<OutputFormat, RenderError> {
        if !job.center.is_valid_center() {
            return Err(RenderError::InvalidCenter);
        }

        if job.width.min(job.height) == 0
            || job.width.max(job.height) as u64 * job.scale as u64 > self.max_size as u64
        {
            return Err(RenderError::InvalidSize);
        }

        if !job.zoom.is_finite() || job.zoom < 0.0 {
            return Err(RenderError::InvalidZoom);
        }

        if job.scale == 0 {
            return Err(RenderError::InvalidScale { scale: job.scale });
        }

        OutputFormat::parse(&job.format).ok_or_else(|| RenderError::InvalidFormat {
            format: job.format.clone(),
        })
    }

    /// Engine parameters and post-processing steps for a job.
    pub fn plan(&self, job: &RenderJob) -> RenderPlan {
        let pool = if job.mode == RenderMode::Tile && self.tile_margin == 0 {
            RenderMode::Tile
        } else {
            RenderMode::Static
        };

        let native_zoom = match job.tile_size {
            TileSize::Px256 => (job.zoom - 1.0).max(0.0),
            TileSize::Px512 => job.zoom.max(0.0),
        };

        let mut params = RenderParams {
            zoom: native_zoom,
            center: job.center,
            bearing: job.bearing,
            pitch: job.pitch,
            width: job.width,
            height: job.height,
        };

        let downscale = job.tile_size == TileSize::Px256 && job.zoom == 0.0;
        if downscale {
            params.width *= 2;
            params.height *= 2;
        }

        let margin = self.tile_margin;
        let apply_margin = job.mode == RenderMode::Tile
            && job.tile_size == TileSize::Px256
            && job.zoom > 2.0
            && margin > 0;
        let crop = if apply_margin {
            params.width += margin * 2;
            params.height += margin * 2;

            let offset = tile_margin_offset(job.center, job.zoom as u32, margin);
            let scale = job.scale as f64;
            let left = margin as f64 * scale;
            let top = ((margin as f64 + offset) * scale).max(0.0);
            Some((left as u32, top.round() as u32))
        } else {
            None
        };

        RenderPlan {
            pool,
            params,
            crop,
            downscale,
        }
    }

    /// Render, post-process and encode a job.
    pub async fn render(
        &self,
        style: &StyleContext,
        job: RenderJob,
    ) -> Result<RenderedImage, RenderError> {
        let format = self.validate(&job)?;
        if !style.pools().serves_scale(job.scale) {
            return Err(RenderError::InvalidScale { scale: job.scale });
        }

        let plan = self.plan(&job);
        let pool = style.pools().get(plan.pool, job.scale)?;

        let raw = {
            let mut renderer = pool.acquire().await?;
            renderer.render(&plan.params).await
        };
        let raw = raw.map_err(|e| {
            warn!(style = style.id(), error = %e, "Render failed");
            RenderError::from(e)
        })?;

        let watermark = match (style.watermark(), &self.watermark_font) {
            (Some(text), Some(font)) => Some((text.to_string(), font.clone())),
            (Some(_), None) => {
                debug!(style = style.id(), "No watermark font, skipping watermark");
                None
            }
            _ => None,
        };

        let finish = Finish {
            width: job.width * job.scale as u32,
            height: job.height * job.scale as u32,
            scale: job.scale,
            crop: plan.crop,
            downscale: plan.downscale,
            overlay: job.overlay,
            watermark,
            format,
            options: self.format_options,
        };
        let (width, height) = (finish.width, finish.height);

        let data = tokio::task::spawn_blocking(move || finish.run(raw))
            .await
            .map_err(|e| RenderError::Codec {
                message: e.to_string(),
            })??;

        Ok(RenderedImage {
            data,
            format,
            width,
            height,
        })
    }
}

/// Post-processing of one raw raster.
struct Finish {
    width: u32,
    height: u32,
    scale: u8,
    crop: Option<(u32, u32)>,
    downscale: bool,
    overlay: Option<RgbaImage>,
    watermark: Option<(String, WatermarkFont)>,
    format: OutputFormat,
    options: FormatOptions,
}

impl Finish {
    fn run(self, raw: RawImage) -> Result<Bytes, RenderError> {
        let RawImage {
            width,
            height,
            mut data,
        } = raw;
        unpremultiply(&mut data);

        let mut image =
            RgbaImage::from_raw(width, height, data).ok_or_else(|| RenderError::Codec {
                message: format!("engine returned a buffer too small for {}x{}", width, height),
            })?;

        if let Some((left, top)) = self.crop {
            image = crop(&image, left, top, self.width, self.height);
        }

        if self.downscale || image.dimensions() != (self.width, self.height) {
            image = resize(&image, self.width, self.height);
        }

        if let Some(overlay) = &self.overlay {
            composite(&mut image, overlay);
        }

        if let Some((text, font)) = &self.watermark {
            draw_watermark(&mut image, text, font, self.scale);
        }

        encode_image(&DynamicImage::ImageRgba8(image), self.format, &self.options)
    }
}
