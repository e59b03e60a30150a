//! Render requests.

use image::RgbaImage;

use crate::engine::RenderMode;
use crate::geo::{tile_center, LngLat, TILE_SIZE};

/// Tile grid a zoom level refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSize {
    /// 256px tiles; the engine renders one zoom level lower
    Px256,
    /// 512px tiles, matching the engine's native grid
    Px512,
}

impl TileSize {
    pub fn pixels(&self) -> u32 {
        match self {
            TileSize::Px256 => 256,
            TileSize::Px512 => 512,
        }
    }
}

/// One image to render.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub mode: RenderMode,

    /// Grid `zoom` is expressed in
    pub tile_size: TileSize,

    pub zoom: f64,
    pub center: LngLat,
    pub bearing: f64,
    pub pitch: f64,

    /// Logical size; the output is `width * scale x height * scale`
    pub width: u32,
    pub height: u32,
    pub scale: u8,

    /// Requested format name, validated at render time
    pub format: String,

    /// Layer composited over the map, `width * scale x height * scale`
    pub overlay: Option<RgbaImage>,
}

impl RenderJob {
    /// A 256px tile `z/x/y`.
    pub fn tile(z: u32, x: u32, y: u32, scale: u8, format: impl Into<String>) -> Self {
        Self {
            mode: RenderMode::Tile,
            tile_size: TileSize::Px256,
            zoom: z as f64,
            center: tile_center(z, x, y),
            bearing: 0.0,
            pitch: 0.0,
            width: TILE_SIZE as u32,
            height: TILE_SIZE as u32,
            scale,
            format: format.into(),
            overlay: None,
        }
    }

    /// A 512px tile `z/x/y`.
    pub fn tile_512(z: u32, x: u32, y: u32, scale: u8, format: impl Into<String>) -> Self {
        Self {
            tile_size: TileSize::Px512,
            width: 512,
            height: 512,
            ..Self::tile(z, x, y, scale, format)
        }
    }

    /// A static map centered on `center` at a 256px-grid `zoom`.
    pub fn static_map(
        center: LngLat,
        zoom: f64,
        width: u32,
        height: u32,
        scale: u8,
        format: impl Into<String>,
    ) -> Self {
        Self {
            mode: RenderMode::Static,
            tile_size: TileSize::Px256,
            zoom,
            center,
            bearing: 0.0,
            pitch: 0.0,
            width,
            height,
            scale,
            format: format.into(),
            overlay: None,
        }
    }

    pub fn with_camera(mut self, bearing: f64, pitch: f64) -> Self {
        self.bearing = bearing;
        self.pitch = pitch;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_overlay(mut self, overlay: RgbaImage) -> Self {
        self.overlay = Some(overlay);
        self
    }
}
