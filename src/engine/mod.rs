//! Render engine seam.
//!
//! A render engine turns a style document plus camera parameters into a raw
//! premultiplied RGBA raster. Engines are expensive to create and hold state
//! for a single style, so they are pooled (see [`crate::pool`]) and driven
//! through the [`Renderer`] trait. Whenever an engine needs a sub-resource
//! during rendering (sprite, glyph range, vector tile, remote asset) it calls
//! back into the [`ResourceRouter`] handed to it at creation.
//!
//! ```text
//! ┌──────────────┐  create(ctx)   ┌────────────────┐
//! │ RendererPool │ ─────────────► │ RendererFactory│
//! └──────┬───────┘                └────────────────┘
//!        │ acquire()
//!        ▼
//! ┌──────────────┐  fetch(url)    ┌────────────────┐
//! │   Renderer   │ ─────────────► │ ResourceRouter │
//! └──────────────┘                └────────────────┘
//! ```

mod background;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::geo::LngLat;
use crate::protocol::ResourceRouter;

pub use background::{BackgroundRenderer, BackgroundRendererFactory};

// =============================================================================
// Render Parameters
// =============================================================================

/// Which kind of request a renderer serves.
///
/// Tile and static requests are served by separate pools so that a burst of
/// large static maps does not starve tile rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Tile,
    Static,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Tile => "tile",
            RenderMode::Static => "static",
        }
    }
}

/// Camera and raster parameters passed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    /// Engine-native zoom (512px tiles)
    pub zoom: f64,

    /// Map center
    pub center: LngLat,

    /// Rotation in degrees, clockwise
    pub bearing: f64,

    /// Tilt in degrees
    pub pitch: f64,

    /// Logical width; the raster is `width * ratio` pixels wide
    pub width: u32,

    /// Logical height; the raster is `height * ratio` pixels high
    pub height: u32,
}

/// Raw engine output.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,

    /// Premultiplied RGBA, row-major, `width * height * 4` bytes
    pub data: Vec<u8>,
}

impl RawImage {
    /// Allocate a raster filled with a single premultiplied color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }
}

// =============================================================================
// Renderer Traits
// =============================================================================

/// Everything an engine needs to bind itself to a style.
#[derive(Clone)]
pub struct RendererContext {
    /// Style identifier (for logging)
    pub style_id: String,

    /// Processed style document
    pub style: Arc<serde_json::Value>,

    /// Device pixel ratio the renderer produces
    pub ratio: u8,

    /// Pool the renderer belongs to
    pub mode: RenderMode,

    /// Resource fetch hook
    pub router: Arc<ResourceRouter>,
}

/// A stateful engine instance bound to one style and pixel ratio.
///
/// A renderer is only ever used by one request at a time; exclusivity is
/// enforced by the pool, which is why `render` takes `&mut self`.
#[async_trait]
pub trait Renderer: Send {
    /// Render the map with the given camera.
    ///
    /// Returns a premultiplied buffer of `(width * ratio) x (height * ratio)`.
    async fn render(&mut self, params: &RenderParams) -> Result<RawImage, EngineError>;
}

/// Creates renderers for a style.
#[async_trait]
pub trait RendererFactory: Send + Sync {
    async fn create(&self, ctx: RendererContext) -> Result<Box<dyn Renderer>, EngineError>;
}
