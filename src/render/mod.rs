//! Render request orchestration.
//!
//! A [`RenderJob`] describes one image: a tile, a static map or a bundle
//! member. [`RenderService::render`] validates it, leases a renderer from the
//! style's pools, and turns the raw premultiplied raster into an encoded
//! image.
//!
//! ```text
//!   Validating ──► Acquiring ──► Rendering ──► PostProcessing ──► Encoding ──► Done
//!       │              │             │               │               │
//!       └──────────────┴─────────────┴───────────────┴───────────────┴──► Failed
//! ```
//!
//! Tile pools are only used for margin-free tiles; anything else, including
//! tiles rendered with a margin, goes through the static pools.

mod codec;
mod job;
mod service;

pub use codec::{
    composite, crop, encode_image, resize, unpremultiply, FormatOptions, OutputFormat,
    DEFAULT_JPEG_QUALITY, DEFAULT_WEBP_QUALITY,
};
pub use job::{RenderJob, TileSize};
pub use service::{RenderPlan, RenderService, RenderedImage, DEFAULT_MAX_SIZE};
