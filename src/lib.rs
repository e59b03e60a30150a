//! # Map Render Server
//!
//! A raster map server: renders vector map styles into image tiles and
//! static map images, and packs batches of tiles into zip bundles.
//!
//! ## Features
//!
//! - **Tiles**: 256 and 512 pixel tiles at any scale factor, with optional
//!   rendered margin to avoid label clipping at tile edges
//! - **Static maps**: center, bounding-box and auto-fit positioning, with
//!   markers, paths and a watermark composited on top
//! - **Bundles**: many tiles rendered concurrently into one zip archive
//! - **Renderer pools**: bounded per style, scale factor and render mode,
//!   drained cleanly when a style is removed
//! - **Resource routing**: sprites, glyphs, packaged tiles and remote URLs
//!   requested by the engine, with per-variant failure policies
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geo`] - Web mercator math, tile helpers and polyline codecs
//! - [`engine`] - The render engine seam and a built-in background engine
//! - [`pool`] - Bounded renderer pools
//! - [`protocol`] - Sub-resource router for engine requests
//! - [`source`] - Packaged tile archives
//! - [`overlay`] - Markers, paths and watermarks
//! - [`render`] - Request validation, planning and output encoding
//! - [`bundle`] - Batch tile bundles
//! - [`style`] - Style registry and shared application context
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and config file types
//!
//! ## Example
//!
//! ```rust,no_run
//! use map_render_server::{config::FileConfig, create_router, RouterConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = FileConfig::load("config.json")?;
//!     println!("{} style(s) configured", file.styles.len());
//!     // Build a StyleRegistry and AppContext, then serve create_router(...)
//!     Ok(())
//! }
//! ```

pub mod bundle;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod overlay;
pub mod pool;
pub mod protocol;
pub mod render;
pub mod server;
pub mod source;
pub mod style;

// Re-export commonly used types
pub use bundle::{build_bundle, decode_bundle_tiles, BundleArchive, BundleOutcome, BundleRequest};
pub use config::{Config, FileConfig};
pub use engine::{
    BackgroundRendererFactory, RawImage, RenderMode, RenderParams, Renderer, RendererContext,
    RendererFactory,
};
pub use error::{
    BundleError, ConfigError, EngineError, OverlayError, PoolError, RenderError, ResourceError,
    SourceError, StyleError,
};
pub use geo::{BoundingBox, LngLat, ProjectionTransform};
pub use overlay::{IconRegistry, OverlaySpec, WatermarkFont};
pub use pool::{PoolSet, PoolSizes, PooledRenderer, RendererPool};
pub use protocol::{EmptyResponseCache, FailurePolicies, FontRegistry, ResourceRouter};
pub use render::{OutputFormat, RenderJob, RenderService, RenderedImage, TileSize};
pub use server::{create_router, AppState, RouterConfig};
pub use style::{AppContext, ServeOptions, StyleConfig, StyleContext, StyleEnv, StyleRegistry};
