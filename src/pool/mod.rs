//! Renderer pool management.
//!
//! Renderers are expensive, stateful and bound to one style and pixel ratio,
//! so each style keeps a [`PoolSet`]: one bounded [`RendererPool`] per render
//! mode and scale factor.
//!
//! ```text
//! ┌────────────────────────────── PoolSet ──────────────────────────────┐
//! │  (Tile, 1x)   (Tile, 2x)   (Tile, 3x)                               │
//! │  (Static, 1x) (Static, 2x) (Static, 3x)                             │
//! └──────────────────────────────┬──────────────────────────────────────┘
//!                                │ acquire()
//!                                ▼
//!                  ┌──────────────────────────┐
//!                  │      PooledRenderer      │  drop → back to idle list
//!                  └──────────────────────────┘
//! ```
//!
//! Sizes come from [`PoolSizes`]: by default `[8, 4, 2]` idle renderers are
//! created up front and at most `[16, 8, 4]` are in use for 1x, 2x and 3x.

mod renderer_pool;
mod set;
mod sizes;

pub use renderer_pool::{PooledRenderer, RendererPool};
pub use set::PoolSet;
pub use sizes::{
    PoolSizes, DEFAULT_MAX_POOL_SIZES, DEFAULT_MAX_SCALE_FACTOR, DEFAULT_MIN_POOL_SIZES,
    MAX_SCALE_FACTOR_LIMIT,
};
