//! Per-style collection of renderer pools.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use super::renderer_pool::RendererPool;
use super::sizes::PoolSizes;
use crate::engine::{RenderMode, RendererContext, RendererFactory};
use crate::error::PoolError;
use crate::protocol::ResourceRouter;

/// One [`RendererPool`] per render mode and scale factor `1..=max_scale`.
pub struct PoolSet {
    pools: HashMap<(RenderMode, u8), RendererPool>,
    max_scale: u8,
}

impl PoolSet {
    /// Build (but do not warm) the pools for a style.
    pub fn new(
        factory: Arc<dyn RendererFactory>,
        style_id: &str,
        style: Arc<serde_json::Value>,
        router: Arc<ResourceRouter>,
        sizes: &PoolSizes,
        max_scale: u8,
    ) -> Self {
        let mut pools = HashMap::new();
        for mode in [RenderMode::Tile, RenderMode::Static] {
            for scale in 1..=max_scale {
                let (min, max) = sizes.for_scale(scale);
                let ctx = RendererContext {
                    style_id: style_id.to_string(),
                    style: style.clone(),
                    ratio: scale,
                    mode,
                    router: router.clone(),
                };
                pools.insert((mode, scale), RendererPool::new(factory.clone(), ctx, min, max));
            }
        }
        Self { pools, max_scale }
    }

    /// Largest scale factor served.
    pub fn max_scale(&self) -> u8 {
        self.max_scale
    }

    pub fn serves_scale(&self, scale: u8) -> bool {
        (1..=self.max_scale).contains(&scale)
    }

    /// Pool for a mode and scale factor.
    pub fn get(&self, mode: RenderMode, scale: u8) -> Result<&RendererPool, PoolError> {
        self.pools
            .get(&(mode, scale))
            .ok_or(PoolError::ScaleNotConfigured { scale })
    }

    /// Pre-create the minimum number of renderers in every pool.
    pub async fn warm(&self) {
        join_all(self.pools.values().map(|pool| pool.warm())).await;
    }

    /// Drain and close every pool, returning once all are closed.
    pub async fn drain_and_close(&self) {
        join_all(self.pools.values().map(|pool| pool.drain_and_close())).await;
    }

    pub fn pools(&self) -> impl Iterator<Item = &RendererPool> {
        self.pools.values()
    }
}
