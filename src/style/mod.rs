//! Registered map styles.
//!
//! Every style served by the process is a [`StyleContext`]: the prepared style
//! document, its TileJSON, the resource router its renderers call back into,
//! and the renderer pools. Contexts are created by
//! [`StyleRegistry::register`] and torn down by [`StyleRegistry::remove`].
//!
//! ```text
//! StyleConfig ──► read + rewrite document ──► open mbtiles sources
//!                                                  │
//!            TileJSON + attribution ◄──────────────┤
//!            projection transformer ◄──────────────┤
//!                                                  ▼
//!                                 ResourceRouter ──► PoolSet ──► StyleContext
//! ```

mod app;
mod loader;
mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::geo::ProjectionTransform;
use crate::pool::PoolSet;
use crate::protocol::ResourceRouter;

pub use app::{AppContext, ServeOptions};
pub use loader::{
    append_attribution, base_tilejson, fix_tilejson_center, is_remote, relative_path,
    rewrite_style, source_reference, SourceReference,
};
pub use registry::{StyleEnv, StyleRegistry};

// =============================================================================
// Configuration
// =============================================================================

/// One entry of the `styles` section of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StyleConfig {
    /// Style document, relative to the styles directory
    pub style: String,

    /// Watermark text, overriding the global one
    #[serde(default)]
    pub watermark: Option<String>,

    /// Keys merged into the generated TileJSON
    #[serde(default)]
    pub tilejson: Option<Map<String, Value>>,

    /// Renames applied to `mbtiles://{id}` references before data lookup
    #[serde(default)]
    pub mapping: HashMap<String, String>,
}

/// One entry of the `data` section of the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Archive path, relative to the mbtiles directory
    pub mbtiles: String,
}

// =============================================================================
// Style Context
// =============================================================================

/// Everything needed to render one registered style.
pub struct StyleContext {
    id: String,
    style: Arc<Value>,
    tilejson: Map<String, Value>,
    transformer: Option<ProjectionTransform>,
    router: Arc<ResourceRouter>,
    pools: PoolSet,
    last_modified: DateTime<Utc>,
    watermark: Option<String>,
}

impl StyleContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        style: Arc<Value>,
        tilejson: Map<String, Value>,
        transformer: Option<ProjectionTransform>,
        router: Arc<ResourceRouter>,
        pools: PoolSet,
        last_modified: DateTime<Utc>,
        watermark: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            style,
            tilejson,
            transformer,
            router,
            pools,
            last_modified,
            watermark,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The prepared style document handed to renderers.
    pub fn style(&self) -> &Arc<Value> {
        &self.style
    }

    pub fn tilejson(&self) -> &Map<String, Value> {
        &self.tilejson
    }

    /// Converts client coordinates in the data projection to WGS84.
    pub fn transformer(&self) -> Option<ProjectionTransform> {
        self.transformer
    }

    pub fn router(&self) -> &Arc<ResourceRouter> {
        &self.router
    }

    pub fn pools(&self) -> &PoolSet {
        &self.pools
    }

    /// Registration time, whole seconds.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn watermark(&self) -> Option<&str> {
        self.watermark.as_deref()
    }
}

impl std::fmt::Debug for StyleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleContext")
            .field("id", &self.id)
            .field("transformer", &self.transformer)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}
