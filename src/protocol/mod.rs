//! Resource protocol router.
//!
//! Renderers ask for sub-resources by URL while they render. The URL scheme
//! selects one handler:
//!
//! | Scheme        | Handler                              | On failure |
//! |---------------|--------------------------------------|------------|
//! | `sprites://`  | file under the sprites directory     | hard       |
//! | `fonts://`    | concatenated glyph ranges            | hard       |
//! | `mbtiles://`  | packaged tile source                 | soft       |
//! | `http(s)://`  | remote fetch                         | soft       |
//!
//! Soft failures answer with a synthesized empty payload from the
//! [`EmptyResponseCache`]. The `lenientAssets` option makes every variant soft.

mod empty;
mod fonts;
mod router;
mod url;

use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use empty::{EmptyResponseCache, DEFAULT_EMPTY_COLOR};
pub use fonts::FontRegistry;
pub use router::{DataDecorator, PackagedSource, ResourceRouter};
pub use url::{format_from_extension, FailurePolicies, FailurePolicy, ResourceUrl};

/// Payload returned to a renderer.
#[derive(Debug, Clone, Default)]
pub struct ResourceResponse {
    pub data: Bytes,
    pub modified: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

impl ResourceResponse {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}
