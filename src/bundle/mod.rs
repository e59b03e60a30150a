//! Batch rendering of tile lists into a zip archive.
//!
//! ```text
//! encoded strings ──► decode_tiles ──► filter invalid ──┐
//!                                                       ▼
//!                           join_all(render each tile)  (fan-out)
//!                                                       │
//!              archive  ◄── append successes in order ◄─┘ (fan-in)
//! ```
//!
//! Every tile is rendered at its center with the bundle's shared size, so a
//! 512x512 bundle tile covers four times the area of the grid cell. A single
//! failed tile is logged and left out of the archive.

mod archive;

use bytes::Bytes;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::BundleError;
use crate::geo::{decode_tiles, is_valid_tile};
use crate::render::{RenderJob, RenderService};
use crate::style::StyleContext;

pub use archive::BundleArchive;

/// Highest zoom accepted in a bundle.
pub const MAX_BUNDLE_ZOOM: u32 = 20;

/// Settings shared by every tile of a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleRequest {
    pub width: u32,
    pub height: u32,
    pub scale: u8,
    pub format: String,
}

impl Default for BundleRequest {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            scale: 1,
            format: "jpeg".to_string(),
        }
    }
}

/// Result of a bundle run.
#[derive(Debug, Clone)]
pub enum BundleOutcome {
    /// Zip archive bytes
    Archive(Bytes),
    /// No valid tile in the input
    NoContent,
}

/// Decode packed `z/x/y` triples, dropping strings that fail to decode and
/// tiles outside the grid.
pub fn decode_bundle_tiles<S: AsRef<str>>(encoded: &[S]) -> Vec<(u32, u32, u32)> {
    let mut tiles = Vec::new();
    for value in encoded {
        let decoded = match decode_tiles(value.as_ref()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable tile list");
                continue;
            }
        };
        for (z, x, y) in decoded {
            if is_valid_tile(z, x, y, MAX_BUNDLE_ZOOM) {
                tiles.push((z as u32, x as u32, y as u32));
            } else {
                warn!(z, x, y, "Skipping invalid bundle tile");
            }
        }
    }
    tiles
}

/// Render `tiles` concurrently and pack the successes into a zip archive.
pub async fn build_bundle(
    renderer: &RenderService,
    style: &StyleContext,
    tiles: &[(u32, u32, u32)],
    request: &BundleRequest,
) -> Result<BundleOutcome, BundleError> {
    if tiles.is_empty() {
        return Ok(BundleOutcome::NoContent);
    }

    let renders = tiles.iter().map(|&(z, x, y)| {
        let job = RenderJob::tile(z, x, y, request.scale, request.format.as_str())
            .with_size(request.width, request.height);
        async move { ((z, x, y), renderer.render(style, job).await) }
    });
    let results = join_all(renders).await;

    let mut entries = Vec::with_capacity(results.len());
    for ((z, x, y), result) in results {
        match result {
            Ok(image) => {
                entries.push((format!("z{}x{}y{}.{}", z, x, y, request.format), image.data));
            }
            Err(e) => {
                warn!(style = style.id(), z, x, y, error = %e, "Dropping failed bundle tile");
            }
        }
    }

    debug!(
        style = style.id(),
        requested = tiles.len(),
        rendered = entries.len(),
        "Built bundle"
    );
    let data = tokio::task::spawn_blocking(move || {
        let mut archive = BundleArchive::new();
        for (name, data) in &entries {
            archive.append(name, data)?;
        }
        archive.finish()
    })
    .await
    .map_err(|e| BundleError::Archive(e.to_string()))??;
    Ok(BundleOutcome::Archive(data))
}
