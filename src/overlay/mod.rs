//! Overlay compositor.
//!
//! Builds the transparent layer that sits on top of a static map:
//!
//! ```text
//! query pairs ──► OverlaySpec { paths, markers, style }
//!                        │
//!                        ├── icons loaded concurrently
//!                        ▼
//!                 Canvas (tiny-skia) ──► paths in order ──► markers in order
//!                        │
//!                        ▼
//!                 RgbaImage (straight alpha, width*scale x height*scale)
//! ```
//!
//! Watermark text is drawn separately, after the overlay has been composited.

mod color;
mod draw;
mod icons;
mod parse;
mod watermark;

use futures::future::join_all;
use image::RgbaImage;
use tracing::warn;

pub use color::Color;
pub use draw::Canvas;
pub use icons::{load_icon, sanitize_filename, IconRegistry, IconSource};
pub use parse::{Marker, OverlayOptions, OverlayPath, OverlaySpec, PathDirectives, PathStyle};
pub use watermark::{draw_watermark, WatermarkFont};

use crate::error::OverlayError;
use crate::geo::LngLat;

/// The map view an overlay is drawn for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayView {
    pub center: LngLat,
    pub zoom: f64,
    pub bearing: f64,
    pub width: u32,
    pub height: u32,
    pub scale: u8,
}

/// Draw the overlay layer, or `None` when there is nothing to draw.
///
/// Markers whose icon fails to load are skipped with a warning.
pub async fn render_overlay(
    spec: &OverlaySpec,
    view: &OverlayView,
    http: &reqwest::Client,
) -> Result<Option<RgbaImage>, OverlayError> {
    if spec.is_empty() {
        return Ok(None);
    }

    let icons = join_all(spec.markers.iter().map(|m| load_icon(&m.icon, http))).await;

    let mut canvas = Canvas::new(
        view.center,
        view.zoom,
        view.bearing,
        view.width,
        view.height,
        view.scale,
    )?;

    for path in &spec.paths {
        canvas.draw_path(path, &spec.style);
    }

    for (marker, icon) in spec.markers.iter().zip(icons) {
        match icon {
            Ok(icon) => canvas.draw_marker(marker, &icon),
            Err(e) => warn!(error = %e, "Skipping marker"),
        }
    }

    Ok(Some(canvas.into_image()))
}
