//! Data projection transformers.
//!
//! A tile source may declare the projection of its data through a proj4
//! definition. When it does, coordinates supplied by clients for that style
//! (static map centers, bounding boxes, overlay points) are expressed in that
//! projection and must be converted to WGS84 before use.

use tracing::warn;

use super::mercator::LngLat;

/// Converts coordinates from a source projection to WGS84 lon/lat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionTransform {
    /// Data already in geographic degrees (`+proj=longlat`)
    Identity,
    /// Spherical mercator meters (`+proj=merc`, EPSG:3857)
    SphericalMercator,
}

impl ProjectionTransform {
    /// Build a transformer from a proj4 definition string.
    ///
    /// Returns `None` (after logging) for projections that cannot be handled.
    pub fn from_proj4(definition: &str) -> Option<Self> {
        let proj = definition
            .split_whitespace()
            .find_map(|token| token.strip_prefix("+proj="));

        match proj {
            Some("longlat") | Some("latlong") => Some(ProjectionTransform::Identity),
            Some("merc") => Some(ProjectionTransform::SphericalMercator),
            _ => {
                warn!(proj4 = %definition, "Unsupported source projection, ignoring");
                None
            }
        }
    }

    /// Convert a point expressed in the source projection to WGS84.
    pub fn to_wgs84(&self, x: f64, y: f64) -> LngLat {
        match self {
            ProjectionTransform::Identity => LngLat::new(x, y),
            ProjectionTransform::SphericalMercator => LngLat::from_mercator_meters(x, y),
        }
    }
}
