//! Coordinate and projection math.
//!
//! Everything here is a pure function over plain values:
//!
//! - [`mercator`] - spherical mercator pixel/meter conversions for 256px tiles,
//!   bounding-box zoom fitting and the tile-margin vertical clamp
//! - [`polyline`] - the 5-bit polyline number codec used for `enc:` paths and
//!   packed z/x/y tile triples
//! - [`projection`] - data projection transformers declared by tile sources

pub mod mercator;
pub mod polyline;
pub mod projection;

pub use mercator::{
    is_valid_tile, ll, project_to_pixel, px, tile_center, tile_margin_offset, zoom_for_bbox,
    BoundingBox, LngLat, DEFAULT_BBOX_PADDING, MAX_CENTER_LATITUDE, PRECISE_ZOOM, TILE_SIZE,
};
pub use polyline::{decode_path, decode_tiles, decode_values, encode_tiles, encode_values, PolylineError};
pub use projection::ProjectionTransform;
