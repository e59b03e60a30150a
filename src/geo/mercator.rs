//! Spherical mercator math for 256px tiles.
//!
//! Pixel coordinates follow the slippy-map convention: the world at zoom `z`
//! is a square of `256 * 2^z` pixels with the origin at the top-left
//! (180°W, ~85.05°N).

use std::f64::consts::PI;

/// Nominal tile size in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Zoom used internally by [`project_to_pixel`] before scaling.
pub const PRECISE_ZOOM: i32 = 20;

/// Largest latitude accepted as a render center.
pub const MAX_CENTER_LATITUDE: f64 = 85.06;

/// Padding applied around a bounding box when none is requested.
pub const DEFAULT_BBOX_PADDING: f64 = 0.1;

/// Reference zoom for bounding-box fitting.
const BBOX_REFERENCE_ZOOM: f64 = 25.0;

const EARTH_RADIUS: f64 = 6_378_137.0;
const MAX_MERCATOR_EXTENT: f64 = 20_037_508.342_789_244;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Whether the point is a valid render center.
    pub fn is_valid_center(&self) -> bool {
        !self.lng.is_nan()
            && !self.lat.is_nan()
            && self.lng.abs() <= 180.0
            && self.lat.abs() <= MAX_CENTER_LATITUDE
    }

    /// Project to EPSG:3857 meters.
    pub fn to_mercator_meters(&self) -> (f64, f64) {
        let x = EARTH_RADIUS * self.lng.to_radians();
        let y = EARTH_RADIUS * (PI / 4.0 + self.lat.to_radians() / 2.0).tan().ln();
        (
            x.clamp(-MAX_MERCATOR_EXTENT, MAX_MERCATOR_EXTENT),
            y.clamp(-MAX_MERCATOR_EXTENT, MAX_MERCATOR_EXTENT),
        )
    }

    /// Inverse of [`LngLat::to_mercator_meters`].
    pub fn from_mercator_meters(x: f64, y: f64) -> Self {
        Self {
            lng: (x / EARTH_RADIUS).to_degrees(),
            lat: (PI / 2.0 - 2.0 * (-y / EARTH_RADIUS).exp().atan()).to_degrees(),
        }
    }
}

/// Geographic bounding box `[min_lng, min_lat, max_lng, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LngLat>) -> Option<Self> {
        let mut bbox: Option<Self> = None;
        for p in points {
            bbox = Some(match bbox {
                None => Self::new(p.lng, p.lat, p.lng, p.lat),
                Some(b) => Self::new(
                    b.min_lng.min(p.lng),
                    b.min_lat.min(p.lat),
                    b.max_lng.max(p.lng),
                    b.max_lat.max(p.lat),
                ),
            });
        }
        bbox
    }

    /// Arithmetic center in degrees.
    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Center taken in mercator meters, which is where the rendered map is centered.
    pub fn mercator_center(&self) -> LngLat {
        let (min_x, min_y) = LngLat::new(self.min_lng, self.min_lat).to_mercator_meters();
        let (max_x, max_y) = LngLat::new(self.max_lng, self.max_lat).to_mercator_meters();
        LngLat::from_mercator_meters((min_x + max_x) / 2.0, (min_y + max_y) / 2.0)
    }
}

/// Project to world pixels at an integer zoom, rounded to whole pixels.
pub fn px(ll: LngLat, zoom: u32) -> (f64, f64) {
    let size = TILE_SIZE * 2f64.powi(zoom as i32);
    let d = size / 2.0;
    let bc = size / 360.0;
    let cc = size / (2.0 * PI);

    let f = ll.lat.to_radians().sin().clamp(-0.9999, 0.9999);
    let x = (d + ll.lng * bc).round();
    let y = (d + 0.5 * ((1.0 + f) / (1.0 - f)).ln() * -cc).round();

    (x.min(size), y.min(size))
}

/// Inverse projection from world pixels at a (possibly fractional) zoom.
pub fn ll(px: (f64, f64), zoom: f64) -> LngLat {
    let size = TILE_SIZE * 2f64.powf(zoom);
    let d = size / 2.0;
    let bc = size / 360.0;
    let cc = size / (2.0 * PI);

    let g = (d - px.1) / cc;
    LngLat {
        lng: (px.0 - d) / bc,
        lat: (2.0 * g.exp().atan() - 0.5 * PI).to_degrees(),
    }
}

/// Project to world pixels at any zoom without low-zoom rounding loss.
///
/// The point is projected at zoom 20 and scaled to `zoom`.
pub fn project_to_pixel(ll: LngLat, zoom: f64) -> (f64, f64) {
    let (x, y) = px(ll, PRECISE_ZOOM as u32);
    let scale = 2f64.powf(zoom - PRECISE_ZOOM as f64);
    (x * scale, y * scale)
}

/// Geographic center of tile `z/x/y`.
pub fn tile_center(z: u32, x: u32, y: u32) -> LngLat {
    ll(
        ((x as f64 + 0.5) * TILE_SIZE, (y as f64 + 0.5) * TILE_SIZE),
        z as f64,
    )
}

/// Whether `z/x/y` addresses a tile: `z <= max_zoom` and `x, y < 2^z`.
pub fn is_valid_tile(z: i64, x: i64, y: i64, max_zoom: u32) -> bool {
    if z < 0 || x < 0 || y < 0 || z > max_zoom as i64 || z > 62 {
        return false;
    }
    let n = 1i64 << z;
    x < n && y < n
}

/// Largest zoom at which `bbox` (padded by `padding` on each side) fits in
/// a `width x height` viewport.
///
/// The result never drops below the zoom at which a single 256px world
/// covers the larger viewport side.
pub fn zoom_for_bbox(bbox: &BoundingBox, width: u32, height: u32, padding: f64) -> f64 {
    let reference = BBOX_REFERENCE_ZOOM as u32;
    let min_corner = px(LngLat::new(bbox.min_lng, bbox.max_lat), reference);
    let max_corner = px(LngLat::new(bbox.max_lng, bbox.min_lat), reference);

    let w = width as f64 / (1.0 + 2.0 * padding);
    let h = height as f64 / (1.0 + 2.0 * padding);

    let span = ((max_corner.0 - min_corner.0) / w)
        .log2()
        .max(((max_corner.1 - min_corner.1) / h).log2());
    let z = BBOX_REFERENCE_ZOOM - span;

    let floor = (width.max(height) as f64 / TILE_SIZE).log2();
    floor.max(BBOX_REFERENCE_ZOOM.min(z))
}

/// Vertical offset that keeps a margin-padded tile raster inside the world.
///
/// `center` is the tile center, `margin` the padding added on every side.
/// The value is added to the crop origin so that the crop never samples above
/// pixel 0 or below `2^(zoom+8)`.
pub fn tile_margin_offset(center: LngLat, zoom: u32, margin: u32) -> f64 {
    let (_, y) = px(center, zoom);
    let half = TILE_SIZE / 2.0;
    let margin = margin as f64;
    let world = 2f64.powi(zoom as i32 + 8);
    (y - half - margin)
        .min(0.0)
        .max(y + half + margin - world)
}
