//! Path segment and query string parsing.
//!
//! Image routes carry their size, scale factor and format in a single path
//! segment (`12@2x.png`, `600x400@2x.webp`), and static maps their camera in
//! another (`8.5,47.3,12@30,45`, `5,45,10,48`, `auto`).

use crate::geo::BoundingBox;

/// Parsed `[@Nx].{format}` suffix and the text before it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSegment<'a> {
    pub stem: &'a str,
    pub scale: u8,
    pub format: &'a str,
}

/// Split `{stem}[@{N}x].{format}`.
///
/// Returns `None` if there is no extension or the scale is malformed.
pub fn image_segment(segment: &str) -> Option<ImageSegment<'_>> {
    let (rest, format) = segment.rsplit_once('.')?;
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let (stem, scale) = match rest.rsplit_once('@') {
        Some((stem, factor)) => {
            let digits = factor.strip_suffix('x')?;
            (stem, digits.parse::<u8>().ok()?)
        }
        None => (rest, 1),
    };

    Some(ImageSegment {
        stem,
        scale,
        format,
    })
}

/// Logical size, scale and format of a static map.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSize {
    pub width: u32,
    pub height: u32,
    pub scale: u8,
    pub format: String,
}

/// Parse `{w}x{h}[@Nx].{format}`.
pub fn static_size(segment: &str) -> Option<StaticSize> {
    let image = image_segment(segment)?;
    let (width, height) = image.stem.split_once('x')?;
    Some(StaticSize {
        width: width.parse().ok()?,
        height: height.parse().ok()?,
        scale: image.scale,
        format: image.format.to_string(),
    })
}

/// How a static map is positioned.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticPosition {
    /// `{x},{y},{zoom}[@{bearing}[,{pitch}]]`
    Center {
        x: f64,
        y: f64,
        zoom: f64,
        bearing: f64,
        pitch: f64,
    },
    /// `{minx},{miny},{maxx},{maxy}`
    Bounds(BoundingBox),
    /// Fit to the overlay's coordinates
    Auto,
}

/// Parse the position segment of a static map URL.
pub fn static_position(segment: &str) -> Option<StaticPosition> {
    if segment == "auto" {
        return Some(StaticPosition::Auto);
    }

    let (coords, camera) = match segment.split_once('@') {
        Some((coords, camera)) => (coords, Some(camera)),
        None => (segment, None),
    };
    let values = parse_floats(coords)?;

    match (values.as_slice(), camera) {
        ([x, y, zoom], camera) => {
            let (bearing, pitch) = match camera {
                Some(camera) => match parse_floats(camera)?.as_slice() {
                    [bearing] => (*bearing, 0.0),
                    [bearing, pitch] => (*bearing, *pitch),
                    _ => return None,
                },
                None => (0.0, 0.0),
            };
            Some(StaticPosition::Center {
                x: *x,
                y: *y,
                zoom: *zoom,
                bearing,
                pitch,
            })
        }
        ([min_x, min_y, max_x, max_y], None) => Some(StaticPosition::Bounds(BoundingBox::new(
            *min_x, *min_y, *max_x, *max_y,
        ))),
        _ => None,
    }
}

fn parse_floats(list: &str) -> Option<Vec<f64>> {
    list.split(',')
        .map(|v| v.trim().parse::<f64>().ok().filter(|f| f.is_finite()))
        .collect()
}

/// Decode a raw query string into ordered pairs, keeping repeated keys.
pub fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    })
    .unwrap_or_default()
}

/// First value for `key`.
pub fn query_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// First value for `key` parsed as a number.
pub fn query_number<T: std::str::FromStr>(pairs: &[(String, String)], key: &str) -> Option<T> {
    query_value(pairs, key).and_then(|v| v.trim().parse().ok())
}
