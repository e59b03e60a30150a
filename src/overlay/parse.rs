//! Overlay query parameters.
//!
//! ```text
//! path=[fill:{color}|][stroke:{color}|][width:{n}|]{lng},{lat}|{lng},{lat}|...
//! path=[fill:{color}|]...enc:{polyline}[,{polyline}...]
//! marker={lng},{lat}|{icon}[|scale:{n}][|offset:{x}[,{y}]][|anchor:center]
//! ```
//!
//! Query-wide styling comes from `fill`, `stroke`, `width`, `border`,
//! `borderwidth`, `linecap` and `linejoin`; per-path directives win over them.
//! With `latlng=1` (or `true`) coordinate pairs are read as `lat,lng`.

use tracing::debug;

use super::icons::{IconRegistry, IconSource};
use crate::geo::{decode_path, BoundingBox, LngLat, ProjectionTransform};

// =============================================================================
// Types
// =============================================================================

/// Query-wide path styling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathStyle {
    /// `Some("")` when `fill` is present without a value
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub width: Option<f32>,
    pub border: Option<String>,
    pub border_width: Option<f32>,
    pub linecap: Option<String>,
    pub linejoin: Option<String>,
}

/// Styling given inline in a single `path` value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathDirectives {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub width: Option<f32>,
}

/// A line or polygon to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPath {
    pub points: Vec<LngLat>,
    pub directives: PathDirectives,
}

/// An icon placed at a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub location: LngLat,
    pub icon: IconSource,
    /// Icon size multiplier, never negative
    pub scale: f32,
    /// Pixel offset applied in bottom-center anchor mode, multiplied by `scale`
    pub offset: (f32, f32),
    /// Center the icon on the location instead of standing on it
    pub center: bool,
}

/// Context needed to interpret overlay parameters.
#[derive(Debug, Clone, Copy)]
pub struct OverlayOptions<'a> {
    pub icons: &'a IconRegistry,
    pub allow_remote_icons: bool,
    /// Source projection of client coordinates, if the style declares one
    pub transformer: Option<ProjectionTransform>,
}

/// Paths, markers and styling parsed from a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySpec {
    pub paths: Vec<OverlayPath>,
    pub markers: Vec<Marker>,
    pub style: PathStyle,
}

// =============================================================================
// Parsing
// =============================================================================

fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn all<'a>(pairs: &'a [(String, String)], key: &'a str) -> impl Iterator<Item = &'a str> {
    pairs
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl OverlaySpec {
    /// Parse overlay parameters from decoded query pairs.
    ///
    /// Malformed paths, coordinates and markers are skipped.
    pub fn from_query(pairs: &[(String, String)], options: &OverlayOptions<'_>) -> Self {
        let latlng = matches!(first(pairs, "latlng"), Some("1") | Some("true"));
        let coords = CoordinateReader {
            latlng,
            transformer: options.transformer,
        };

        let style = PathStyle {
            fill: first(pairs, "fill").map(String::from),
            stroke: first(pairs, "stroke").map(String::from),
            width: first(pairs, "width").and_then(|v| v.trim().parse().ok()),
            border: first(pairs, "border").map(String::from),
            border_width: first(pairs, "borderwidth").and_then(|v| v.trim().parse().ok()),
            linecap: first(pairs, "linecap").map(String::from),
            linejoin: first(pairs, "linejoin").map(String::from),
        };

        let paths = all(pairs, "path")
            .flat_map(|value| parse_path(value, &coords))
            .collect();

        let markers = all(pairs, "marker")
            .filter_map(|value| parse_marker(value, &coords, options))
            .collect();

        Self {
            paths,
            markers,
            style,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.markers.is_empty()
    }

    /// Every path point and marker location.
    pub fn coordinates(&self) -> impl Iterator<Item = &LngLat> {
        self.paths
            .iter()
            .flat_map(|p| p.points.iter())
            .chain(self.markers.iter().map(|m| &m.location))
    }

    /// Bounding box of [`OverlaySpec::coordinates`].
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.coordinates())
    }
}

struct CoordinateReader {
    latlng: bool,
    transformer: Option<ProjectionTransform>,
}

impl CoordinateReader {
    fn read(&self, pair: &str) -> Option<LngLat> {
        let (a, b) = pair.split_once(',')?;
        if b.contains(',') {
            return None;
        }
        let a: f64 = a.trim().parse().ok()?;
        let b: f64 = b.trim().parse().ok()?;
        if a.is_nan() || b.is_nan() {
            return None;
        }
        let (x, y) = if self.latlng { (b, a) } else { (a, b) };
        Some(match self.transformer {
            Some(t) => t.to_wgs84(x, y),
            None => LngLat::new(x, y),
        })
    }
}

fn parse_path(value: &str, coords: &CoordinateReader) -> Vec<OverlayPath> {
    if value.is_empty() {
        return Vec::new();
    }

    let mut directives = PathDirectives::default();
    let mut body = Vec::new();
    for part in value.split('|') {
        if let Some(v) = part.strip_prefix("fill:") {
            directives.fill = Some(v.to_string());
        } else if let Some(v) = part.strip_prefix("stroke:") {
            directives.stroke = Some(v.to_string());
        } else if let Some(v) = part.strip_prefix("width:") {
            directives.width = v.trim().parse().ok();
        } else {
            body.push(part);
        }
    }

    if body.first().is_some_and(|p| p.starts_with("enc:")) {
        // `|` is a valid polyline character, so the pieces are rejoined
        let joined = body.join("|");
        return joined["enc:".len()..]
            .split(',')
            .filter_map(|line| match decode_path(line) {
                Ok(points) => Some(OverlayPath {
                    points,
                    directives: directives.clone(),
                }),
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable path");
                    None
                }
            })
            .collect();
    }

    let points: Vec<LngLat> = body.iter().filter_map(|pair| coords.read(pair)).collect();
    if points.is_empty() {
        return Vec::new();
    }
    vec![OverlayPath { points, directives }]
}

fn parse_marker(value: &str, coords: &CoordinateReader, options: &OverlayOptions<'_>) -> Option<Marker> {
    let mut parts = value.split('|');
    let location = parts.next()?;
    let icon = parts.next()?;

    let icon = if icon.starts_with("http://") || icon.starts_with("https://") {
        if !options.allow_remote_icons {
            debug!(icon, "Remote marker icons are disabled");
            return None;
        }
        IconSource::Remote(icon.to_string())
    } else {
        match options.icons.resolve(icon) {
            Some(path) => IconSource::File(path),
            None => {
                debug!(icon, "Marker icon not available");
                return None;
            }
        }
    };

    let mut marker = Marker {
        location: coords.read(location)?,
        icon,
        scale: 1.0,
        offset: (0.0, 0.0),
        center: false,
    };

    for option in parts {
        let Some((name, value)) = option.split_once(':') else {
            continue;
        };
        match name {
            "scale" => {
                if let Ok(scale) = value.trim().parse::<f32>() {
                    marker.scale = scale.abs();
                }
            }
            "offset" => {
                let mut offsets = value.split(',').map(|v| v.trim().parse::<f32>().ok());
                if let Some(Some(x)) = offsets.next() {
                    marker.offset.0 = x;
                }
                if let Some(Some(y)) = offsets.next() {
                    marker.offset.1 = y;
                }
            }
            "anchor" => marker.center = value == "center",
            _ => {}
        }
    }

    Some(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn icons() -> (TempDir, IconRegistry) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pin.png"), b"x").unwrap();
        let registry = IconRegistry::scan(dir.path()).await;
        (dir, registry)
    }

    fn parse(items: &[(&str, &str)], icons: &IconRegistry) -> OverlaySpec {
        let options = OverlayOptions {
            icons,
            allow_remote_icons: false,
            transformer: None,
        };
        OverlaySpec::from_query(&pairs(items), &options)
    }

    #[test]
    fn test_coordinate_path() {
        let spec = parse(&[("path", "1,2|3,4|bad|5,6")], &IconRegistry::empty());
        assert_eq!(spec.paths.len(), 1);
        assert_eq!(
            spec.paths[0].points,
            vec![LngLat::new(1.0, 2.0), LngLat::new(3.0, 4.0), LngLat::new(5.0, 6.0)]
        );
    }

    #[test]
    fn test_latlng_swaps() {
        let spec = parse(&[("path", "10,20|30,40"), ("latlng", "true")], &IconRegistry::empty());
        assert_eq!(spec.paths[0].points[0], LngLat::new(20.0, 10.0));
    }

    #[test]
    fn test_encoded_path_with_directives() {
        let spec = parse(
            &[("path", "stroke:red|width:3|fill:rgba(1,2,3,0.5)|enc:_p~iF~ps|U_ulLnnqC_mqNvxq`@")],
            &IconRegistry::empty(),
        );
        assert_eq!(spec.paths.len(), 1);
        let path = &spec.paths[0];
        assert_eq!(path.points.len(), 3);
        assert_eq!(path.points[0], LngLat::new(-120.2, 38.5));
        assert_eq!(path.directives.stroke.as_deref(), Some("red"));
        assert_eq!(path.directives.width, Some(3.0));
        assert_eq!(path.directives.fill.as_deref(), Some("rgba(1,2,3,0.5)"));
    }

    #[test]
    fn test_multiple_encoded_paths() {
        let spec = parse(&[("path", "enc:_p~iF~ps|U,_ulLnnqC")], &IconRegistry::empty());
        assert_eq!(spec.paths.len(), 2);
        assert_eq!(spec.paths[0].points, vec![LngLat::new(-120.2, 38.5)]);
    }

    #[test]
    fn test_each_path_keeps_its_directives() {
        let spec = parse(
            &[("path", "stroke:red|1,1|2,2"), ("path", "3,3|4,4")],
            &IconRegistry::empty(),
        );
        assert_eq!(spec.paths[0].directives.stroke.as_deref(), Some("red"));
        assert_eq!(spec.paths[1].directives.stroke, None);
    }

    #[test]
    fn test_empty_path_ignored() {
        assert!(parse(&[("path", "")], &IconRegistry::empty()).is_empty());
    }

    #[test]
    fn test_query_style() {
        let spec = parse(
            &[("fill", ""), ("width", "4"), ("border", "#000"), ("linecap", "round")],
            &IconRegistry::empty(),
        );
        assert_eq!(spec.style.fill.as_deref(), Some(""));
        assert_eq!(spec.style.width, Some(4.0));
        assert_eq!(spec.style.border.as_deref(), Some("#000"));
        assert_eq!(spec.style.border_width, None);
        assert_eq!(spec.style.linecap.as_deref(), Some("round"));
    }

    #[tokio::test]
    async fn test_marker_options() {
        let (_dir, registry) = icons().await;
        let spec = parse(
            &[("marker", "5,6|pin.png|scale:-2|offset:3,-4|anchor:center")],
            &registry,
        );
        assert_eq!(spec.markers.len(), 1);
        let marker = &spec.markers[0];
        assert_eq!(marker.location, LngLat::new(5.0, 6.0));
        assert_eq!(marker.scale, 2.0);
        assert_eq!(marker.offset, (3.0, -4.0));
        assert!(marker.center);
    }

    #[tokio::test]
    async fn test_marker_rejections() {
        let (_dir, registry) = icons().await;
        let spec = parse(
            &[
                ("marker", "5,6"),
                ("marker", "5|pin.png"),
                ("marker", "5,6|missing.png"),
                ("marker", "5,6|https://example.com/pin.png"),
                ("marker", "a,b|pin.png"),
            ],
            &registry,
        );
        assert!(spec.markers.is_empty());
    }

    #[tokio::test]
    async fn test_remote_marker_allowed() {
        let registry = IconRegistry::empty();
        let options = OverlayOptions {
            icons: &registry,
            allow_remote_icons: true,
            transformer: None,
        };
        let spec = OverlaySpec::from_query(
            &pairs(&[("marker", "1,2|https://example.com/pin.png")]),
            &options,
        );
        assert_eq!(
            spec.markers[0].icon,
            IconSource::Remote("https://example.com/pin.png".to_string())
        );
    }

    #[test]
    fn test_transformer_applies_to_coordinates() {
        let registry = IconRegistry::empty();
        let options = OverlayOptions {
            icons: &registry,
            allow_remote_icons: false,
            transformer: Some(ProjectionTransform::SphericalMercator),
        };
        let spec = OverlaySpec::from_query(&pairs(&[("path", "0,0|20037508.342789244,0")]), &options);
        assert!((spec.paths[0].points[1].lng - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds() {
        let spec = parse(&[("path", "1,2|3,-4")], &IconRegistry::empty());
        assert_eq!(spec.bounds(), Some(BoundingBox::new(1.0, -4.0, 3.0, 2.0)));
        assert_eq!(OverlaySpec::default().bounds(), None);
    }
}
