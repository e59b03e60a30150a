//! Style document preparation.
//!
//! A style document is rewritten once at registration so that every
//! resource it references is served through the resource router:
//!
//! - local `sprite` paths become `sprites://...`
//! - local `glyphs` templates become `fonts://...`
//! - `mbtiles://` source URLs are resolved to archive files and replaced by
//!   `tiles: ["mbtiles://{name}/{z}/{x}/{y}.{format}"]`
//!
//! 3D extrusions are flattened since renders are always top-down rasters.

use std::path::{Component, Path, PathBuf};

use serde_json::{json, Map, Value};

/// Whether a style URL points at a remote resource (`http://`, `https://`
/// or protocol-relative `//`).
pub fn is_remote(url: &str) -> bool {
    url.starts_with("//") || url.starts_with("http://") || url.starts_with("https://")
}

/// Rewrite sprite and glyph references and flatten extrusions in place.
///
/// `style_name` replaces `{style}` in the sprite path and `style_folder` (the
/// style directory relative to the sprites directory) replaces
/// `{styleJsonFolder}`.
pub fn rewrite_style(doc: &mut Value, style_name: &str, style_folder: &str) {
    let sprite = doc
        .get("sprite")
        .and_then(Value::as_str)
        .filter(|sprite| !is_remote(sprite))
        .map(|sprite| {
            format!(
                "sprites://{}",
                sprite
                    .replacen("{style}", style_name, 1)
                    .replacen("{styleJsonFolder}", style_folder, 1)
            )
        });
    if let Some(sprite) = sprite {
        doc["sprite"] = Value::String(sprite);
    }

    let glyphs = doc
        .get("glyphs")
        .and_then(Value::as_str)
        .filter(|glyphs| !is_remote(glyphs))
        .map(|glyphs| format!("fonts://{}", glyphs));
    if let Some(glyphs) = glyphs {
        doc["glyphs"] = Value::String(glyphs);
    }

    if let Some(layers) = doc.get_mut("layers").and_then(Value::as_array_mut) {
        for paint in layers
            .iter_mut()
            .filter_map(|layer| layer.get_mut("paint").and_then(Value::as_object_mut))
        {
            for key in ["fill-extrusion-height", "fill-extrusion-base"] {
                if paint.get(key).map(is_truthy).unwrap_or(false) {
                    paint.insert(key.to_string(), json!(0));
                }
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The archive a style source refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    /// `mbtiles://{data-id}`: resolved through the configured data entries
    Data(String),
    /// `mbtiles://path/to/file.mbtiles`: relative to the mbtiles directory
    File(String),
}

/// Parse a source `url`, returning `None` for anything but `mbtiles:` URLs.
pub fn source_reference(url: &str) -> Option<SourceReference> {
    if !url.starts_with("mbtiles:") {
        return None;
    }
    let target = url.get("mbtiles://".len()..).unwrap_or_default();
    match target.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        Some(id) => Some(SourceReference::Data(id.to_string())),
        None => Some(SourceReference::File(target.to_string())),
    }
}

/// Initial TileJSON for a style.
///
/// Defaults are overridden by the style's `center`/`zoom`, then by the
/// configured `overrides`.
pub fn base_tilejson(doc: &Value, overrides: Option<&Map<String, Value>>) -> Map<String, Value> {
    let defaults = json!({
        "tilejson": "2.0.0",
        "name": doc.get("name").cloned().unwrap_or(Value::Null),
        "attribution": "",
        "minzoom": 0,
        "maxzoom": 20,
        "bounds": [-180, -85.0511, 180, 85.0511],
        "format": "png",
        "type": "baselayer",
    });
    let mut map = match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let center = doc.get("center").and_then(Value::as_array);
    let zoom = doc.get("zoom").and_then(Value::as_f64).filter(|z| *z != 0.0);
    if let (Some(center), Some(zoom)) = (center, zoom) {
        let mut value = center.clone();
        value.push(json!(zoom.round()));
        map.insert("center".to_string(), Value::Array(value));
    }

    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            map.insert(key.clone(), value.clone());
        }
    }

    fix_tilejson_center(&mut map);
    map
}

/// Derive a `center` from `bounds` when none is given.
///
/// The zoom fits the bounds into a 1024px wide viewport.
pub fn fix_tilejson_center(tilejson: &mut Map<String, Value>) {
    if tilejson.contains_key("center") {
        return;
    }
    let Some(bounds) = tilejson.get("bounds").and_then(Value::as_array) else {
        return;
    };
    let b: Vec<f64> = bounds.iter().filter_map(Value::as_f64).collect();
    let [west, south, east, north] = b.as_slice() else {
        return;
    };

    let tiles = 1024.0 / 256.0;
    let zoom = (-((east - west) / 360.0 / tiles).log2()).round();
    let center = json!([(west + east) / 2.0, (south + north) / 2.0, zoom]);
    tilejson.insert("center".to_string(), center);
}

/// Append `attribution` to a ` | ` separated list unless already present.
pub fn append_attribution(current: &mut String, attribution: &str) {
    if attribution.is_empty() || current.contains(attribution) {
        return;
    }
    if !current.is_empty() {
        current.push_str(" | ");
    }
    current.push_str(attribution);
}

/// Relative path from `from` to `to`, using `..` where needed.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_local_sprite_and_glyphs() {
        let mut doc = json!({
            "sprite": "{styleJsonFolder}/{style}",
            "glyphs": "{fontstack}/{range}.pbf",
            "layers": []
        });
        rewrite_style(&mut doc, "basic", "styles/basic");
        assert_eq!(doc["sprite"], "sprites://styles/basic/basic");
        assert_eq!(doc["glyphs"], "fonts://{fontstack}/{range}.pbf");
    }

    #[test]
    fn test_remote_urls_untouched() {
        let mut doc = json!({
            "sprite": "https://example.com/sprite",
            "glyphs": "//example.com/{fontstack}/{range}.pbf"
        });
        rewrite_style(&mut doc, "basic", "");
        assert_eq!(doc["sprite"], "https://example.com/sprite");
        assert_eq!(doc["glyphs"], "//example.com/{fontstack}/{range}.pbf");
    }

    #[test]
    fn test_flatten_extrusions() {
        let mut doc = json!({
            "layers": [
                {"id": "a", "paint": {"fill-extrusion-height": ["get", "height"], "fill-extrusion-base": 3}},
                {"id": "b", "paint": {"fill-extrusion-height": 0, "fill-color": "#fff"}},
                {"id": "c"}
            ]
        });
        rewrite_style(&mut doc, "s", "");
        assert_eq!(doc["layers"][0]["paint"]["fill-extrusion-height"], 0);
        assert_eq!(doc["layers"][0]["paint"]["fill-extrusion-base"], 0);
        assert_eq!(doc["layers"][1]["paint"]["fill-color"], "#fff");
        assert!(doc["layers"][1]["paint"].get("fill-extrusion-base").is_none());
    }

    #[test]
    fn test_source_reference() {
        assert_eq!(
            source_reference("mbtiles://{openmaptiles}"),
            Some(SourceReference::Data("openmaptiles".into()))
        );
        assert_eq!(
            source_reference("mbtiles://zurich.mbtiles"),
            Some(SourceReference::File("zurich.mbtiles".into()))
        );
        assert_eq!(source_reference("https://example.com/tiles.json"), None);
    }

    #[test]
    fn test_base_tilejson() {
        let doc = json!({"name": "Basic", "center": [8.5, 47.3], "zoom": 11.6});
        let mut overrides = Map::new();
        overrides.insert("maxzoom".into(), json!(14));
        let tilejson = base_tilejson(&doc, Some(&overrides));
        assert_eq!(tilejson["name"], "Basic");
        assert_eq!(tilejson["center"], json!([8.5, 47.3, 12.0]));
        assert_eq!(tilejson["maxzoom"], 14);
        assert_eq!(tilejson["format"], "png");
    }

    #[test]
    fn test_center_from_bounds() {
        let tilejson = base_tilejson(&json!({}), None);
        let center = tilejson["center"].as_array().unwrap();
        assert_eq!(center[0].as_f64(), Some(0.0));
        assert_eq!(center[2].as_f64(), Some(2.0));
    }

    #[test]
    fn test_append_attribution() {
        let mut attribution = String::new();
        append_attribution(&mut attribution, "© OSM");
        append_attribution(&mut attribution, "© OSM");
        append_attribution(&mut attribution, "© Other");
        append_attribution(&mut attribution, "");
        assert_eq!(attribution, "© OSM | © Other");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/data/sprites"), Path::new("/data/styles/basic")),
            PathBuf::from("../styles/basic")
        );
        assert_eq!(
            relative_path(Path::new("/data"), Path::new("/data/styles")),
            PathBuf::from("styles")
        );
        assert_eq!(relative_path(Path::new("/a"), Path::new("/a")), PathBuf::new());
    }
}
