//! Translation of third-party `staticmap` requests.
//!
//! ```text
//! /{style}/staticmap?size=468x468&center=53.9,-122.7&zoom=15&markers=icon:pin.png|53.9,-122.7
//!   ──► /{style}/static/-122.7,53.9,15/468x468.png?marker=53.9,-122.7|pin.png&latlng=1
//! ```
//!
//! Coordinates in that dialect are `lat,lng`, so any translated marker or
//! coordinate path switches the target request to `latlng=1`.

use url::form_urlencoded;

const DEFAULT_SIZE: &str = "256x256";

/// Build the static map URL a legacy request redirects to.
pub fn translate_staticmap(
    style_id: &str,
    pairs: &[(String, String)],
    default_icon: Option<&str>,
) -> String {
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    };

    let size = get("size").unwrap_or(DEFAULT_SIZE);
    let (width, height) = size.split_once('x').unwrap_or((size, size));

    let position = match (get("center"), get("zoom")) {
        (Some(center), Some(zoom)) => {
            let (lat, lng) = center.split_once(',').unwrap_or((center, ""));
            format!("{},{},{}", lng.trim(), lat.trim(), zoom.trim())
        }
        _ => "auto".to_string(),
    };

    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut latlng = false;
    for (key, value) in pairs {
        match key.to_ascii_lowercase().as_str() {
            "size" | "center" | "zoom" => {}
            "markers" => {
                if let Some(marker) = translate_marker(value, default_icon) {
                    query.append_pair("marker", &marker);
                    latlng = true;
                }
            }
            "path" => {
                let path = translate_path(value);
                if path.has_coordinates {
                    latlng = true;
                }
                query.append_pair("path", &path.value);
                for (option, option_value) in &path.options {
                    query.append_pair(option, option_value);
                }
            }
            other => {
                query.append_pair(other, value);
            }
        }
    }
    if latlng {
        query.append_pair("latlng", "1");
    }

    let mut url = format!("/{}/static/{}/{}x{}.png", style_id, position, width, height);
    let query = query.finish();
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url
}

/// `anchor:center|icon:{url}|{lat},{lng}` to `{lat},{lng}|{icon}|anchor:center`.
fn translate_marker(marker: &str, default_icon: Option<&str>) -> Option<String> {
    let mut parts: Vec<&str> = marker.split('|').collect();
    let location = parts.pop()?;

    let mut icon = None;
    let mut options = String::new();
    for part in parts {
        match part.split_once(':') {
            Some(("icon", value)) => icon = Some(value),
            _ => {
                options.push('|');
                options.push_str(part);
            }
        }
    }

    let icon = icon.or(default_icon)?;
    Some(format!("{}|{}{}", location, icon, options))
}

struct LegacyPath {
    value: String,
    /// Query-wide styling, used when the path is a coordinate list
    options: Vec<(String, String)>,
    has_coordinates: bool,
}

/// `weight:3|color:0xRRGGBBAA|{coords or enc:...}`.
fn translate_path(path: &str) -> LegacyPath {
    let mut options: Vec<(String, String)> = Vec::new();
    let mut coords: Vec<&str> = Vec::new();

    // An encoded polyline runs to the end and may itself contain `|`
    let (path, encoded) = match path.find("enc:") {
        Some(0) => ("", Some(path)),
        Some(pos) if path[..pos].ends_with('|') => (&path[..pos - 1], Some(&path[pos..])),
        _ => (path, None),
    };

    for part in path.split('|').filter(|p| !p.is_empty() || encoded.is_none()) {
        match part.split_once(':') {
            None => coords.push(part),
            Some((option, value)) => {
                let (option, value) = match option {
                    "weight" => ("width", value.to_string()),
                    "color" => ("stroke", legacy_color(value)),
                    _ => (option, value.to_string()),
                };
                options.push((option.to_string(), value));
            }
        }
    }

    if let Some(encoded) = encoded {
        let value = options
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .chain(std::iter::once(encoded.to_string()))
            .collect::<Vec<_>>()
            .join("|");
        LegacyPath {
            value,
            options: Vec::new(),
            has_coordinates: false,
        }
    } else if coords.is_empty() {
        let value = options
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join("|");
        LegacyPath {
            value,
            options: Vec::new(),
            has_coordinates: false,
        }
    } else {
        LegacyPath {
            value: coords.join("|"),
            options,
            has_coordinates: true,
        }
    }
}

/// `0xRRGGBB[AA]` to `rgba(r,g,b,a)`; anything else is passed through.
fn legacy_color(value: &str) -> String {
    let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    else {
        return value.to_string();
    };
    let Ok(packed) = u32::from_str_radix(hex, 16) else {
        return value.to_string();
    };

    let (rgb, alpha) = match hex.len() {
        6 => (packed, 1.0),
        8 => (packed >> 8, (packed & 0xff) as f64 / 255.0),
        _ => return value.to_string(),
    };
    format!(
        "rgba({},{},{},{:.1})",
        (rgb >> 16) & 0xff,
        (rgb >> 8) & 0xff,
        rgb & 0xff,
        alpha
    )
}
