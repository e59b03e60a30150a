//! Resource URL parsing and failure policy.

use crate::error::ResourceError;

// =============================================================================
// Resource URL
// =============================================================================

/// A sub-resource requested by a renderer, parsed once from its URL scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUrl {
    /// `sprites://{path}`: file relative to the sprites directory
    Local { path: String },

    /// `fonts://{fontstack}/{start}-{end}.pbf`: glyph range for a font stack
    FontGlyph { fontstack: String, range: String },

    /// `mbtiles://{source}/{z}/{x}/{y}.{format}`: tile from a packaged source
    PackagedTile {
        source: String,
        z: u32,
        x: u32,
        y: u32,
        format: String,
    },

    /// `http://` or `https://` resource fetched over the network
    Remote { url: String },
}

impl ResourceUrl {
    /// Parse a renderer resource URL.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::UnsupportedScheme`] for schemes without a handler
    /// - [`ResourceError::InvalidUrl`] when a known scheme has a malformed body
    pub fn parse(url: &str) -> Result<Self, ResourceError> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(ResourceError::UnsupportedScheme(url.to_string()));
        };

        match scheme {
            "sprites" => Ok(ResourceUrl::Local {
                path: decode(rest, url)?,
            }),
            "fonts" => parse_font(rest, url),
            "mbtiles" => parse_packaged_tile(rest, url),
            "http" | "https" => Ok(ResourceUrl::Remote {
                url: url.to_string(),
            }),
            other => Err(ResourceError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceUrl::Local { .. } => "local",
            ResourceUrl::FontGlyph { .. } => "font",
            ResourceUrl::PackagedTile { .. } => "tile",
            ResourceUrl::Remote { .. } => "remote",
        }
    }
}

fn decode(value: &str, url: &str) -> Result<String, ResourceError> {
    urlencoding::decode(value)
        .map(|s| s.into_owned())
        .map_err(|_| ResourceError::InvalidUrl(url.to_string()))
}

fn parse_font(rest: &str, url: &str) -> Result<ResourceUrl, ResourceError> {
    let invalid = || ResourceError::InvalidUrl(url.to_string());

    let (fontstack, file) = rest.rsplit_once('/').ok_or_else(invalid)?;
    let range = file.split('.').next().unwrap_or_default();
    let valid_range = range
        .split_once('-')
        .map(|(start, end)| is_digits(start) && is_digits(end))
        .unwrap_or(false);

    if fontstack.is_empty() || !valid_range {
        return Err(invalid());
    }

    Ok(ResourceUrl::FontGlyph {
        fontstack: decode(fontstack, url)?,
        range: range.to_string(),
    })
}

fn parse_packaged_tile(rest: &str, url: &str) -> Result<ResourceUrl, ResourceError> {
    let invalid = || ResourceError::InvalidUrl(url.to_string());

    let parts: Vec<&str> = rest.split('/').collect();
    let [source, z, x, file] = parts.as_slice() else {
        return Err(invalid());
    };
    let (y, format) = file.split_once('.').ok_or_else(invalid)?;

    Ok(ResourceUrl::PackagedTile {
        source: decode(source, url)?,
        z: z.parse().map_err(|_| invalid())?,
        x: x.parse().map_err(|_| invalid())?,
        y: y.parse().map_err(|_| invalid())?,
        format: format.to_string(),
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Image format implied by a URL path extension, or `""` when unknown.
pub fn format_from_extension(url: &str) -> &'static str {
    let path = ::url::Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_default();
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match extension {
        "png" => "png",
        "jpg" | "jpeg" => "jpeg",
        "webp" => "webp",
        _ => "",
    }
}

// =============================================================================
// Failure Policy
// =============================================================================

/// What the router does when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Report the error to the renderer, failing the render
    Hard,
    /// Log and answer with a synthesized empty response
    Soft,
}

/// Failure policy per resource variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicies {
    pub local: FailurePolicy,
    pub font_glyph: FailurePolicy,
    pub packaged_tile: FailurePolicy,
    pub remote: FailurePolicy,
}

impl Default for FailurePolicies {
    fn default() -> Self {
        Self {
            local: FailurePolicy::Hard,
            font_glyph: FailurePolicy::Hard,
            packaged_tile: FailurePolicy::Soft,
            remote: FailurePolicy::Soft,
        }
    }
}

impl FailurePolicies {
    /// Soft-fail every variant.
    pub fn lenient() -> Self {
        Self {
            local: FailurePolicy::Soft,
            font_glyph: FailurePolicy::Soft,
            ..Self::default()
        }
    }

    pub fn for_url(&self, url: &ResourceUrl) -> FailurePolicy {
        match url {
            ResourceUrl::Local { .. } => self.local,
            ResourceUrl::FontGlyph { .. } => self.font_glyph,
            ResourceUrl::PackagedTile { .. } => self.packaged_tile,
            ResourceUrl::Remote { .. } => self.remote,
        }
    }
}
