//! Sub-resource dispatch for renderers.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use flate2::read::{GzDecoder, ZlibDecoder};
use tracing::{debug, warn};

use super::empty::EmptyResponseCache;
use super::fonts::FontRegistry;
use super::url::{format_from_extension, FailurePolicies, FailurePolicy, ResourceUrl};
use super::ResourceResponse;
use crate::error::{ResourceError, SourceError};
use crate::source::TileSource;

/// Hook applied to decompressed vector tile payloads.
pub trait DataDecorator: Send + Sync {
    fn decorate(&self, source_id: &str, data: Bytes, z: u32, x: u32, y: u32) -> Bytes;
}

/// A tile source as referenced from a style.
#[derive(Clone)]
pub struct PackagedSource {
    pub source: Arc<dyn TileSource>,
    /// Background color for synthesized tiles, from the style's source entry
    pub color: Option<String>,
}

/// Resolves renderer resource URLs for one style.
///
/// ```text
///              fetch(url)
///                  │
///         ResourceUrl::parse
///                  │
///    ┌─────────┬───┴─────────┬──────────────┐
///    ▼         ▼             ▼              ▼
///  Local   FontGlyph   PackagedTile      Remote
///  (file)  (fonts dir) (TileSource)    (reqwest)
///    │         │             │              │
///    └─────────┴──── error? ─┴──────────────┘
///                     │
///          Hard → Err  /  Soft → EmptyResponseCache
/// ```
pub struct ResourceRouter {
    style_id: String,
    sprites_dir: PathBuf,
    fonts: Arc<FontRegistry>,
    sources: HashMap<String, PackagedSource>,
    empty: Arc<EmptyResponseCache>,
    http: reqwest::Client,
    policies: FailurePolicies,
    decorator: Option<Arc<dyn DataDecorator>>,
}

impl ResourceRouter {
    pub fn new(
        style_id: impl Into<String>,
        sprites_dir: impl Into<PathBuf>,
        fonts: Arc<FontRegistry>,
        empty: Arc<EmptyResponseCache>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            style_id: style_id.into(),
            sprites_dir: sprites_dir.into(),
            fonts,
            sources: HashMap::new(),
            empty,
            http,
            policies: FailurePolicies::default(),
            decorator: None,
        }
    }

    /// Register the packaged sources the style references by name.
    pub fn with_sources(mut self, sources: HashMap<String, PackagedSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_policies(mut self, policies: FailurePolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn DataDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn source(&self, name: &str) -> Option<&PackagedSource> {
        self.sources.get(name)
    }

    pub fn policies(&self) -> FailurePolicies {
        self.policies
    }

    /// Fetch a resource on behalf of a renderer.
    ///
    /// Soft-failing variants never return an error for fetch failures; they
    /// answer with a synthesized empty payload instead. Unparseable URLs are
    /// reported, except malformed packaged tile URLs under a soft policy.
    pub async fn fetch(&self, url: &str) -> Result<ResourceResponse, ResourceError> {
        let resource = match ResourceUrl::parse(url) {
            Ok(resource) => resource,
            Err(e) => match url.strip_prefix("mbtiles://") {
                Some(rest) if self.policies.packaged_tile == FailurePolicy::Soft => {
                    debug!(
                        style = %self.style_id,
                        url,
                        error = %e,
                        "Malformed tile URL, serving empty response"
                    );
                    let format = rest
                        .rsplit('/')
                        .next()
                        .and_then(|file| file.split_once('.'))
                        .map(|(_, ext)| ext)
                        .unwrap_or_default();
                    return Ok(ResourceResponse::new(self.empty.get(format, None).await));
                }
                _ => return Err(e),
            },
        };

        match self.dispatch(&resource).await {
            Ok(response) => Ok(response),
            Err(e) => match self.policies.for_url(&resource) {
                FailurePolicy::Hard => {
                    warn!(style = %self.style_id, url, error = %e, "Resource fetch failed");
                    Err(e)
                }
                FailurePolicy::Soft => {
                    debug!(
                        style = %self.style_id,
                        url,
                        kind = resource.kind(),
                        error = %e,
                        "Resource fetch failed, serving empty response"
                    );
                    Ok(ResourceResponse::new(self.fallback(&resource).await))
                }
            },
        }
    }

    async fn dispatch(&self, resource: &ResourceUrl) -> Result<ResourceResponse, ResourceError> {
        match resource {
            ResourceUrl::Local { path } => self.fetch_local(path).await,
            ResourceUrl::FontGlyph { fontstack, range } => self
                .fonts
                .glyphs(fontstack, range)
                .await
                .map(ResourceResponse::new),
            ResourceUrl::PackagedTile {
                source,
                z,
                x,
                y,
                format,
            } => self.fetch_tile(source, *z, *x, *y, format).await,
            ResourceUrl::Remote { url } => self.fetch_remote(url).await,
        }
    }

    async fn fetch_local(&self, relative: &str) -> Result<ResourceResponse, ResourceError> {
        let path = confine(&self.sprites_dir, relative).ok_or_else(|| {
            ResourceError::InvalidUrl(format!("sprites://{relative}"))
        })?;
        let data = tokio::fs::read(&path).await.map_err(|e| ResourceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(ResourceResponse::new(Bytes::from(data)))
    }

    async fn fetch_tile(
        &self,
        name: &str,
        z: u32,
        x: u32,
        y: u32,
        format: &str,
    ) -> Result<ResourceResponse, ResourceError> {
        let packaged = self
            .sources
            .get(name)
            .ok_or_else(|| SourceError::UnknownSource(name.to_string()))?;
        let tile = packaged.source.get_tile(z, x, y).await?;

        let data = if format == "pbf" {
            let data = match decompress(&tile.data) {
                Some(inflated) => inflated,
                None => {
                    debug!(
                        source = name,
                        z, x, y,
                        "Skipping incorrect header for vector tile"
                    );
                    tile.data
                }
            };
            match &self.decorator {
                Some(decorator) => decorator.decorate(name, data, z, x, y),
                None => data,
            }
        } else {
            tile.data
        };

        Ok(ResourceResponse {
            data,
            modified: tile.modified,
            expires: None,
            etag: None,
        })
    }

    async fn fetch_remote(&self, url: &str) -> Result<ResourceResponse, ResourceError> {
        let http_error = |message: String| ResourceError::Http {
            url: url.to_string(),
            message,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| http_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_error(format!("status {status}")));
        }

        let headers = response.headers();
        let header_date = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
                .map(|d| d.with_timezone(&Utc))
        };
        let modified = header_date("last-modified");
        let expires = header_date("expires");
        let etag = headers
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let data = response
            .bytes()
            .await
            .map_err(|e| http_error(e.to_string()))?;

        Ok(ResourceResponse {
            data,
            modified,
            expires,
            etag,
        })
    }

    async fn fallback(&self, resource: &ResourceUrl) -> Bytes {
        match resource {
            ResourceUrl::PackagedTile { source, format, .. } => {
                let packaged = self.sources.get(source);
                let format = packaged
                    .and_then(|p| p.source.info().format.as_deref())
                    .unwrap_or(format);
                let color = packaged.and_then(|p| p.color.as_deref());
                self.empty.get(format, color).await
            }
            ResourceUrl::Remote { url } => self.empty.get(format_from_extension(url), None).await,
            ResourceUrl::Local { .. } | ResourceUrl::FontGlyph { .. } => Bytes::new(),
        }
    }
}

/// Join `relative` onto `base`, refusing absolute paths and `..` escapes.
fn confine(base: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then(|| base.join(relative))
}

/// Inflate a gzip or zlib payload. `None` when the header is neither.
fn decompress(data: &[u8]) -> Option<Bytes> {
    let mut out = Vec::new();
    let result = match data {
        [0x1f, 0x8b, ..] => GzDecoder::new(data).read_to_end(&mut out),
        [0x78, ..] => ZlibDecoder::new(data).read_to_end(&mut out),
        _ => return None,
    };
    result.ok().map(|_| Bytes::from(out))
}
