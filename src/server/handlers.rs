//! HTTP request handlers for the map render API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /{style}/{z}/{x}/{y}[@Nx].{format}` - 256px tile
//! - `GET /{style}/512/{z}/{x}/{y}[@Nx].{format}` - 512px tile
//! - `GET /{style}/static[/raw]/{position}/{w}x{h}[@Nx].{format}` - Static map
//! - `GET /{style}/static?bbox=...` - Static map of a projected bounding box
//! - `GET /{style}/staticmap` - Legacy static map redirect
//! - `POST /{style}/bundle` - Zip of rendered tiles
//! - `GET /{style}.json` - TileJSON

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::legacy::translate_staticmap;
use super::query::{
    image_segment, query_number, query_pairs, query_value, static_position, static_size,
    StaticPosition, StaticSize,
};
use crate::bundle::{build_bundle, decode_bundle_tiles, BundleOutcome, BundleRequest};
use crate::error::{BundleError, PoolError, RenderError};
use crate::geo::{
    is_valid_tile, zoom_for_bbox, BoundingBox, LngLat, ProjectionTransform, DEFAULT_BBOX_PADDING,
};
use crate::overlay::{render_overlay, OverlaySpec, OverlayView};
use crate::render::{RenderJob, RenderedImage};
use crate::style::{AppContext, StyleContext};

/// Highest zoom served by the tile routes.
pub const MAX_TILE_ZOOM: u32 = 22;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<AppContext>,

    /// Cache-Control max-age in seconds for rendered images
    pub cache_max_age: u32,
}

impl AppState {
    pub fn new(app: Arc<AppContext>) -> Self {
        Self {
            app,
            cache_max_age: 3600,
        }
    }

    pub fn with_cache_max_age(app: Arc<AppContext>, cache_max_age: u32) -> Self {
        Self { app, cache_max_age }
    }

    async fn style(&self, id: &str) -> Result<Arc<StyleContext>, RenderError> {
        self.app
            .styles()
            .get(id)
            .await
            .ok_or_else(|| RenderError::StyleNotFound {
                style_id: id.to_string(),
            })
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Query parameters of the bundle endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct BundleQueryParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<u8>,
    pub format: Option<String>,
}

/// JSON body of the bundle endpoint.
#[derive(Debug, Deserialize)]
pub struct BundleBody {
    #[serde(default)]
    pub encoded: Option<EncodedTiles>,
}

/// One packed tile list or several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EncodedTiles {
    One(String),
    Many(Vec<String>),
}

impl EncodedTiles {
    fn into_vec(self) -> Vec<String> {
        match self {
            EncodedTiles::One(value) => vec![value],
            EncodedTiles::Many(values) => values,
        }
    }
}

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_size")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,

    /// Number of registered styles
    pub styles: usize,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Errors a handler can end with.
#[derive(Debug)]
pub enum HandlerError {
    Render(RenderError),
    Bundle(BundleError),
}

impl From<RenderError> for HandlerError {
    fn from(err: RenderError) -> Self {
        HandlerError::Render(err)
    }
}

impl From<BundleError> for HandlerError {
    fn from(err: BundleError) -> Self {
        HandlerError::Bundle(err)
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Render(err) => err.into_response(),
            HandlerError::Bundle(err) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "archive_error",
                err.to_string(),
            ),
        }
    }
}

/// Convert RenderError to an HTTP response.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG and other 4xx at WARN.
impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            RenderError::InvalidCenter => (StatusCode::BAD_REQUEST, "invalid_center"),
            RenderError::InvalidSize => (StatusCode::BAD_REQUEST, "invalid_size"),
            RenderError::InvalidFormat { .. } => (StatusCode::BAD_REQUEST, "invalid_format"),
            RenderError::InvalidZoom => (StatusCode::BAD_REQUEST, "invalid_zoom"),
            RenderError::InvalidScale { .. } => (StatusCode::BAD_REQUEST, "invalid_scale"),
            RenderError::NoCoordinates => (StatusCode::BAD_REQUEST, "no_coordinates"),
            RenderError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),

            RenderError::OutOfBounds => (StatusCode::NOT_FOUND, "out_of_bounds"),
            RenderError::StyleNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),

            RenderError::Pool(PoolError::Closed) => {
                (StatusCode::SERVICE_UNAVAILABLE, "style_unavailable")
            }
            RenderError::Pool(_) => (StatusCode::INTERNAL_SERVER_ERROR, "pool_error"),
            RenderError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
            RenderError::Codec { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            RenderError::Overlay(_) => (StatusCode::INTERNAL_SERVER_ERROR, "overlay_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

// =============================================================================
// Response Helpers
// =============================================================================

/// RFC 7231 date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Whether a conditional request can be answered with 304.
///
/// Applies when `If-Modified-Since` is present, `Cache-Control` does not
/// contain `no-cache`, and the style has not changed since that date.
pub fn is_not_modified(headers: &HeaderMap, last_modified: DateTime<Utc>) -> bool {
    let Some(since) = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let no_cache = headers
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("no-cache"))
        .unwrap_or(false);
    if no_cache {
        return false;
    }

    match DateTime::parse_from_rfc2822(since) {
        Ok(since) => last_modified <= since.with_timezone(&Utc),
        Err(_) => false,
    }
}

fn image_response(image: RenderedImage, last_modified: DateTime<Utc>, cache_max_age: u32) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, image.format.content_type().to_string()),
            (header::LAST_MODIFIED, http_date(last_modified)),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", cache_max_age),
            ),
        ],
        Body::from(image.data),
    )
        .into_response()
}

/// Base URL for links: the configured public URL, or scheme and host of the
/// request.
fn base_url(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = public_url {
        return url.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", proto, host)
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        styles: state.app.styles().len().await,
    })
}

/// `GET /{style}/{z}/{x}/{y}[@Nx].{format}`
///
/// # Response
///
/// - `200 OK` with `Content-Type: image/{format}` and `Last-Modified`
/// - `304 Not Modified` for a fresh conditional request
/// - `404 Not Found` for an unknown style or coordinates outside the grid
pub async fn tile_handler(
    State(state): State<AppState>,
    Path((style_id, z, x, file)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    serve_tile(&state, &style_id, &z, &x, &file, &headers, RenderJob::tile).await
}

/// `GET /{style}/512/{z}/{x}/{y}[@Nx].{format}`
pub async fn tile_512_handler(
    State(state): State<AppState>,
    Path((style_id, z, x, file)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    serve_tile(&state, &style_id, &z, &x, &file, &headers, RenderJob::tile_512).await
}

async fn serve_tile(
    state: &AppState,
    style_id: &str,
    z: &str,
    x: &str,
    file: &str,
    headers: &HeaderMap,
    job: fn(u32, u32, u32, u8, String) -> RenderJob,
) -> Result<Response, HandlerError> {
    let style = state.style(style_id).await?;

    if is_not_modified(headers, style.last_modified()) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let image = image_segment(file).ok_or_else(|| RenderError::BadRequest {
        message: format!("Invalid tile name: {}", file),
    })?;
    let (z, x, y) = match (z.parse::<i64>(), x.parse::<i64>(), image.stem.parse::<i64>()) {
        (Ok(z), Ok(x), Ok(y)) => (z, x, y),
        _ => {
            return Err(RenderError::BadRequest {
                message: "Tile coordinates must be integers".to_string(),
            }
            .into())
        }
    };
    if !is_valid_tile(z, x, y, MAX_TILE_ZOOM) {
        return Err(RenderError::OutOfBounds.into());
    }

    let job = job(
        z as u32,
        x as u32,
        y as u32,
        image.scale,
        image.format.to_string(),
    );
    let rendered = state.app.renderer().render(&style, job).await?;
    Ok(image_response(rendered, style.last_modified(), state.cache_max_age))
}

/// `GET /{style}/static/{position}/{w}x{h}[@Nx].{format}`
///
/// `position` is `{lng},{lat},{zoom}[@{bearing}[,{pitch}]]`,
/// `{minx},{miny},{maxx},{maxy}` or `auto`.
pub async fn static_handler(
    State(state): State<AppState>,
    Path((style_id, position, size)): Path<(String, String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError> {
    let (position, size) = parse_static(&position, &size)?;
    serve_static(&state, &style_id, position, size, false, &query_pairs(query.as_deref())).await
}

/// `GET /{style}/static/raw/{position}/{w}x{h}[@Nx].{format}`
///
/// Like [`static_handler`] with coordinates in EPSG:3857 meters.
pub async fn static_raw_handler(
    State(state): State<AppState>,
    Path((style_id, position, size)): Path<(String, String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError> {
    let (position, size) = parse_static(&position, &size)?;
    serve_static(&state, &style_id, position, size, true, &query_pairs(query.as_deref())).await
}

/// `GET /{style}/static?bbox={minx},{miny},{maxx},{maxy}&width=&height=&scale=&format=`
///
/// Bounding box in EPSG:3857 meters; `width`/`height` are output pixels and
/// are divided by `scale`. `format` may be a MIME type (`image/png`).
pub async fn static_query_handler(
    State(state): State<AppState>,
    Path(style_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError> {
    let pairs: Vec<(String, String)> = query_pairs(query.as_deref())
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect();

    let bbox = query_value(&pairs, "bbox").unwrap_or_default();
    let position = match static_position(bbox) {
        Some(position @ StaticPosition::Bounds(_)) => position,
        _ => {
            return Err(RenderError::BadRequest {
                message: format!("Invalid bbox: {}", bbox),
            }
            .into())
        }
    };

    let scale: u8 = query_number(&pairs, "scale").unwrap_or(1).max(1);
    let width: u32 = query_number(&pairs, "width").unwrap_or(256);
    let height: u32 = query_number(&pairs, "height").unwrap_or(256);
    let format = query_value(&pairs, "format")
        .unwrap_or("image/png")
        .rsplit('/')
        .next()
        .unwrap_or("png")
        .to_string();

    let size = StaticSize {
        width: width / scale as u32,
        height: height / scale as u32,
        scale,
        format,
    };
    serve_static(&state, &style_id, position, size, true, &pairs).await
}

fn parse_static(position: &str, size: &str) -> Result<(StaticPosition, StaticSize), RenderError> {
    let position = static_position(position).ok_or_else(|| RenderError::BadRequest {
        message: format!("Invalid static map position: {}", position),
    })?;
    let size = static_size(size).ok_or_else(|| RenderError::BadRequest {
        message: format!("Invalid static map size: {}", size),
    })?;
    Ok((position, size))
}

async fn serve_static(
    state: &AppState,
    style_id: &str,
    position: StaticPosition,
    size: StaticSize,
    raw: bool,
    pairs: &[(String, String)],
) -> Result<Response, HandlerError> {
    let style = state.style(style_id).await?;
    let app = &state.app;

    let transformer = if raw {
        Some(ProjectionTransform::SphericalMercator)
    } else {
        style.transformer()
    };
    let to_wgs84 = |x: f64, y: f64| match transformer {
        Some(t) => t.to_wgs84(x, y),
        None => LngLat::new(x, y),
    };

    let overlay = OverlaySpec::from_query(pairs, &app.overlay_options(transformer));
    let padding = query_number(pairs, "padding").unwrap_or(DEFAULT_BBOX_PADDING);

    let (center, zoom, bearing, pitch) = match position {
        StaticPosition::Center {
            x,
            y,
            zoom,
            bearing,
            pitch,
        } => {
            if zoom < 0.0 {
                return Err(RenderError::InvalidZoom.into());
            }
            (to_wgs84(x, y), zoom, bearing, pitch)
        }
        StaticPosition::Bounds(bbox) => {
            let min = to_wgs84(bbox.min_lng, bbox.min_lat);
            let max = to_wgs84(bbox.max_lng, bbox.max_lat);
            let center = to_wgs84(
                (bbox.min_lng + bbox.max_lng) / 2.0,
                (bbox.min_lat + bbox.max_lat) / 2.0,
            );
            let bbox = BoundingBox::new(min.lng, min.lat, max.lng, max.lat);
            let zoom = zoom_for_bbox(&bbox, size.width, size.height, padding);
            (center, zoom, 0.0, 0.0)
        }
        StaticPosition::Auto => {
            let bbox = overlay.bounds().ok_or(RenderError::NoCoordinates)?;
            let (min_x, min_y) = LngLat::new(bbox.min_lng, bbox.min_lat).to_mercator_meters();
            let (max_x, max_y) = LngLat::new(bbox.max_lng, bbox.max_lat).to_mercator_meters();
            let center = LngLat::from_mercator_meters((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

            let mut zoom = zoom_for_bbox(&bbox, size.width, size.height, padding);
            if let Some(max_zoom) = query_number::<f64>(pairs, "maxzoom").filter(|z| *z > 0.0) {
                zoom = zoom.min(max_zoom);
            }
            (center, zoom, 0.0, 0.0)
        }
    };

    let job = RenderJob::static_map(center, zoom, size.width, size.height, size.scale, size.format)
        .with_camera(bearing, pitch);
    app.renderer().validate(&job)?;
    if !style.pools().serves_scale(job.scale) {
        return Err(RenderError::InvalidScale { scale: job.scale }.into());
    }

    let view = OverlayView {
        center,
        zoom,
        bearing,
        width: job.width,
        height: job.height,
        scale: job.scale,
    };
    let job = match render_overlay(&overlay, &view, app.http())
        .await
        .map_err(RenderError::from)?
    {
        Some(layer) => job.with_overlay(layer),
        None => job,
    };

    let rendered = app.renderer().render(&style, job).await?;
    Ok(image_response(rendered, style.last_modified(), state.cache_max_age))
}

/// `GET /{style}/staticmap?size=&center=&zoom=&markers=&path=`
///
/// Redirects to the equivalent static map URL.
pub async fn staticmap_handler(
    State(state): State<AppState>,
    Path(style_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError> {
    state.style(&style_id).await?;
    let pairs = query_pairs(query.as_deref());
    let target = translate_staticmap(
        &style_id,
        &pairs,
        state.app.options().legacy_marker_icon.as_deref(),
    );
    debug!(style = %style_id, target = %target, "Redirecting legacy static map");
    Ok((StatusCode::FOUND, [(header::LOCATION, target)]).into_response())
}

/// `GET /{style}.json`
///
/// The style's TileJSON with `tiles` pointing at this server.
pub async fn tilejson_handler(
    State(state): State<AppState>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let Some(style_id) = file.strip_suffix(".json") else {
        return Err(RenderError::StyleNotFound { style_id: file }.into());
    };
    let style = state.style(style_id).await?;

    let mut tilejson = style.tilejson().clone();
    let format = tilejson
        .get("format")
        .and_then(Value::as_str)
        .unwrap_or("png")
        .to_string();
    let base = base_url(state.app.options().public_url.as_deref(), &headers);
    tilejson.insert(
        "tiles".to_string(),
        Value::Array(vec![Value::String(format!(
            "{}/{}/{{z}}/{{x}}/{{y}}.{}",
            base, style_id, format
        ))]),
    );

    Ok(Json(Value::Object(tilejson)).into_response())
}

/// `POST /{style}/bundle?width=&height=&scale=&format=`
///
/// Body: JSON `{"encoded": "..." | ["...", ...]}` or a form with one or
/// more `encoded` fields.
///
/// # Response
///
/// - `200 OK` with `Content-Type: application/zip`
/// - `204 No Content` when no valid tile was given
pub async fn bundle_handler(
    State(state): State<AppState>,
    Path(style_id): Path<String>,
    Query(params): Query<BundleQueryParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HandlerError> {
    let style = state.style(&style_id).await?;

    let encoded = encoded_from_body(&headers, &body)?;
    let tiles = decode_bundle_tiles(&encoded);

    let defaults = BundleRequest::default();
    let request = BundleRequest {
        width: params.width.unwrap_or(defaults.width),
        height: params.height.unwrap_or(defaults.height),
        scale: params.scale.unwrap_or(defaults.scale),
        format: params.format.unwrap_or(defaults.format),
    };

    match build_bundle(state.app.renderer(), &style, &tiles, &request).await? {
        BundleOutcome::NoContent => Ok(StatusCode::NO_CONTENT.into_response()),
        BundleOutcome::Archive(data) => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.zip\"", style_id),
                ),
            ],
            Body::from(data),
        )
            .into_response()),
    }
}

fn encoded_from_body(headers: &HeaderMap, body: &[u8]) -> Result<Vec<String>, RenderError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        let body: BundleBody =
            serde_json::from_slice(body).map_err(|e| RenderError::BadRequest {
                message: format!("Invalid bundle body: {}", e),
            })?;
        Ok(body.encoded.map(EncodedTiles::into_vec).unwrap_or_default())
    } else {
        Ok(url::form_urlencoded::parse(body)
            .filter(|(k, _)| k == "encoded" || k == "encoded[]")
            .map(|(_, v)| v.into_owned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::HeaderValue;

    #[test]
    fn test_error_response_with_status() {
        let response =
            ErrorResponse::with_status("not_found", "Style not found", StatusCode::NOT_FOUND);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("404"));
        assert!(json.contains("not_found"));
    }

    #[test]
    fn test_render_error_to_status_code() {
        let cases = [
            (RenderError::InvalidCenter, StatusCode::BAD_REQUEST),
            (RenderError::InvalidSize, StatusCode::BAD_REQUEST),
            (
                RenderError::InvalidFormat {
                    format: "gif".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (RenderError::NoCoordinates, StatusCode::BAD_REQUEST),
            (RenderError::OutOfBounds, StatusCode::NOT_FOUND),
            (
                RenderError::StyleNotFound {
                    style_id: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                RenderError::Pool(PoolError::Closed),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RenderError::Codec {
                    message: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_http_date() {
        let time = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_not_modified() {
        let modified = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut headers = HeaderMap::new();
        assert!(!is_not_modified(&headers, modified));

        headers.insert(
            header::IF_MODIFIED_SINCE,
            HeaderValue::from_static("Mon, 01 Jan 2024 12:00:00 GMT"),
        );
        assert!(is_not_modified(&headers, modified));

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert!(!is_not_modified(&headers, modified));

        headers.remove(header::CACHE_CONTROL);
        headers.insert(
            header::IF_MODIFIED_SINCE,
            HeaderValue::from_static("Mon, 01 Jan 2024 11:59:59 GMT"),
        );
        assert!(!is_not_modified(&headers, modified));

        headers.insert(header::IF_MODIFIED_SINCE, HeaderValue::from_static("garbage"));
        assert!(!is_not_modified(&headers, modified));
    }

    #[test]
    fn test_base_url() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("maps.test:8080"));
        assert_eq!(base_url(None, &headers), "http://maps.test:8080");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(base_url(None, &headers), "https://maps.test:8080");

        assert_eq!(
            base_url(Some("https://cdn.test/maps/"), &headers),
            "https://cdn.test/maps"
        );
    }

    #[test]
    fn test_encoded_from_body() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert_eq!(
            encoded_from_body(&headers, br#"{"encoded": "abc"}"#).unwrap(),
            vec!["abc"]
        );
        assert_eq!(
            encoded_from_body(&headers, br#"{"encoded": ["a", "b"]}"#).unwrap(),
            vec!["a", "b"]
        );
        assert!(encoded_from_body(&headers, b"{}").unwrap().is_empty());
        assert!(encoded_from_body(&headers, b"not json").is_err());

        let mut form = HeaderMap::new();
        form.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert_eq!(
            encoded_from_body(&form, b"encoded=a%3F&encoded=b&other=c").unwrap(),
            vec!["a?", "b"]
        );
        assert!(encoded_from_body(&form, b"").unwrap().is_empty());
    }
}
