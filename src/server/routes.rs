//! Router configuration.
//!
//! # Route Structure
//!
//! ```text
//! /health                                          - Health check
//! /{style}.json                                    - TileJSON
//! /{style}/{z}/{x}/{y}[@Nx].{format}               - 256px tile
//! /{style}/512/{z}/{x}/{y}[@Nx].{format}           - 512px tile
//! /{style}/static/{position}/{size}                - Static map     (serveStaticMaps)
//! /{style}/static/raw/{position}/{size}            - Static map, EPSG:3857
//! /{style}/static?bbox=...                         - Static map, EPSG:3857 query
//! /{style}/staticmap                               - Legacy redirect
//! /{style}/bundle                                  - Zip of tiles (POST)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let app = Arc::new(AppContext::new(registry, RenderService::new(), icons, options));
//! let router = create_router(app, RouterConfig::new().with_cache_max_age(600));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    bundle_handler, health_handler, static_handler, static_query_handler, static_raw_handler,
    staticmap_handler, tile_512_handler, tile_handler, tilejson_handler, AppState,
};
use crate::style::AppContext;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Any CORS origin, 1 hour max-age, tracing on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// Static map routes are only mounted when the app's options enable them.
pub fn create_router(app: Arc<AppContext>, config: RouterConfig) -> Router {
    let serve_static_maps = app.options().serve_static_maps;
    let state = AppState::with_cache_max_age(app, config.cache_max_age);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/{file}", get(tilejson_handler))
        .route("/{style}/{z}/{x}/{file}", get(tile_handler))
        .route("/{style}/512/{z}/{x}/{file}", get(tile_512_handler))
        .route("/{style}/bundle", post(bundle_handler));

    if serve_static_maps {
        router = router
            .route("/{style}/static", get(static_query_handler))
            .route("/{style}/static/{position}/{size}", get(static_handler))
            .route(
                "/{style}/static/raw/{position}/{size}",
                get(static_raw_handler),
            )
            .route("/{style}/staticmap", get(staticmap_handler));
    }

    let router = router
        .with_state(state)
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed)
        }
    }
}
