//! Test utilities for integration tests.
//!
//! This module provides a counting mock render engine and helpers that lay
//! out a temporary style directory and build a ready-to-query router.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use map_render_server::engine::{RawImage, RenderParams, Renderer, RendererContext, RendererFactory};
use map_render_server::error::EngineError;
use map_render_server::overlay::IconRegistry;
use map_render_server::pool::PoolSizes;
use map_render_server::protocol::{EmptyResponseCache, FailurePolicies, FontRegistry};
use map_render_server::render::RenderService;
use map_render_server::style::{AppContext, ServeOptions, StyleConfig, StyleEnv, StyleRegistry};
use map_render_server::{create_router, RouterConfig};

// =============================================================================
// Mock Render Engine
// =============================================================================

/// Shared counters of a [`CountingFactory`] and its renderers.
#[derive(Default)]
pub struct EngineStats {
    pub created: AtomicUsize,
    pub renders: AtomicUsize,
    pub active: AtomicUsize,
    pub peak_active: AtomicUsize,
    pub fail_renders: AtomicBool,
}

impl EngineStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_renders.store(failing, Ordering::SeqCst);
    }
}

/// A render engine that fills the raster with one color and counts its work.
#[derive(Clone)]
pub struct CountingFactory {
    pub stats: Arc<EngineStats>,
    fill: [u8; 4],
    delay: Duration,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(EngineStats::default()),
            fill: [0, 128, 255, 255],
            delay: Duration::ZERO,
        }
    }

    /// Every render takes at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for CountingFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RendererFactory for CountingFactory {
    async fn create(&self, ctx: RendererContext) -> Result<Box<dyn Renderer>, EngineError> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingRenderer {
            ratio: ctx.ratio as u32,
            fill: self.fill,
            delay: self.delay,
            stats: self.stats.clone(),
        }))
    }
}

struct CountingRenderer {
    ratio: u32,
    fill: [u8; 4],
    delay: Duration,
    stats: Arc<EngineStats>,
}

#[async_trait]
impl Renderer for CountingRenderer {
    async fn render(&mut self, params: &RenderParams) -> Result<RawImage, EngineError> {
        self.stats.renders.fetch_add(1, Ordering::SeqCst);
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_active.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.stats.active.fetch_sub(1, Ordering::SeqCst);

        if self.stats.fail_renders.load(Ordering::SeqCst) {
            return Err(EngineError::Render {
                message: "mock failure".to_string(),
            });
        }
        Ok(RawImage::filled(
            params.width * self.ratio,
            params.height * self.ratio,
            self.fill,
        ))
    }
}

// =============================================================================
// Test Server
// =============================================================================

/// Settings for [`TestServer::start`].
#[derive(Clone)]
pub struct TestOptions {
    pub factory: CountingFactory,
    pub pool_sizes: PoolSizes,
    pub max_scale: u8,
    pub renderer: RenderService,
    pub serve: ServeOptions,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            factory: CountingFactory::new(),
            pool_sizes: PoolSizes::new(vec![0], vec![2]),
            max_scale: 2,
            renderer: RenderService::new(),
            serve: ServeOptions::default(),
        }
    }
}

/// A registered `demo` style behind a router, with its temp directory.
pub struct TestServer {
    pub dir: TempDir,
    pub app: Arc<AppContext>,
    pub stats: Arc<EngineStats>,
    pub router: Router,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(TestOptions::default()).await
    }

    pub async fn start_with(options: TestOptions) -> Self {
        let dir = TempDir::new().unwrap();
        write_style_dir(dir.path(), &demo_style());

        let env = StyleEnv {
            styles_dir: dir.path().join("styles"),
            sprites_dir: dir.path().join("styles"),
            mbtiles_dir: dir.path().join("mbtiles"),
            data: Default::default(),
            pool_sizes: options.pool_sizes,
            max_scale: options.max_scale,
            policies: FailurePolicies::default(),
            watermark: None,
            factory: Arc::new(options.factory.clone()),
            fonts: Arc::new(FontRegistry::empty()),
            empty: Arc::new(EmptyResponseCache::new()),
            http: reqwest::Client::new(),
            decorator: None,
        };

        let registry = StyleRegistry::new(env);
        registry
            .register(
                "demo",
                &StyleConfig {
                    style: "demo.json".to_string(),
                    ..StyleConfig::default()
                },
            )
            .await
            .unwrap();

        let icons = Arc::new(IconRegistry::scan(dir.path().join("icons")).await);
        let app = Arc::new(AppContext::new(
            registry,
            options.renderer,
            icons,
            options.serve,
        ));
        let router = create_router(app.clone(), RouterConfig::new().with_tracing(false));

        Self {
            dir,
            app,
            stats: options.factory.stats.clone(),
            router,
        }
    }

    /// Send a GET request.
    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Minimal style with a literal background.
pub fn demo_style() -> Value {
    json!({
        "version": 8,
        "name": "Demo",
        "sources": {},
        "layers": [
            {"id": "bg", "type": "background", "paint": {"background-color": "#0080ff"}}
        ]
    })
}

/// `styles/demo.json` plus an `icons/` directory with a 4x4 `pin.png`.
pub fn write_style_dir(root: &Path, style: &Value) {
    std::fs::create_dir_all(root.join("styles")).unwrap();
    std::fs::create_dir_all(root.join("icons")).unwrap();
    std::fs::write(
        root.join("styles/demo.json"),
        serde_json::to_vec(style).unwrap(),
    )
    .unwrap();

    let pin = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
    pin.save(root.join("icons/pin.png")).unwrap();
}

// =============================================================================
// Response Helpers
// =============================================================================

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Decode an image body and return its dimensions.
pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(data).unwrap();
    (image.width(), image.height())
}

/// Check if data starts with the PNG signature.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G'])
}

/// Check if data starts with a JPEG SOI marker.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}
