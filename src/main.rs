//! Map Render Server - raster tiles and static maps from vector styles.
//!
//! This binary loads the config file, registers every style and starts the
//! HTTP server.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use map_render_server::{
    config::{Config, FileConfig},
    engine::BackgroundRendererFactory,
    overlay::{IconRegistry, WatermarkFont},
    protocol::{EmptyResponseCache, FontRegistry},
    render::RenderService,
    server::{create_router, RouterConfig},
    style::{AppContext, ServeOptions, StyleEnv, StyleRegistry},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let file = match FileConfig::load(&config.config) {
        Ok(file) => file,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = match bootstrap(&config, &file).await {
        Some(app) => Arc::new(app),
        None => return ExitCode::FAILURE,
    };

    let router = create_router(app.clone(), build_router_config(&config));
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    for id in app.styles().ids().await {
        info!("    curl http://{}/{}.json", addr, id);
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Draining renderer pools");
    app.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build the shared services and register every configured style.
///
/// A style that fails to load is logged and skipped; the server starts as
/// long as the shared services could be created.
async fn bootstrap(config: &Config, file: &FileConfig) -> Option<AppContext> {
    let paths = file.paths();

    info!("Configuration:");
    info!("  Root: {}", paths.root.display());
    info!("  Styles: {}", paths.styles.display());
    info!("  Max scale factor: {}", file.max_scale_factor());
    if file.options.lenient_assets {
        warn!("  Lenient assets: missing sprites and glyphs will not fail renders");
    }

    let fonts = match FontRegistry::scan(&paths.fonts).await {
        Ok(fonts) => Arc::new(fonts),
        Err(e) => {
            warn!("Fonts unavailable ({}), glyph requests will fail", e);
            Arc::new(FontRegistry::empty())
        }
    };

    let icons = match &paths.icons {
        Some(dir) => Arc::new(IconRegistry::scan(dir).await),
        None => Arc::new(IconRegistry::empty()),
    };

    let http = match reqwest::Client::builder()
        .timeout(file.remote_timeout())
        .user_agent(concat!("map-render-server/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return None;
        }
    };

    let mut renderer = RenderService::new()
        .with_max_size(file.options.max_size)
        .with_tile_margin(file.options.tile_margin)
        .with_format_options(file.format_options());

    match file.watermark_font_path() {
        Some(path) => match WatermarkFont::load(&path).await {
            Ok(font) => renderer = renderer.with_watermark_font(font),
            Err(e) => warn!("Watermarks disabled: {}", e),
        },
        None => {
            if file.options.watermark.is_some()
                || file.styles.values().any(|s| s.watermark.is_some())
            {
                warn!("Watermarks configured without watermarkFont, they will not be drawn");
            }
        }
    }

    let env = StyleEnv {
        styles_dir: paths.styles.clone(),
        sprites_dir: paths.sprites.clone(),
        mbtiles_dir: paths.mbtiles.clone(),
        data: file.data.clone(),
        pool_sizes: file.pool_sizes(),
        max_scale: file.max_scale_factor(),
        policies: file.failure_policies(),
        watermark: file.options.watermark.clone(),
        factory: Arc::new(BackgroundRendererFactory::new()),
        fonts,
        empty: Arc::new(EmptyResponseCache::new()),
        http,
        decorator: None,
    };

    let registry = StyleRegistry::new(env);
    for (id, style) in &file.styles {
        if let Err(e) = registry.register(id, style).await {
            error!(style = %id, "Failed to load style: {}", e);
        }
    }
    if registry.is_empty().await {
        warn!("No styles registered");
    }

    let options = ServeOptions {
        serve_static_maps: file.options.serve_static_maps,
        allow_remote_marker_icons: file.options.allow_remote_marker_icons,
        legacy_marker_icon: file.options.legacy_marker_icon.clone(),
        public_url: config.public_url.clone(),
    };

    Some(AppContext::new(registry, renderer, icons, options))
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "map_render_server=debug,tower_http=debug"
    } else {
        "map_render_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the CLI config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
