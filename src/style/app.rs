//! Long-lived service context shared by every request.

use std::sync::Arc;

use super::registry::StyleRegistry;
use crate::geo::ProjectionTransform;
use crate::overlay::{IconRegistry, OverlayOptions};
use crate::protocol::{EmptyResponseCache, FontRegistry};
use crate::render::RenderService;

/// Request-facing switches from the `options` section of the config.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Static map routes are mounted
    pub serve_static_maps: bool,

    /// `marker=` icons may be `http(s)` URLs
    pub allow_remote_marker_icons: bool,

    /// Icon used when translating legacy `staticmap` markers
    pub legacy_marker_icon: Option<String>,

    /// Base URL advertised in TileJSON tile templates
    pub public_url: Option<String>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            serve_static_maps: true,
            allow_remote_marker_icons: false,
            legacy_marker_icon: None,
            public_url: None,
        }
    }
}

/// Everything handlers need: registered styles, the renderer and the shared
/// caches.
pub struct AppContext {
    styles: StyleRegistry,
    renderer: RenderService,
    icons: Arc<IconRegistry>,
    options: ServeOptions,
}

impl AppContext {
    pub fn new(
        styles: StyleRegistry,
        renderer: RenderService,
        icons: Arc<IconRegistry>,
        options: ServeOptions,
    ) -> Self {
        Self {
            styles,
            renderer,
            icons,
            options,
        }
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn renderer(&self) -> &RenderService {
        &self.renderer
    }

    pub fn icons(&self) -> &IconRegistry {
        &self.icons
    }

    pub fn options(&self) -> &ServeOptions {
        &self.options
    }

    /// Client shared by remote resource fetches and remote marker icons.
    pub fn http(&self) -> &reqwest::Client {
        &self.styles.env().http
    }

    /// Process-wide cache of synthesized empty tiles.
    pub fn empty(&self) -> &Arc<EmptyResponseCache> {
        &self.styles.env().empty
    }

    pub fn fonts(&self) -> &Arc<FontRegistry> {
        &self.styles.env().fonts
    }

    /// Overlay parsing settings for coordinates in `transformer`'s projection.
    pub fn overlay_options(&self, transformer: Option<ProjectionTransform>) -> OverlayOptions<'_> {
        OverlayOptions {
            icons: &self.icons,
            allow_remote_icons: self.options.allow_remote_marker_icons,
            transformer,
        }
    }

    /// Drain every style's pools.
    pub async fn shutdown(&self) {
        self.styles.clear().await;
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("renderer", &self.renderer)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
