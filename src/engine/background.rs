//! Built-in engine that paints a style's background layer.
//!
//! It does not rasterize vector data. It fills the raster with the color of
//! the first `background` layer and, on its first render, loads the style's
//! sprite index through the resource router the same way a full engine does,
//! so the resource plumbing and failure policies are exercised end to end.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{RawImage, RenderParams, Renderer, RendererContext, RendererFactory};
use crate::error::EngineError;
use crate::overlay::Color;
use crate::protocol::ResourceRouter;

/// Creates [`BackgroundRenderer`]s.
#[derive(Debug, Clone, Default)]
pub struct BackgroundRendererFactory;

impl BackgroundRendererFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RendererFactory for BackgroundRendererFactory {
    async fn create(&self, ctx: RendererContext) -> Result<Box<dyn Renderer>, EngineError> {
        if ctx.ratio == 0 {
            return Err(EngineError::Create {
                message: "pixel ratio must be at least 1".to_string(),
            });
        }

        let color = background_color(&ctx.style).unwrap_or(Color::TRANSPARENT);
        let sprite = ctx
            .style
            .get("sprite")
            .and_then(Value::as_str)
            .map(|base| sprite_index_url(base, ctx.ratio));

        debug!(
            style = %ctx.style_id,
            ratio = ctx.ratio,
            mode = ctx.mode.as_str(),
            "Created background renderer"
        );

        Ok(Box::new(BackgroundRenderer {
            ratio: ctx.ratio,
            fill: color.premultiplied(),
            sprite,
            sprite_loaded: false,
            router: ctx.router,
        }))
    }
}

/// Renderer that fills the raster with the style background.
pub struct BackgroundRenderer {
    ratio: u8,
    fill: [u8; 4],
    sprite: Option<String>,
    sprite_loaded: bool,
    router: Arc<ResourceRouter>,
}

#[async_trait]
impl Renderer for BackgroundRenderer {
    async fn render(&mut self, params: &RenderParams) -> Result<RawImage, EngineError> {
        if !self.sprite_loaded {
            if let Some(url) = &self.sprite {
                let index = self.router.fetch(url).await?;
                match sprite_entry_count(&index.data) {
                    Some(entries) => debug!(sprite = %url, entries, "Loaded sprite index"),
                    None => debug!(sprite = %url, "Sprite index is not a JSON object"),
                }
            }
            self.sprite_loaded = true;
        }

        let ratio = self.ratio as u32;
        Ok(RawImage::filled(
            params.width * ratio,
            params.height * ratio,
            self.fill,
        ))
    }
}

/// Color of the first `background` layer, when it is a literal.
fn background_color(style: &Value) -> Option<Color> {
    style
        .get("layers")?
        .as_array()?
        .iter()
        .find(|layer| layer.get("type").and_then(Value::as_str) == Some("background"))?
        .get("paint")?
        .get("background-color")?
        .as_str()
        .and_then(Color::parse)
}

/// Number of images in a sprite index document.
fn sprite_entry_count(data: &[u8]) -> Option<usize> {
    serde_json::from_slice::<serde_json::Map<String, Value>>(data)
        .ok()
        .map(|index| index.len())
}

fn sprite_index_url(base: &str, ratio: u8) -> String {
    if ratio > 1 {
        format!("{base}@2x.json")
    } else {
        format!("{base}.json")
    }
}
