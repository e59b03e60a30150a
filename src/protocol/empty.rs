//! Synthesized empty responses.
//!
//! When a soft-failing fetch has nothing to return, the renderer still needs
//! a payload it can decode: an empty body for vector data, or a single pixel
//! of the source's background color in the expected image format. Each
//! `(format, color)` payload is encoded once and reused for the life of the
//! process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::overlay::Color;
use crate::render::{encode_image, FormatOptions, OutputFormat};

/// Color used when a source declares none.
pub const DEFAULT_EMPTY_COLOR: &str = "rgba(255,255,255,0)";

/// Process-wide cache of synthesized empty payloads.
#[derive(Default)]
pub struct EmptyResponseCache {
    entries: RwLock<HashMap<(OutputFormat, String), Bytes>>,
    synthesized: AtomicUsize,
}

impl EmptyResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty payload for a format and optional CSS color.
    ///
    /// `pbf`, empty and unknown formats yield an empty body.
    pub async fn get(&self, format: &str, color: Option<&str>) -> Bytes {
        let Some(format) = OutputFormat::parse(format) else {
            return Bytes::new();
        };
        let color = color
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_EMPTY_COLOR)
            .to_string();
        let key = (format, color);

        if let Some(data) = self.entries.read().await.get(&key) {
            return data.clone();
        }

        let mut entries = self.entries.write().await;
        if let Some(data) = entries.get(&key) {
            return data.clone();
        }

        match synthesize(format, &key.1) {
            Some(data) => {
                self.synthesized.fetch_add(1, Ordering::Relaxed);
                debug!(format = format.as_str(), color = %key.1, "Synthesized empty response");
                entries.insert(key, data.clone());
                data
            }
            None => Bytes::new(),
        }
    }

    /// Number of payloads encoded so far.
    pub fn synthesized(&self) -> usize {
        self.synthesized.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn synthesize(format: OutputFormat, color: &str) -> Option<Bytes> {
    let parsed = Color::parse(color).unwrap_or_else(|| {
        debug!(color, "Unparseable empty response color, using default");
        Color::rgba(255, 255, 255, 0)
    });

    let image = if parsed.a < 255 && format != OutputFormat::Jpeg {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            1,
            1,
            Rgba([parsed.r, parsed.g, parsed.b, parsed.a]),
        ))
    } else {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([parsed.r, parsed.g, parsed.b])))
    };

    match encode_image(&image, format, &FormatOptions::default()) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(format = format.as_str(), error = %e, "Failed to synthesize empty response");
            None
        }
    }
}
