//! Overlay canvas.
//!
//! Paths and markers are drawn in world pixel space at the request zoom. The
//! canvas transform maps that space onto the output raster:
//!
//! ```text
//! world px ──translate(-center)──► rotate(-bearing) ──translate(w/2,h/2)──► scale(ratio)
//! ```

use image::RgbaImage;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pattern, Pixmap, Rect,
    SpreadMode, Stroke, Transform,
};

use super::color::Color;
use super::parse::{Marker, OverlayPath, PathStyle};
use crate::error::OverlayError;
use crate::geo::{project_to_pixel, LngLat, TILE_SIZE};

const DEFAULT_STROKE: Color = Color::rgba(0, 64, 255, 179);
const DEFAULT_FILL: Color = Color::rgba(255, 255, 255, 102);

/// Transparent drawing surface sized to the output raster.
pub struct Canvas {
    pixmap: Pixmap,
    transform: Transform,
    zoom: f64,
}

impl Canvas {
    /// Create a canvas of `width*scale x height*scale` pixels looking at
    /// `center`.
    pub fn new(
        center: LngLat,
        zoom: f64,
        bearing: f64,
        width: u32,
        height: u32,
        scale: u8,
    ) -> Result<Self, OverlayError> {
        let scale = scale.max(1);
        let pixmap = Pixmap::new(width * scale as u32, height * scale as u32).ok_or(
            OverlayError::Canvas {
                width: width * scale as u32,
                height: height * scale as u32,
            },
        )?;

        let (cx, mut cy) = project_to_pixel(center, zoom);

        // Keep the viewport inside the world vertically
        let world = TILE_SIZE * 2f64.powf(zoom);
        let half = height as f64 / 2.0;
        if cy + half > world {
            cy -= cy + half - world;
        } else if cy - half < 0.0 {
            cy -= cy - half;
        }

        let s = scale as f32;
        let (w, h) = (width as f32, height as f32);
        let (cx, cy) = (cx as f32, cy as f32);
        let transform = if bearing != 0.0 {
            Transform::from_scale(s, s)
                .pre_translate(w / 2.0, h / 2.0)
                .pre_concat(Transform::from_rotate(-bearing as f32))
                .pre_translate(-cx, -cy)
        } else {
            Transform::from_scale(s, s).pre_translate(-cx + w / 2.0, -cy + h / 2.0)
        };

        Ok(Self {
            pixmap,
            transform,
            zoom,
        })
    }

    fn point(&self, ll: &LngLat) -> (f32, f32) {
        let (x, y) = project_to_pixel(*ll, self.zoom);
        (x as f32, y as f32)
    }

    /// Draw one path: fill, then the border stroke, then the stroke.
    pub fn draw_path(&mut self, path: &OverlayPath, style: &PathStyle) {
        if path.points.len() < 2 {
            return;
        }

        let mut builder = PathBuilder::new();
        let (x, y) = self.point(&path.points[0]);
        builder.move_to(x, y);
        for ll in &path.points[1..] {
            let (x, y) = self.point(ll);
            builder.line_to(x, y);
        }
        if path.points.first() == path.points.last() {
            builder.close();
        }
        let Some(shape) = builder.finish() else {
            return;
        };

        let directives = &path.directives;

        if style.fill.is_some() || directives.fill.is_some() {
            let fill = directives
                .fill
                .as_deref()
                .or(style.fill.as_deref().filter(|f| !f.is_empty()))
                .and_then(Color::parse)
                .unwrap_or(DEFAULT_FILL);
            self.pixmap.fill_path(
                &shape,
                &paint(fill),
                FillRule::Winding,
                self.transform,
                None,
            );
        }

        let width = directives.width.or(style.width).unwrap_or(1.0);
        let mut stroke = Stroke {
            width,
            ..Stroke::default()
        };
        if directives.width.is_some() || style.width.is_some() {
            stroke.line_cap = line_cap(style.linecap.as_deref());
            stroke.line_join = line_join(style.linejoin.as_deref());
        }

        let border_width = style.border_width.unwrap_or(width * 0.1);
        if let Some(border) = style.border.as_deref().and_then(Color::parse) {
            if border_width > 0.0 {
                let border_stroke = Stroke {
                    width: width + 2.0 * border_width,
                    ..stroke.clone()
                };
                self.pixmap
                    .stroke_path(&shape, &paint(border), &border_stroke, self.transform, None);
            }
        }

        let color = directives
            .stroke
            .as_deref()
            .or(style.stroke.as_deref())
            .and_then(Color::parse)
            .unwrap_or(DEFAULT_STROKE);
        self.pixmap
            .stroke_path(&shape, &paint(color), &stroke, self.transform, None);
    }

    /// Draw a marker icon at its location.
    pub fn draw_marker(&mut self, marker: &Marker, icon: &RgbaImage) {
        let Some(icon_pixmap) = to_pixmap(icon) else {
            return;
        };

        let (px, py) = self.point(&marker.location);
        let w = icon.width() as f32 * marker.scale;
        let h = icon.height() as f32 * marker.scale;

        let (x, y) = if marker.center {
            (px - w / 2.0, py - h / 2.0)
        } else {
            (
                px - w / 2.0 + marker.offset.0 * marker.scale,
                py - h + marker.offset.1 * marker.scale,
            )
        };

        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };

        let pattern_transform = Transform::from_translate(x, y)
            .pre_scale(marker.scale, marker.scale);
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.shader = Pattern::new(
            icon_pixmap.as_ref(),
            SpreadMode::Pad,
            FilterQuality::Bilinear,
            1.0,
            pattern_transform,
        );
        self.pixmap.fill_rect(rect, &paint, self.transform, None);
    }

    /// Finish drawing and return a straight-alpha image.
    pub fn into_image(self) -> RgbaImage {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let data: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        // Length always matches the pixmap dimensions
        RgbaImage::from_raw(width, height, data).unwrap_or_else(|| RgbaImage::new(width, height))
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn line_cap(value: Option<&str>) -> LineCap {
    match value {
        Some("round") => LineCap::Round,
        Some("square") => LineCap::Square,
        _ => LineCap::Butt,
    }
}

fn line_join(value: Option<&str>) -> LineJoin {
    match value {
        Some("round") => LineJoin::Round,
        Some("bevel") => LineJoin::Bevel,
        _ => LineJoin::Miter,
    }
}

/// Premultiply a straight-alpha image into a pixmap.
fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let data = image
        .pixels()
        .flat_map(|p| Color::rgba(p[0], p[1], p[2], p[3]).premultiplied())
        .collect();
    Pixmap::from_vec(data, size)
}
