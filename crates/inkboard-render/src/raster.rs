//! CPU renderer backed by tiny-skia.

use crate::renderer::{RasterImage, RenderConfig, RenderContext, RenderResult, Renderer, RendererError};
use ab_glyph::{Font, FontArc, ScaleFont, point};
use inkboard_core::shapes::{Arrow, Image, Shape, ShapeStyle, Text};
use inkboard_core::ShapeTrait;
use kurbo::{BezPath, PathEl, Point, Rect};
use peniko::Color;
use std::collections::HashMap;
use tiny_skia::{
    ColorU8, FillRule, LineCap, LineJoin, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    StrokeDash, Transform,
};

/// Decoded image pixels keyed by source URL.
#[derive(Default)]
pub struct ImageCache {
    images: HashMap<String, Pixmap>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode encoded image bytes (PNG, JPEG, WebP) for `source`.
    pub fn insert_bytes(&mut self, source: &str, bytes: &[u8]) -> RenderResult<()> {
        let decoded = ::image::load_from_memory(bytes)
            .map_err(|e| RendererError::RenderFailed(format!("decode {source}: {e}")))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let mut pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize {
            width: width as f64,
            height: height as f64,
        })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(decoded.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        self.images.insert(source.to_string(), pixmap);
        Ok(())
    }

    pub fn contains(&self, source: &str) -> bool {
        self.images.contains_key(source)
    }

    fn get(&self, source: &str) -> Option<&Pixmap> {
        self.images.get(source)
    }
}

/// Software renderer producing straight RGBA buffers.
pub struct RasterRenderer {
    config: RenderConfig,
    font: Option<FontArc>,
    images: ImageCache,
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

fn skia_color(color: Color) -> tiny_skia::Color {
    let rgba = color.to_rgba8();
    tiny_skia::Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    paint
}

/// Convert a kurbo path. Returns None for paths with no drawable extent.
fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p) => pb.quad_to(p1.x as f32, p1.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(p1, p2, p) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(
        rect.x0 as f32,
        rect.y0 as f32,
        rect.width() as f32,
        rect.height() as f32,
    )
}

fn solid_stroke(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

impl RasterRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            font: None,
            images: ImageCache::new(),
        }
    }

    /// Use this TrueType/OpenType font for text shapes.
    pub fn with_font_data(mut self, data: Vec<u8>) -> RenderResult<Self> {
        let font = FontArc::try_from_vec(data)
            .map_err(|e| RendererError::RenderFailed(format!("font: {e}")))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn images_mut(&mut self) -> &mut ImageCache {
        &mut self.images
    }

    fn render_shape(&self, pixmap: &mut Pixmap, shape: &Shape, transform: Transform, scale: f64) {
        match shape {
            Shape::Text(text) => self.render_text(pixmap, text, transform, scale),
            Shape::Image(image) => self.render_image(pixmap, image, transform),
            Shape::Arrow(arrow) => self.render_arrow(pixmap, arrow, transform),
            _ => self.render_path(pixmap, &shape.to_path(), shape.style(), transform),
        }
    }

    /// Fill (if any), then stroke.
    fn render_path(&self, pixmap: &mut Pixmap, path: &BezPath, style: &ShapeStyle, transform: Transform) {
        let Some(path) = skia_path(path) else {
            log::debug!("Skipping path with no extent");
            return;
        };
        if let Some(fill) = style.fill() {
            pixmap.fill_path(&path, &paint_for(fill), FillRule::Winding, transform, None);
        }
        if style.stroke_width > 0.0 {
            pixmap.stroke_path(
                &path,
                &paint_for(style.stroke()),
                &solid_stroke(style.stroke_width),
                transform,
                None,
            );
        }
    }

    fn render_arrow(&self, pixmap: &mut Pixmap, arrow: &Arrow, transform: Transform) {
        let mut shaft_style = arrow.style.clone();
        shaft_style.fill_color = None;
        self.render_path(pixmap, &arrow.to_path(), &shaft_style, transform);
        if let Some(head) = skia_path(&arrow.head_path()) {
            pixmap.fill_path(
                &head,
                &paint_for(arrow.style.stroke()),
                FillRule::Winding,
                transform,
                None,
            );
        }
    }

    fn render_text(&self, pixmap: &mut Pixmap, text: &Text, transform: Transform, scale: f64) {
        let Some(font) = &self.font else {
            // no font loaded: mark where the text sits
            self.render_dashed_box(pixmap, text.glyph_box(), None, text.style.stroke(), transform);
            return;
        };
        if text.content.is_empty() || text.font_size <= 0.0 {
            return;
        }

        let size = (text.font_size * scale) as f32;
        let scaled = font.as_scaled(size);
        let mut origin = tiny_skia::Point::from_xy(
            text.position.x as f32,
            (text.position.y - text.font_size) as f32,
        );
        transform.map_points(std::slice::from_mut(&mut origin));

        let Some(mut mask) = Mask::new(pixmap.width(), pixmap.height()) else {
            return;
        };
        let width = pixmap.width() as i64;
        let height = pixmap.height() as i64;
        let data = mask.data_mut();
        let baseline = origin.y + scaled.ascent();
        let mut x = origin.x;
        let mut previous = None;
        for ch in text.content.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = previous {
                x += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(size, point(x, baseline));
            x += scaled.h_advance(id);
            previous = Some(id);
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let dx = bounds.min.x as i64 + px as i64;
                let dy = bounds.min.y as i64 + py as i64;
                if dx < 0 || dy < 0 || dx >= width || dy >= height {
                    return;
                }
                let i = (dy * width + dx) as usize;
                let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                data[i] = data[i].max(value);
            });
        }

        if let Some(area) = tiny_skia::Rect::from_xywh(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32) {
            pixmap.fill_rect(
                area,
                &paint_for(text.style.stroke()),
                Transform::identity(),
                Some(&mask),
            );
        }
    }

    fn render_image(&self, pixmap: &mut Pixmap, image: &Image, transform: Transform) {
        let rect = image.as_rect();
        match self.images.get(&image.source) {
            Some(source) if rect.width() > 0.0 && rect.height() > 0.0 => {
                let sx = rect.width() / source.width() as f64;
                let sy = rect.height() / source.height() as f64;
                let placed = transform
                    .pre_translate(rect.x0 as f32, rect.y0 as f32)
                    .pre_scale(sx as f32, sy as f32);
                pixmap.draw_pixmap(0, 0, source.as_ref(), &PixmapPaint::default(), placed, None);
            }
            _ => self.render_dashed_box(
                pixmap,
                rect,
                Some(self.config.placeholder_fill),
                self.config.placeholder_stroke,
                transform,
            ),
        }
    }

    fn render_dashed_box(
        &self,
        pixmap: &mut Pixmap,
        rect: Rect,
        fill: Option<Color>,
        stroke: Color,
        transform: Transform,
    ) {
        let Some(rect) = skia_rect(rect) else {
            return;
        };
        if let Some(fill) = fill {
            pixmap.fill_rect(rect, &paint_for(fill), transform, None);
        }
        let path = PathBuilder::from_rect(rect);
        let dash = self.config.placeholder_dash;
        let outline = Stroke {
            width: 1.0,
            dash: StrokeDash::new(vec![dash[0], dash[1]], 0.0),
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint_for(stroke), &outline, transform, None);
    }

    fn render_selection(&self, pixmap: &mut Pixmap, bounds: Rect, transform: Transform, scale: f64) {
        let Some(rect) = skia_rect(bounds.inflate(4.0, 4.0)) else {
            return;
        };
        let outline = Stroke {
            width: (1.5 / scale.max(f64::EPSILON)) as f32,
            ..Default::default()
        };
        pixmap.stroke_path(
            &PathBuilder::from_rect(rect),
            &paint_for(self.config.selection_color),
            &outline,
            transform,
            None,
        );
    }
}

/// Convert premultiplied pixmap pixels to straight RGBA.
fn to_raster(pixmap: &Pixmap) -> RasterImage {
    let mut rgba_data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba_data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RasterImage {
        rgba_data,
        width: pixmap.width(),
        height: pixmap.height(),
    }
}

impl Renderer for RasterRenderer {
    fn render_frame(&mut self, ctx: &RenderContext) -> RenderResult<RasterImage> {
        let (width, height) = ctx.device_size()?;
        let mut pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize {
            width: width as f64,
            height: height as f64,
        })?;
        pixmap.fill(skia_color(self.background_color(ctx)));

        let scale = ctx.scale_factor;
        let transform = Transform::from_scale(scale as f32, scale as f32)
            .pre_translate(ctx.pan_offset.x as f32, ctx.pan_offset.y as f32);

        for index in 0..ctx.shapes.len() {
            if let Some(shape) = ctx.shape_for_display(index) {
                self.render_shape(&mut pixmap, &shape, transform, scale);
            }
        }

        if let Some(preview) = ctx.preview {
            self.render_shape(&mut pixmap, preview, transform, scale);
        }

        if let Some(bounds) = ctx
            .selected
            .and_then(|index| ctx.shape_for_display(index))
            .and_then(|shape| shape.bounds())
        {
            self.render_selection(&mut pixmap, bounds, transform, scale);
        }

        Ok(to_raster(&pixmap))
    }

    fn export_pixel_ratio(&self) -> f64 {
        self.config.export_pixel_ratio
    }
}

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(image: &RasterImage) -> RenderResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, image.width, image.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().map_err(|e| {
            log::error!("Failed to write PNG header: {:?}", e);
            RendererError::Encode(e.to_string())
        })?;

        writer.write_image_data(&image.rgba_data).map_err(|e| {
            log::error!("Failed to write PNG data: {:?}", e);
            RendererError::Encode(e.to_string())
        })?;
    }
    Ok(png_data)
}

/// Board-space box covering every shape, grown by `margin`.
pub fn content_bounds(shapes: &[Shape], margin: f64) -> Option<Rect> {
    shapes
        .iter()
        .filter_map(Shape::bounds)
        .reduce(|a, b| a.union(b))
        .map(|r| r.inflate(margin, margin))
}

/// Convenience for callers holding a board point rather than a pan offset.
pub fn pan_to_origin(origin: Point) -> kurbo::Vec2 {
    -origin.to_vec2()
}
