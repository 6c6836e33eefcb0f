//! Renderer trait abstraction.

use inkboard_core::session::Frame;
use inkboard_core::shapes::Shape;
use kurbo::{Size, Vec2};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size: {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Flattened frame: straight (non-premultiplied) RGBA8, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub rgba_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RasterImage {
    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba_data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Surface-independent render settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub background_color: Color,
    /// Device pixels per board unit when exporting.
    pub export_pixel_ratio: f64,
    /// Space left around the content when exporting a whole board.
    pub export_margin: f64,
    pub selection_color: Color,
    /// Outline of an image whose pixels are not available.
    pub placeholder_stroke: Color,
    pub placeholder_fill: Color,
    /// Dash pattern (on, off) of the placeholder outline.
    pub placeholder_dash: [f32; 2],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_color: Color::from_rgba8(255, 255, 255, 255),
            export_pixel_ratio: 2.0,
            export_margin: 20.0,
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            placeholder_stroke: Color::from_rgba8(0x88, 0x88, 0x88, 255),
            placeholder_fill: Color::from_rgba8(255, 255, 255, 255),
            placeholder_dash: [4.0, 4.0],
        }
    }
}

/// Context for a single render frame.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Authoritative shapes in z-order.
    pub shapes: &'a [Shape],
    /// In-progress shape drawn over everything else.
    pub preview: Option<&'a Shape>,
    /// View pan offset in board units.
    pub pan_offset: Vec2,
    /// Viewport size in logical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI and export).
    pub scale_factor: f64,
    /// Background color.
    pub background_color: Color,
    /// Index of the shape to outline.
    pub selected: Option<usize>,
    /// Index and transient offset of a shape being dragged.
    pub drag_offset: Option<(usize, Vec2)>,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(shapes: &'a [Shape], viewport_size: Size) -> Self {
        Self {
            shapes,
            preview: None,
            pan_offset: Vec2::ZERO,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::from_rgba8(255, 255, 255, 255),
            selected: None,
            drag_offset: None,
        }
    }

    /// Context for everything a session frame shows.
    pub fn from_frame(frame: &'a Frame, viewport_size: Size) -> Self {
        Self::new(&frame.shapes, viewport_size)
            .with_preview(frame.preview.as_ref())
            .with_pan_offset(frame.pan_offset)
            .with_selected(frame.selected)
            .with_drag_offset(frame.drag)
    }

    pub fn with_preview(mut self, preview: Option<&'a Shape>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_pan_offset(mut self, offset: Vec2) -> Self {
        self.pan_offset = offset;
        self
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_drag_offset(mut self, drag: Option<(usize, Vec2)>) -> Self {
        self.drag_offset = drag;
        self
    }

    /// Surface size in device pixels.
    pub fn device_size(&self) -> RenderResult<(u32, u32)> {
        let width = self.viewport_size.width * self.scale_factor;
        let height = self.viewport_size.height * self.scale_factor;
        let invalid = || RendererError::InvalidSize { width, height };
        if !width.is_finite() || !height.is_finite() || width < 1.0 || height < 1.0 {
            return Err(invalid());
        }
        if width > u32::MAX as f64 || height > u32::MAX as f64 {
            return Err(invalid());
        }
        Ok((width.ceil() as u32, height.ceil() as u32))
    }

    /// Shape at `index` as it should be drawn, including any drag offset.
    pub fn shape_for_display(&self, index: usize) -> Option<Shape> {
        let shape = self.shapes.get(index)?;
        match self.drag_offset {
            Some((dragged, offset)) if dragged == index => {
                let mut moved = shape.clone();
                moved.translate(offset);
                Some(moved)
            }
            _ => Some(shape.clone()),
        }
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Draw a frame into a fresh RGBA buffer.
    fn render_frame(&mut self, ctx: &RenderContext) -> RenderResult<RasterImage>;

    /// Device pixel ratio used by [`Renderer::export_raster`].
    fn export_pixel_ratio(&self) -> f64 {
        2.0
    }

    /// Flatten the current frame for download: shapes and preview at the
    /// export pixel ratio, without selection chrome.
    fn export_raster(&mut self, ctx: &RenderContext) -> RenderResult<RasterImage> {
        let ctx = ctx
            .clone()
            .with_scale_factor(self.export_pixel_ratio())
            .with_selected(None);
        let image = self.render_frame(&ctx)?;
        log::info!("Exported {}x{} raster", image.width, image.height);
        Ok(image)
    }

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
