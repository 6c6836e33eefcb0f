//! Text shape.
//!
//! The origin is the baseline start, so the glyph box sits above `position.y`.

use super::{ShapeMeta, ShapeStyle, ShapeTrait};
use crate::geometry::{GLYPH_WIDTH_FACTOR, TEXT_PADDING, contains_inclusive, floor_footprint};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};

/// A single line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub(crate) meta: ShapeMeta,
    /// Baseline origin.
    pub position: Point,
    /// Text content.
    pub content: String,
    /// Font size in board units.
    pub font_size: f64,
    /// Style properties; `stroke_color` is the glyph color.
    pub style: ShapeStyle,
}

impl Text {
    /// Font size used when a record carries none.
    pub const DEFAULT_FONT_SIZE: f64 = 20.0;

    /// Create a new text shape.
    pub fn new(position: Point, content: String, font_size: f64) -> Self {
        Self::reconstruct(ShapeMeta::new(), position, content, font_size, ShapeStyle::default())
    }

    pub(crate) fn reconstruct(
        meta: ShapeMeta,
        position: Point,
        content: String,
        font_size: f64,
        style: ShapeStyle,
    ) -> Self {
        Self {
            meta,
            position,
            content,
            font_size: font_size.max(0.0),
            style,
        }
    }

    /// Approximate advance width of the content.
    pub fn approx_width(&self) -> f64 {
        self.content.chars().count() as f64 * self.font_size * GLYPH_WIDTH_FACTOR
    }

    /// Unpadded glyph box: from the top of the em square down to the baseline.
    pub fn glyph_box(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y - self.font_size,
            self.position.x + self.approx_width(),
            self.position.y,
        )
    }
}

impl ShapeTrait for Text {
    fn meta(&self) -> &ShapeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ShapeMeta {
        &mut self.meta
    }

    fn bounds(&self) -> Option<Rect> {
        Some(floor_footprint(self.glyph_box().inflate(TEXT_PADDING, TEXT_PADDING)))
    }

    fn hit_test(&self, point: Point, _tolerance: f64) -> bool {
        self.bounds().is_some_and(|b| contains_inclusive(b, point))
    }

    /// Outline of the glyph box; glyphs themselves are laid out by the renderer.
    fn to_path(&self) -> BezPath {
        self.glyph_box().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_sit_above_baseline() {
        let text = Text::new(Point::new(100.0, 100.0), "hello".to_string(), 20.0);
        let bounds = text.bounds().unwrap();
        // 5 chars * 20 * 0.6 = 60 wide, padded by 4 on each side
        assert!((bounds.x0 - 96.0).abs() < 1e-9);
        assert!((bounds.y0 - 76.0).abs() < 1e-9);
        assert!((bounds.width() - 68.0).abs() < 1e-9);
        assert!((bounds.height() - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_width_counts_chars_not_bytes() {
        let text = Text::new(Point::ZERO, "héé".to_string(), 10.0);
        assert!((text.approx_width() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test() {
        let text = Text::new(Point::new(0.0, 20.0), "abc".to_string(), 20.0);
        assert!(text.hit_test(Point::new(10.0, 10.0), 0.0));
        assert!(!text.hit_test(Point::new(10.0, 30.0), 0.0));
    }
}
