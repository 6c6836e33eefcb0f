//! Image shape referencing an external source.

use super::{ShapeMeta, ShapeStyle, ShapeTrait};
use crate::geometry::{contains_inclusive, floor_footprint};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};

/// An image placed on the board by URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub(crate) meta: ShapeMeta,
    /// Top-left corner position.
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Source reference (URL).
    pub source: String,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Image {
    /// Create a new image. Negative sizes are clamped to zero.
    pub fn new(position: Point, width: f64, height: f64, source: String) -> Self {
        Self::reconstruct(
            ShapeMeta::new(),
            position,
            width,
            height,
            source,
            ShapeStyle::default(),
        )
    }

    pub(crate) fn reconstruct(
        meta: ShapeMeta,
        position: Point,
        width: f64,
        height: f64,
        source: String,
        style: ShapeStyle,
    ) -> Self {
        Self {
            meta,
            position,
            width: width.max(0.0),
            height: height.max(0.0),
            source,
            style,
        }
    }

    /// Display box as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

impl ShapeTrait for Image {
    fn meta(&self) -> &ShapeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ShapeMeta {
        &mut self.meta
    }

    fn bounds(&self) -> Option<Rect> {
        Some(floor_footprint(self.as_rect()))
    }

    fn hit_test(&self, point: Point, _tolerance: f64) -> bool {
        self.bounds().is_some_and(|b| contains_inclusive(b, point))
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
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
