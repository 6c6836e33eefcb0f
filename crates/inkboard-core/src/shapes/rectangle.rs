//! Rectangle shape.

use super::{ShapeMeta, ShapeStyle, ShapeTrait};
use crate::geometry::{contains_inclusive, floor_footprint};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};

/// An axis-aligned rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub(crate) meta: ShapeMeta,
    /// Top-left corner position.
    pub position: Point,
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Rectangle {
    /// Create a new rectangle. Negative sizes are clamped to zero.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self::reconstruct(ShapeMeta::new(), position, width, height, ShapeStyle::default())
    }

    pub(crate) fn reconstruct(
        meta: ShapeMeta,
        position: Point,
        width: f64,
        height: f64,
        style: ShapeStyle,
    ) -> Self {
        Self {
            meta,
            position,
            width: width.max(0.0),
            height: height.max(0.0),
            style,
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let min_x = p1.x.min(p2.x);
        let min_y = p1.y.min(p2.y);
        let width = (p2.x - p1.x).abs();
        let height = (p2.y - p1.y).abs();

        Self::new(Point::new(min_x, min_y), width, height)
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

impl ShapeTrait for Rectangle {
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
