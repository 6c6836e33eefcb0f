//! Straight line shape.

use super::{ShapeMeta, ShapeStyle, ShapeTrait};
use crate::geometry::{padded_points_bounds, polyline_hit};
use kurbo::{BezPath, Point, Rect, Vec2};

/// A straight line between two endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub(crate) meta: ShapeMeta,
    /// Start point.
    pub start: Point,
    /// End point.
    pub end: Point,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Line {
    /// Create a new line.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            meta: ShapeMeta::new(),
            start,
            end,
            style: ShapeStyle::default(),
        }
    }

    pub(crate) fn reconstruct(meta: ShapeMeta, start: Point, end: Point, style: ShapeStyle) -> Self {
        Self {
            meta,
            start,
            end,
            style,
        }
    }

    /// Both endpoints, in order.
    pub fn points(&self) -> [Point; 2] {
        [self.start, self.end]
    }

    /// Get the length of the line.
    pub fn length(&self) -> f64 {
        (self.end - self.start).hypot()
    }
}

impl ShapeTrait for Line {
    fn meta(&self) -> &ShapeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ShapeMeta {
        &mut self.meta
    }

    fn bounds(&self) -> Option<Rect> {
        padded_points_bounds(&self.points())
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        polyline_hit(&self.points(), point, tolerance)
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        path.line_to(self.end);
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn translate(&mut self, delta: Vec2) {
        self.start += delta;
        self.end += delta;
    }
}
