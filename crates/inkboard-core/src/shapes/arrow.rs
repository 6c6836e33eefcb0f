//! Arrow shape.

use super::{ShapeMeta, ShapeStyle, ShapeTrait};
use crate::geometry::{padded_points_bounds, polyline_hit};
use kurbo::{BezPath, Point, Rect, Vec2};

/// An arrow shape (line with arrowhead at `end`).
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub(crate) meta: ShapeMeta,
    /// Start point.
    pub start: Point,
    /// End point (where the arrowhead points).
    pub end: Point,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Arrow {
    /// Length of the arrowhead along the shaft.
    pub const HEAD_LENGTH: f64 = 15.0;
    /// Full width of the arrowhead base.
    pub const HEAD_WIDTH: f64 = 10.0;

    /// Create a new arrow.
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

    /// Get the direction vector (normalized).
    pub fn direction(&self) -> Vec2 {
        let v = self.end - self.start;
        let len = v.hypot();
        if len < f64::EPSILON {
            Vec2::new(1.0, 0.0)
        } else {
            v / len
        }
    }

    /// Closed triangle for the arrowhead, tip at `end`.
    pub fn head_path(&self) -> BezPath {
        let dir = self.direction();
        let perp = Vec2::new(-dir.y, dir.x);
        let base = self.end - dir * Self::HEAD_LENGTH;
        let half = Self::HEAD_WIDTH / 2.0;

        let mut path = BezPath::new();
        path.move_to(self.end);
        path.line_to(base + perp * half);
        path.line_to(base - perp * half);
        path.close_path();
        path
    }
}

impl ShapeTrait for Arrow {
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

    /// Shaft only; the head is drawn from [`Arrow::head_path`].
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_direction() {
        let arrow = Arrow::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let dir = arrow.direction();
        assert!((dir.x - 1.0).abs() < f64::EPSILON);
        assert!(dir.y.abs() < f64::EPSILON);
    }

    #[test]
    fn test_head_tip_at_end() {
        let arrow = Arrow::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let head = arrow.head_path();
        let bbox = kurbo::Shape::bounding_box(&head);
        assert!((bbox.x1 - 100.0).abs() < 1e-9);
        assert!((bbox.x0 - 85.0).abs() < 1e-9);
        assert!((bbox.height() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_arrow_has_head() {
        let arrow = Arrow::new(Point::new(5.0, 5.0), Point::new(5.0, 5.0));
        assert!(!arrow.head_path().elements().is_empty());
        assert!(arrow.hit_test(Point::new(5.0, 5.0), 1.0));
    }
}
