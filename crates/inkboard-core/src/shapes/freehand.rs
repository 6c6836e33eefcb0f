//! Freehand pen stroke.

use super::{ShapeMeta, ShapeStyle, ShapeTrait};
use crate::geometry::{padded_points_bounds, polyline_hit};
use kurbo::{BezPath, Point, Rect, Vec2};

/// A freehand drawing (series of points).
#[derive(Debug, Clone, PartialEq)]
pub struct Freehand {
    pub(crate) meta: ShapeMeta,
    /// Points in the freehand path.
    pub points: Vec<Point>,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Freehand {
    /// Create a new empty freehand shape.
    pub fn new() -> Self {
        Self::from_points(Vec::new())
    }

    /// Create from existing points.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            meta: ShapeMeta::new(),
            points,
            style: ShapeStyle::default(),
        }
    }

    pub(crate) fn reconstruct(meta: ShapeMeta, points: Vec<Point>, style: ShapeStyle) -> Self {
        Self {
            meta,
            points,
            style,
        }
    }

    /// Add a point to the path.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for Freehand {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeTrait for Freehand {
    fn meta(&self) -> &ShapeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ShapeMeta {
        &mut self.meta
    }

    fn bounds(&self) -> Option<Rect> {
        padded_points_bounds(&self.points)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        polyline_hit(&self.points, point, tolerance)
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut points = self.points.iter();
        if let Some(first) = points.next() {
            path.move_to(*first);
            for p in points {
                path.line_to(*p);
            }
        }
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freehand_creation() {
        let mut freehand = Freehand::new();
        assert!(freehand.is_empty());

        freehand.add_point(Point::new(0.0, 0.0));
        freehand.add_point(Point::new(10.0, 10.0));
        assert_eq!(freehand.len(), 2);
    }

    #[test]
    fn test_bounds() {
        let freehand = Freehand::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 100.0),
        ]);
        let bounds = freehand.bounds().unwrap();
        assert!((bounds.x0 + 3.0).abs() < f64::EPSILON);
        assert!((bounds.y0 + 3.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 103.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 103.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_point_is_hittable() {
        let dot = Freehand::from_points(vec![Point::new(5.0, 5.0)]);
        assert!(dot.hit_test(Point::new(8.0, 9.0), 10.0));
        assert!(!dot.hit_test(Point::new(20.0, 5.0), 10.0));
    }

    #[test]
    fn test_translate_moves_every_point() {
        let mut freehand = Freehand::from_points(vec![Point::new(0.0, 0.0), Point::new(1.0, 2.0)]);
        freehand.translate(Vec2::new(10.0, -1.0));
        assert_eq!(freehand.points, vec![Point::new(10.0, -1.0), Point::new(11.0, 1.0)]);
    }

    #[test]
    fn test_path_follows_points() {
        let freehand = Freehand::from_points(vec![Point::new(0.0, 0.0), Point::new(1.0, 2.0)]);
        assert_eq!(freehand.to_path().elements().len(), 2);
        assert!(Freehand::new().to_path().elements().is_empty());
    }
}
