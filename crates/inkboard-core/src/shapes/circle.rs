//! Circle shape.

use super::{ShapeMeta, ShapeStyle, ShapeTrait};
use crate::geometry::{MIN_FOOTPRINT, contains_inclusive};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};

/// A circle given by center and radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub(crate) meta: ShapeMeta,
    /// Center point.
    pub center: Point,
    /// Radius, never negative.
    pub radius: f64,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Circle {
    /// Create a new circle. A negative radius is clamped to zero.
    pub fn new(center: Point, radius: f64) -> Self {
        Self::reconstruct(ShapeMeta::new(), center, radius, ShapeStyle::default())
    }

    pub(crate) fn reconstruct(meta: ShapeMeta, center: Point, radius: f64, style: ShapeStyle) -> Self {
        Self {
            meta,
            center,
            radius: radius.max(0.0),
            style,
        }
    }

    /// Circle centered on `anchor` reaching `edge`.
    pub fn from_anchor(anchor: Point, edge: Point) -> Self {
        Self::new(anchor, (edge - anchor).hypot())
    }
}

impl ShapeTrait for Circle {
    fn meta(&self) -> &ShapeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ShapeMeta {
        &mut self.meta
    }

    /// Square centered on the circle, side `max(2r, MIN_FOOTPRINT)`.
    fn bounds(&self) -> Option<Rect> {
        let half = self.radius.max(MIN_FOOTPRINT / 2.0);
        Some(Rect::from_center_size(self.center, (half * 2.0, half * 2.0)))
    }

    fn hit_test(&self, point: Point, _tolerance: f64) -> bool {
        self.bounds().is_some_and(|b| contains_inclusive(b, point))
    }

    fn to_path(&self) -> BezPath {
        kurbo::Circle::new(self.center, self.radius).to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }
}
