//! Bounds, hit testing and translation for every shape kind.
//!
//! All functions here are pure and deterministic. The per-kind rules live on the
//! shape structs themselves; this module holds the shared constants, helpers and
//! the shape-set queries used by selection and erasing.

use crate::shapes::{Shape, point_to_polyline_dist};
use kurbo::{Point, Rect, Vec2};

/// Smallest width/height of any hit-testing box, so degenerate shapes stay selectable.
pub const MIN_FOOTPRINT: f64 = 6.0;
/// Padding added around the tight box of a point sequence.
pub const PATH_PADDING: f64 = 3.0;
/// Padding added around the approximate text box.
pub const TEXT_PADDING: f64 = 4.0;
/// Empirical average glyph width as a fraction of the font size.
pub const GLYPH_WIDTH_FACTOR: f64 = 0.6;
/// Default eraser diameter.
pub const ERASER_SIZE: f64 = 20.0;

/// `boundsOf`: the hit-testing box of a shape, `None` for empty geometry.
pub fn bounds_of(shape: &Shape) -> Option<Rect> {
    shape.bounds()
}

/// `hitTest` with the default eraser radius.
pub fn hit_test(point: Point, shape: &Shape) -> bool {
    hit_test_with_radius(point, shape, ERASER_SIZE / 2.0)
}

/// Box-like kinds test containment in their bounds; path-like kinds test
/// segment distance against `radius`.
pub fn hit_test_with_radius(point: Point, shape: &Shape, radius: f64) -> bool {
    shape.hit_test(point, radius)
}

/// Return a copy of `shape` moved by `(dx, dy)`.
pub fn translate(shape: &Shape, dx: f64, dy: f64) -> Shape {
    let mut moved = shape.clone();
    moved.translate(Vec2::new(dx, dy));
    moved
}

/// Grow a box to at least [`MIN_FOOTPRINT`] in each dimension, keeping its origin.
pub fn floor_footprint(rect: Rect) -> Rect {
    let rect = rect.abs();
    Rect::from_origin_size(
        rect.origin(),
        (rect.width().max(MIN_FOOTPRINT), rect.height().max(MIN_FOOTPRINT)),
    )
}

/// Tight box of `points` padded by [`PATH_PADDING`] and floored; `None` when empty.
pub fn padded_points_bounds(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let tight = points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p));
    Some(floor_footprint(tight.inflate(PATH_PADDING, PATH_PADDING)))
}

/// Closed-interval containment (kurbo's `Rect::contains` excludes the far edges).
pub fn contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Path hit test: cheap box pre-filter (box grown by `radius`) then segment distance.
pub(crate) fn polyline_hit(points: &[Point], point: Point, radius: f64) -> bool {
    match padded_points_bounds(points) {
        Some(bounds) if contains_inclusive(bounds.inflate(radius, radius), point) => {
            point_to_polyline_dist(point, points) <= radius
        }
        _ => false,
    }
}

/// Index of the topmost shape under `point`, scanning in reverse z-order.
pub fn topmost_hit(point: Point, shapes: &[Shape], radius: f64) -> Option<usize> {
    shapes
        .iter()
        .enumerate()
        .rev()
        .find(|(_, shape)| shape.hit_test(point, radius))
        .map(|(index, _)| index)
}

/// Indices of every shape touched by an eraser of diameter `eraser_size` at `point`,
/// highest index first so they can be removed in order.
pub fn eraser_hits(point: Point, shapes: &[Shape], eraser_size: f64) -> Vec<usize> {
    shapes
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, shape)| {
            shape.bounds().is_some_and(|b| {
                contains_inclusive(b.inflate(eraser_size, eraser_size), point)
            })
        })
        .filter(|(_, shape)| shape.hit_test(point, eraser_size / 2.0))
        .map(|(index, _)| index)
        .collect()
}
