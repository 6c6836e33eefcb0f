//! View-level pan offset.
//!
//! Board coordinates are pointer coordinates minus the pan offset. The camera
//! never touches the shape set.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Camera holds the pan translation between screen and board space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
}

impl Camera {
    /// Create a new camera with no pan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a screen point to board coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        screen_point - self.offset
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.offset, Vec2::ZERO);
    }

    #[test]
    fn test_screen_to_world_with_offset() {
        let mut camera = Camera::new();
        camera.offset = Vec2::new(50.0, 100.0);
        let world = camera.screen_to_world(Point::new(100.0, 200.0));
        assert!((world.x - 50.0).abs() < f64::EPSILON);
        assert!((world.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_accumulates() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(10.0, 20.0));
        camera.pan(Vec2::new(-5.0, 0.0));
        assert!((camera.offset.x - 5.0).abs() < f64::EPSILON);
        assert!((camera.offset.y - 20.0).abs() < f64::EPSILON);
        assert_eq!(camera.screen_to_world(Point::new(5.0, 20.0)), Point::ZERO);
    }
}
