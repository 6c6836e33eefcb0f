//! Session configuration.

use crate::geometry::ERASER_SIZE;
use crate::shapes::{ShapeStyle, Text};
use serde::{Deserialize, Serialize};

/// Default number of history snapshots kept per session.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Tunables for interaction and history. Every field has a default, so a
/// partial JSON document is enough to override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Eraser diameter in board units.
    pub eraser_size: f64,
    /// Font size used when the stroke width gives none.
    pub default_font_size: f64,
    /// Smallest font size for new text.
    pub min_font_size: f64,
    /// New text gets `stroke_width * font_size_per_stroke`, at least `min_font_size`.
    pub font_size_per_stroke: f64,
    /// Width of newly placed images.
    pub image_width: f64,
    /// Height of newly placed images.
    pub image_height: f64,
    /// Oldest snapshots are dropped beyond this count.
    pub max_history: usize,
    /// Style applied to new shapes.
    pub default_style: ShapeStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eraser_size: ERASER_SIZE,
            default_font_size: Text::DEFAULT_FONT_SIZE,
            min_font_size: 16.0,
            font_size_per_stroke: 5.0,
            image_width: 300.0,
            image_height: 200.0,
            max_history: DEFAULT_MAX_HISTORY,
            default_style: ShapeStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Font size for text committed with the given stroke width.
    pub fn font_size_for(&self, stroke_width: f64) -> f64 {
        if !stroke_width.is_finite() || stroke_width <= 0.0 {
            return self.default_font_size;
        }
        (stroke_width * self.font_size_per_stroke).max(self.min_font_size)
    }
}
