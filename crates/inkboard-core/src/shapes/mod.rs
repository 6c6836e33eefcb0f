//! Shape definitions for the board.

mod arrow;
mod circle;
mod freehand;
mod image;
mod line;
mod rectangle;
mod text;

pub use arrow::Arrow;
pub use circle::Circle;
pub use freehand::Freehand;
pub use image::Image;
pub use line::Line;
pub use rectangle::Rectangle;
pub use text::Text;

use kurbo::{BezPath, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Prefix reserved for locally generated ids.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Serializable color representation (RGBA8), stored on the wire as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = channel(0..1)? * 17;
                let g = channel(1..2)? * 17;
                let b = channel(2..3)? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke color (also the glyph color for text).
    pub stroke_color: SerializableColor,
    /// Stroke width.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    #[serde(default)]
    pub fill_color: Option<SerializableColor>,
}

impl ShapeStyle {
    /// Get the stroke color as a peniko Color.
    pub fn stroke(&self) -> Color {
        self.stroke_color.into()
    }

    /// Get the fill color as a peniko Color.
    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(|c| c.into())
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 2.0,
            fill_color: None,
        }
    }
}

/// Unique identifier for shapes.
///
/// Ids issued by the collaborator are opaque strings. Ids minted locally before
/// the collaborator has acknowledged a create carry [`TEMP_ID_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh temporary id.
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ShapeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Identity and bookkeeping shared by every shape kind.
///
/// Equality deliberately ignores `pending`: two shapes that differ only in
/// acknowledgment state have the same content.
#[derive(Debug, Clone)]
pub struct ShapeMeta {
    pub(crate) id: ShapeId,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// True while the collaborator has not yet acknowledged the create.
    pub pending: bool,
}

impl ShapeMeta {
    pub(crate) fn new() -> Self {
        Self {
            id: ShapeId::temporary(),
            created_at: now_millis(),
            pending: false,
        }
    }

    pub(crate) fn reconstruct(id: ShapeId, created_at: u64, pending: bool) -> Self {
        Self {
            id,
            created_at,
            pending,
        }
    }

    pub fn id(&self) -> &ShapeId {
        &self.id
    }
}

impl PartialEq for ShapeMeta {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.created_at == other.created_at
    }
}

/// The closed set of shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Freehand,
    Line,
    Rectangle,
    Circle,
    Arrow,
    Text,
    Image,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Freehand,
        ShapeKind::Line,
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::Arrow,
        ShapeKind::Text,
        ShapeKind::Image,
    ];

    /// Wire tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Freehand => "path",
            ShapeKind::Line => "line",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Arrow => "arrow",
            ShapeKind::Text => "text",
            ShapeKind::Image => "image",
        }
    }

    /// Path-like kinds are hit-tested by segment distance rather than box containment.
    pub fn is_path_like(self) -> bool {
        matches!(self, ShapeKind::Freehand | ShapeKind::Line | ShapeKind::Arrow)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Identity and bookkeeping.
    fn meta(&self) -> &ShapeMeta;

    /// Mutable identity and bookkeeping.
    fn meta_mut(&mut self) -> &mut ShapeMeta;

    /// Get the unique identifier.
    fn id(&self) -> &ShapeId {
        &self.meta().id
    }

    /// Hit-testing box in board coordinates, or `None` for empty geometry.
    fn bounds(&self) -> Option<Rect>;

    /// Check if a point (in board coordinates) hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Get the path representation for rendering.
    fn to_path(&self) -> BezPath;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Shift every point and origin by `delta`.
    fn translate(&mut self, delta: Vec2);
}

/// Enum wrapper for all shape types.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Freehand(Freehand),
    Line(Line),
    Rectangle(Rectangle),
    Circle(Circle),
    Arrow(Arrow),
    Text(Text),
    Image(Image),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Freehand(_) => ShapeKind::Freehand,
            Shape::Line(_) => ShapeKind::Line,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Arrow(_) => ShapeKind::Arrow,
            Shape::Text(_) => ShapeKind::Text,
            Shape::Image(_) => ShapeKind::Image,
        }
    }

    pub fn meta(&self) -> &ShapeMeta {
        match self {
            Shape::Freehand(s) => s.meta(),
            Shape::Line(s) => s.meta(),
            Shape::Rectangle(s) => s.meta(),
            Shape::Circle(s) => s.meta(),
            Shape::Arrow(s) => s.meta(),
            Shape::Text(s) => s.meta(),
            Shape::Image(s) => s.meta(),
        }
    }

    pub fn meta_mut(&mut self) -> &mut ShapeMeta {
        match self {
            Shape::Freehand(s) => s.meta_mut(),
            Shape::Line(s) => s.meta_mut(),
            Shape::Rectangle(s) => s.meta_mut(),
            Shape::Circle(s) => s.meta_mut(),
            Shape::Arrow(s) => s.meta_mut(),
            Shape::Text(s) => s.meta_mut(),
            Shape::Image(s) => s.meta_mut(),
        }
    }

    pub fn id(&self) -> &ShapeId {
        &self.meta().id
    }

    pub fn is_pending(&self) -> bool {
        self.meta().pending
    }

    pub fn created_at(&self) -> u64 {
        self.meta().created_at
    }

    /// Replace the id, keeping everything else.
    pub fn set_id(&mut self, id: ShapeId) {
        self.meta_mut().id = id;
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.meta_mut().pending = pending;
    }

    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Shape::Freehand(s) => s.bounds(),
            Shape::Line(s) => s.bounds(),
            Shape::Rectangle(s) => s.bounds(),
            Shape::Circle(s) => s.bounds(),
            Shape::Arrow(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
            Shape::Image(s) => s.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Shape::Freehand(s) => s.hit_test(point, tolerance),
            Shape::Line(s) => s.hit_test(point, tolerance),
            Shape::Rectangle(s) => s.hit_test(point, tolerance),
            Shape::Circle(s) => s.hit_test(point, tolerance),
            Shape::Arrow(s) => s.hit_test(point, tolerance),
            Shape::Text(s) => s.hit_test(point, tolerance),
            Shape::Image(s) => s.hit_test(point, tolerance),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Freehand(s) => s.to_path(),
            Shape::Line(s) => s.to_path(),
            Shape::Rectangle(s) => s.to_path(),
            Shape::Circle(s) => s.to_path(),
            Shape::Arrow(s) => s.to_path(),
            Shape::Text(s) => s.to_path(),
            Shape::Image(s) => s.to_path(),
        }
    }

    pub fn style(&self) -> &ShapeStyle {
        match self {
            Shape::Freehand(s) => s.style(),
            Shape::Line(s) => s.style(),
            Shape::Rectangle(s) => s.style(),
            Shape::Circle(s) => s.style(),
            Shape::Arrow(s) => s.style(),
            Shape::Text(s) => s.style(),
            Shape::Image(s) => s.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        match self {
            Shape::Freehand(s) => s.style_mut(),
            Shape::Line(s) => s.style_mut(),
            Shape::Rectangle(s) => s.style_mut(),
            Shape::Circle(s) => s.style_mut(),
            Shape::Arrow(s) => s.style_mut(),
            Shape::Text(s) => s.style_mut(),
            Shape::Image(s) => s.style_mut(),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Freehand(s) => s.translate(delta),
            Shape::Line(s) => s.translate(delta),
            Shape::Rectangle(s) => s.translate(delta),
            Shape::Circle(s) => s.translate(delta),
            Shape::Arrow(s) => s.translate(delta),
            Shape::Text(s) => s.translate(delta),
            Shape::Image(s) => s.translate(delta),
        }
    }

    /// Copy of this shape carrying `other`'s geometry and style, keeping this shape's identity.
    pub fn with_content_of(&self, other: &Shape) -> Shape {
        let mut next = other.clone();
        *next.meta_mut() = self.meta().clone();
        next
    }
}

/// Change applied to an existing shape by an update.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapePatch {
    /// Move the shape by a delta.
    Translate(Vec2),
    /// Replace the style.
    Restyle(ShapeStyle),
    /// Replace kind, geometry and style; identity and creation time are kept.
    Replace(Shape),
}

impl ShapePatch {
    /// Resolve the patch against `target` into absolute content.
    pub fn apply(&self, target: &Shape) -> Shape {
        match self {
            ShapePatch::Translate(delta) => {
                let mut next = target.clone();
                next.translate(*delta);
                next
            }
            ShapePatch::Restyle(style) => {
                let mut next = target.clone();
                *next.style_mut() = style.clone();
                next
            }
            ShapePatch::Replace(shape) => target.with_content_of(shape),
        }
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline. A single point counts as a zero-length segment.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (point - *only).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}
