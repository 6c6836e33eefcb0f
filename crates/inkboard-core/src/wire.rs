//! Conversion between shapes and the collaborator's JSON stroke records.
//!
//! A record looks like
//! `{"id", "type", "created_at", "pending"?, "data": {geometry..., "color", "fillColor", "lineWidth"}}`.

use crate::board::{Board, BoardSnapshot};
use crate::shapes::{
    Arrow, Circle, Freehand, Image, Line, Rectangle, SerializableColor, Shape, ShapeId, ShapeKind,
    ShapeMeta, ShapeStyle, Text,
};
use kurbo::Point;
use serde_json::{Map, Value, json};
use thiserror::Error;

// Shape type identifiers
const TYPE_PATH: &str = "path";
const TYPE_LINE: &str = "line";
const TYPE_RECTANGLE: &str = "rectangle";
const TYPE_CIRCLE: &str = "circle";
const TYPE_ARROW: &str = "arrow";
const TYPE_TEXT: &str = "text";
const TYPE_IMAGE: &str = "image";

// Record keys
const KEY_ID: &str = "id";
const KEY_TYPE: &str = "type";
const KEY_DATA: &str = "data";
const KEY_CREATED_AT: &str = "created_at";
const KEY_PENDING: &str = "pending";

// Style keys
const KEY_COLOR: &str = "color";
const KEY_FILL_COLOR: &str = "fillColor";
const KEY_LINE_WIDTH: &str = "lineWidth";
const KEY_LEGACY_WIDTH: &str = "width";

// Geometry keys
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";
const KEY_RADIUS: &str = "radius";
const KEY_POINTS: &str = "points";
const KEY_X1: &str = "x1";
const KEY_Y1: &str = "y1";
const KEY_X2: &str = "x2";
const KEY_Y2: &str = "y2";
const KEY_CONTENT: &str = "content";
const KEY_LEGACY_TEXT: &str = "text";
const KEY_FONT_SIZE: &str = "fontSize";
const KEY_URL: &str = "url";

// Snapshot keys
const KEY_BOARD: &str = "board";
const KEY_SHAPES: &str = "shapes";

/// Serialization errors (`MalformedShapeError`).
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("malformed {kind} record: {reason}")]
    Malformed { kind: String, reason: String },
    #[error("unknown shape type: {0}")]
    UnknownKind(String),
    #[error("non-finite value for {field} in {kind} record")]
    NonFinite { kind: String, field: String },
}

/// Result type for wire conversion.
pub type ShapeResult<T> = Result<T, ShapeError>;

fn malformed(kind: &str, reason: impl Into<String>) -> ShapeError {
    ShapeError::Malformed {
        kind: kind.to_string(),
        reason: reason.into(),
    }
}

// Helper functions to extract values from a JSON object
fn get_f64(map: &Map<String, Value>, key: &str, kind: &str) -> ShapeResult<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(ShapeError::NonFinite {
                kind: kind.to_string(),
                field: key.to_string(),
            }),
        },
        // numeric strings show up in records written by loosely typed clients
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            Ok(_) => Err(ShapeError::NonFinite {
                kind: kind.to_string(),
                field: key.to_string(),
            }),
            Err(_) => Err(malformed(kind, format!("{key} is not a number"))),
        },
        Some(_) => Err(malformed(kind, format!("{key} is not a number"))),
    }
}

fn require_f64(map: &Map<String, Value>, key: &str, kind: &str) -> ShapeResult<f64> {
    get_f64(map, key, kind)?.ok_or_else(|| malformed(kind, format!("missing {key}")))
}

fn get_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn get_point(value: &Value, kind: &str) -> ShapeResult<Point> {
    let map = value
        .as_object()
        .ok_or_else(|| malformed(kind, "point is not an object"))?;
    Ok(Point::new(
        require_f64(map, KEY_X, kind)?,
        require_f64(map, KEY_Y, kind)?,
    ))
}

fn get_points(map: &Map<String, Value>, kind: &str) -> ShapeResult<Option<Vec<Point>>> {
    match map.get(KEY_POINTS) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|p| get_point(p, kind))
            .collect::<ShapeResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(malformed(kind, "points is not an array")),
    }
}

fn point_to_wire(p: Point) -> Value {
    let mut map = Map::new();
    map.insert(KEY_X.into(), json!(p.x));
    map.insert(KEY_Y.into(), json!(p.y));
    Value::Object(map)
}

/// `"transparent"`, `"none"`, an empty string or `null` mean no color.
fn parse_optional_color(value: Option<&Value>, kind: &str) -> ShapeResult<Option<SerializableColor>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("transparent") || s.eq_ignore_ascii_case("none") {
                return Ok(None);
            }
            SerializableColor::from_hex(s)
                .map(Some)
                .ok_or_else(|| malformed(kind, format!("invalid color {s}")))
        }
        Some(_) => Err(malformed(kind, "color is not a string")),
    }
}

fn style_to_wire(style: &ShapeStyle, data: &mut Map<String, Value>) {
    data.insert(KEY_COLOR.into(), Value::String(style.stroke_color.to_hex()));
    data.insert(
        KEY_FILL_COLOR.into(),
        match style.fill_color {
            Some(c) => Value::String(c.to_hex()),
            None => Value::String("transparent".into()),
        },
    );
    data.insert(KEY_LINE_WIDTH.into(), json!(style.stroke_width));
}

fn style_from_wire(data: &Map<String, Value>, kind: ShapeKind) -> ShapeResult<ShapeStyle> {
    let tag = kind.as_str();
    let defaults = ShapeStyle::default();
    let stroke_color = parse_optional_color(data.get(KEY_COLOR), tag)?.unwrap_or(defaults.stroke_color);
    let fill_color = parse_optional_color(data.get(KEY_FILL_COLOR), tag)?;
    let mut stroke_width = get_f64(data, KEY_LINE_WIDTH, tag)?;
    // path-like strokes used to carry their pen width as `width`
    if stroke_width.is_none() && kind.is_path_like() {
        stroke_width = get_f64(data, KEY_LEGACY_WIDTH, tag)?;
    }
    Ok(ShapeStyle {
        stroke_color,
        stroke_width: stroke_width.unwrap_or(defaults.stroke_width).max(0.0),
        fill_color,
    })
}

/// Geometry and style as the `data` object of a record.
pub fn shape_data_to_wire(shape: &Shape) -> Value {
    let mut data = Map::new();
    match shape {
        Shape::Freehand(s) => {
            data.insert(
                KEY_POINTS.into(),
                Value::Array(s.points.iter().copied().map(point_to_wire).collect()),
            );
        }
        Shape::Line(s) => {
            data.insert(
                KEY_POINTS.into(),
                Value::Array(s.points().into_iter().map(point_to_wire).collect()),
            );
        }
        Shape::Arrow(s) => {
            data.insert(
                KEY_POINTS.into(),
                Value::Array(s.points().into_iter().map(point_to_wire).collect()),
            );
        }
        Shape::Rectangle(s) => {
            data.insert(KEY_X.into(), json!(s.position.x));
            data.insert(KEY_Y.into(), json!(s.position.y));
            data.insert(KEY_WIDTH.into(), json!(s.width));
            data.insert(KEY_HEIGHT.into(), json!(s.height));
        }
        Shape::Circle(s) => {
            data.insert(KEY_X.into(), json!(s.center.x));
            data.insert(KEY_Y.into(), json!(s.center.y));
            data.insert(KEY_RADIUS.into(), json!(s.radius));
        }
        Shape::Text(s) => {
            data.insert(KEY_X.into(), json!(s.position.x));
            data.insert(KEY_Y.into(), json!(s.position.y));
            data.insert(KEY_CONTENT.into(), Value::String(s.content.clone()));
            data.insert(KEY_FONT_SIZE.into(), json!(s.font_size));
        }
        Shape::Image(s) => {
            data.insert(KEY_X.into(), json!(s.position.x));
            data.insert(KEY_Y.into(), json!(s.position.y));
            data.insert(KEY_WIDTH.into(), json!(s.width));
            data.insert(KEY_HEIGHT.into(), json!(s.height));
            data.insert(KEY_URL.into(), Value::String(s.source.clone()));
        }
    }
    style_to_wire(shape.style(), &mut data);
    Value::Object(data)
}

/// Convert a Shape to a full stroke record.
pub fn shape_to_wire(shape: &Shape) -> Value {
    let mut record = Map::new();
    record.insert(KEY_ID.into(), Value::String(shape.id().to_string()));
    record.insert(KEY_TYPE.into(), Value::String(shape.kind().as_str().into()));
    record.insert(KEY_CREATED_AT.into(), json!(shape.created_at()));
    if shape.is_pending() {
        record.insert(KEY_PENDING.into(), Value::Bool(true));
    }
    record.insert(KEY_DATA.into(), shape_data_to_wire(shape));
    Value::Object(record)
}

/// Convert a stroke record to a Shape, rejecting records that lack required geometry.
pub fn shape_from_wire(value: &Value) -> ShapeResult<Shape> {
    let record = value
        .as_object()
        .ok_or_else(|| malformed("stroke", "record is not an object"))?;
    let shape_type =
        get_string(record, KEY_TYPE).ok_or_else(|| malformed("stroke", "missing type"))?;
    let id = match record.get(KEY_ID) {
        Some(Value::String(s)) if !s.is_empty() => ShapeId::new(s.clone()),
        // numeric ids come from relational backends
        Some(Value::Number(n)) => ShapeId::new(n.to_string()),
        _ => return Err(malformed(&shape_type, "missing id")),
    };
    let created_at = match record.get(KEY_CREATED_AT) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
        _ => 0,
    };
    let pending = matches!(record.get(KEY_PENDING), Some(Value::Bool(true)));
    if id.is_temporary() && !pending {
        return Err(malformed(
            &shape_type,
            format!("committed record uses reserved id {id}"),
        ));
    }
    let data = record
        .get(KEY_DATA)
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(&shape_type, "missing data"))?;

    let meta = ShapeMeta::reconstruct(id, created_at, pending);
    shape_body_from_wire(&shape_type, data, meta)
}

fn shape_body_from_wire(
    shape_type: &str,
    data: &Map<String, Value>,
    meta: ShapeMeta,
) -> ShapeResult<Shape> {
    match shape_type {
        TYPE_PATH => freehand_from_wire(data, meta),
        TYPE_LINE => line_from_wire(data, meta),
        TYPE_RECTANGLE => rectangle_from_wire(data, meta),
        TYPE_CIRCLE => circle_from_wire(data, meta),
        TYPE_ARROW => arrow_from_wire(data, meta),
        TYPE_TEXT => text_from_wire(data, meta),
        TYPE_IMAGE => image_from_wire(data, meta),
        other => Err(ShapeError::UnknownKind(other.to_string())),
    }
}

fn freehand_from_wire(data: &Map<String, Value>, meta: ShapeMeta) -> ShapeResult<Shape> {
    let points = get_points(data, TYPE_PATH)?.ok_or_else(|| malformed(TYPE_PATH, "missing points"))?;
    if points.is_empty() {
        return Err(malformed(TYPE_PATH, "path has no points"));
    }
    let style = style_from_wire(data, ShapeKind::Freehand)?;
    Ok(Shape::Freehand(Freehand::reconstruct(meta, points, style)))
}

fn line_from_wire(data: &Map<String, Value>, meta: ShapeMeta) -> ShapeResult<Shape> {
    let points = get_points(data, TYPE_LINE)?.ok_or_else(|| malformed(TYPE_LINE, "missing points"))?;
    match points.as_slice() {
        [start, end] => {
            let style = style_from_wire(data, ShapeKind::Line)?;
            Ok(Shape::Line(Line::reconstruct(meta, *start, *end, style)))
        }
        [] => Err(malformed(TYPE_LINE, "line has no points")),
        // older clients stored pen strokes as `line`
        _ => {
            let style = style_from_wire(data, ShapeKind::Freehand)?;
            Ok(Shape::Freehand(Freehand::reconstruct(meta, points, style)))
        }
    }
}

fn arrow_from_wire(data: &Map<String, Value>, meta: ShapeMeta) -> ShapeResult<Shape> {
    let (start, end) = match get_points(data, TYPE_ARROW)? {
        Some(points) if points.len() >= 2 => (points[0], points[points.len() - 1]),
        Some(points) if !points.is_empty() => {
            return Err(malformed(TYPE_ARROW, "arrow needs two points"));
        }
        _ => (
            Point::new(
                require_f64(data, KEY_X1, TYPE_ARROW)?,
                require_f64(data, KEY_Y1, TYPE_ARROW)?,
            ),
            Point::new(
                require_f64(data, KEY_X2, TYPE_ARROW)?,
                require_f64(data, KEY_Y2, TYPE_ARROW)?,
            ),
        ),
    };
    let style = style_from_wire(data, ShapeKind::Arrow)?;
    Ok(Shape::Arrow(Arrow::reconstruct(meta, start, end, style)))
}

fn rectangle_from_wire(data: &Map<String, Value>, meta: ShapeMeta) -> ShapeResult<Shape> {
    let x = require_f64(data, KEY_X, TYPE_RECTANGLE)?;
    let y = require_f64(data, KEY_Y, TYPE_RECTANGLE)?;
    let width = require_f64(data, KEY_WIDTH, TYPE_RECTANGLE)?;
    let height = require_f64(data, KEY_HEIGHT, TYPE_RECTANGLE)?;
    let style = style_from_wire(data, ShapeKind::Rectangle)?;
    Ok(Shape::Rectangle(Rectangle::reconstruct(
        meta,
        Point::new(x, y),
        width,
        height,
        style,
    )))
}

fn circle_from_wire(data: &Map<String, Value>, meta: ShapeMeta) -> ShapeResult<Shape> {
    let x = require_f64(data, KEY_X, TYPE_CIRCLE)?;
    let y = require_f64(data, KEY_Y, TYPE_CIRCLE)?;
    let radius = require_f64(data, KEY_RADIUS, TYPE_CIRCLE)?;
    let style = style_from_wire(data, ShapeKind::Circle)?;
    Ok(Shape::Circle(Circle::reconstruct(meta, Point::new(x, y), radius, style)))
}

fn text_from_wire(data: &Map<String, Value>, meta: ShapeMeta) -> ShapeResult<Shape> {
    let x = require_f64(data, KEY_X, TYPE_TEXT)?;
    let y = require_f64(data, KEY_Y, TYPE_TEXT)?;
    let content = get_string(data, KEY_CONTENT)
        .or_else(|| get_string(data, KEY_LEGACY_TEXT))
        .ok_or_else(|| malformed(TYPE_TEXT, "missing content"))?;
    let font_size = get_f64(data, KEY_FONT_SIZE, TYPE_TEXT)?.unwrap_or(Text::DEFAULT_FONT_SIZE);
    let style = style_from_wire(data, ShapeKind::Text)?;
    Ok(Shape::Text(Text::reconstruct(
        meta,
        Point::new(x, y),
        content,
        font_size,
        style,
    )))
}

fn image_from_wire(data: &Map<String, Value>, meta: ShapeMeta) -> ShapeResult<Shape> {
    let x = require_f64(data, KEY_X, TYPE_IMAGE)?;
    let y = require_f64(data, KEY_Y, TYPE_IMAGE)?;
    let width = require_f64(data, KEY_WIDTH, TYPE_IMAGE)?;
    let height = require_f64(data, KEY_HEIGHT, TYPE_IMAGE)?;
    let source = get_string(data, KEY_URL).ok_or_else(|| malformed(TYPE_IMAGE, "missing url"))?;
    let style = style_from_wire(data, ShapeKind::Image)?;
    Ok(Shape::Image(Image::reconstruct(
        meta,
        Point::new(x, y),
        width,
        height,
        source,
        style,
    )))
}

/// Decode every record, logging and skipping malformed ones.
pub fn shapes_from_wire(records: &[Value]) -> Vec<Shape> {
    records
        .iter()
        .filter_map(|record| match shape_from_wire(record) {
            Ok(shape) => Some(shape),
            Err(e) => {
                log::warn!("Skipping malformed stroke record: {}", e);
                None
            }
        })
        .collect()
}

/// Encode a board and its shapes as `{"board": {...}, "shapes": [...]}`.
pub fn snapshot_to_wire(snapshot: &BoardSnapshot) -> Value {
    let mut map = Map::new();
    map.insert(KEY_BOARD.into(), snapshot.board.to_wire());
    map.insert(
        KEY_SHAPES.into(),
        Value::Array(snapshot.shapes.iter().map(shape_to_wire).collect()),
    );
    Value::Object(map)
}

/// Decode a snapshot. The board header must be valid; malformed shapes are skipped.
pub fn snapshot_from_wire(value: &Value) -> ShapeResult<BoardSnapshot> {
    let board_value = value
        .get(KEY_BOARD)
        .ok_or_else(|| malformed("snapshot", "missing board"))?;
    let board: Board = serde_json::from_value(board_value.clone())
        .map_err(|e| malformed("snapshot", e.to_string()))?;
    let shapes = match value.get(KEY_SHAPES) {
        Some(Value::Array(records)) => shapes_from_wire(records),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => return Err(malformed("snapshot", "shapes is not an array")),
    };
    Ok(BoardSnapshot { board, shapes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    fn sample_shapes() -> Vec<Shape> {
        let mut rect = Rectangle::new(Point::new(10.0, 20.0), 30.0, 40.0);
        rect.style.fill_color = Some(SerializableColor::new(255, 0, 0, 255));
        rect.style.stroke_width = 4.0;
        let mut pending = Shape::Circle(Circle::new(Point::new(1.0, 2.0), 3.0));
        pending.set_pending(true);
        let shapes = vec![
            Shape::Freehand(Freehand::from_points(vec![
                Point::new(0.0, 0.0),
                Point::new(1.5, 2.5),
                Point::new(3.0, 1.0),
            ])),
            Shape::Line(Line::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0))),
            Shape::Rectangle(rect),
            pending,
            Shape::Arrow(Arrow::new(Point::new(-1.0, -1.0), Point::new(9.0, 9.0))),
            Shape::Text(Text::new(Point::new(4.0, 40.0), "hello".into(), 24.0)),
            Shape::Image(Image::new(Point::new(0.0, 0.0), 300.0, 200.0, "https://img/x.png".into())),
        ];
        shapes
            .into_iter()
            .enumerate()
            .map(|(i, mut shape)| {
                if !shape.is_pending() {
                    shape.set_id(ShapeId::new(format!("s{i}")));
                }
                shape
            })
            .collect()
    }

    #[test]
    fn test_every_kind_survives_the_wire() {
        for shape in sample_shapes() {
            let decoded = shape_from_wire(&shape_to_wire(&shape)).unwrap();
            assert_eq!(decoded, shape, "{}", shape.kind());
            assert_eq!(decoded.is_pending(), shape.is_pending());
            assert_eq!(decoded.style(), shape.style());
        }
    }

    #[test]
    fn test_missing_geometry_is_rejected() {
        let record = json!({"id": "a1", "type": "rectangle", "data": {"x": 1, "y": 2, "width": 3}});
        assert!(matches!(
            shape_from_wire(&record),
            Err(ShapeError::Malformed { .. })
        ));
        let record = json!({"id": "a1", "type": "circle", "data": {"x": 1, "y": 2}});
        assert!(shape_from_wire(&record).is_err());
        let record = json!({"id": "a1", "type": "text", "data": {"x": 1, "y": 2}});
        assert!(shape_from_wire(&record).is_err());
        let record = json!({"id": "a1", "type": "path", "data": {"points": []}});
        assert!(shape_from_wire(&record).is_err());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let record = json!({"id": "a1", "type": "hexagon", "data": {}});
        assert_eq!(
            shape_from_wire(&record),
            Err(ShapeError::UnknownKind("hexagon".into()))
        );
    }

    #[test]
    fn test_reserved_id_needs_pending_flag() {
        let record = json!({"id": "temp_abc", "type": "circle", "data": {"x": 0, "y": 0, "radius": 1}});
        assert!(shape_from_wire(&record).is_err());
    }

    #[test]
    fn test_legacy_arrow_coordinates() {
        let record = json!({
            "id": "7", "type": "arrow",
            "data": {"x1": 0, "y1": 0, "x2": 10, "y2": 5, "color": "#333", "width": 3}
        });
        let Shape::Arrow(arrow) = shape_from_wire(&record).unwrap() else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.end, Point::new(10.0, 5.0));
        assert!((arrow.style.stroke_width - 3.0).abs() < f64::EPSILON);
        assert_eq!(arrow.style.stroke_color, SerializableColor::new(51, 51, 51, 255));
    }

    #[test]
    fn test_legacy_pen_line_becomes_path() {
        let record = json!({
            "id": 12, "type": "line",
            "data": {"points": [{"x": 0, "y": 0}, {"x": 1, "y": 1}, {"x": 2, "y": 0}], "color": "#000", "width": 2}
        });
        let shape = shape_from_wire(&record).unwrap();
        assert_eq!(shape.kind(), ShapeKind::Freehand);
        assert_eq!(shape.id().as_str(), "12");
    }

    #[test]
    fn test_transparent_fill_is_none() {
        let record = json!({
            "id": "r", "type": "rectangle",
            "data": {"x": 0, "y": 0, "width": 1, "height": 1, "fillColor": "transparent"}
        });
        assert!(shape_from_wire(&record).unwrap().style().fill_color.is_none());
    }

    #[test]
    fn test_non_finite_string_is_rejected() {
        let record = json!({"id": "c", "type": "circle", "data": {"x": "NaN", "y": 0, "radius": 1}});
        assert!(matches!(
            shape_from_wire(&record),
            Err(ShapeError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_snapshot_skips_malformed_records() {
        let mut line = Shape::Line(Line::new(Point::ZERO, Point::new(1.0, 1.0)));
        line.set_id(ShapeId::new("l1"));
        line.translate(Vec2::new(1.0, 1.0));
        let value = json!({
            "board": {"id": "b1", "title": "Plans", "owner": "ana", "join_code": "ABC123"},
            "shapes": [shape_to_wire(&line), {"id": "x", "type": "rectangle", "data": {}}],
        });
        let snapshot = snapshot_from_wire(&value).unwrap();
        assert_eq!(snapshot.board.title, "Plans");
        assert_eq!(snapshot.shapes, vec![line]);
    }
}
