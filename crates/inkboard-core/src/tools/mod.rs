//! Tool system: turns pointer input and the selected tool into previews and
//! commit requests.
//!
//! Drawing tools move `Idle → Drawing` on pointer-down and leave through
//! [`ToolOutcome::Committed`] or [`ToolOutcome::Cancelled`] on pointer-up.
//! The preview lives only here; nothing is written to the shape set.

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::geometry::{eraser_hits, topmost_hit};
use crate::shapes::{
    Arrow, Circle, Freehand, Image, Line, Rectangle, Shape, ShapeId, ShapeStyle, Text,
};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Freehand,
    Line,
    Rectangle,
    Circle,
    Arrow,
    Eraser,
    Text,
    Image,
}

/// Value collected from the user outside the drawing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    ImageUrl,
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    /// Tool is idle, waiting for interaction.
    #[default]
    Idle,
    /// A drawing tool is showing a preview.
    Drawing {
        /// Board point of the pointer-down.
        anchor: Point,
        /// Rendering-only shape.
        preview: Shape,
    },
    /// A selected shape is being dragged.
    Dragging {
        id: ShapeId,
        /// Board point of the pointer-down.
        origin: Point,
        /// Transient offset shown by the renderer until release.
        offset: Vec2,
    },
    /// The eraser is pressed.
    Erasing,
    /// The view is being panned; holds the last screen point.
    Panning { last: Point },
    /// Waiting for text or an image URL to be entered.
    AwaitingInput { kind: InputKind, position: Point },
}

/// What a pointer event asks the rest of the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Nothing to do.
    None,
    /// The preview or drag offset changed; redraw.
    Preview,
    /// A finished shape to hand to `create`.
    Committed(Shape),
    /// The interaction ended without a shape.
    Cancelled,
    /// Selection changed to this index (or cleared).
    Selected(Option<usize>),
    /// A drag finished; hand the delta to `update`.
    Moved { id: ShapeId, delta: Vec2 },
    /// Shapes under the eraser, highest index first.
    Erase(Vec<usize>),
    /// The pan offset moved by this screen delta.
    Panned(Vec2),
    /// The host should collect a value and call [`ToolManager::submit_input`].
    InputRequested { kind: InputKind, position: Point },
}

/// Manages the current tool and its state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
    /// Current style to apply to new shapes.
    pub current_style: ShapeStyle,
    /// View pan offset.
    pub camera: Camera,
    /// Id of the selected shape.
    selection: Option<ShapeId>,
    config: EngineConfig,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            current_style: config.default_style.clone(),
            camera: Camera::new(),
            selection: None,
            config,
        }
    }

    /// Set the current tool, abandoning any interaction in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.cancel();
        self.current_tool = tool;
        if tool != ToolKind::Select {
            self.selection = None;
        }
    }

    /// Check if a tool interaction is active.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// Get the preview shape for the current interaction.
    pub fn preview_shape(&self) -> Option<&Shape> {
        match &self.state {
            ToolState::Drawing { preview, .. } => Some(preview),
            _ => None,
        }
    }

    /// Shape id and transient offset of an in-progress drag.
    pub fn drag_offset(&self) -> Option<(&ShapeId, Vec2)> {
        match &self.state {
            ToolState::Dragging { id, offset, .. } => Some((id, *offset)),
            _ => None,
        }
    }

    pub fn selection(&self) -> Option<&ShapeId> {
        self.selection.as_ref()
    }

    /// Index of the selected shape in `shapes`, if it is still there.
    pub fn selected_index(&self, shapes: &[Shape]) -> Option<usize> {
        let id = self.selection.as_ref()?;
        shapes.iter().position(|s| s.id() == id)
    }

    /// Pointer pressed at `screen`.
    pub fn pointer_down(&mut self, screen: Point, shapes: &[Shape]) -> ToolOutcome {
        if self.is_active() {
            // a stray down without an up; start over
            self.cancel();
        }
        let point = self.camera.screen_to_world(screen);
        match self.current_tool {
            ToolKind::Select => self.begin_select(point, shapes),
            ToolKind::Pan => {
                self.state = ToolState::Panning { last: screen };
                ToolOutcome::None
            }
            ToolKind::Eraser => {
                self.state = ToolState::Erasing;
                ToolOutcome::None
            }
            ToolKind::Text | ToolKind::Image => {
                let kind = if self.current_tool == ToolKind::Text {
                    InputKind::Text
                } else {
                    InputKind::ImageUrl
                };
                self.state = ToolState::AwaitingInput {
                    kind,
                    position: point,
                };
                ToolOutcome::InputRequested {
                    kind,
                    position: point,
                }
            }
            ToolKind::Freehand
            | ToolKind::Line
            | ToolKind::Rectangle
            | ToolKind::Circle
            | ToolKind::Arrow => match self.seed_preview(point) {
                Some(preview) => {
                    self.state = ToolState::Drawing {
                        anchor: point,
                        preview,
                    };
                    ToolOutcome::Preview
                }
                None => ToolOutcome::None,
            },
        }
    }

    /// Pointer moved to `screen`.
    pub fn pointer_move(&mut self, screen: Point, shapes: &[Shape]) -> ToolOutcome {
        let point = self.camera.screen_to_world(screen);
        match &mut self.state {
            ToolState::Drawing { anchor, preview } => {
                reshape_preview(preview, *anchor, point);
                ToolOutcome::Preview
            }
            ToolState::Dragging { origin, offset, .. } => {
                *offset = point - *origin;
                ToolOutcome::Preview
            }
            ToolState::Erasing => {
                let hits = eraser_hits(point, shapes, self.config.eraser_size);
                if hits.is_empty() {
                    ToolOutcome::None
                } else {
                    ToolOutcome::Erase(hits)
                }
            }
            ToolState::Panning { last } => {
                let delta = screen - *last;
                *last = screen;
                self.camera.pan(delta);
                ToolOutcome::Panned(delta)
            }
            ToolState::Idle | ToolState::AwaitingInput { .. } => ToolOutcome::None,
        }
    }

    /// Pointer released at `screen`.
    pub fn pointer_up(&mut self, screen: Point, shapes: &[Shape]) -> ToolOutcome {
        let point = self.camera.screen_to_world(screen);
        match std::mem::take(&mut self.state) {
            ToolState::Drawing {
                anchor,
                mut preview,
            } => {
                if !ends_at(&preview, point) {
                    reshape_preview(&mut preview, anchor, point);
                }
                if is_degenerate(&preview) {
                    ToolOutcome::Cancelled
                } else {
                    ToolOutcome::Committed(preview)
                }
            }
            ToolState::Dragging { id, origin, .. } => {
                let delta = point - origin;
                if delta.hypot2() < f64::EPSILON {
                    ToolOutcome::Selected(shapes.iter().position(|s| s.id() == &id))
                } else {
                    ToolOutcome::Moved { id, delta }
                }
            }
            ToolState::Panning { last } => {
                let delta = screen - last;
                self.camera.pan(delta);
                ToolOutcome::Panned(delta)
            }
            awaiting @ ToolState::AwaitingInput { .. } => {
                // the input step outlives the click that opened it
                self.state = awaiting;
                ToolOutcome::None
            }
            ToolState::Erasing | ToolState::Idle => ToolOutcome::None,
        }
    }

    /// Confirm the value collected for a text or image tool.
    pub fn submit_input(&mut self, value: &str) -> ToolOutcome {
        let ToolState::AwaitingInput { kind, position } = std::mem::take(&mut self.state) else {
            return ToolOutcome::None;
        };
        let value = value.trim();
        if value.is_empty() {
            return ToolOutcome::Cancelled;
        }
        let mut shape = match kind {
            InputKind::Text => {
                let font_size = self.config.font_size_for(self.current_style.stroke_width);
                Shape::Text(Text::new(position, value.to_string(), font_size))
            }
            InputKind::ImageUrl => Shape::Image(Image::new(
                position,
                self.config.image_width,
                self.config.image_height,
                value.to_string(),
            )),
        };
        *shape.style_mut() = self.current_style.clone();
        ToolOutcome::Committed(shape)
    }

    /// Cancel the current interaction, dropping any preview or drag offset.
    pub fn cancel(&mut self) -> ToolOutcome {
        match std::mem::take(&mut self.state) {
            ToolState::Idle => ToolOutcome::None,
            _ => ToolOutcome::Cancelled,
        }
    }

    fn begin_select(&mut self, point: Point, shapes: &[Shape]) -> ToolOutcome {
        let hit = topmost_hit(point, shapes, self.config.eraser_size / 2.0);
        self.selection = hit.map(|index| shapes[index].id().clone());
        if let Some(index) = hit {
            self.state = ToolState::Dragging {
                id: shapes[index].id().clone(),
                origin: point,
                offset: Vec2::ZERO,
            };
        }
        ToolOutcome::Selected(hit)
    }

    fn seed_preview(&self, anchor: Point) -> Option<Shape> {
        let mut shape = match self.current_tool {
            ToolKind::Freehand => Shape::Freehand(Freehand::from_points(vec![anchor])),
            ToolKind::Line => Shape::Line(Line::new(anchor, anchor)),
            ToolKind::Arrow => Shape::Arrow(Arrow::new(anchor, anchor)),
            ToolKind::Rectangle => Shape::Rectangle(Rectangle::new(anchor, 0.0, 0.0)),
            ToolKind::Circle => Shape::Circle(Circle::new(anchor, 0.0)),
            _ => return None,
        };
        *shape.style_mut() = self.current_style.clone();
        Some(shape)
    }
}

/// Recompute preview geometry from the anchor and the current point.
fn reshape_preview(preview: &mut Shape, anchor: Point, current: Point) {
    match preview {
        Shape::Freehand(freehand) => freehand.add_point(current),
        Shape::Line(line) => line.end = current,
        Shape::Arrow(arrow) => arrow.end = current,
        Shape::Rectangle(rect) => {
            let corners = Rectangle::from_corners(anchor, current);
            rect.position = corners.position;
            rect.width = corners.width;
            rect.height = corners.height;
        }
        Shape::Circle(circle) => circle.radius = Circle::from_anchor(anchor, current).radius,
        Shape::Text(_) | Shape::Image(_) => {}
    }
}

/// Whether the preview already reflects `point` (avoids duplicating the last freehand point).
fn ends_at(preview: &Shape, point: Point) -> bool {
    match preview {
        Shape::Freehand(freehand) => freehand.points.last() == Some(&point),
        Shape::Line(line) => line.end == point,
        Shape::Arrow(arrow) => arrow.end == point,
        _ => false,
    }
}

fn is_degenerate(preview: &Shape) -> bool {
    match preview {
        Shape::Freehand(freehand) => freehand.len() < 2,
        _ => false,
    }
}
