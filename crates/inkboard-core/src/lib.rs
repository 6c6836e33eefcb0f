//! Inkboard Core Library
//!
//! Shape model, geometry, interaction and reconciliation logic for a shared
//! whiteboard. Rendering lives in `inkboard-render`.

pub mod board;
pub mod camera;
pub mod collab;
pub mod config;
pub mod geometry;
pub mod history;
pub mod reconcile;
pub mod session;
pub mod shapes;
pub mod tools;
pub mod wire;

pub use board::{Board, BoardSnapshot};
pub use camera::Camera;
pub use collab::{
    BoxFuture, CollabError, CollabResult, Collaborator, MemoryCollaborator, RemoteEvent,
    Subscription, WireEvent,
};
pub use config::EngineConfig;
pub use geometry::{ERASER_SIZE, bounds_of, eraser_hits, hit_test, topmost_hit, translate};
pub use history::History;
pub use reconcile::{
    CreateOutcome, DeleteOutcome, PendingOp, Reconciler, UpdateOutcome, UpdateRejection,
};
pub use session::{BoardSession, Frame, SessionNotice};
pub use shapes::{
    SerializableColor, Shape, ShapeId, ShapeKind, ShapePatch, ShapeStyle, ShapeTrait,
};
pub use tools::{InputKind, ToolKind, ToolManager, ToolOutcome, ToolState};
pub use wire::{ShapeError, ShapeResult, shape_from_wire, shape_to_wire, snapshot_from_wire, snapshot_to_wire};
