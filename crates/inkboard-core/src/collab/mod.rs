//! Collaborator abstraction: the remote service that persists strokes and
//! broadcasts changes to every client viewing a board.

mod memory;

pub use memory::MemoryCollaborator;

use crate::board::BoardSnapshot;
use crate::shapes::{Shape, ShapeId};
use crate::wire::{ShapeError, ShapeResult, shape_from_wire, shape_to_wire, shapes_from_wire};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc::{Receiver, TryRecvError};
use thiserror::Error;

/// Collaborator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    /// The collaborator does not know this id (e.g. an update racing a remote delete).
    #[error("Stale reference: {0}")]
    StaleReference(ShapeId),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Board not found: {0}")]
    NotFound(String),
}

/// Result type for collaborator operations.
pub type CollabResult<T> = Result<T, CollabError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Change-feed message as the collaborator sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// A stroke record was inserted.
    StrokeAdded { stroke: Value },
    /// A stroke record was replaced.
    StrokeUpdated { stroke: Value },
    /// A stroke was removed.
    StrokeDeleted { stroke_id: Value },
    /// Full set of stroke records for the board.
    Snapshot { strokes: Vec<Value> },
}

impl WireEvent {
    pub fn added(shape: &Shape) -> Self {
        Self::StrokeAdded {
            stroke: shape_to_wire(shape),
        }
    }

    pub fn updated(shape: &Shape) -> Self {
        Self::StrokeUpdated {
            stroke: shape_to_wire(shape),
        }
    }

    pub fn deleted(id: &ShapeId) -> Self {
        Self::StrokeDeleted {
            stroke_id: Value::String(id.as_str().to_string()),
        }
    }

    /// Decode into a typed event.
    pub fn decode(&self) -> ShapeResult<RemoteEvent> {
        match self {
            WireEvent::StrokeAdded { stroke } => shape_from_wire(stroke).map(RemoteEvent::Created),
            WireEvent::StrokeUpdated { stroke } => {
                shape_from_wire(stroke).map(RemoteEvent::Updated)
            }
            WireEvent::StrokeDeleted { stroke_id } => match stroke_id {
                Value::String(id) => Ok(RemoteEvent::Deleted(ShapeId::new(id.clone()))),
                Value::Number(id) => Ok(RemoteEvent::Deleted(ShapeId::new(id.to_string()))),
                _ => Err(ShapeError::Malformed {
                    kind: "delete".to_string(),
                    reason: "stroke_id must be a string or number".to_string(),
                }),
            },
            WireEvent::Snapshot { strokes } => Ok(RemoteEvent::Snapshot(shapes_from_wire(strokes))),
        }
    }
}

/// Inbound change, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    Created(Shape),
    Updated(Shape),
    Deleted(ShapeId),
    Snapshot(Vec<Shape>),
}

impl RemoteEvent {
    /// Id the event refers to, if it concerns a single shape.
    pub fn shape_id(&self) -> Option<&ShapeId> {
        match self {
            RemoteEvent::Created(shape) | RemoteEvent::Updated(shape) => Some(shape.id()),
            RemoteEvent::Deleted(id) => Some(id),
            RemoteEvent::Snapshot(_) => None,
        }
    }
}

/// Live change feed for one board. Dropping it (or calling
/// [`Subscription::unsubscribe`]) tears the feed down.
#[derive(Debug)]
pub struct Subscription {
    board_id: String,
    receiver: Receiver<WireEvent>,
    closed: bool,
}

impl Subscription {
    pub fn new(board_id: impl Into<String>, receiver: Receiver<WireEvent>) -> Self {
        Self {
            board_id: board_id.into(),
            receiver,
            closed: false,
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// True once the collaborator side has hung up.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain everything that has arrived, in delivery order. Malformed
    /// records are logged and skipped.
    pub fn poll_events(&mut self) -> Vec<RemoteEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(message) => match message.decode() {
                    Ok(event) => events.push(event),
                    Err(e) => log::warn!("Dropping malformed change on {}: {}", self.board_id, e),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        log::info!("Change feed for {} closed", self.board_id);
                    }
                    self.closed = true;
                    break;
                }
            }
        }
        events
    }

    /// Stop receiving changes.
    pub fn unsubscribe(self) {
        log::info!("Unsubscribed from {}", self.board_id);
    }
}

/// Remote service the session talks to.
///
/// Every client runs one logical thread, so implementations need not be
/// `Send` or `Sync`.
pub trait Collaborator {
    /// Initial full state of a board.
    fn fetch_snapshot<'a>(&'a self, board_id: &'a str) -> BoxFuture<'a, CollabResult<BoardSnapshot>>;

    /// Open the change feed for a board.
    fn subscribe(&self, board_id: &str) -> CollabResult<Subscription>;

    /// Store a new shape; resolves to the authoritative id.
    fn persist_create<'a>(
        &'a self,
        board_id: &'a str,
        shape: &'a Shape,
    ) -> BoxFuture<'a, CollabResult<ShapeId>>;

    /// Replace the stored content of `id` with `shape`.
    fn persist_update<'a>(
        &'a self,
        board_id: &'a str,
        id: &'a ShapeId,
        shape: &'a Shape,
    ) -> BoxFuture<'a, CollabResult<()>>;

    /// Remove `id` from the board.
    fn persist_delete<'a>(
        &'a self,
        board_id: &'a str,
        id: &'a ShapeId,
    ) -> BoxFuture<'a, CollabResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Rectangle;
    use kurbo::Point;
    use serde_json::json;
    use std::sync::mpsc::channel;

    #[test]
    fn test_wire_event_tagging() {
        let event = WireEvent::deleted(&ShapeId::new("abc"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"type": "stroke_deleted", "stroke_id": "abc"}));

        let back: WireEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.decode().unwrap(), RemoteEvent::Deleted(ShapeId::new("abc")));
    }

    #[test]
    fn test_numeric_delete_id() {
        let event = WireEvent::StrokeDeleted { stroke_id: json!(42) };
        assert_eq!(event.decode().unwrap(), RemoteEvent::Deleted(ShapeId::new("42")));
        let bad = WireEvent::StrokeDeleted { stroke_id: json!([1]) };
        assert!(bad.decode().is_err());
    }

    #[test]
    fn test_poll_skips_malformed() {
        let (tx, rx) = channel();
        let mut sub = Subscription::new("b1", rx);
        let mut rect = Shape::Rectangle(Rectangle::new(Point::new(1.0, 2.0), 3.0, 4.0));
        rect.set_id(ShapeId::new("r1"));

        tx.send(WireEvent::StrokeAdded {
            stroke: json!({"id": "x", "type": "hexagon", "data": {}}),
        })
        .unwrap();
        tx.send(WireEvent::added(&rect)).unwrap();

        let events = sub.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].shape_id(), Some(&ShapeId::new("r1")));
        assert!(!sub.is_closed());

        drop(tx);
        assert!(sub.poll_events().is_empty());
        assert!(sub.is_closed());
    }
}
