//! In-memory collaborator for tests and single-process use.

use super::{BoxFuture, CollabError, CollabResult, Collaborator, Subscription, WireEvent};
use crate::board::{Board, BoardSnapshot};
use crate::shapes::{Shape, ShapeId};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};
use uuid::Uuid;

#[derive(Debug, Default)]
struct BoardRecord {
    board: Board,
    shapes: Vec<Shape>,
    subscribers: Vec<Sender<WireEvent>>,
}

impl BoardRecord {
    /// Send to every live subscriber, dropping the ones that hung up.
    fn broadcast(&mut self, event: WireEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

/// Collaborator that keeps boards in memory and fans changes out over
/// channels. Every subscriber, including the author, receives each change.
#[derive(Debug, Default)]
pub struct MemoryCollaborator {
    boards: RwLock<HashMap<String, BoardRecord>>,
    offline: AtomicBool,
}

fn lock_error(e: impl std::fmt::Display) -> CollabError {
    CollabError::Transport(format!("Lock error: {}", e))
}

impl MemoryCollaborator {
    /// Create a new collaborator with no boards.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a board (replacing any board with the same id).
    pub fn create_board(&self, board: Board) -> CollabResult<()> {
        let mut boards = self.boards.write().map_err(lock_error)?;
        boards.insert(
            board.id.clone(),
            BoardRecord {
                board,
                ..Default::default()
            },
        );
        Ok(())
    }

    /// While offline every persistence call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> CollabResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CollabError::Transport("collaborator offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// Stored shapes of a board, in insertion order.
    pub fn shapes(&self, board_id: &str) -> CollabResult<Vec<Shape>> {
        let boards = self.boards.read().map_err(lock_error)?;
        boards
            .get(board_id)
            .map(|record| record.shapes.clone())
            .ok_or_else(|| CollabError::NotFound(board_id.to_string()))
    }

    pub fn stroke_count(&self, board_id: &str) -> usize {
        self.shapes(board_id).map(|shapes| shapes.len()).unwrap_or(0)
    }

    /// Deliver a raw event to every subscriber without touching stored state.
    pub fn inject(&self, board_id: &str, event: WireEvent) -> CollabResult<()> {
        self.with_board(board_id, |record| {
            record.broadcast(event);
            Ok(())
        })
    }

    /// Send the stored state of a board to every subscriber as a full snapshot.
    pub fn broadcast_snapshot(&self, board_id: &str) -> CollabResult<()> {
        self.with_board(board_id, |record| {
            let strokes = record.shapes.iter().map(crate::wire::shape_to_wire).collect();
            record.broadcast(WireEvent::Snapshot { strokes });
            Ok(())
        })
    }

    fn with_board<T>(
        &self,
        board_id: &str,
        f: impl FnOnce(&mut BoardRecord) -> CollabResult<T>,
    ) -> CollabResult<T> {
        let mut boards = self.boards.write().map_err(lock_error)?;
        let record = boards
            .get_mut(board_id)
            .ok_or_else(|| CollabError::NotFound(board_id.to_string()))?;
        f(record)
    }
}

impl Collaborator for MemoryCollaborator {
    fn fetch_snapshot<'a>(&'a self, board_id: &'a str) -> BoxFuture<'a, CollabResult<BoardSnapshot>> {
        Box::pin(async move {
            self.check_online()?;
            let boards = self.boards.read().map_err(lock_error)?;
            let record = boards
                .get(board_id)
                .ok_or_else(|| CollabError::NotFound(board_id.to_string()))?;
            Ok(BoardSnapshot {
                board: record.board.clone(),
                shapes: record.shapes.clone(),
            })
        })
    }

    fn subscribe(&self, board_id: &str) -> CollabResult<Subscription> {
        let (tx, rx) = channel();
        self.with_board(board_id, |record| {
            record.subscribers.push(tx);
            Ok(())
        })?;
        Ok(Subscription::new(board_id, rx))
    }

    fn persist_create<'a>(
        &'a self,
        board_id: &'a str,
        shape: &'a Shape,
    ) -> BoxFuture<'a, CollabResult<ShapeId>> {
        Box::pin(async move {
            self.check_online()?;
            self.with_board(board_id, |record| {
                let id = ShapeId::new(Uuid::new_v4().to_string());
                let mut stored = shape.clone();
                stored.set_id(id.clone());
                stored.set_pending(false);
                record.broadcast(WireEvent::added(&stored));
                record.shapes.push(stored);
                Ok(id)
            })
        })
    }

    fn persist_update<'a>(
        &'a self,
        board_id: &'a str,
        id: &'a ShapeId,
        shape: &'a Shape,
    ) -> BoxFuture<'a, CollabResult<()>> {
        Box::pin(async move {
            self.check_online()?;
            self.with_board(board_id, |record| {
                let stored = record
                    .shapes
                    .iter_mut()
                    .find(|s| s.id() == id)
                    .ok_or_else(|| CollabError::StaleReference(id.clone()))?;
                *stored = stored.with_content_of(shape);
                let event = WireEvent::updated(stored);
                record.broadcast(event);
                Ok(())
            })
        })
    }

    fn persist_delete<'a>(
        &'a self,
        board_id: &'a str,
        id: &'a ShapeId,
    ) -> BoxFuture<'a, CollabResult<()>> {
        Box::pin(async move {
            self.check_online()?;
            self.with_board(board_id, |record| {
                let index = record
                    .shapes
                    .iter()
                    .position(|s| s.id() == id)
                    .ok_or_else(|| CollabError::StaleReference(id.clone()))?;
                record.shapes.remove(index);
                record.broadcast(WireEvent::deleted(id));
                Ok(())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::RemoteEvent;
    use crate::shapes::Line;
    use kurbo::{Point, Vec2};

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        // Simple blocking executor for tests
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }

    fn collaborator() -> MemoryCollaborator {
        let collab = MemoryCollaborator::new();
        collab.create_board(Board::new("b1", "Board")).unwrap();
        collab
    }

    fn line() -> Shape {
        let mut shape = Shape::Line(Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        shape.set_pending(true);
        shape
    }

    #[test]
    fn test_create_assigns_authoritative_id() {
        let collab = collaborator();
        let draft = line();
        let id = block_on(collab.persist_create("b1", &draft)).unwrap();

        assert!(!id.is_temporary());
        let stored = collab.shapes("b1").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id(), &id);
        assert!(!stored[0].is_pending());
    }

    #[test]
    fn test_changes_reach_every_subscriber() {
        let collab = collaborator();
        let mut a = collab.subscribe("b1").unwrap();
        let mut b = collab.subscribe("b1").unwrap();

        let id = block_on(collab.persist_create("b1", &line())).unwrap();
        let mut moved = collab.shapes("b1").unwrap().remove(0);
        moved.translate(Vec2::new(5.0, 0.0));
        block_on(collab.persist_update("b1", &id, &moved)).unwrap();
        block_on(collab.persist_delete("b1", &id)).unwrap();

        for sub in [&mut a, &mut b] {
            let events = sub.poll_events();
            assert_eq!(events.len(), 3);
            assert!(matches!(&events[0], RemoteEvent::Created(s) if s.id() == &id));
            assert!(matches!(&events[1], RemoteEvent::Updated(s) if s.bounds() == moved.bounds()));
            assert_eq!(events[2], RemoteEvent::Deleted(id.clone()));
        }
        assert_eq!(collab.stroke_count("b1"), 0);
    }

    #[test]
    fn test_unknown_id_is_stale() {
        let collab = collaborator();
        let ghost = ShapeId::new("ghost");
        let result = block_on(collab.persist_delete("b1", &ghost));
        assert_eq!(result, Err(CollabError::StaleReference(ghost.clone())));
        let result = block_on(collab.persist_update("b1", &ghost, &line()));
        assert_eq!(result, Err(CollabError::StaleReference(ghost)));
    }

    #[test]
    fn test_offline_fails_with_transport_error() {
        let collab = collaborator();
        collab.set_offline(true);
        let result = block_on(collab.persist_create("b1", &line()));
        assert!(matches!(result, Err(CollabError::Transport(_))));
        assert_eq!(collab.stroke_count("b1"), 0);

        collab.set_offline(false);
        assert!(block_on(collab.persist_create("b1", &line())).is_ok());
    }

    #[test]
    fn test_missing_board() {
        let collab = MemoryCollaborator::new();
        let result = block_on(collab.fetch_snapshot("nope"));
        assert_eq!(result, Err(CollabError::NotFound("nope".to_string())));
        assert!(collab.subscribe("nope").is_err());
    }

    #[test]
    fn test_unsubscribed_feeds_are_pruned() {
        let collab = collaborator();
        let sub = collab.subscribe("b1").unwrap();
        sub.unsubscribe();
        block_on(collab.persist_create("b1", &line())).unwrap();
        let mut live = collab.subscribe("b1").unwrap();
        collab.broadcast_snapshot("b1").unwrap();
        match live.poll_events().as_slice() {
            [RemoteEvent::Snapshot(shapes)] => assert_eq!(shapes.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }
}
