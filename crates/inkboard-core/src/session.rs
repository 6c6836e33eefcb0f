//! A client's view of one board: tools, reconciler and history driven by
//! pointer input, with collaborator calls made through [`BoardSession::persist`].
//!
//! All mutation happens synchronously inside the session. Async methods only
//! await the collaborator and never hold the state borrow across an await,
//! so pointer input keeps flowing while a commit is in flight.

use crate::board::Board;
use crate::collab::{CollabResult, Collaborator, Subscription};
use crate::config::EngineConfig;
use crate::history::History;
use crate::reconcile::{
    CreateOutcome, DeleteOutcome, PendingOp, Reconciler, UpdateOutcome,
};
use crate::shapes::{Shape, ShapeId, ShapePatch, ShapeStyle};
use crate::tools::{InputKind, ToolKind, ToolManager, ToolOutcome, ToolState};
use kurbo::{Point, Vec2};
use std::cell::RefCell;
use std::rc::Rc;

/// Something the host should show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// A shape could not be saved and was removed.
    CreateFailed { temp_id: ShapeId, reason: String },
}

/// Everything needed to draw the current view.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub shapes: Vec<Shape>,
    pub preview: Option<Shape>,
    pub pan_offset: Vec2,
    pub selected: Option<usize>,
    /// Index and transient offset of a shape being dragged.
    pub drag: Option<(usize, Vec2)>,
}

#[derive(Debug)]
struct SessionState {
    board: Board,
    reconciler: Reconciler,
    history: History,
    tools: ToolManager,
    notices: Vec<SessionNotice>,
}

impl SessionState {
    fn record(&mut self) {
        self.history.record(self.reconciler.shapes());
    }

    fn apply_tool_outcome(&mut self, outcome: ToolOutcome) -> Vec<PendingOp> {
        let mut ops = Vec::new();
        match outcome {
            ToolOutcome::Committed(shape) => ops.push(self.reconciler.create(shape)),
            ToolOutcome::Moved { id, delta } => match self.reconciler.index_of(&id) {
                Some(index) => {
                    if let UpdateOutcome::Applied(op) =
                        self.reconciler.update(index, &ShapePatch::Translate(delta))
                    {
                        ops.push(op);
                    }
                }
                None => log::debug!("Dragged shape {} is gone", id),
            },
            ToolOutcome::Erase(indices) => {
                for index in indices {
                    if let DeleteOutcome::Deleted(op) = self.reconciler.delete(index) {
                        ops.push(op);
                    }
                }
            }
            ToolOutcome::None
            | ToolOutcome::Preview
            | ToolOutcome::Cancelled
            | ToolOutcome::Selected(_)
            | ToolOutcome::Panned(_)
            | ToolOutcome::InputRequested { .. } => return ops,
        }
        self.record();
        ops
    }
}

/// An open board backed by a collaborator.
pub struct BoardSession<C: Collaborator> {
    board_id: String,
    collaborator: Rc<C>,
    state: RefCell<SessionState>,
    subscription: RefCell<Option<Subscription>>,
}

impl<C: Collaborator> BoardSession<C> {
    /// Subscribe to the board's change feed, then load its current state.
    /// Changes that race the fetch are buffered and merged on the next
    /// [`pump_remote_events`](Self::pump_remote_events).
    pub async fn open(
        collaborator: Rc<C>,
        board_id: &str,
        config: EngineConfig,
    ) -> CollabResult<Self> {
        let subscription = collaborator.subscribe(board_id)?;
        let snapshot = collaborator.fetch_snapshot(board_id).await?;
        log::info!(
            "Opened board {} with {} shapes",
            board_id,
            snapshot.shapes.len()
        );

        let mut history = History::new(config.max_history);
        history.record(&snapshot.shapes);
        let state = SessionState {
            board: snapshot.board,
            reconciler: Reconciler::with_shapes(snapshot.shapes),
            history,
            tools: ToolManager::new(config),
            notices: Vec::new(),
        };
        Ok(Self {
            board_id: board_id.to_string(),
            collaborator,
            state: RefCell::new(state),
            subscription: RefCell::new(Some(subscription)),
        })
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn board(&self) -> Board {
        self.state.borrow().board.clone()
    }

    /// Copy of the authoritative shape list.
    pub fn shapes(&self) -> Vec<Shape> {
        self.state.borrow().reconciler.shapes().to_vec()
    }

    pub fn shape_count(&self) -> usize {
        self.state.borrow().reconciler.len()
    }

    pub fn set_tool(&self, tool: ToolKind) {
        self.state.borrow_mut().tools.set_tool(tool);
    }

    pub fn tool(&self) -> ToolKind {
        self.state.borrow().tools.current_tool
    }

    /// Style for shapes drawn from now on.
    pub fn set_style(&self, style: ShapeStyle) {
        self.state.borrow_mut().tools.current_style = style;
    }

    /// The input step the host should show, if a text or image tool asked for one.
    pub fn awaiting_input(&self) -> Option<(InputKind, Point)> {
        match &self.state.borrow().tools.state {
            ToolState::AwaitingInput { kind, position } => Some((*kind, *position)),
            _ => None,
        }
    }

    pub fn pointer_down(&self, screen: Point) -> Vec<PendingOp> {
        self.with_tools(|tools, shapes| tools.pointer_down(screen, shapes))
    }

    pub fn pointer_move(&self, screen: Point) -> Vec<PendingOp> {
        self.with_tools(|tools, shapes| tools.pointer_move(screen, shapes))
    }

    pub fn pointer_up(&self, screen: Point) -> Vec<PendingOp> {
        self.with_tools(|tools, shapes| tools.pointer_up(screen, shapes))
    }

    /// Confirm the text or image URL collected after an input request.
    pub fn submit_input(&self, value: &str) -> Vec<PendingOp> {
        self.with_tools(|tools, _| tools.submit_input(value))
    }

    /// Abandon the current interaction.
    pub fn cancel_interaction(&self) {
        self.state.borrow_mut().tools.cancel();
    }

    fn with_tools(&self, f: impl FnOnce(&mut ToolManager, &[Shape]) -> ToolOutcome) -> Vec<PendingOp> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let outcome = f(&mut state.tools, state.reconciler.shapes());
        state.apply_tool_outcome(outcome)
    }

    /// Insert a shape optimistically.
    pub fn create(&self, draft: Shape) -> PendingOp {
        let mut state = self.state.borrow_mut();
        let op = state.reconciler.create(draft);
        state.record();
        op
    }

    /// Patch the shape at `index`.
    pub fn update(&self, index: usize, patch: &ShapePatch) -> UpdateOutcome {
        let mut state = self.state.borrow_mut();
        let outcome = state.reconciler.update(index, patch);
        state.record();
        outcome
    }

    /// Remove the shape at `index`.
    pub fn delete(&self, index: usize) -> DeleteOutcome {
        let mut state = self.state.borrow_mut();
        let outcome = state.reconciler.delete(index);
        state.record();
        outcome
    }

    /// Merge every change the collaborator has delivered. Returns how many
    /// changed the shape set.
    pub fn pump_remote_events(&self) -> usize {
        let events = match self.subscription.borrow_mut().as_mut() {
            Some(subscription) => subscription.poll_events(),
            None => return 0,
        };
        let mut state = self.state.borrow_mut();
        let mut changed = 0;
        for event in events {
            if state.reconciler.apply_remote(event) {
                changed += 1;
                state.record();
            }
        }
        changed
    }

    /// Make the collaborator call for `op` and fold its result back in.
    pub async fn persist(&self, op: PendingOp) {
        let collaborator = Rc::clone(&self.collaborator);
        match op {
            PendingOp::Create { temp_id, draft } => {
                let result = collaborator.persist_create(&self.board_id, &draft).await;
                let follow_up = self.finish_create(&temp_id, result);
                if let Some(id) = follow_up {
                    let result = collaborator.persist_delete(&self.board_id, &id).await;
                    self.state.borrow().reconciler.complete_delete(&id, result);
                }
            }
            PendingOp::Update { id, shape } => {
                let result = collaborator
                    .persist_update(&self.board_id, &id, &shape)
                    .await;
                self.state.borrow().reconciler.complete_update(&id, result);
            }
            PendingOp::Delete { id } => {
                let result = collaborator.persist_delete(&self.board_id, &id).await;
                self.state.borrow().reconciler.complete_delete(&id, result);
            }
        }
    }

    /// Persist ops one after another, in order.
    pub async fn persist_all(&self, ops: Vec<PendingOp>) {
        for op in ops {
            self.persist(op).await;
        }
    }

    /// Returns the id to delete remotely when the shape was erased mid-flight.
    fn finish_create(&self, temp_id: &ShapeId, result: CollabResult<ShapeId>) -> Option<ShapeId> {
        let mut state = self.state.borrow_mut();
        let outcome = state.reconciler.complete_create(temp_id, result);
        match outcome {
            CreateOutcome::Confirmed { id, .. } | CreateOutcome::Orphaned { id, .. } => {
                state.history.rename_shape(temp_id, &id);
                state.record();
                None
            }
            CreateOutcome::DeletedWhilePending { id, follow_up } => {
                state.history.rename_shape(temp_id, &id);
                state.record();
                match follow_up {
                    PendingOp::Delete { id } => Some(id),
                    _ => None,
                }
            }
            CreateOutcome::Failed { error, .. } => {
                state.history.forget_shape(temp_id);
                state.record();
                state.notices.push(SessionNotice::CreateFailed {
                    temp_id: temp_id.clone(),
                    reason: error.to_string(),
                });
                None
            }
        }
    }

    /// Step back through history. Local only; nothing is sent.
    pub fn undo(&self) -> bool {
        let mut state = self.state.borrow_mut();
        match state.history.undo() {
            Some(shapes) => {
                state.reconciler.restore(shapes);
                true
            }
            None => false,
        }
    }

    /// Step forward through history. Local only; nothing is sent.
    pub fn redo(&self) -> bool {
        let mut state = self.state.borrow_mut();
        match state.history.redo() {
            Some(shapes) => {
                state.reconciler.restore(shapes);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.state.borrow().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state.borrow().history.can_redo()
    }

    /// Drain notices raised since the last call.
    pub fn take_notices(&self) -> Vec<SessionNotice> {
        std::mem::take(&mut self.state.borrow_mut().notices)
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.state.borrow().tools.camera.offset
    }

    /// Snapshot of what to draw.
    pub fn frame(&self) -> Frame {
        let state = self.state.borrow();
        let shapes = state.reconciler.shapes();
        let drag = state
            .tools
            .drag_offset()
            .and_then(|(id, offset)| state.reconciler.index_of(id).map(|index| (index, offset)));
        Frame {
            shapes: shapes.to_vec(),
            preview: state.tools.preview_shape().cloned(),
            pan_offset: state.tools.camera.offset,
            selected: state.tools.selected_index(shapes),
            drag,
        }
    }

    /// Tear down the change feed.
    pub fn close(self) {
        if let Some(subscription) = self.subscription.into_inner() {
            subscription.unsubscribe();
        }
        log::info!("Closed board {}", self.board_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MemoryCollaborator;
    use crate::shapes::Rectangle;

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

    fn open() -> (Rc<MemoryCollaborator>, BoardSession<MemoryCollaborator>) {
        let collab = Rc::new(MemoryCollaborator::new());
        collab.create_board(Board::new("b1", "Plan")).unwrap();
        let session =
            block_on(BoardSession::open(Rc::clone(&collab), "b1", EngineConfig::default()))
                .unwrap();
        (collab, session)
    }

    fn draw_rect(session: &BoardSession<MemoryCollaborator>, from: Point, to: Point) -> Vec<PendingOp> {
        session.set_tool(ToolKind::Rectangle);
        let mut ops = session.pointer_down(from);
        ops.extend(session.pointer_move(to));
        ops.extend(session.pointer_up(to));
        ops
    }

    #[test]
    fn test_open_missing_board_fails() {
        let collab = Rc::new(MemoryCollaborator::new());
        let result = block_on(BoardSession::open(collab, "nope", EngineConfig::default()));
        assert!(result.is_err());
    }

    #[test]
    fn test_draw_commits_optimistically() {
        let (collab, session) = open();
        let ops = draw_rect(&session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        assert_eq!(ops.len(), 1);
        assert_eq!(session.shape_count(), 1);
        assert!(session.shapes()[0].is_pending());
        assert_eq!(collab.stroke_count("b1"), 0);

        block_on(session.persist_all(ops));
        assert_eq!(collab.stroke_count("b1"), 1);
        let shapes = session.shapes();
        assert_eq!(shapes.len(), 1);
        assert!(!shapes[0].is_pending());
        assert!(!shapes[0].id().is_temporary());

        // the echo of our own create changes nothing
        assert_eq!(session.pump_remote_events(), 0);
        assert_eq!(session.shape_count(), 1);
    }

    #[test]
    fn test_failed_create_raises_notice() {
        let (collab, session) = open();
        collab.set_offline(true);
        let ops = draw_rect(&session, Point::ZERO, Point::new(20.0, 20.0));
        block_on(session.persist_all(ops));

        assert_eq!(session.shape_count(), 0);
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0], SessionNotice::CreateFailed { .. }));
        assert!(session.take_notices().is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_drag_updates_once() {
        let (collab, session) = open();
        block_on(session.persist_all(draw_rect(
            &session,
            Point::new(0.0, 0.0),
            Point::new(40.0, 40.0),
        )));

        session.set_tool(ToolKind::Select);
        assert!(session.pointer_down(Point::new(20.0, 20.0)).is_empty());
        session.pointer_move(Point::new(30.0, 25.0));
        let frame = session.frame();
        assert_eq!(frame.selected, Some(0));
        assert_eq!(frame.drag, Some((0, Vec2::new(10.0, 5.0))));

        let ops = session.pointer_up(Point::new(30.0, 25.0));
        assert_eq!(ops.len(), 1);
        assert!(session.frame().drag.is_none());
        block_on(session.persist_all(ops));

        let stored = collab.shapes("b1").unwrap();
        assert_eq!(stored[0].bounds(), session.shapes()[0].bounds());
        match &session.shapes()[0] {
            Shape::Rectangle(rect) => assert_eq!(rect.position, Point::new(10.0, 5.0)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_erase_pending_shape_deletes_after_ack() {
        let (collab, session) = open();
        let create = draw_rect(&session, Point::ZERO, Point::new(40.0, 40.0));

        session.set_tool(ToolKind::Eraser);
        session.pointer_down(Point::new(100.0, 100.0));
        let erase = session.pointer_move(Point::new(20.0, 20.0));
        session.pointer_up(Point::new(20.0, 20.0));
        assert!(erase.is_empty());
        assert_eq!(session.shape_count(), 0);

        block_on(session.persist_all(create));
        assert_eq!(collab.stroke_count("b1"), 0);
        session.pump_remote_events();
        assert_eq!(session.shape_count(), 0);
    }

    #[test]
    fn test_pan_changes_anchor() {
        let (_collab, session) = open();
        session.set_tool(ToolKind::Pan);
        session.pointer_down(Point::new(0.0, 0.0));
        session.pointer_up(Point::new(100.0, 50.0));
        assert_eq!(session.pan_offset(), Vec2::new(100.0, 50.0));
        assert_eq!(session.shape_count(), 0);

        draw_rect(&session, Point::new(110.0, 60.0), Point::new(150.0, 90.0));
        match &session.shapes()[0] {
            Shape::Rectangle(rect) => {
                assert_eq!(rect.position, Point::new(10.0, 10.0));
                assert!((rect.width - 40.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_text_input_flow() {
        let (_collab, session) = open();
        session.set_tool(ToolKind::Text);
        session.pointer_down(Point::new(5.0, 50.0));
        session.pointer_up(Point::new(5.0, 50.0));
        assert_eq!(
            session.awaiting_input(),
            Some((InputKind::Text, Point::new(5.0, 50.0)))
        );
        let ops = session.submit_input("hello");
        assert_eq!(ops.len(), 1);
        assert!(session.awaiting_input().is_none());
        assert!(matches!(session.shapes()[0], Shape::Text(_)));
    }

    #[test]
    fn test_undo_is_local_only() {
        let (collab, session) = open();
        for x in [0.0, 50.0, 100.0] {
            let ops = draw_rect(&session, Point::new(x, 0.0), Point::new(x + 20.0, 20.0));
            block_on(session.persist_all(ops));
        }
        assert!(session.undo());
        assert_eq!(session.shape_count(), 2);
        assert_eq!(collab.stroke_count("b1"), 3);
        assert!(session.shapes().iter().all(|s| !s.id().is_temporary()));

        assert!(session.redo());
        assert_eq!(session.shape_count(), 3);
        assert!(!session.redo());
    }

    fn unique_ids(session: &BoardSession<MemoryCollaborator>) -> bool {
        let mut ids: Vec<ShapeId> = session.shapes().iter().map(|s| s.id().clone()).collect();
        let count = ids.len();
        ids.sort();
        ids.dedup();
        ids.len() == count
    }

    /// Store `op`'s draft, let `deliver` push feed traffic, then apply the ack.
    fn ack_after(
        collab: &MemoryCollaborator,
        session: &BoardSession<MemoryCollaborator>,
        op: PendingOp,
        deliver: impl FnOnce(),
    ) -> ShapeId {
        let PendingOp::Create { temp_id, draft } = op else {
            panic!("expected a create");
        };
        let id = block_on(collab.persist_create("b1", &draft)).unwrap();
        deliver();
        session.pump_remote_events();
        assert!(session.finish_create(&temp_id, Ok(id.clone())).is_none());
        id
    }

    #[test]
    fn test_echo_before_ack_keeps_history_unique() {
        let (collab, session) = open();
        block_on(session.persist_all(draw_rect(&session, Point::ZERO, Point::new(10.0, 10.0))));

        let op = session.create(Shape::Rectangle(Rectangle::new(Point::new(30.0, 0.0), 10.0, 10.0)));
        let id = ack_after(&collab, &session, op, || {});
        assert_eq!(session.shape_count(), 2);
        assert_eq!(session.shapes()[1].id(), &id);

        assert!(session.undo());
        assert_eq!(session.shape_count(), 1);
        assert!(unique_ids(&session));
        assert!(session.redo());
        assert_eq!(session.shape_count(), 2);
        assert!(unique_ids(&session));
        assert!(!session.redo());
    }

    #[test]
    fn test_snapshot_before_ack_keeps_history_unique() {
        let (collab, session) = open();
        block_on(session.persist_all(draw_rect(&session, Point::ZERO, Point::new(10.0, 10.0))));

        let op = session.create(Shape::Rectangle(Rectangle::new(Point::new(30.0, 0.0), 10.0, 10.0)));
        let id = ack_after(&collab, &session, op, || {
            collab.broadcast_snapshot("b1").unwrap();
        });
        assert_eq!(session.shape_count(), 2);
        assert!(session.shapes().iter().any(|s| s.id() == &id));

        while session.undo() {
            assert!(unique_ids(&session));
        }
        assert_eq!(session.shape_count(), 1);
        while session.redo() {
            assert!(unique_ids(&session));
        }
        assert_eq!(session.shape_count(), 2);
    }

    #[test]
    fn test_preview_moves_do_not_record() {
        let (_collab, session) = open();
        session.set_tool(ToolKind::Freehand);
        session.pointer_down(Point::ZERO);
        for x in 1..20 {
            session.pointer_move(Point::new(x as f64, 0.0));
        }
        assert!(!session.can_undo());
        assert_eq!(session.state.borrow().history.len(), 0);
        session.pointer_up(Point::new(20.0, 0.0));
        assert_eq!(session.state.borrow().history.len(), 1);
    }

    #[test]
    fn test_direct_operations() {
        let (_collab, session) = open();
        let op = session.create(Shape::Rectangle(Rectangle::new(Point::ZERO, 5.0, 5.0)));
        assert!(matches!(op, PendingOp::Create { .. }));
        assert!(matches!(
            session.update(0, &ShapePatch::Translate(Vec2::new(1.0, 1.0))),
            UpdateOutcome::Rejected(_)
        ));
        block_on(session.persist(op));
        assert!(matches!(
            session.update(0, &ShapePatch::Translate(Vec2::new(1.0, 1.0))),
            UpdateOutcome::Applied(_)
        ));
        assert!(matches!(session.delete(0), DeleteOutcome::Deleted(_)));
        assert!(matches!(session.delete(0), DeleteOutcome::NoSuchIndex(0)));
        session.close();
    }
}
