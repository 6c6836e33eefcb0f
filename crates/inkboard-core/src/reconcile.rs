//! Optimistic local edits merged with the collaborator's change feed.
//!
//! The reconciler owns the board's ordered shape collection and the set of
//! ids deleted in this session. Local operations mutate the collection
//! synchronously and return a [`PendingOp`] describing the collaborator call
//! to make; the caller reports the call's result back through the matching
//! `complete_*` method.

use crate::collab::{CollabError, CollabResult, RemoteEvent};
use crate::shapes::{Shape, ShapeId, ShapePatch};
use std::collections::HashSet;

/// A collaborator call still to be made for a local edit.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOp {
    /// Persist a new shape currently held under `temp_id`.
    Create { temp_id: ShapeId, draft: Shape },
    /// Persist the full content of an existing shape.
    Update { id: ShapeId, shape: Shape },
    /// Remove a shape.
    Delete { id: ShapeId },
}

/// Result of acknowledging a create.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The entry now carries `id`; it kept its index.
    Confirmed { temp_id: ShapeId, id: ShapeId },
    /// The shape was erased while its create was in flight. `follow_up`
    /// deletes it remotely.
    DeletedWhilePending { id: ShapeId, follow_up: PendingOp },
    /// No local entry for the temporary id (e.g. replaced by an undo).
    Orphaned { temp_id: ShapeId, id: ShapeId },
    /// The create failed and the optimistic entry was removed.
    Failed { temp_id: ShapeId, error: CollabError },
}

/// Why a local update was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRejection {
    NoSuchIndex(usize),
    /// The shape has no authoritative id yet.
    Pending(ShapeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Applied(PendingOp),
    Rejected(UpdateRejection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Removed locally; the op removes it remotely.
    Deleted(PendingOp),
    /// A pending shape was removed; its create ack will trigger the remote delete.
    DeletedLocally(ShapeId),
    NoSuchIndex(usize),
}

/// Authoritative shape collection of one board.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    shapes: Vec<Shape>,
    deleted: HashSet<ShapeId>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a fetched snapshot.
    pub fn with_shapes(shapes: Vec<Shape>) -> Self {
        let mut reconciler = Self::new();
        reconciler.replace_with_snapshot(shapes);
        reconciler
    }

    /// Shapes in z-order, bottom first.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Shape> {
        self.shapes.get(index)
    }

    pub fn index_of(&self, id: &ShapeId) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == id)
    }

    pub fn is_deleted(&self, id: &ShapeId) -> bool {
        self.deleted.contains(id)
    }

    /// Insert `draft` optimistically under a fresh temporary id.
    pub fn create(&mut self, mut draft: Shape) -> PendingOp {
        let temp_id = ShapeId::temporary();
        draft.set_id(temp_id.clone());
        draft.set_pending(true);
        self.shapes.push(draft.clone());
        PendingOp::Create { temp_id, draft }
    }

    /// Apply the collaborator's answer to a create.
    pub fn complete_create(
        &mut self,
        temp_id: &ShapeId,
        result: CollabResult<ShapeId>,
    ) -> CreateOutcome {
        let id = match result {
            Ok(id) => id,
            Err(error) => {
                if let Some(index) = self.index_of(temp_id) {
                    self.shapes.remove(index);
                }
                log::error!("Create of {} failed: {}", temp_id, error);
                return CreateOutcome::Failed {
                    temp_id: temp_id.clone(),
                    error,
                };
            }
        };

        let Some(index) = self.index_of(temp_id) else {
            if self.deleted.contains(temp_id) {
                self.deleted.insert(id.clone());
                self.remove_id(&id);
                log::debug!("{} was erased before its ack; deleting {}", temp_id, id);
                return CreateOutcome::DeletedWhilePending {
                    follow_up: PendingOp::Delete { id: id.clone() },
                    id,
                };
            }
            log::debug!("Ack for {} has no local entry", temp_id);
            return CreateOutcome::Orphaned {
                temp_id: temp_id.clone(),
                id,
            };
        };

        let shape = &mut self.shapes[index];
        shape.set_id(id.clone());
        shape.set_pending(false);

        // the feed may have delivered our own create before the ack
        let mut position = 0;
        self.shapes.retain(|s| {
            let keep = position == index || s.id() != &id;
            position += 1;
            keep
        });

        CreateOutcome::Confirmed {
            temp_id: temp_id.clone(),
            id,
        }
    }

    /// Patch the shape at `index` in place.
    pub fn update(&mut self, index: usize, patch: &ShapePatch) -> UpdateOutcome {
        let Some(current) = self.shapes.get(index) else {
            log::warn!("Update rejected: no shape at index {}", index);
            return UpdateOutcome::Rejected(UpdateRejection::NoSuchIndex(index));
        };
        if current.is_pending() || current.id().is_temporary() {
            log::warn!("Update rejected: {} is not yet persisted", current.id());
            return UpdateOutcome::Rejected(UpdateRejection::Pending(current.id().clone()));
        }
        let next = patch.apply(current);
        let id = next.id().clone();
        self.shapes[index] = next.clone();
        UpdateOutcome::Applied(PendingOp::Update { id, shape: next })
    }

    /// Remove the shape at `index`. Its id is recorded as deleted first.
    pub fn delete(&mut self, index: usize) -> DeleteOutcome {
        let Some(id) = self.shapes.get(index).map(|s| s.id().clone()) else {
            return DeleteOutcome::NoSuchIndex(index);
        };
        self.deleted.insert(id.clone());
        self.shapes.remove(index);
        if id.is_temporary() {
            DeleteOutcome::DeletedLocally(id)
        } else {
            DeleteOutcome::Deleted(PendingOp::Delete { id })
        }
    }

    /// Failed updates stay applied locally.
    pub fn complete_update(&self, id: &ShapeId, result: CollabResult<()>) {
        if let Err(e) = result {
            log::warn!("Update of {} was not persisted: {}", id, e);
        }
    }

    /// Failed deletes stay applied locally.
    pub fn complete_delete(&self, id: &ShapeId, result: CollabResult<()>) {
        match result {
            Ok(()) => {}
            Err(CollabError::StaleReference(_)) => {
                log::debug!("Delete of {} found it already gone", id)
            }
            Err(e) => log::warn!("Delete of {} was not persisted: {}", id, e),
        }
    }

    /// Merge one inbound change. Returns true if the collection changed.
    pub fn apply_remote(&mut self, event: RemoteEvent) -> bool {
        if let Some(id) = event.shape_id() {
            if self.deleted.contains(id) {
                log::debug!("Dropping inbound change for deleted {}", id);
                return false;
            }
        }
        match event {
            RemoteEvent::Created(shape) => {
                if self.index_of(shape.id()).is_some() {
                    log::debug!("Ignoring duplicate create for {}", shape.id());
                    return false;
                }
                self.shapes.push(shape);
                true
            }
            RemoteEvent::Updated(shape) => match self.index_of(shape.id()) {
                Some(index) => {
                    if self.shapes[index] == shape {
                        return false;
                    }
                    self.shapes[index] = shape;
                    true
                }
                None => {
                    log::debug!("Ignoring update for unknown {}", shape.id());
                    false
                }
            },
            RemoteEvent::Deleted(id) => self.remove_id(&id),
            RemoteEvent::Snapshot(shapes) => {
                let before = self.shapes.clone();
                self.replace_with_snapshot(shapes);
                self.shapes != before
            }
        }
    }

    /// Replace the collection wholesale (undo/redo). The deleted set is left
    /// alone, so a restored shape still ignores inbound changes.
    pub fn restore(&mut self, shapes: Vec<Shape>) {
        self.shapes = shapes;
    }

    fn remove_id(&mut self, id: &ShapeId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.shapes.remove(index);
                true
            }
            None => false,
        }
    }

    fn replace_with_snapshot(&mut self, shapes: Vec<Shape>) {
        let pending: Vec<Shape> = self
            .shapes
            .drain(..)
            .filter(|s| s.is_pending())
            .collect();
        let mut seen = HashSet::new();
        for shape in shapes {
            if self.deleted.contains(shape.id()) {
                log::debug!("Snapshot entry {} is deleted locally", shape.id());
                continue;
            }
            if seen.insert(shape.id().clone()) {
                self.shapes.push(shape);
            }
        }
        self.shapes.extend(pending);
    }
}
