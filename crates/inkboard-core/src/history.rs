//! Undo/redo over full snapshots of the shape collection.

use crate::config::DEFAULT_MAX_HISTORY;
use crate::shapes::{Shape, ShapeId};

/// Stack of shape-set snapshots with a cursor at the current state.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Vec<Shape>>,
    cursor: usize,
    max: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl History {
    /// Create an empty history keeping at most `max` snapshots.
    pub fn new(max: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            max: max.max(1),
        }
    }

    /// Number of snapshots held.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// The snapshot the cursor points at.
    pub fn current(&self) -> Option<&[Shape]> {
        self.snapshots.get(self.cursor).map(Vec::as_slice)
    }

    /// Record `shapes` if they differ from the current snapshot. Recording
    /// after an undo discards the redo branch. Returns true if a snapshot
    /// was added.
    pub fn record(&mut self, shapes: &[Shape]) -> bool {
        if self.snapshots.is_empty() {
            if shapes.is_empty() {
                return false;
            }
            self.snapshots.push(shapes.to_vec());
            self.cursor = 0;
            return true;
        }
        if self.snapshots[self.cursor] == shapes {
            return false;
        }
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(shapes.to_vec());
        if self.snapshots.len() > self.max {
            self.snapshots.remove(0);
        }
        self.cursor = self.snapshots.len() - 1;
        true
    }

    /// Step back; returns the state to restore.
    pub fn undo(&mut self) -> Option<Vec<Shape>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Step forward; returns the state to restore.
    pub fn redo(&mut self) -> Option<Vec<Shape>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Rewrite a temporary id to its authoritative id in every snapshot.
    /// A snapshot that already holds `to` (the feed echoed the create before
    /// the ack) keeps only the renamed entry, at its own position.
    pub fn rename_shape(&mut self, from: &ShapeId, to: &ShapeId) {
        for snapshot in &mut self.snapshots {
            let Some(index) = snapshot.iter().position(|s| s.id() == from) else {
                continue;
            };
            snapshot[index].set_id(to.clone());
            snapshot[index].set_pending(false);

            let mut position = 0;
            snapshot.retain(|s| {
                let keep = position == index || s.id() != to;
                position += 1;
                keep
            });
        }
        self.collapse();
    }

    /// Drop a shape from every snapshot, collapsing snapshots that become
    /// identical to their predecessor.
    pub fn forget_shape(&mut self, id: &ShapeId) {
        for snapshot in &mut self.snapshots {
            snapshot.retain(|s| s.id() != id);
        }
        self.collapse();
        if self.snapshots.len() == 1 && self.snapshots[0].is_empty() {
            self.snapshots.clear();
            self.cursor = 0;
        }
    }

    fn collapse(&mut self) {
        let mut kept: Vec<Vec<Shape>> = Vec::with_capacity(self.snapshots.len());
        let mut cursor = 0;
        for (index, snapshot) in self.snapshots.drain(..).enumerate() {
            if kept.last() != Some(&snapshot) {
                kept.push(snapshot);
            }
            if index == self.cursor {
                cursor = kept.len().saturating_sub(1);
            }
        }
        self.snapshots = kept;
        self.cursor = cursor.min(self.snapshots.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, ShapeMeta};
    use kurbo::Point;

    fn shape(id: &str) -> Shape {
        let mut s = Shape::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0));
        *s.meta_mut() = ShapeMeta::reconstruct(ShapeId::new(id), 1, false);
        s
    }

    fn ids(shapes: &[Shape]) -> Vec<&str> {
        shapes.iter().map(|s| s.id().as_str()).collect()
    }

    fn three_creates() -> History {
        let mut history = History::default();
        let mut state = Vec::new();
        for id in ["a", "b", "c"] {
            state.push(shape(id));
            assert!(history.record(&state));
        }
        history
    }

    #[test]
    fn test_empty_state_does_not_seed() {
        let mut history = History::default();
        assert!(!history.record(&[]));
        assert!(history.is_empty());
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_undo_redo() {
        let mut history = three_creates();
        assert_eq!(history.len(), 3);

        let undone = history.undo().unwrap();
        assert_eq!(ids(&undone), vec!["a", "b"]);
        let redone = history.redo().unwrap();
        assert_eq!(ids(&redone), vec!["a", "b", "c"]);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_record_after_undo_discards_branch() {
        let mut history = three_creates();
        let mut state = history.undo().unwrap();
        state.push(shape("d"));
        assert!(history.record(&state));

        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(ids(history.current().unwrap()), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_pending_churn_is_not_recorded() {
        let mut history = History::default();
        let mut state = vec![shape("a")];
        state[0].set_pending(true);
        history.record(&state);
        state[0].set_pending(false);
        assert!(!history.record(&state));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_empty_state_recorded_once_seeded() {
        let mut history = History::default();
        history.record(&[shape("a")]);
        assert!(history.record(&[]));
        assert_eq!(ids(&history.undo().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut history = History::new(2);
        history.record(&[shape("a")]);
        history.record(&[shape("a"), shape("b")]);
        history.record(&[shape("a"), shape("b"), shape("c")]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 1);
        assert_eq!(ids(&history.undo().unwrap()), vec!["a", "b"]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_rename_shape() {
        let mut history = History::default();
        let mut pending = shape("temp_1");
        pending.set_pending(true);
        history.record(&[shape("a")]);
        history.record(&[shape("a"), pending]);

        history.rename_shape(&ShapeId::new("temp_1"), &ShapeId::new("real"));
        let current = history.current().unwrap();
        assert_eq!(ids(current), vec!["a", "real"]);
        assert!(!current[1].is_pending());
        assert!(!history.record(&[shape("a"), shape("real")]));
    }

    #[test]
    fn test_rename_drops_echoed_duplicate() {
        let mut history = History::default();
        let mut pending = shape("temp_1");
        pending.set_pending(true);
        history.record(&[shape("a"), pending.clone()]);
        // echo of the same create merged before the ack
        history.record(&[shape("a"), pending, shape("real")]);

        history.rename_shape(&ShapeId::new("temp_1"), &ShapeId::new("real"));
        assert_eq!(history.len(), 1);
        assert_eq!(ids(history.current().unwrap()), vec!["a", "real"]);
        assert!(!history.can_undo());
        assert!(!history.record(&[shape("a"), shape("real")]));
    }

    #[test]
    fn test_rename_keeps_renamed_position() {
        let mut history = History::default();
        history.record(&[shape("a")]);
        // a snapshot put the stored copy first, the pending entry after it
        history.record(&[shape("a"), shape("real"), shape("temp_1")]);
        history.record(&[shape("a"), shape("real"), shape("temp_1"), shape("b")]);

        history.rename_shape(&ShapeId::new("temp_1"), &ShapeId::new("real"));
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(ids(history.current().unwrap()), vec!["a", "real", "b"]);
        assert_eq!(ids(&history.undo().unwrap()), vec!["a", "real"]);
        assert_eq!(ids(&history.undo().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_forget_shape_collapses() {
        let mut history = History::default();
        history.record(&[shape("a")]);
        history.record(&[shape("a"), shape("t")]);
        history.record(&[shape("a"), shape("t"), shape("b")]);

        history.forget_shape(&ShapeId::new("t"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 1);
        assert_eq!(ids(history.current().unwrap()), vec!["a", "b"]);
        assert_eq!(ids(&history.undo().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_forget_only_shape_resets() {
        let mut history = History::default();
        history.record(&[shape("t")]);
        history.forget_shape(&ShapeId::new("t"));
        assert!(history.is_empty());
        assert!(!history.can_undo());
    }
}
