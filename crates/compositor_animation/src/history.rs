// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of animation edits.
//!
//! Every edit stores bincode snapshots of the graph state it touched, taken
//! before and after, so undo and redo restore exact curves and knob values.

use crate::commands::{CommandEffect, MergeKey};
use compositor_graph::{Curve, CurveLocation, Graph, Knob, KnobId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Default number of undoable edits kept
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// The snapshotted state no longer exists in the graph
    #[error("Snapshot target no longer exists: {0:?}")]
    TargetNotFound(StateTarget),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized piece of graph state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot(Vec<u8>);

impl StateSnapshot {
    /// Serialize a value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self(bincode::serialize(value)?))
    }

    /// Deserialize the stored value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.0)?)
    }
}

/// Piece of graph state an edit touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateTarget {
    /// One curve
    Curve(CurveLocation),
    /// Values and curves of a knob
    Knob(KnobId),
    /// Name of a node
    NodeName(NodeId),
}

impl StateTarget {
    /// Snapshot the current state of the target
    pub fn capture(&self, graph: &Graph) -> Result<StateSnapshot> {
        match *self {
            Self::Curve(location) => {
                let curve = graph.curve(location).ok_or(HistoryError::TargetNotFound(*self))?;
                StateSnapshot::from_value(curve)
            }
            Self::Knob(knob) => {
                let knob = graph.knob(knob).ok_or(HistoryError::TargetNotFound(*self))?;
                StateSnapshot::from_value(knob)
            }
            Self::NodeName(node) => {
                let node = graph.node(node).ok_or(HistoryError::TargetNotFound(*self))?;
                StateSnapshot::from_value(&node.name)
            }
        }
    }

    /// Put a snapshot back into the graph
    pub fn restore(&self, graph: &mut Graph, snapshot: &StateSnapshot) -> Result<()> {
        match *self {
            Self::Curve(location) => {
                let curve: Curve = snapshot.to_value()?;
                if !graph.set_curve(location, curve) {
                    return Err(HistoryError::TargetNotFound(*self));
                }
            }
            Self::Knob(id) => {
                let knob: Knob = snapshot.to_value()?;
                let slot = graph.knob_mut(id).ok_or(HistoryError::TargetNotFound(*self))?;
                *slot = knob;
            }
            Self::NodeName(id) => {
                let name: String = snapshot.to_value()?;
                let node = graph.node_mut(id).ok_or(HistoryError::TargetNotFound(*self))?;
                node.name = name;
            }
        }
        Ok(())
    }
}

/// Before and after state of one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// State the snapshots were taken from
    pub target: StateTarget,
    /// State before the edit
    pub before: StateSnapshot,
    /// State after the edit
    pub after: StateSnapshot,
}

/// Operations undone and redone together, one per user edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationGroup {
    /// Human-readable description
    pub description: String,
    /// Operations in this group
    pub operations: Vec<Operation>,
    /// What redoing the group changes
    pub effect: CommandEffect,
    /// Consecutive groups with equal keys may be merged
    pub merge_key: Option<MergeKey>,
}

impl OperationGroup {
    /// Create an empty group
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            operations: Vec::new(),
            effect: CommandEffect::default(),
            merge_key: None,
        }
    }

    /// Record the before and after state of a target
    pub fn push(&mut self, target: StateTarget, before: StateSnapshot, after: StateSnapshot) {
        self.operations.push(Operation { target, before, after });
    }

    /// Restore the state from before the group, last operation first
    pub fn restore_before(&self, graph: &mut Graph) -> Result<()> {
        for op in self.operations.iter().rev() {
            op.target.restore(graph, &op.before)?;
        }
        Ok(())
    }

    /// Restore the state from after the group
    pub fn restore_after(&self, graph: &mut Graph) -> Result<()> {
        for op in &self.operations {
            op.target.restore(graph, &op.after)?;
        }
        Ok(())
    }

    /// Fold a later group into this one: original before states, latest after states
    fn absorb(&mut self, later: OperationGroup) {
        for op in later.operations {
            match self.operations.iter_mut().find(|o| o.target == op.target) {
                Some(existing) => existing.after = op.after,
                None => self.operations.push(op),
            }
        }
        self.effect = std::mem::take(&mut self.effect).then(later.effect);
    }
}

/// Bounded undo and redo stacks
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<OperationGroup>,
    redo_stack: VecDeque<OperationGroup>,
    max_depth: usize,
}

impl History {
    /// Create a history keeping [`MAX_HISTORY`] edits
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
        }
    }

    /// Commit an operation group. Empty groups are dropped.
    ///
    /// With `allow_merge`, a group whose merge key equals the one of the last
    /// undoable group is folded into it instead of pushed.
    pub fn commit(&mut self, group: OperationGroup, allow_merge: bool) {
        if group.operations.is_empty() {
            return;
        }

        let mergeable = allow_merge
            && self.redo_stack.is_empty()
            && group.merge_key.is_some()
            && self.undo_stack.back().is_some_and(|last| last.merge_key == group.merge_key);
        if mergeable {
            if let Some(last) = self.undo_stack.back_mut() {
                last.absorb(group);
                tracing::debug!("Merged edit into '{}'", last.description);
                return;
            }
        }

        self.redo_stack.clear();
        self.undo_stack.push_back(group);
        self.trim();
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Pop the last edit onto the redo stack
    pub fn undo(&mut self) -> Result<OperationGroup> {
        let group = self.undo_stack.pop_back().ok_or(HistoryError::NothingToUndo)?;
        self.redo_stack.push_back(group.clone());
        Ok(group)
    }

    /// Pop the last undone edit back onto the undo stack
    pub fn redo(&mut self) -> Result<OperationGroup> {
        let group = self.redo_stack.pop_back().ok_or(HistoryError::NothingToRedo)?;
        self.undo_stack.push_back(group.clone());
        Ok(group)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable edits
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Change the maximum depth, dropping the oldest edits if needed
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
        self.trim();
    }

    /// Description of the next edit to undo
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|g| g.description.as_str())
    }

    /// Description of the next edit to redo
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|g| g.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compositor_graph::{plugin_ids, DimIdx, Keyframe, ViewIdx};

    fn curve_group(graph: &mut Graph, location: CurveLocation, time: f64) -> OperationGroup {
        let target = StateTarget::Curve(location);
        let before = target.capture(graph).unwrap();
        graph.curve_mut(location).unwrap().set_keyframe(Keyframe::new(time, 1.0));
        let after = target.capture(graph).unwrap();
        let mut group = OperationGroup::new(format!("Key at {time}"));
        group.push(target, before, after);
        group
    }

    fn setup() -> (Graph, CurveLocation) {
        let mut graph = Graph::default();
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        let knob = graph.knob_id_by_name(blur, "size").unwrap();
        (graph, CurveLocation::Knob { knob, view: ViewIdx(0), dim: DimIdx(0) })
    }

    #[test]
    fn test_undo_redo_restores_snapshots() {
        let (mut graph, location) = setup();
        let mut history = History::new();
        history.commit(curve_group(&mut graph, location, 5.0), false);
        assert_eq!(history.undo_description(), Some("Key at 5"));
        assert_eq!(history.redo_description(), None);

        let group = history.undo().unwrap();
        group.restore_before(&mut graph).unwrap();
        assert!(graph.curve(location).unwrap().is_empty());
        assert!(history.can_redo());
        assert_eq!(history.redo_description(), Some("Key at 5"));

        let group = history.redo().unwrap();
        group.restore_after(&mut graph).unwrap();
        assert_eq!(graph.curve(location).unwrap().len(), 1);
        assert!(matches!(history.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_max_depth() {
        let (mut graph, location) = setup();
        let mut history = History::with_max_depth(3);
        for t in 0..3 {
            history.commit(curve_group(&mut graph, location, f64::from(t)), false);
        }
        history.commit(OperationGroup::new("Nothing"), false);
        assert_eq!(history.undo_depth(), 3);

        history.set_max_depth(2);
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.undo_description(), Some("Key at 2"));
    }

    #[test]
    fn test_merge_keeps_first_before_state() {
        let (mut graph, location) = setup();
        let mut history = History::new();
        let key = MergeKey::default();
        for t in 0..3 {
            let mut group = curve_group(&mut graph, location, f64::from(t));
            group.merge_key = Some(key.clone());
            history.commit(group, t > 0);
        }
        assert_eq!(history.undo_depth(), 1);
        let group = history.undo().unwrap();
        assert_eq!(group.operations.len(), 1);
        group.restore_before(&mut graph).unwrap();
        assert!(graph.curve(location).unwrap().is_empty());
    }

    #[test]
    fn test_missing_target() {
        let (mut graph, location) = setup();
        let target = StateTarget::Curve(location);
        let snapshot = target.capture(&graph).unwrap();
        let node = graph.node_ids().next().unwrap();
        graph.remove_node(node);
        assert!(matches!(target.capture(&graph), Err(HistoryError::TargetNotFound(_))));
        assert!(target.restore(&mut graph, &snapshot).is_err());
    }
}
