// SPDX-License-Identifier: MIT OR Apache-2.0
//! User-facing errors of the animation module.

use crate::commands::CommandError;
use compositor_graph::{CurveError, NodeId};

/// A rejected editing request. The graph and the selection are left unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    /// Paste needs exactly one selected curve
    #[error("You must select exactly one target item to paste keyframes onto (currently {0} selected)")]
    PasteTargetCount(usize),

    /// Rename needs exactly one selected node
    #[error("You must select exactly one node to rename (currently {0} selected)")]
    RenameTargetCount(usize),

    /// Interpolation only applies to numeric curves
    #[error("Interpolation can only be changed on numeric curves, {0} is not numeric")]
    NonNumericInterpolation(String),

    /// The operation needs a selection
    #[error("Nothing selected to {0}")]
    EmptySelection(&'static str),

    /// The dry run of a warp failed
    #[error("The transform cannot be applied: {0}")]
    WarpRejected(CurveError),

    /// Node is not part of the animation module
    #[error("Node {0:?} is not part of the animation module")]
    UnknownNode(NodeId),

    /// Reader operation on another kind of node
    #[error("{0} is not a reader")]
    NotAReader(String),

    /// The command failed and was rolled back
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result alias for animation module operations
pub type Result<T> = std::result::Result<T, AnimationError>;

/// What an accepted request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The request was clamped to the current state, nothing was pushed
    Unchanged,
    /// One undoable command was pushed
    Applied,
}

impl EditOutcome {
    /// Whether a command was pushed
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
