// SPDX-License-Identifier: MIT OR Apache-2.0
//! Item tables: trees of rows owned by a node, such as tracks of a tracker.

use crate::curve::Curve;
use crate::knob::KnobId;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a table item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableItemId(pub Uuid);

impl TableItemId {
    /// Create a new random table item ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TableItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named table of items owned by a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTable {
    /// Table name
    pub name: String,
    /// Top-level rows, in display order
    pub roots: Vec<TableItemId>,
}

impl ItemTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roots: Vec::new(),
        }
    }
}

/// One row of an item table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableItem {
    /// Unique item ID
    pub id: TableItemId,
    /// Display label
    pub label: String,
    /// Node owning the table
    pub node: NodeId,
    /// Index of the table in the node's item tables
    pub table: usize,
    /// Parent row, `None` for a top-level row
    pub parent: Option<TableItemId>,
    /// Child rows, in display order
    pub children: Vec<TableItemId>,
    /// Parameters of this row
    pub knobs: Vec<KnobId>,
    /// Animation carried by the row itself (a shape's keyframes, for instance)
    pub animation: Option<Curve>,
}

impl TableItem {
    /// Whether the row carries its own animation curve
    pub fn has_own_animation(&self) -> bool {
        self.animation.is_some()
    }
}
