// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of `from_node` feeding input slot `input_index` of `to_node`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Upstream node
    pub from_node: NodeId,
    /// Downstream node
    pub to_node: NodeId,
    /// Input slot on the downstream node
    pub input_index: usize,
}

impl Connection {
    /// Create a new connection
    pub fn new(from_node: NodeId, to_node: NodeId, input_index: usize) -> Self {
        Self {
            id: ConnectionId::new(),
            from_node,
            to_node,
            input_index,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}
