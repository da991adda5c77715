// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, their knobs, item tables and connections.

use crate::connection::{Connection, ConnectionId};
use crate::curve::Curve;
use crate::item_table::{ItemTable, TableItem, TableItemId};
use crate::knob::{DimIdx, Knob, KnobId, KnobTemplate, ViewIdx};
use crate::node::{knob_names, plugin_ids, Node, NodeId, NodeRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Entity holding a knob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnobOwner {
    /// Knob of a node
    Node(NodeId),
    /// Knob of a table item
    TableItem(TableItemId),
}

/// Address of one curve in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveLocation {
    /// Curve of a knob for one (view, dimension)
    Knob {
        /// Knob
        knob: KnobId,
        /// View
        view: ViewIdx,
        /// Dimension
        dim: DimIdx,
    },
    /// Animation carried by a table item
    TableItem(TableItemId),
}

/// A compositing node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    nodes: IndexMap<NodeId, Node>,
    knobs: IndexMap<KnobId, Knob>,
    knob_owners: IndexMap<KnobId, KnobOwner>,
    table_items: IndexMap<TableItemId, TableItem>,
    connections: IndexMap<ConnectionId, Connection>,
    registry: NodeRegistry,
}

impl Graph {
    /// Create a new empty graph using the built-in plugins
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_registry(name, NodeRegistry::with_builtins())
    }

    /// Create a new empty graph with a custom plugin registry
    pub fn with_registry(name: impl Into<String>, registry: NodeRegistry) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            knobs: IndexMap::new(),
            knob_owners: IndexMap::new(),
            table_items: IndexMap::new(),
            connections: IndexMap::new(),
            registry,
        }
    }

    /// Plugin registry
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Instantiate a top-level node
    pub fn create_node(&mut self, plugin_id: &str, name: &str) -> Result<NodeId, GraphError> {
        self.create_node_in_group(plugin_id, name, None)
    }

    /// Instantiate a node inside `group`, or at the top level
    pub fn create_node_in_group(
        &mut self,
        plugin_id: &str,
        name: &str,
        group: Option<NodeId>,
    ) -> Result<NodeId, GraphError> {
        if let Some(group) = group {
            match self.nodes.get(&group) {
                Some(node) if node.is_group() => {}
                Some(_) => return Err(GraphError::NotAGroup(group)),
                None => return Err(GraphError::NodeNotFound(group)),
            }
        }
        let plugin = self
            .registry
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownPlugin(plugin_id.to_string()))?;

        let id = NodeId::new();
        let mut knobs = Vec::with_capacity(plugin.knobs.len());
        for template in &plugin.knobs {
            knobs.push(self.insert_knob(template, KnobOwner::Node(id)));
        }
        let name = self.unique_name(name, group);
        let node = Node {
            id,
            plugin_id: plugin.id.clone(),
            name,
            knobs,
            input_count: plugin.input_count,
            group,
            item_tables: plugin.item_tables.iter().map(ItemTable::new).collect(),
            settings_panel_open: false,
            position: [0.0, 0.0],
        };
        tracing::debug!("Created node {} ({})", node.name, node.plugin_id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    fn insert_knob(&mut self, template: &KnobTemplate, owner: KnobOwner) -> KnobId {
        let knob = Knob::from_template(template);
        let id = knob.id;
        self.knobs.insert(id, knob);
        self.knob_owners.insert(id, owner);
        id
    }

    fn unique_name(&self, base: &str, group: Option<NodeId>) -> String {
        let taken = |candidate: &str| {
            self.nodes
                .values()
                .any(|n| n.group == group && n.name == candidate)
        };
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}{i}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Rename a node, keeping names unique among siblings
    pub fn rename_node(&mut self, node_id: NodeId, name: &str) -> Result<(), GraphError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GraphError::InvalidName(name.to_string()));
        }
        let group = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?.group;
        if self
            .nodes
            .values()
            .any(|n| n.id != node_id && n.group == group && n.name == name)
        {
            return Err(GraphError::NameTaken(name.to_string()));
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.name = name.to_string();
        }
        Ok(())
    }

    /// Remove a node, every node it contains, their knobs, table items and connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        for child in self.nodes_in_group(node_id) {
            self.remove_node(child);
        }
        self.connections.retain(|_, c| !c.involves_node(node_id));
        let node = self.nodes.shift_remove(&node_id)?;
        let roots: Vec<TableItemId> = node
            .item_tables
            .iter()
            .flat_map(|t| t.roots.iter().copied())
            .collect();
        for root in roots {
            self.remove_table_item(root);
        }
        for knob in &node.knobs {
            self.knobs.shift_remove(knob);
            self.knob_owners.shift_remove(knob);
        }
        tracing::debug!("Removed node {}", node.name);
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a knob by ID
    pub fn knob(&self, knob_id: KnobId) -> Option<&Knob> {
        self.knobs.get(&knob_id)
    }

    /// Get a mutable knob by ID
    pub fn knob_mut(&mut self, knob_id: KnobId) -> Option<&mut Knob> {
        self.knobs.get_mut(&knob_id)
    }

    /// Entity holding a knob
    pub fn knob_owner(&self, knob_id: KnobId) -> Option<KnobOwner> {
        self.knob_owners.get(&knob_id).copied()
    }

    /// Find a node's knob by script name
    pub fn knob_id_by_name(&self, node_id: NodeId, name: &str) -> Option<KnobId> {
        self.nodes
            .get(&node_id)?
            .knobs
            .iter()
            .copied()
            .find(|k| self.knobs.get(k).is_some_and(|knob| knob.name == name))
    }

    /// Find a node's knob by script name
    pub fn knob_by_name(&self, node_id: NodeId, name: &str) -> Option<&Knob> {
        self.knob_id_by_name(node_id, name)
            .and_then(|id| self.knobs.get(&id))
    }

    /// Static value of a node's knob, 0 when missing
    pub fn knob_value(&self, node_id: NodeId, name: &str, dim: usize) -> f64 {
        self.knob_by_name(node_id, name)
            .map(|k| k.value(DimIdx(dim), ViewIdx(0)))
            .unwrap_or(0.0)
    }

    /// Set the static value of a node's knob in the main view
    pub fn set_knob_value(&mut self, node_id: NodeId, name: &str, dim: usize, value: f64) -> Result<(), GraphError> {
        let knob_id = self
            .knob_id_by_name(node_id, name)
            .ok_or_else(|| GraphError::KnobNotFound(name.to_string()))?;
        let knob = self
            .knobs
            .get_mut(&knob_id)
            .ok_or_else(|| GraphError::KnobNotFound(name.to_string()))?;
        if knob.set_value(DimIdx(dim), ViewIdx(0), value) {
            Ok(())
        } else {
            Err(GraphError::KnobNotFound(name.to_string()))
        }
    }

    /// Curve at a location
    pub fn curve(&self, location: CurveLocation) -> Option<&Curve> {
        match location {
            CurveLocation::Knob { knob, view, dim } => self.knobs.get(&knob)?.curve(view, dim),
            CurveLocation::TableItem(item) => self.table_items.get(&item)?.animation.as_ref(),
        }
    }

    /// Mutable curve at a location
    pub fn curve_mut(&mut self, location: CurveLocation) -> Option<&mut Curve> {
        match location {
            CurveLocation::Knob { knob, view, dim } => {
                self.knobs.get_mut(&knob)?.curve_mut(view, dim)
            }
            CurveLocation::TableItem(item) => self.table_items.get_mut(&item)?.animation.as_mut(),
        }
    }

    /// Replace the curve at a location, returns false if it does not exist
    pub fn set_curve(&mut self, location: CurveLocation, curve: Curve) -> bool {
        match self.curve_mut(location) {
            Some(slot) => {
                *slot = curve;
                true
            }
            None => false,
        }
    }

    /// Insert a row in one of a node's item tables.
    ///
    /// `index` is clamped to the number of siblings.
    pub fn insert_table_item(
        &mut self,
        node_id: NodeId,
        table: usize,
        parent: Option<TableItemId>,
        index: usize,
        label: &str,
        knobs: &[KnobTemplate],
    ) -> Result<TableItemId, GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if table >= node.item_tables.len() {
            return Err(GraphError::TableNotFound { node: node_id, table });
        }
        if let Some(parent) = parent {
            match self.table_items.get(&parent) {
                Some(p) if p.node == node_id && p.table == table => {}
                _ => return Err(GraphError::TableItemNotFound(parent)),
            }
        }

        let id = TableItemId::new();
        let knob_ids = knobs
            .iter()
            .map(|t| self.insert_knob(t, KnobOwner::TableItem(id)))
            .collect();
        self.table_items.insert(
            id,
            TableItem {
                id,
                label: label.to_string(),
                node: node_id,
                table,
                parent,
                children: Vec::new(),
                knobs: knob_ids,
                animation: None,
            },
        );

        let siblings = match parent {
            Some(parent) => self.table_items.get_mut(&parent).map(|p| &mut p.children),
            None => self
                .nodes
                .get_mut(&node_id)
                .and_then(|n| n.item_tables.get_mut(table))
                .map(|t| &mut t.roots),
        };
        if let Some(siblings) = siblings {
            let index = index.min(siblings.len());
            siblings.insert(index, id);
        }
        Ok(id)
    }

    /// Remove a row, its children and their knobs
    pub fn remove_table_item(&mut self, item_id: TableItemId) -> Option<TableItem> {
        let item = self.table_items.shift_remove(&item_id)?;
        for child in &item.children {
            self.remove_table_item(*child);
        }
        for knob in &item.knobs {
            self.knobs.shift_remove(knob);
            self.knob_owners.shift_remove(knob);
        }
        match item.parent {
            Some(parent) => {
                if let Some(p) = self.table_items.get_mut(&parent) {
                    p.children.retain(|c| *c != item_id);
                }
            }
            None => {
                if let Some(t) = self
                    .nodes
                    .get_mut(&item.node)
                    .and_then(|n| n.item_tables.get_mut(item.table))
                {
                    t.roots.retain(|c| *c != item_id);
                }
            }
        }
        Some(item)
    }

    /// Get a table item by ID
    pub fn table_item(&self, item_id: TableItemId) -> Option<&TableItem> {
        self.table_items.get(&item_id)
    }

    /// Get a mutable table item by ID
    pub fn table_item_mut(&mut self, item_id: TableItemId) -> Option<&mut TableItem> {
        self.table_items.get_mut(&item_id)
    }

    /// Top-level rows of every item table of a node
    pub fn table_roots(&self, node_id: NodeId) -> Vec<TableItemId> {
        self.nodes
            .get(&node_id)
            .map(|n| n.item_tables.iter().flat_map(|t| t.roots.iter().copied()).collect())
            .unwrap_or_default()
    }

    /// Connect the output of `from_node` to input slot `input_index` of `to_node`
    pub fn connect(
        &mut self,
        from_node: NodeId,
        to_node: NodeId,
        input_index: usize,
    ) -> Result<ConnectionId, ConnectionError> {
        if !self.nodes.contains_key(&from_node) {
            return Err(ConnectionError::NodeNotFound(from_node));
        }
        let target = self
            .nodes
            .get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;
        if input_index >= target.input_count {
            return Err(ConnectionError::InputOutOfRange(input_index));
        }
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }
        if self.input(to_node, input_index).is_some() {
            return Err(ConnectionError::InputOccupied(input_index));
        }

        let connection = Connection::new(from_node, to_node, input_index);
        let id = connection.id;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Node connected to an input slot
    pub fn input(&self, node_id: NodeId, input_index: usize) -> Option<NodeId> {
        self.connections
            .values()
            .find(|c| c.to_node == node_id && c.input_index == input_index)
            .map(|c| c.from_node)
    }

    /// Nodes connected to the inputs of a node, by input slot
    pub fn inputs(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut inputs: Vec<&Connection> = self
            .connections
            .values()
            .filter(|c| c.to_node == node_id)
            .collect();
        inputs.sort_by_key(|c| c.input_index);
        inputs.into_iter().map(|c| c.from_node).collect()
    }

    /// Nodes fed by the output of a node
    pub fn outputs(&self, node_id: NodeId) -> Vec<NodeId> {
        self.connections
            .values()
            .filter(|c| c.from_node == node_id)
            .map(|c| c.to_node)
            .collect()
    }

    /// Nodes directly contained in a group
    pub fn nodes_in_group(&self, group: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.group == Some(group))
            .map(|n| n.id)
            .collect()
    }

    /// Nodes contained in a group and in its sub-groups
    pub fn nodes_in_group_recursive(&self, group: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in self.nodes_in_group(group) {
            out.push(child);
            out.extend(self.nodes_in_group_recursive(child));
        }
        out
    }

    /// First time node found walking the outputs of `node_id` depth-first,
    /// without leaving the node's group
    pub fn nearest_time_node_from_outputs(&self, node_id: NodeId) -> Option<NodeId> {
        let scope = self.nodes.get(&node_id)?.group;
        let mut visited = HashSet::new();
        self.visit_outputs_for_time_node(node_id, scope, &mut visited)
    }

    fn visit_outputs_for_time_node(
        &self,
        node_id: NodeId,
        scope: Option<NodeId>,
        visited: &mut HashSet<NodeId>,
    ) -> Option<NodeId> {
        if !visited.insert(node_id) {
            return None;
        }
        for output in self.outputs(node_id) {
            let Some(node) = self.nodes.get(&output) else {
                continue;
            };
            if node.group != scope {
                continue;
            }
            if node.is_time_node() {
                return Some(output);
            }
            if let Some(found) = self.visit_outputs_for_time_node(output, scope, visited) {
                return Some(found);
            }
        }
        None
    }

    /// First reader found walking the inputs of `node_id` depth-first
    pub fn nearest_reader(&self, node_id: NodeId) -> Option<NodeId> {
        let mut visited = HashSet::new();
        self.visit_inputs_for_reader(node_id, &mut visited)
    }

    fn visit_inputs_for_reader(&self, node_id: NodeId, visited: &mut HashSet<NodeId>) -> Option<NodeId> {
        if !visited.insert(node_id) {
            return None;
        }
        for input in self.inputs(node_id) {
            if self.nodes.get(&input).is_some_and(Node::is_reader) {
                return Some(input);
            }
            if let Some(found) = self.visit_inputs_for_reader(input, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Every node reachable through the inputs of `node_id`, excluding itself
    pub fn upstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        visited.insert(node_id);
        let mut out = Vec::new();
        let mut stack = self.inputs(node_id);
        stack.reverse();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            out.push(current);
            let mut inputs = self.inputs(current);
            inputs.reverse();
            stack.extend(inputs);
        }
        out
    }

    /// Input frame a node needs to render output frame `time`
    pub fn frames_needed(&self, node_id: NodeId, time: f64) -> f64 {
        let Some(node) = self.nodes.get(&node_id) else {
            return time;
        };
        match node.plugin_id.as_str() {
            plugin_ids::RETIME => time * self.knob_value(node_id, knob_names::SPEED, 0),
            plugin_ids::TIME_OFFSET => time - self.knob_value(node_id, knob_names::TIME_OFFSET, 0),
            _ => time,
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when editing the graph structure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Plugin not registered
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Node is not a group
    #[error("Node is not a group: {0:?}")]
    NotAGroup(NodeId),

    /// Knob not found
    #[error("Knob not found: {0}")]
    KnobNotFound(String),

    /// Item table not found
    #[error("Node {node:?} has no item table {table}")]
    TableNotFound {
        /// Node
        node: NodeId,
        /// Table index
        table: usize,
    },

    /// Table item not found
    #[error("Table item not found: {0:?}")]
    TableItemNotFound(TableItemId),

    /// Name already used by a sibling
    #[error("A node named {0} already exists")]
    NameTaken(String),

    /// Empty or invalid name
    #[error("Invalid node name: {0:?}")]
    InvalidName(String),
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Input slot does not exist
    #[error("Input {0} out of range")]
    InputOutOfRange(usize),

    /// Input slot is already connected
    #[error("Input {0} already connected")]
    InputOccupied(usize),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knob::KnobKind;

    #[test]
    fn test_create_node_instantiates_knobs() {
        let mut graph = Graph::default();
        let read = graph.create_node(plugin_ids::READ, "Read").unwrap();
        assert!(graph.knob_by_name(read, knob_names::FIRST_FRAME).is_some());
        assert_eq!(graph.knob_value(read, knob_names::ORIGINAL_FRAME_RANGE, 1), 100.0);
        let knob = graph.knob_id_by_name(read, knob_names::LAST_FRAME).unwrap();
        assert_eq!(graph.knob_owner(knob), Some(KnobOwner::Node(read)));
        assert!(matches!(
            graph.create_node("nope", "x"),
            Err(GraphError::UnknownPlugin(_))
        ));
    }

    #[test]
    fn test_unique_names_and_rename() {
        let mut graph = Graph::default();
        let a = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        let b = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        assert_eq!(graph.node(b).unwrap().name, "Blur1");
        assert_eq!(graph.rename_node(a, "Blur1"), Err(GraphError::NameTaken("Blur1".into())));
        assert!(graph.rename_node(a, "Soft").is_ok());
        assert_eq!(graph.node(a).unwrap().name, "Soft");
    }

    #[test]
    fn test_connection_validation() {
        let mut graph = Graph::default();
        let read = graph.create_node(plugin_ids::READ, "Read").unwrap();
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        assert!(graph.connect(read, blur, 0).is_ok());
        assert_eq!(graph.connect(read, blur, 0), Err(ConnectionError::InputOccupied(0)));
        assert_eq!(graph.connect(blur, read, 0), Err(ConnectionError::InputOutOfRange(0)));
        assert_eq!(graph.connect(blur, blur, 0), Err(ConnectionError::SelfLoop));
        assert_eq!(graph.inputs(blur), vec![read]);
        assert_eq!(graph.outputs(read), vec![blur]);
    }

    #[test]
    fn test_nearest_time_node_stays_in_scope() {
        let mut graph = Graph::default();
        let read = graph.create_node(plugin_ids::READ, "Read").unwrap();
        let a = graph.create_node(plugin_ids::BLUR, "A").unwrap();
        let b = graph.create_node(plugin_ids::BLUR, "B").unwrap();
        let retime = graph.create_node(plugin_ids::RETIME, "Retime").unwrap();
        graph.connect(read, a, 0).unwrap();
        graph.connect(a, b, 0).unwrap();
        graph.connect(b, retime, 0).unwrap();
        assert_eq!(graph.nearest_time_node_from_outputs(read), Some(retime));
        assert_eq!(graph.nearest_reader(retime), Some(read));

        let group = graph.create_node(plugin_ids::GROUP, "Group").unwrap();
        let inner = graph
            .create_node_in_group(plugin_ids::TIME_OFFSET, "Offset", Some(group))
            .unwrap();
        let c = graph.create_node(plugin_ids::BLUR, "C").unwrap();
        graph.connect(c, inner, 0).unwrap();
        assert_eq!(graph.nearest_time_node_from_outputs(c), None);
    }

    #[test]
    fn test_traversal_on_cyclic_graph() {
        let mut graph = Graph::default();
        let a = graph.create_node(plugin_ids::BLUR, "A").unwrap();
        let b = graph.create_node(plugin_ids::BLUR, "B").unwrap();
        graph.connect(a, b, 0).unwrap();
        graph.connect(b, a, 0).unwrap();
        assert_eq!(graph.nearest_reader(a), None);
        assert_eq!(graph.nearest_time_node_from_outputs(a), None);
        assert_eq!(graph.upstream_nodes(a), vec![b]);
    }

    #[test]
    fn test_remove_group_cascades() {
        let mut graph = Graph::default();
        let group = graph.create_node(plugin_ids::GROUP, "Group").unwrap();
        let inner = graph.create_node_in_group(plugin_ids::BLUR, "Blur", Some(group)).unwrap();
        let knob = graph.node(inner).unwrap().knobs[0];
        graph.remove_node(group);
        assert!(graph.node(inner).is_none());
        assert!(graph.knob(knob).is_none());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_table_items() {
        let mut graph = Graph::default();
        let tracker = graph.create_node(plugin_ids::TRACKER, "Tracker").unwrap();
        let templates = [KnobTemplate::new("center", KnobKind::Double, vec![0.0, 0.0])];
        let first = graph.insert_table_item(tracker, 0, None, 0, "track1", &templates).unwrap();
        let second = graph.insert_table_item(tracker, 0, None, 0, "track2", &templates).unwrap();
        let child = graph.insert_table_item(tracker, 0, Some(first), 5, "sub", &[]).unwrap();
        assert_eq!(graph.table_roots(tracker), vec![second, first]);
        assert_eq!(graph.table_item(first).unwrap().children, vec![child]);
        assert!(graph.insert_table_item(tracker, 3, None, 0, "bad", &[]).is_err());

        let knob = graph.table_item(first).unwrap().knobs[0];
        assert_eq!(graph.knob_owner(knob), Some(KnobOwner::TableItem(first)));
        graph.remove_table_item(first);
        assert!(graph.table_item(child).is_none());
        assert!(graph.knob(knob).is_none());
        assert_eq!(graph.table_roots(tracker), vec![second]);
    }

    #[test]
    fn test_frames_needed() {
        let mut graph = Graph::default();
        let retime = graph.create_node(plugin_ids::RETIME, "Retime").unwrap();
        graph.set_knob_value(retime, knob_names::SPEED, 0, 2.0).unwrap();
        assert_eq!(graph.frames_needed(retime, 10.0), 20.0);
        let offset = graph.create_node(plugin_ids::TIME_OFFSET, "Offset").unwrap();
        graph.set_knob_value(offset, knob_names::TIME_OFFSET, 0, 5.0).unwrap();
        assert_eq!(graph.frames_needed(offset, 10.0), 5.0);
    }
}
