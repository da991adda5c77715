// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation entry of one graph node and its frame range.

use crate::anim_item::{
    AnimatedItemType, HolderRef, ItemRef, KnobAnimId, KnobsHolderAnimBase, NodeAnimId, TableItemAnimId,
};
use crate::model::AnimationModel;
use crate::tree::{DisplayTree, TreeNodeId, TreeOwner};
use compositor_graph::{knob_names, plugin_ids, DimIdx, Graph, KnobId, Node, NodeId, TableItemId};
use std::collections::BTreeSet;
use ordered_float::OrderedFloat;

/// Wraps a graph node: its knobs, its table rows and its frame range
#[derive(Debug, Clone)]
pub struct NodeAnim {
    id: NodeAnimId,
    node: NodeId,
    item_type: AnimatedItemType,
    root: TreeNodeId,
    pub(crate) knobs: Vec<KnobAnimId>,
    pub(crate) table_items: Vec<TableItemAnimId>,
    frame_range: (f64, f64),
    pub(crate) refresh_guard: u32,
    range_dependencies: Vec<KnobId>,
    keep_visible: bool,
}

/// Role of a node in the animation model
pub fn item_type_for(node: &Node) -> AnimatedItemType {
    match node.plugin_id.as_str() {
        plugin_ids::READ => AnimatedItemType::Reader,
        plugin_ids::RETIME => AnimatedItemType::Retime,
        plugin_ids::TIME_OFFSET => AnimatedItemType::TimeOffset,
        plugin_ids::FRAME_RANGE => AnimatedItemType::FrameRange,
        plugin_ids::GROUP => AnimatedItemType::Group,
        _ => AnimatedItemType::Common,
    }
}

/// Names of the knobs a node's frame range is computed from
fn range_knob_names(item_type: AnimatedItemType) -> &'static [&'static str] {
    match item_type {
        AnimatedItemType::Reader => &[
            knob_names::FIRST_FRAME,
            knob_names::LAST_FRAME,
            knob_names::STARTING_TIME,
            knob_names::ORIGINAL_FRAME_RANGE,
        ],
        AnimatedItemType::Retime => &[knob_names::SPEED],
        AnimatedItemType::TimeOffset => &[knob_names::TIME_OFFSET],
        AnimatedItemType::FrameRange => &[knob_names::FRAME_RANGE],
        _ => &[knob_names::ENABLE_LIFETIME, knob_names::LIFETIME],
    }
}

/// Output range of a reader: `[startingTime, startingTime + lastFrame - firstFrame + 1]`
pub fn reader_range(graph: &Graph, reader: NodeId) -> (f64, f64) {
    let start = graph.knob_value(reader, knob_names::STARTING_TIME, 0);
    let first = graph.knob_value(reader, knob_names::FIRST_FRAME, 0);
    let last = graph.knob_value(reader, knob_names::LAST_FRAME, 0);
    (start, start + (last - first) + 1.0)
}

impl NodeAnim {
    /// First construction phase: classify the node and create its display row.
    ///
    /// Knob and table entries are attached by [`AnimationModel::add_node`].
    pub(crate) fn new(graph: &Graph, tree: &mut DisplayTree, node_id: NodeId) -> Option<Self> {
        let node = graph.node(node_id)?;
        let item_type = item_type_for(node);
        let id = NodeAnimId::new();
        let root = tree.insert(None, node.name.clone(), TreeOwner::whole(item_type, ItemRef::Node(id)));
        let mut range_dependencies: Vec<KnobId> = range_knob_names(item_type)
            .iter()
            .filter_map(|name| graph.knob_id_by_name(node_id, name))
            .collect();
        if item_type != AnimatedItemType::Common {
            range_dependencies.extend(
                [knob_names::ENABLE_LIFETIME, knob_names::LIFETIME]
                    .iter()
                    .filter_map(|name| graph.knob_id_by_name(node_id, name)),
            );
        }
        Some(Self {
            id,
            node: node_id,
            item_type,
            root,
            knobs: Vec::new(),
            table_items: Vec::new(),
            frame_range: (0.0, 0.0),
            refresh_guard: 0,
            range_dependencies,
            keep_visible: false,
        })
    }

    /// Handle of this entry
    pub fn id(&self) -> NodeAnimId {
        self.id
    }

    /// Wrapped graph node
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Role of the node
    pub fn item_type(&self) -> AnimatedItemType {
        self.item_type
    }

    /// Display row
    pub fn root_item(&self) -> TreeNodeId {
        self.root
    }

    /// Top-level table row entries
    pub fn top_level_table_items(&self) -> &[TableItemAnimId] {
        &self.table_items
    }

    /// Cached frame range
    pub fn frame_range(&self) -> (f64, f64) {
        self.frame_range
    }

    pub(crate) fn set_frame_range(&mut self, range: (f64, f64)) {
        self.frame_range = range;
    }

    /// Whether a change of `knob` affects the frame range
    pub fn depends_on(&self, knob: KnobId) -> bool {
        self.range_dependencies.contains(&knob)
    }

    /// Whether the node stays visible with its settings panel closed
    pub fn keep_visible(&self) -> bool {
        self.keep_visible
    }

    /// Keep the node visible with its settings panel closed
    pub fn set_keep_visible(&mut self, keep: bool) {
        self.keep_visible = keep;
    }

    /// Whether the node's frame range is drawn in the dope sheet
    pub fn is_range_drawing_enabled(&self, graph: &Graph) -> bool {
        match self.item_type {
            AnimatedItemType::Common => graph.knob_value(self.node, knob_names::ENABLE_LIFETIME, 0) != 0.0,
            _ => true,
        }
    }

    /// Whether this row is drawn as a container of other nodes
    pub fn contains_node_context(&self, tree: &DisplayTree) -> bool {
        matches!(self.item_type, AnimatedItemType::Group)
            || self.item_type.is_time_node()
            || tree
                .children(self.root)
                .iter()
                .any(|c| tree.find_item(*c).is_some_and(|o| o.kind.is_node()))
    }

    /// Depth-first search of the row entries of this node for `item`
    pub fn find_table_item(&self, model: &AnimationModel, item: TableItemId) -> Option<TableItemAnimId> {
        self.table_items
            .iter()
            .find_map(|t| model.table_item_anim(*t)?.find_table_item(model, item))
    }

    /// Frame range from the node's current state, using the cached ranges of other nodes
    pub fn compute_frame_range(&self, graph: &Graph, model: &AnimationModel) -> (f64, f64) {
        match self.item_type {
            AnimatedItemType::Reader => reader_range(graph, self.node),
            AnimatedItemType::Retime => {
                let input_range = graph
                    .input(self.node, 0)
                    .and_then(|input| model.node_anim_for(input))
                    .and_then(|anim| model.node_anim(anim))
                    .map_or((0.0, 0.0), NodeAnim::frame_range);
                (
                    graph.frames_needed(self.node, input_range.0),
                    graph.frames_needed(self.node, input_range.1),
                )
            }
            AnimatedItemType::TimeOffset => match graph.nearest_reader(self.node) {
                Some(reader) => {
                    let (min, max) = model
                        .node_anim_for(reader)
                        .and_then(|anim| model.node_anim(anim))
                        .map_or_else(|| reader_range(graph, reader), NodeAnim::frame_range);
                    let offset = graph.knob_value(self.node, knob_names::TIME_OFFSET, 0);
                    (min + offset, max + offset)
                }
                None => (0.0, 0.0),
            },
            AnimatedItemType::FrameRange => (
                graph.knob_value(self.node, knob_names::FRAME_RANGE, 0),
                graph.knob_value(self.node, knob_names::FRAME_RANGE, 1),
            ),
            AnimatedItemType::Group => self.compute_group_range(graph, model),
            _ => {
                if self.is_range_drawing_enabled(graph) {
                    (
                        graph.knob_value(self.node, knob_names::LIFETIME, 0),
                        graph.knob_value(self.node, knob_names::LIFETIME, 1),
                    )
                } else {
                    (0.0, 0.0)
                }
            }
        }
    }

    fn compute_group_range(&self, graph: &Graph, model: &AnimationModel) -> (f64, f64) {
        let mut times: BTreeSet<OrderedFloat<f64>> = BTreeSet::new();
        for child in graph.nodes_in_group(self.node) {
            let Some(anim) = model.node_anim_for(child).and_then(|a| model.node_anim(a)) else {
                continue;
            };
            if !model.tree().is_visible(anim.root) {
                continue;
            }
            if anim.is_range_drawing_enabled(graph) {
                let (min, max) = anim.frame_range;
                times.insert(OrderedFloat(min));
                times.insert(OrderedFloat(max));
            }
            let Some(node) = graph.node(child) else {
                continue;
            };
            for knob in node.knobs.iter().filter_map(|k| graph.knob(*k)) {
                if !knob.has_animation() {
                    continue;
                }
                for view in knob.views() {
                    for d in 0..knob.n_dimensions() {
                        let Some(curve) = knob.curve(*view, DimIdx(d)) else {
                            continue;
                        };
                        if let (Some(first), Some(last)) = (curve.first_keyframe_time(), curve.last_keyframe_time()) {
                            times.insert(OrderedFloat(first));
                            times.insert(OrderedFloat(last));
                        }
                    }
                }
            }
        }
        if times.len() < 2 {
            return (0.0, 0.0);
        }
        match (times.first(), times.last()) {
            (Some(min), Some(max)) => (min.0, max.0),
            _ => (0.0, 0.0),
        }
    }
}

impl KnobsHolderAnimBase for NodeAnim {
    fn holder_ref(&self) -> HolderRef {
        HolderRef::Node(self.id)
    }

    fn knobs(&self) -> &[KnobAnimId] {
        &self.knobs
    }
}
