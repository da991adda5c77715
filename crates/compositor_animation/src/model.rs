// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arena of node, knob and table row entries with their display tree.

use crate::anim_item::{
    AnimItemBase, AnimItemDimViewIndexId, AnimItemRef, AnimatedItemType, HolderRef, ItemRef, KnobAnimId,
    KnobsHolderAnimBase, NodeAnimId, TableItemAnimId,
};
use crate::knob_anim::KnobAnim;
use crate::node_anim::NodeAnim;
use crate::settings::AnimationModuleSettings;
use crate::table_item_anim::TableItemAnim;
use crate::tree::{DisplayTree, TreeNodeId};
use compositor_graph::{CurveLocation, DimIdx, DimSpec, Graph, KnobId, NodeId, TableItemId, ViewIdx, ViewSetSpec};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Entry resolved from a display row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundItem {
    /// Role of the row
    pub kind: AnimatedItemType,
    /// Node shown by the row, or owning the shown knob or table row
    pub node: Option<NodeAnimId>,
    /// Knob shown by the row
    pub knob: Option<KnobAnimId>,
    /// Table row shown by the row, or holding the shown knob
    pub table_item: Option<TableItemAnimId>,
    /// Views covered by the row
    pub view: ViewSetSpec,
    /// Dimensions covered by the row
    pub dim: DimSpec,
}

/// Owner of every animation entry
#[derive(Debug, Clone, Default)]
pub struct AnimationModel {
    nodes: IndexMap<NodeAnimId, NodeAnim>,
    knobs: IndexMap<KnobAnimId, KnobAnim>,
    table_items: IndexMap<TableItemAnimId, TableItemAnim>,
    tree: DisplayTree,
    node_index: HashMap<NodeId, NodeAnimId>,
    knob_index: HashMap<KnobId, KnobAnimId>,
    table_item_index: HashMap<TableItemId, TableItemAnimId>,
}

impl AnimationModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Display tree
    pub fn tree(&self) -> &DisplayTree {
        &self.tree
    }

    /// Mutable display tree
    pub fn tree_mut(&mut self) -> &mut DisplayTree {
        &mut self.tree
    }

    /// Wrap a graph node, its knobs and its table rows. Idempotent.
    pub fn add_node(&mut self, graph: &Graph, node_id: NodeId) -> Option<NodeAnimId> {
        if let Some(existing) = self.node_index.get(&node_id) {
            return Some(*existing);
        }
        let anim = NodeAnim::new(graph, &mut self.tree, node_id)?;
        let id = anim.id();
        let row = anim.root_item();
        let holder = anim.holder_ref();
        self.nodes.insert(id, anim);
        self.node_index.insert(node_id, id);

        let knob_ids = graph.node(node_id).map(|n| n.knobs.clone()).unwrap_or_default();
        let mut knobs = Vec::with_capacity(knob_ids.len());
        for knob in knob_ids {
            if let Some(knob_anim) = KnobAnim::create(graph, &mut self.tree, holder, row, knob) {
                knobs.push(knob_anim.id());
                self.knob_index.insert(knob, knob_anim.id());
                self.knobs.insert(knob_anim.id(), knob_anim);
            }
        }
        if let Some(anim) = self.nodes.get_mut(&id) {
            anim.knobs = knobs;
        }
        for (index, item) in graph.table_roots(node_id).into_iter().enumerate() {
            self.insert_table_item(graph, index, item);
        }
        Some(id)
    }

    /// Remove a node entry with its knob and table row entries.
    ///
    /// Display rows of other nodes nested under it move to the top level.
    pub fn remove_node(&mut self, id: NodeAnimId) -> Option<NodeAnim> {
        let (knobs, items) = {
            let anim = self.nodes.get(&id)?;
            (anim.knobs().to_vec(), anim.table_items.clone())
        };
        for item in items {
            self.remove_table_item_anim(item);
        }
        for knob in knobs {
            self.remove_knob_anim(knob);
        }
        let anim = self.nodes.shift_remove(&id)?;
        for child in self.tree.children(anim.root_item()).to_vec() {
            self.tree.reparent(child, None);
        }
        self.tree.remove_subtree(anim.root_item());
        self.node_index.remove(&anim.node());
        Some(anim)
    }

    fn remove_knob_anim(&mut self, id: KnobAnimId) {
        if let Some(knob) = self.knobs.shift_remove(&id) {
            self.knob_index.remove(&knob.knob());
            knob.destroy(&mut self.tree);
        }
    }

    /// Wrap a table row at `index` among its siblings, then its children.
    ///
    /// No-op when the row is already wrapped. Skipped when its node or parent row
    /// is not wrapped yet; wrapping the parent later picks it up.
    pub fn insert_table_item(&mut self, graph: &Graph, index: usize, item: TableItemId) -> Option<TableItemAnimId> {
        if let Some(existing) = self.table_item_index.get(&item) {
            return Some(*existing);
        }
        let row = graph.table_item(item)?;
        let node = *self.node_index.get(&row.node)?;
        let (parent, parent_row) = match row.parent {
            Some(parent_item) => {
                let parent = *self.table_item_index.get(&parent_item)?;
                (Some(parent), self.table_items.get(&parent)?.root_item())
            }
            None => (None, self.nodes.get(&node)?.root_item()),
        };

        let mut anim = TableItemAnim::new(graph, &mut self.tree, node, parent, parent_row, item)?;
        let id = anim.id();
        for knob in &row.knobs {
            if let Some(knob_anim) =
                KnobAnim::create(graph, &mut self.tree, anim.holder_ref(), anim.root_item(), *knob)
            {
                anim.knobs.push(knob_anim.id());
                self.knob_index.insert(*knob, knob_anim.id());
                self.knobs.insert(knob_anim.id(), knob_anim);
            }
        }
        self.table_items.insert(id, anim);
        self.table_item_index.insert(item, id);

        let siblings = match parent {
            Some(parent) => self.table_items.get_mut(&parent).map(|p| &mut p.children),
            None => self.nodes.get_mut(&node).map(|n| &mut n.table_items),
        };
        if let Some(siblings) = siblings {
            let index = index.min(siblings.len());
            siblings.insert(index, id);
        }

        for (child_index, child) in row.children.iter().enumerate() {
            self.insert_table_item(graph, child_index, *child);
        }
        Some(id)
    }

    /// Remove the entry of a table row and its descendants
    pub fn remove_table_item(&mut self, item: TableItemId) -> Option<TableItemAnim> {
        let id = self.table_item_index.get(&item).copied()?;
        self.remove_table_item_anim(id)
    }

    fn remove_table_item_anim(&mut self, id: TableItemAnimId) -> Option<TableItemAnim> {
        let children = self.table_items.get(&id)?.children.clone();
        for child in children {
            self.remove_table_item_anim(child);
        }
        let knobs = self.table_items.get(&id)?.knobs().to_vec();
        for knob in knobs {
            self.remove_knob_anim(knob);
        }
        let anim = self.table_items.shift_remove(&id)?;
        self.tree.remove_subtree(anim.root_item());
        match anim.parent() {
            Some(parent) => {
                if let Some(p) = self.table_items.get_mut(&parent) {
                    p.children.retain(|c| *c != id);
                }
            }
            None => {
                if let Some(n) = self.nodes.get_mut(&anim.node()) {
                    n.table_items.retain(|c| *c != id);
                }
            }
        }
        self.table_item_index.remove(&anim.item());
        Some(anim)
    }

    /// Get a node entry
    pub fn node_anim(&self, id: NodeAnimId) -> Option<&NodeAnim> {
        self.nodes.get(&id)
    }

    /// Get a mutable node entry
    pub fn node_anim_mut(&mut self, id: NodeAnimId) -> Option<&mut NodeAnim> {
        self.nodes.get_mut(&id)
    }

    /// Get a knob entry
    pub fn knob_anim(&self, id: KnobAnimId) -> Option<&KnobAnim> {
        self.knobs.get(&id)
    }

    /// Get a table row entry
    pub fn table_item_anim(&self, id: TableItemAnimId) -> Option<&TableItemAnim> {
        self.table_items.get(&id)
    }

    /// Get a mutable table row entry
    pub fn table_item_anim_mut(&mut self, id: TableItemAnimId) -> Option<&mut TableItemAnim> {
        self.table_items.get_mut(&id)
    }

    /// Entry wrapping a graph node
    pub fn node_anim_for(&self, node: NodeId) -> Option<NodeAnimId> {
        self.node_index.get(&node).copied()
    }

    /// Entry wrapping a knob
    pub fn knob_anim_for(&self, knob: KnobId) -> Option<KnobAnimId> {
        self.knob_index.get(&knob).copied()
    }

    /// Entry wrapping a table row
    pub fn table_item_anim_for(&self, item: TableItemId) -> Option<TableItemAnimId> {
        self.table_item_index.get(&item).copied()
    }

    /// Every node entry, in insertion order
    pub fn node_anims(&self) -> impl Iterator<Item = &NodeAnim> {
        self.nodes.values()
    }

    /// Every knob entry
    pub fn knob_anims(&self) -> impl Iterator<Item = &KnobAnim> {
        self.knobs.values()
    }

    /// Every table row entry
    pub fn table_item_anims(&self) -> impl Iterator<Item = &TableItemAnim> {
        self.table_items.values()
    }

    /// Entry carrying curves
    pub fn anim_item(&self, item: AnimItemRef) -> Option<&dyn AnimItemBase> {
        match item {
            AnimItemRef::Knob(k) => self.knobs.get(&k).map(|k| k as &dyn AnimItemBase),
            AnimItemRef::TableItem(t) => self.table_items.get(&t).map(|t| t as &dyn AnimItemBase),
        }
    }

    /// Node owning an entry, directly or through a table row
    pub fn owning_node(&self, item: ItemRef) -> Option<NodeAnimId> {
        match item {
            ItemRef::Node(n) => Some(n),
            ItemRef::TableItem(t) => self.table_items.get(&t).map(TableItemAnim::node),
            ItemRef::Knob(k) => match self.knobs.get(&k)?.holder() {
                HolderRef::Node(n) => Some(n),
                HolderRef::TableItem(t) => self.table_items.get(&t).map(TableItemAnim::node),
            },
        }
    }

    /// Resolve a display row to the entry it shows
    pub fn find_item(&self, row: TreeNodeId) -> Option<FoundItem> {
        let owner = self.tree.find_item(row)?;
        let (knob, table_item) = match owner.item {
            ItemRef::Node(_) => (None, None),
            ItemRef::TableItem(t) => (None, Some(t)),
            ItemRef::Knob(k) => match self.knobs.get(&k)?.holder() {
                HolderRef::Node(_) => (Some(k), None),
                HolderRef::TableItem(t) => (Some(k), Some(t)),
            },
        };
        Some(FoundItem {
            kind: owner.kind,
            node: self.owning_node(owner.item),
            knob,
            table_item,
            view: owner.view,
            dim: owner.dim,
        })
    }

    /// Curve key of a graph curve location
    pub fn index_id_for_location(&self, location: CurveLocation) -> Option<AnimItemDimViewIndexId> {
        match location {
            CurveLocation::Knob { knob, view, dim } => {
                let anim = self.knob_anim_for(knob)?;
                Some(AnimItemDimViewIndexId::new(AnimItemRef::Knob(anim), view, dim))
            }
            CurveLocation::TableItem(item) => {
                let anim = self.table_item_anim_for(item)?;
                Some(AnimItemDimViewIndexId::new(AnimItemRef::TableItem(anim), ViewIdx(0), DimIdx(0)))
            }
        }
    }

    /// Graph curve location of a curve key
    pub fn location_for(&self, graph: &Graph, key: &AnimItemDimViewIndexId) -> Option<CurveLocation> {
        self.anim_item(key.item)?.curve_location(graph, key.dim, key.view)
    }

    /// Every existing curve key of every knob and table row entry
    pub fn all_curve_keys(&self, graph: &Graph) -> Vec<AnimItemDimViewIndexId> {
        let knobs = self.knobs.values().map(|k| k as &dyn AnimItemBase);
        let items = self.table_items.values().map(|t| t as &dyn AnimItemBase);
        knobs
            .chain(items)
            .flat_map(|item| {
                item.expand(graph, DimSpec::All, ViewSetSpec::All)
                    .into_iter()
                    .filter(|(d, v)| item.curve_location(graph, *d, *v).is_some())
                    .map(move |(d, v)| AnimItemDimViewIndexId::new(item.anim_ref(), v, d))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Recompute the frame range of a node, then of its group and of the nearest
    /// time node downstream. Re-entrant calls on the same node are ignored.
    pub fn refresh_frame_range(&mut self, graph: &Graph, id: NodeAnimId) {
        let Some(anim) = self.nodes.get_mut(&id) else {
            return;
        };
        if anim.refresh_guard > 0 {
            return;
        }
        anim.refresh_guard += 1;
        let node = anim.node();

        let range = match self.nodes.get(&id) {
            Some(anim) => anim.compute_frame_range(graph, self),
            None => return,
        };
        if let Some(anim) = self.nodes.get_mut(&id) {
            anim.set_frame_range(range);
        }

        let group = graph
            .node(node)
            .and_then(|n| n.group)
            .and_then(|g| self.node_anim_for(g));
        if let Some(group) = group {
            self.refresh_frame_range(graph, group);
        }
        let downstream = graph
            .nearest_time_node_from_outputs(node)
            .and_then(|t| self.node_anim_for(t));
        if let Some(downstream) = downstream {
            self.refresh_frame_range(graph, downstream);
        }

        if let Some(anim) = self.nodes.get_mut(&id) {
            anim.refresh_guard -= 1;
        }
    }

    /// Recompute every frame range
    pub fn refresh_all_frame_ranges(&mut self, graph: &Graph) {
        let ids: Vec<NodeAnimId> = self.nodes.keys().copied().collect();
        for id in ids {
            self.refresh_frame_range(graph, id);
        }
    }

    /// Node entries shown under a node: contained nodes for a group, upstream nodes for a time node
    pub fn children_nodes(&self, graph: &Graph, id: NodeAnimId) -> Vec<NodeAnimId> {
        let Some(anim) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let candidates = if anim.item_type() == AnimatedItemType::Group {
            graph.nodes_in_group(anim.node())
        } else if anim.item_type().is_time_node() {
            graph.upstream_nodes(anim.node())
        } else {
            Vec::new()
        };
        candidates
            .into_iter()
            .filter_map(|n| self.node_anim_for(n))
            .collect()
    }

    /// Place each node row under its group, else under the nearest time node downstream
    pub fn refresh_node_relationships(&mut self, graph: &Graph) {
        let entries: Vec<(NodeAnimId, NodeId, TreeNodeId)> = self
            .nodes
            .values()
            .map(|n| (n.id(), n.node(), n.root_item()))
            .collect();
        for (id, node, row) in entries {
            let group = graph
                .node(node)
                .and_then(|n| n.group)
                .and_then(|g| self.node_anim_for(g));
            let parent = group.or_else(|| {
                graph
                    .nearest_time_node_from_outputs(node)
                    .and_then(|t| self.node_anim_for(t))
            });
            let parent_row = parent
                .filter(|p| *p != id)
                .and_then(|p| self.nodes.get(&p))
                .map(NodeAnim::root_item);
            if !self.tree.reparent(row, parent_row) {
                tracing::debug!("Keeping node row at its place to avoid a cycle in the display tree");
            }
        }
    }

    /// Refresh the visibility of every row
    pub fn refresh_visibility(&mut self, graph: &Graph, settings: &AnimationModuleSettings) {
        let roots: Vec<NodeAnimId> = self
            .tree
            .roots()
            .iter()
            .filter_map(|r| match self.tree.find_item(*r)?.item {
                ItemRef::Node(n) => Some(n),
                _ => None,
            })
            .collect();
        for id in roots {
            self.refresh_node_visibility(graph, settings, id);
        }
    }

    /// Refresh the rows of a node's children first, then show the node iff something
    /// below it is shown or its range is drawn, and its panel is open or it is kept visible
    pub fn refresh_node_visibility(&mut self, graph: &Graph, settings: &AnimationModuleSettings, id: NodeAnimId) -> bool {
        let Some(anim) = self.nodes.get(&id) else {
            return false;
        };
        let knobs = anim.knobs().to_vec();
        let items = anim.table_items.clone();
        let row = anim.root_item();
        let range_drawing = anim.is_range_drawing_enabled(graph);
        let keep_visible = anim.keep_visible();
        let node = anim.node();

        let mut any_child = false;
        for knob in knobs {
            if let Some(knob) = self.knobs.get(&knob) {
                any_child |= knob.refresh_visibility_conditional(graph, &mut self.tree, settings);
            }
        }
        for item in items {
            any_child |= self.refresh_table_item_visibility(graph, settings, item);
        }
        let child_nodes: Vec<NodeAnimId> = self
            .tree
            .children(row)
            .iter()
            .filter_map(|c| match self.tree.find_item(*c)?.item {
                ItemRef::Node(n) => Some(n),
                _ => None,
            })
            .collect();
        for child in child_nodes {
            any_child |= self.refresh_node_visibility(graph, settings, child);
        }

        let panel_open = graph.node(node).is_some_and(|n| n.settings_panel_open);
        let visible = (any_child || range_drawing) && (panel_open || keep_visible || settings.keep_nodes_visible);
        self.tree.set_visible(row, visible);
        visible
    }

    fn refresh_table_item_visibility(
        &mut self,
        graph: &Graph,
        settings: &AnimationModuleSettings,
        id: TableItemAnimId,
    ) -> bool {
        let Some(anim) = self.table_items.get(&id) else {
            return false;
        };
        let knobs = anim.knobs().to_vec();
        let children = anim.children.clone();
        let row = anim.root_item();
        let mut visible =
            anim.has_animation(graph) || anim.is_range_drawing_enabled() || !settings.hide_knobs_without_animation;
        for knob in knobs {
            if let Some(knob) = self.knobs.get(&knob) {
                visible |= knob.refresh_visibility_conditional(graph, &mut self.tree, settings);
            }
        }
        for child in children {
            visible |= self.refresh_table_item_visibility(graph, settings, child);
        }
        self.tree.set_visible(row, visible);
        visible
    }

    /// Knob entries of a node or table row
    pub fn holder_knobs(&self, holder: HolderRef) -> &[KnobAnimId] {
        let holder: Option<&dyn KnobsHolderAnimBase> = match holder {
            HolderRef::Node(n) => self.nodes.get(&n).map(|n| n as &dyn KnobsHolderAnimBase),
            HolderRef::TableItem(t) => self.table_items.get(&t).map(|t| t as &dyn KnobsHolderAnimBase),
        };
        holder.map(KnobsHolderAnimBase::knobs).unwrap_or_default()
    }

    /// Frame range drawn for a table row, when its range drawing is enabled
    pub fn table_item_frame_range(&self, graph: &Graph, id: TableItemAnimId) -> Option<(f64, f64)> {
        let anim = self.table_items.get(&id)?;
        if !anim.is_range_drawing_enabled() {
            return None;
        }
        anim.frame_range(graph)
    }

    /// Rebuild the rows of a knob whose views changed
    pub fn refresh_knob_views(&mut self, graph: &Graph, knob: KnobId) {
        let Some(id) = self.knob_index.get(&knob).copied() else {
            return;
        };
        if let Some(anim) = self.knobs.get_mut(&id) {
            anim.rebuild_entries(graph, &mut self.tree);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compositor_graph::{knob_names, plugin_ids, Curve, CurveType, Keyframe, KnobKind, KnobTemplate};

    fn reader(graph: &mut Graph, name: &str, first: f64, last: f64, start: f64) -> NodeId {
        let id = graph.create_node(plugin_ids::READ, name).unwrap();
        graph.set_knob_value(id, knob_names::FIRST_FRAME, 0, first).unwrap();
        graph.set_knob_value(id, knob_names::LAST_FRAME, 0, last).unwrap();
        graph.set_knob_value(id, knob_names::STARTING_TIME, 0, start).unwrap();
        id
    }

    #[test]
    fn test_add_node_wraps_animatable_knobs() {
        let mut graph = Graph::default();
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        let mut model = AnimationModel::new();
        let id = model.add_node(&graph, blur).unwrap();
        assert_eq!(model.add_node(&graph, blur), Some(id));

        let anim = model.node_anim(id).unwrap();
        assert_eq!(anim.item_type(), AnimatedItemType::Common);
        // size, filter, label; the button and the lifetime knobs are not animatable
        assert_eq!(anim.knobs.len(), 3);
        let size = graph.knob_id_by_name(blur, "size").unwrap();
        let knob_anim = model.knob_anim_for(size).unwrap();
        let row = model.knob_anim(knob_anim).unwrap().root_item();
        let found = model.find_item(row).unwrap();
        assert_eq!(found.kind, AnimatedItemType::KnobRoot);
        assert_eq!(found.node, Some(id));
        assert_eq!(found.knob, Some(knob_anim));
        assert_eq!(found.table_item, None);
    }

    #[test]
    fn test_reader_range() {
        let mut graph = Graph::default();
        let read = reader(&mut graph, "Read", 1.0, 100.0, 10.0);
        let mut model = AnimationModel::new();
        let id = model.add_node(&graph, read).unwrap();
        model.refresh_frame_range(&graph, id);
        assert_eq!(model.node_anim(id).unwrap().frame_range(), (10.0, 110.0));
    }

    #[test]
    fn test_time_offset_and_retime_ranges() {
        let mut graph = Graph::default();
        let read = reader(&mut graph, "Read", 1.0, 50.0, 1.0);
        let offset = graph.create_node(plugin_ids::TIME_OFFSET, "Offset").unwrap();
        graph.set_knob_value(offset, knob_names::TIME_OFFSET, 0, 10.0).unwrap();
        let retime = graph.create_node(plugin_ids::RETIME, "Retime").unwrap();
        graph.connect(read, offset, 0).unwrap();
        graph.connect(offset, retime, 0).unwrap();

        let mut model = AnimationModel::new();
        let read_anim = model.add_node(&graph, read).unwrap();
        let offset_anim = model.add_node(&graph, offset).unwrap();
        let retime_anim = model.add_node(&graph, retime).unwrap();
        model.refresh_frame_range(&graph, read_anim);

        assert_eq!(model.node_anim(offset_anim).unwrap().frame_range(), (11.0, 61.0));
        assert_eq!(model.node_anim(retime_anim).unwrap().frame_range(), (11.0, 61.0));
    }

    #[test]
    fn test_frame_range_and_lifetime() {
        let mut graph = Graph::default();
        let range = graph.create_node(plugin_ids::FRAME_RANGE, "Range").unwrap();
        graph.set_knob_value(range, knob_names::FRAME_RANGE, 0, 5.0).unwrap();
        graph.set_knob_value(range, knob_names::FRAME_RANGE, 1, 20.0).unwrap();
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();

        let mut model = AnimationModel::new();
        let range_anim = model.add_node(&graph, range).unwrap();
        let blur_anim = model.add_node(&graph, blur).unwrap();
        model.refresh_all_frame_ranges(&graph);
        assert_eq!(model.node_anim(range_anim).unwrap().frame_range(), (5.0, 20.0));
        assert_eq!(model.node_anim(blur_anim).unwrap().frame_range(), (0.0, 0.0));
        assert!(!model.node_anim(blur_anim).unwrap().is_range_drawing_enabled(&graph));

        graph.set_knob_value(blur, knob_names::ENABLE_LIFETIME, 0, 1.0).unwrap();
        graph.set_knob_value(blur, knob_names::LIFETIME, 0, 3.0).unwrap();
        graph.set_knob_value(blur, knob_names::LIFETIME, 1, 8.0).unwrap();
        model.refresh_frame_range(&graph, blur_anim);
        assert_eq!(model.node_anim(blur_anim).unwrap().frame_range(), (3.0, 8.0));
        assert!(model.node_anim(blur_anim).unwrap().is_range_drawing_enabled(&graph));
    }

    #[test]
    fn test_group_range_collects_children_and_keys() {
        let mut graph = Graph::default();
        let group = graph.create_node(plugin_ids::GROUP, "Group").unwrap();
        let blur = graph.create_node_in_group(plugin_ids::BLUR, "Blur", Some(group)).unwrap();
        let mut model = AnimationModel::new();
        let group_anim = model.add_node(&graph, group).unwrap();
        let blur_anim = model.add_node(&graph, blur).unwrap();
        model.refresh_frame_range(&graph, group_anim);
        assert_eq!(model.node_anim(group_anim).unwrap().frame_range(), (0.0, 0.0));

        let size = graph.knob_id_by_name(blur, "size").unwrap();
        let curve = graph
            .curve_mut(CurveLocation::Knob { knob: size, view: ViewIdx(0), dim: DimIdx(1) })
            .unwrap();
        curve.set_keyframe(Keyframe::new(4.0, 1.0));
        model.refresh_frame_range(&graph, group_anim);
        // a single distinct time collapses to an empty range
        assert_eq!(model.node_anim(group_anim).unwrap().frame_range(), (0.0, 0.0));

        graph
            .curve_mut(CurveLocation::Knob { knob: size, view: ViewIdx(0), dim: DimIdx(0) })
            .unwrap()
            .set_keyframe(Keyframe::new(30.0, 1.0));
        model.refresh_frame_range(&graph, blur_anim);
        assert_eq!(model.node_anim(group_anim).unwrap().frame_range(), (4.0, 30.0));

        let blur_row = model.node_anim(blur_anim).unwrap().root_item();
        model.tree_mut().set_visible(blur_row, false);
        model.refresh_frame_range(&graph, group_anim);
        assert_eq!(model.node_anim(group_anim).unwrap().frame_range(), (0.0, 0.0));
    }

    #[test]
    fn test_range_refresh_terminates_on_cycles() {
        let mut graph = Graph::default();
        let a = graph.create_node(plugin_ids::RETIME, "A").unwrap();
        let b = graph.create_node(plugin_ids::TIME_OFFSET, "B").unwrap();
        graph.connect(a, b, 0).unwrap();
        graph.connect(b, a, 0).unwrap();
        let mut model = AnimationModel::new();
        let a_anim = model.add_node(&graph, a).unwrap();
        model.add_node(&graph, b).unwrap();
        model.refresh_frame_range(&graph, a_anim);
        assert_eq!(model.node_anim(a_anim).unwrap().refresh_guard, 0);
        model.refresh_node_relationships(&graph);
    }

    #[test]
    fn test_table_item_insertion_rules() {
        let mut graph = Graph::default();
        let tracker = graph.create_node(plugin_ids::TRACKER, "Tracker").unwrap();
        let templates = [KnobTemplate::new("center", KnobKind::Double, vec![0.0, 0.0])];
        let track = graph.insert_table_item(tracker, 0, None, 0, "track1", &templates).unwrap();
        let sub = graph.insert_table_item(tracker, 0, Some(track), 0, "sub", &templates).unwrap();

        let mut model = AnimationModel::new();
        // node not wrapped yet
        assert!(model.insert_table_item(&graph, 0, track).is_none());
        let node_anim = model.add_node(&graph, tracker).unwrap();
        let track_anim = model.table_item_anim_for(track).unwrap();
        let sub_anim = model.table_item_anim_for(sub).unwrap();
        assert_eq!(model.insert_table_item(&graph, 0, track), Some(track_anim));
        assert_eq!(model.node_anim(node_anim).unwrap().top_level_table_items(), &[track_anim]);
        assert_eq!(model.table_item_anim(track_anim).unwrap().children(), &[sub_anim]);

        let node = model.node_anim(node_anim).unwrap();
        assert_eq!(node.find_table_item(&model, sub), Some(sub_anim));
        let track_row = model.table_item_anim(track_anim).unwrap();
        assert_eq!(track_row.find_table_item(&model, sub), Some(sub_anim));
        assert!(!track_row.is_range_drawing_enabled());

        let sub_knob = graph.table_item(sub).unwrap().knobs[0];
        let sub_knob_anim = model.knob_anim_for(sub_knob).unwrap();
        let found = model.find_item(model.knob_anim(sub_knob_anim).unwrap().root_item()).unwrap();
        assert_eq!(found.table_item, Some(sub_anim));
        assert_eq!(found.node, Some(node_anim));

        model.remove_table_item(track);
        assert!(model.table_item_anim_for(sub).is_none());
        assert!(model.knob_anim_for(sub_knob).is_none());
        assert!(model.node_anim(node_anim).unwrap().top_level_table_items().is_empty());
    }

    #[test]
    fn test_table_item_range_is_opt_in() {
        let mut graph = Graph::default();
        let tracker = graph.create_node(plugin_ids::TRACKER, "Tracker").unwrap();
        let templates = [KnobTemplate::new("center", KnobKind::Double, vec![0.0, 0.0])];
        let track = graph.insert_table_item(tracker, 0, None, 0, "track1", &templates).unwrap();
        let mut own = Curve::new(CurveType::Double);
        own.set_keyframe(Keyframe::new(12.0, 0.0));
        own.set_keyframe(Keyframe::new(40.0, 1.0));
        graph.table_item_mut(track).unwrap().animation = Some(own);

        let mut model = AnimationModel::new();
        let node_anim = model.add_node(&graph, tracker).unwrap();
        let track_anim = model.table_item_anim_for(track).unwrap();
        assert_eq!(model.table_item_frame_range(&graph, track_anim), None);

        model.table_item_anim_mut(track_anim).unwrap().set_range_drawing_enabled(true);
        assert_eq!(model.table_item_frame_range(&graph, track_anim), Some((12.0, 40.0)));

        let center = model.knob_anim_for(graph.table_item(track).unwrap().knobs[0]).unwrap();
        assert_eq!(model.holder_knobs(HolderRef::TableItem(track_anim)), &[center]);
        let reference = model.knob_anim_for(graph.knob_id_by_name(tracker, "reference").unwrap()).unwrap();
        assert_eq!(model.holder_knobs(HolderRef::Node(node_anim)), &[reference]);
        assert_eq!(model.knob_anim(center).unwrap().holder(), HolderRef::TableItem(track_anim));
    }

    #[test]
    fn test_child_row_skipped_until_parent_exists() {
        let mut graph = Graph::default();
        let tracker = graph.create_node(plugin_ids::TRACKER, "Tracker").unwrap();
        let mut model = AnimationModel::new();
        model.add_node(&graph, tracker).unwrap();
        let track = graph.insert_table_item(tracker, 0, None, 0, "track1", &[]).unwrap();
        let sub = graph.insert_table_item(tracker, 0, Some(track), 0, "sub", &[]).unwrap();
        assert!(model.insert_table_item(&graph, 0, sub).is_none());
        model.insert_table_item(&graph, 0, track).unwrap();
        assert!(model.table_item_anim_for(sub).is_some());
    }

    #[test]
    fn test_relationships_and_children_nodes() {
        let mut graph = Graph::default();
        let read = reader(&mut graph, "Read", 1.0, 10.0, 1.0);
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        let retime = graph.create_node(plugin_ids::RETIME, "Retime").unwrap();
        graph.connect(read, blur, 0).unwrap();
        graph.connect(blur, retime, 0).unwrap();
        let mut model = AnimationModel::new();
        let read_anim = model.add_node(&graph, read).unwrap();
        let blur_anim = model.add_node(&graph, blur).unwrap();
        let retime_anim = model.add_node(&graph, retime).unwrap();
        model.refresh_node_relationships(&graph);

        let retime_row = model.node_anim(retime_anim).unwrap().root_item();
        let blur_row = model.node_anim(blur_anim).unwrap().root_item();
        assert_eq!(model.tree().parent(blur_row), Some(retime_row));
        assert_eq!(model.children_nodes(&graph, retime_anim), vec![blur_anim, read_anim]);
        assert!(model.node_anim(retime_anim).unwrap().contains_node_context(model.tree()));

        model.remove_node(retime_anim);
        assert_eq!(model.tree().parent(blur_row), None);
        assert!(model.node_anim(blur_anim).is_some());
    }

    #[test]
    fn test_node_visibility() {
        let mut graph = Graph::default();
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        let read = reader(&mut graph, "Read", 1.0, 10.0, 1.0);
        let mut model = AnimationModel::new();
        let blur_anim = model.add_node(&graph, blur).unwrap();
        let read_anim = model.add_node(&graph, read).unwrap();
        let settings = AnimationModuleSettings::default();

        model.refresh_visibility(&graph, &settings);
        let blur_row = model.node_anim(blur_anim).unwrap().root_item();
        let read_row = model.node_anim(read_anim).unwrap().root_item();
        assert!(!model.tree().is_visible(blur_row));
        assert!(!model.tree().is_visible(read_row));

        graph.node_mut(read).unwrap().settings_panel_open = true;
        graph.node_mut(blur).unwrap().settings_panel_open = true;
        model.refresh_visibility(&graph, &settings);
        // a reader draws its range, a blur without animation has nothing to show
        assert!(model.tree().is_visible(read_row));
        assert!(!model.tree().is_visible(blur_row));

        let size = graph.knob_id_by_name(blur, "size").unwrap();
        graph
            .curve_mut(CurveLocation::Knob { knob: size, view: ViewIdx(0), dim: DimIdx(0) })
            .unwrap()
            .set_keyframe(Keyframe::new(1.0, 1.0));
        model.refresh_visibility(&graph, &settings);
        assert!(model.tree().is_visible(blur_row));

        graph.node_mut(blur).unwrap().settings_panel_open = false;
        model.node_anim_mut(blur_anim).unwrap().set_keep_visible(true);
        model.refresh_visibility(&graph, &settings);
        assert!(model.tree().is_visible(blur_row));
    }

    #[test]
    fn test_all_curve_keys() {
        let mut graph = Graph::default();
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        let mut model = AnimationModel::new();
        model.add_node(&graph, blur).unwrap();
        // size has 2 dimensions, filter and label one each
        assert_eq!(model.all_curve_keys(&graph).len(), 4);
    }
}
