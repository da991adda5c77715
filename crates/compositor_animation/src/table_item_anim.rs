// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation entry of one item table row.

use crate::anim_item::{
    AnimItemBase, AnimItemRef, AnimatedItemType, HolderRef, ItemRef, KnobAnimId, KnobsHolderAnimBase, NodeAnimId,
    TableItemAnimId,
};
use crate::model::AnimationModel;
use crate::tree::{DisplayTree, TreeNodeId, TreeOwner};
use compositor_graph::{CurveLocation, DimIdx, DimSpec, Graph, TableItemId, ViewIdx, ViewSetSpec};

/// Wraps a table row: its own animation, its knobs and its child rows
#[derive(Debug, Clone)]
pub struct TableItemAnim {
    id: TableItemAnimId,
    item: TableItemId,
    node: NodeAnimId,
    parent: Option<TableItemAnimId>,
    pub(crate) children: Vec<TableItemAnimId>,
    pub(crate) knobs: Vec<KnobAnimId>,
    root: TreeNodeId,
    range_drawing: bool,
}

impl TableItemAnim {
    /// Create the entry and its display row under `parent_row`.
    ///
    /// Knobs and children are attached by the model.
    pub fn new(
        graph: &Graph,
        tree: &mut DisplayTree,
        node: NodeAnimId,
        parent: Option<TableItemAnimId>,
        parent_row: TreeNodeId,
        item: TableItemId,
    ) -> Option<Self> {
        let label = graph.table_item(item)?.label.clone();
        let id = TableItemAnimId::new();
        let root = tree.insert(
            Some(parent_row),
            label,
            TreeOwner::whole(AnimatedItemType::TableItemRoot, ItemRef::TableItem(id)),
        );
        Some(Self {
            id,
            item,
            node,
            parent,
            children: Vec::new(),
            knobs: Vec::new(),
            root,
            range_drawing: false,
        })
    }

    /// Handle of this entry
    pub fn id(&self) -> TableItemAnimId {
        self.id
    }

    /// Wrapped table row
    pub fn item(&self) -> TableItemId {
        self.item
    }

    /// Node entry owning the table
    pub fn node(&self) -> NodeAnimId {
        self.node
    }

    /// Parent row entry
    pub fn parent(&self) -> Option<TableItemAnimId> {
        self.parent
    }

    /// Child row entries
    pub fn children(&self) -> &[TableItemAnimId] {
        &self.children
    }

    /// Display row
    pub fn root_item(&self) -> TreeNodeId {
        self.root
    }

    /// Whether the row's range is drawn in the dope sheet. Off unless enabled.
    pub fn is_range_drawing_enabled(&self) -> bool {
        self.range_drawing
    }

    /// Opt in to range drawing
    pub fn set_range_drawing_enabled(&mut self, enabled: bool) {
        self.range_drawing = enabled;
    }

    /// Depth-first search of this row and its descendants for `item`
    pub fn find_table_item(&self, model: &AnimationModel, item: TableItemId) -> Option<TableItemAnimId> {
        if self.item == item {
            return Some(self.id);
        }
        self.children
            .iter()
            .find_map(|c| model.table_item_anim(*c)?.find_table_item(model, item))
    }

    /// Span from the first to the last keyframe of the row's own animation
    pub fn frame_range(&self, graph: &Graph) -> Option<(f64, f64)> {
        let curve = graph.table_item(self.item)?.animation.as_ref()?;
        Some((curve.first_keyframe_time()?, curve.last_keyframe_time()?))
    }
}

impl AnimItemBase for TableItemAnim {
    fn anim_ref(&self) -> AnimItemRef {
        AnimItemRef::TableItem(self.id)
    }

    fn curve_location(&self, graph: &Graph, dim: DimIdx, view: ViewIdx) -> Option<CurveLocation> {
        if dim != DimIdx(0) || view != ViewIdx(0) {
            return None;
        }
        graph.table_item(self.item)?.animation.as_ref()?;
        Some(CurveLocation::TableItem(self.item))
    }

    fn n_dimensions(&self, graph: &Graph) -> usize {
        graph
            .table_item(self.item)
            .map_or(0, |t| usize::from(t.has_own_animation()))
    }

    fn views(&self, _graph: &Graph) -> Vec<ViewIdx> {
        vec![ViewIdx(0)]
    }

    fn all_dimensions_visible(&self, _graph: &Graph, tree: &DisplayTree, _view: ViewIdx) -> bool {
        tree.is_visible(self.root)
    }

    fn tree_item(&self, _dim: DimSpec, _view: ViewSetSpec) -> Option<TreeNodeId> {
        Some(self.root)
    }
}

impl KnobsHolderAnimBase for TableItemAnim {
    fn holder_ref(&self) -> HolderRef {
        HolderRef::TableItem(self.id)
    }

    fn knobs(&self) -> &[KnobAnimId] {
        &self.knobs
    }
}
