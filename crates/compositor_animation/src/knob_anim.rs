// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation entry of one knob.

use crate::anim_item::{AnimItemBase, AnimItemRef, AnimatedItemType, HolderRef, ItemRef, KnobAnimId};
use crate::settings::AnimationModuleSettings;
use crate::tree::{DisplayTree, TreeNodeId, TreeOwner};
use compositor_graph::{CurveLocation, DimIdx, DimSpec, Graph, KnobId, ViewIdx, ViewSetSpec};
use std::collections::BTreeMap;

/// Maps the (dimension, view) pairs of a knob to curves and display rows
#[derive(Debug, Clone)]
pub struct KnobAnim {
    id: KnobAnimId,
    knob: KnobId,
    holder: HolderRef,
    root: TreeNodeId,
    view_entries: BTreeMap<ViewIdx, TreeNodeId>,
    dim_entries: BTreeMap<(ViewIdx, DimIdx), TreeNodeId>,
}

impl KnobAnim {
    /// Create the entry and its display rows under `parent`.
    ///
    /// Returns `None` for a missing knob or one that cannot be animated.
    pub fn create(
        graph: &Graph,
        tree: &mut DisplayTree,
        holder: HolderRef,
        parent: TreeNodeId,
        knob_id: KnobId,
    ) -> Option<Self> {
        let knob = graph.knob(knob_id)?;
        if !knob.can_animate() {
            return None;
        }
        let id = KnobAnimId::new();
        let root = tree.insert(
            Some(parent),
            knob.name.clone(),
            TreeOwner::whole(AnimatedItemType::KnobRoot, ItemRef::Knob(id)),
        );
        let mut anim = Self {
            id,
            knob: knob_id,
            holder,
            root,
            view_entries: BTreeMap::new(),
            dim_entries: BTreeMap::new(),
        };
        anim.build_entries(graph, tree);
        Some(anim)
    }

    fn build_entries(&mut self, graph: &Graph, tree: &mut DisplayTree) {
        let Some(knob) = graph.knob(self.knob) else {
            return;
        };
        let views = knob.views().to_vec();
        let n_dims = knob.n_dimensions();
        let split_views = views.len() > 1;
        for view in views {
            let view_parent = if split_views {
                let entry = tree.insert(
                    Some(self.root),
                    format!("view {}", view.0),
                    TreeOwner {
                        kind: AnimatedItemType::KnobView,
                        item: ItemRef::Knob(self.id),
                        view: ViewSetSpec::View(view),
                        dim: DimSpec::All,
                    },
                );
                self.view_entries.insert(view, entry);
                entry
            } else {
                self.root
            };
            if n_dims > 1 {
                for d in 0..n_dims {
                    let entry = tree.insert(
                        Some(view_parent),
                        format!("{}.{}", knob.name, d),
                        TreeOwner {
                            kind: AnimatedItemType::KnobDim,
                            item: ItemRef::Knob(self.id),
                            view: ViewSetSpec::View(view),
                            dim: DimSpec::Dim(DimIdx(d)),
                        },
                    );
                    self.dim_entries.insert((view, DimIdx(d)), entry);
                }
            }
        }
    }

    /// Rebuild the per-view and per-dimension rows after the knob's views changed
    pub fn rebuild_entries(&mut self, graph: &Graph, tree: &mut DisplayTree) {
        for child in tree.children(self.root).to_vec() {
            tree.remove_subtree(child);
        }
        self.view_entries.clear();
        self.dim_entries.clear();
        self.build_entries(graph, tree);
    }

    /// Handle of this entry
    pub fn id(&self) -> KnobAnimId {
        self.id
    }

    /// Knob wrapped by this entry
    pub fn knob(&self) -> KnobId {
        self.knob
    }

    /// Node or table item holding the knob
    pub fn holder(&self) -> HolderRef {
        self.holder
    }

    /// Top display row of the knob
    pub fn root_item(&self) -> TreeNodeId {
        self.root
    }

    /// Show the rows that have animation, hide the others.
    ///
    /// Returns whether the knob's top row ended up visible.
    pub fn refresh_visibility_conditional(
        &self,
        graph: &Graph,
        tree: &mut DisplayTree,
        settings: &AnimationModuleSettings,
    ) -> bool {
        let Some(knob) = graph.knob(self.knob) else {
            tree.set_visible(self.root, false);
            return false;
        };
        if knob.secret || !settings.knob_name_matches(&knob.name) {
            tree.set_visible(self.root, false);
            return false;
        }
        let hide_static = settings.hide_knobs_without_animation;
        let mut any_visible = false;
        for view in knob.views() {
            let mut view_visible = false;
            for d in 0..knob.n_dimensions() {
                let animated = knob.curve(*view, DimIdx(d)).is_some_and(|c| !c.is_empty());
                let shown = animated || !hide_static;
                if let Some(entry) = self.dim_entries.get(&(*view, DimIdx(d))) {
                    tree.set_visible(*entry, shown);
                }
                view_visible |= shown;
            }
            if let Some(entry) = self.view_entries.get(view) {
                tree.set_visible(*entry, view_visible);
            }
            any_visible |= view_visible;
        }
        tree.set_visible(self.root, any_visible);
        any_visible
    }

    /// Remove the display rows of this entry
    pub fn destroy(&self, tree: &mut DisplayTree) {
        tree.remove_subtree(self.root);
    }
}

impl AnimItemBase for KnobAnim {
    fn anim_ref(&self) -> AnimItemRef {
        AnimItemRef::Knob(self.id)
    }

    fn curve_location(&self, graph: &Graph, dim: DimIdx, view: ViewIdx) -> Option<CurveLocation> {
        let knob = graph.knob(self.knob)?;
        knob.curve(view, dim)?;
        Some(CurveLocation::Knob {
            knob: self.knob,
            view,
            dim,
        })
    }

    fn n_dimensions(&self, graph: &Graph) -> usize {
        graph.knob(self.knob).map_or(0, compositor_graph::Knob::n_dimensions)
    }

    fn views(&self, graph: &Graph) -> Vec<ViewIdx> {
        graph.knob(self.knob).map(|k| k.views().to_vec()).unwrap_or_default()
    }

    fn all_dimensions_visible(&self, graph: &Graph, tree: &DisplayTree, view: ViewIdx) -> bool {
        let n_dims = self.n_dimensions(graph);
        n_dims > 0
            && (0..n_dims).all(|d| {
                self.dim_entries
                    .get(&(view, DimIdx(d)))
                    .map_or(true, |entry| tree.is_visible(*entry))
            })
    }

    fn tree_item(&self, dim: DimSpec, view: ViewSetSpec) -> Option<TreeNodeId> {
        let view_row = |v: ViewIdx| {
            if self.view_entries.is_empty() {
                Some(self.root)
            } else {
                self.view_entries.get(&v).copied()
            }
        };
        match (dim, view) {
            (DimSpec::All, ViewSetSpec::All) => Some(self.root),
            (DimSpec::All, ViewSetSpec::View(v)) => view_row(v),
            (DimSpec::Dim(d), ViewSetSpec::View(v)) => {
                if self.dim_entries.is_empty() {
                    view_row(v)
                } else {
                    self.dim_entries.get(&(v, d)).copied()
                }
            }
            (DimSpec::Dim(d), ViewSetSpec::All) => {
                if self.dim_entries.is_empty() {
                    Some(self.root)
                } else {
                    self.dim_entries
                        .iter()
                        .find(|((_, dim), _)| *dim == d)
                        .map(|(_, entry)| *entry)
                }
            }
        }
    }
}
