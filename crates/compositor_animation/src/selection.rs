// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection of keyframes, nodes and table rows.

use crate::anim_item::{
    AnimItemBase, AnimItemDimViewIndexId, AnimItemDimViewKeyFramesMap, AnimItemRef, GetKeyframesType, HolderRef,
    KeyFrameSet, NodeAnimId, TableItemAnimId,
};
use crate::events::{AnimationModuleEvent, Signal};
use crate::model::AnimationModel;
use crate::tree::TreeNodeId;
use compositor_graph::{DimSpec, Graph, ViewSetSpec};
use std::collections::BTreeSet;
use std::ops::BitOr;

/// How [`AnimationModuleSelectionModel::make_selection`] combines its input with the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionFlags(u8);

impl SelectionFlags {
    /// Keep the current selection
    pub const NONE: Self = Self(0);
    /// Empty the selection first
    pub const CLEAR: Self = Self(1);
    /// Add to the selection
    pub const ADD: Self = Self(1 << 1);
    /// Toggle already selected entries off
    pub const TOGGLE: Self = Self(1 << 2);
    /// Ask the views to propagate the change to child rows
    pub const RECURSE: Self = Self(1 << 3);

    /// Whether every flag of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SelectionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A keyframe whose time changed, used to follow moved keys
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyMove {
    /// Curve holding the keyframe
    pub key: AnimItemDimViewIndexId,
    /// Time before the move
    pub from: f64,
    /// Time after the move
    pub to: f64,
}

/// Single source of truth for what is selected
#[derive(Debug, Default)]
pub struct AnimationModuleSelectionModel {
    keyframes: AnimItemDimViewKeyFramesMap,
    nodes: BTreeSet<NodeAnimId>,
    table_items: BTreeSet<TableItemAnimId>,
    signal: Signal<AnimationModuleEvent>,
}

impl AnimationModuleSelectionModel {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection change notifications
    pub fn signal_mut(&mut self) -> &mut Signal<AnimationModuleEvent> {
        &mut self.signal
    }

    /// Combine keyframes, table rows and nodes with the current selection.
    ///
    /// Returns whether the selection changed. [`SelectionFlags::ADD`] and
    /// [`SelectionFlags::TOGGLE`] are exclusive; requesting both is ignored.
    pub fn make_selection(
        &mut self,
        keys: &AnimItemDimViewKeyFramesMap,
        table_items: &[TableItemAnimId],
        nodes: &[NodeAnimId],
        flags: SelectionFlags,
    ) -> bool {
        let toggle = flags.contains(SelectionFlags::TOGGLE);
        debug_assert!(
            !(toggle && flags.contains(SelectionFlags::ADD)),
            "ADD and TOGGLE selection flags are exclusive"
        );
        if toggle && flags.contains(SelectionFlags::ADD) {
            tracing::error!("Selection requested with both ADD and TOGGLE, ignoring");
            return false;
        }

        let mut changed = false;
        if flags.contains(SelectionFlags::CLEAR) {
            changed = !self.keyframes.is_empty() || !self.nodes.is_empty() || !self.table_items.is_empty();
            self.keyframes.clear();
            self.nodes.clear();
            self.table_items.clear();
        }

        for (key, set) in keys {
            let Some(existing) = self.keyframes.get_mut(key) else {
                self.keyframes.insert(*key, set.clone());
                changed = true;
                continue;
            };
            for keyframe in set.iter() {
                match existing.remove(keyframe.time) {
                    Some(_) if toggle => changed = true,
                    previous => {
                        existing.insert(*keyframe);
                        changed |= previous.as_ref() != Some(keyframe);
                    }
                }
            }
        }

        for item in table_items {
            if !self.table_items.insert(*item) {
                if toggle {
                    self.table_items.remove(item);
                    changed = true;
                }
            } else {
                changed = true;
            }
        }
        for node in nodes {
            if !self.nodes.insert(*node) {
                if toggle {
                    self.nodes.remove(node);
                    changed = true;
                }
            } else {
                changed = true;
            }
        }

        if changed {
            self.signal.emit(AnimationModuleEvent::SelectionChanged {
                recurse: flags.contains(SelectionFlags::RECURSE),
            });
        }
        changed
    }

    /// Whether no keyframe and no node is selected
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty() && self.nodes.is_empty()
    }

    /// Number of selected keyframes across every curve
    pub fn selected_keyframes_count(&self) -> usize {
        self.keyframes.values().map(KeyFrameSet::len).sum()
    }

    /// The shared time of every selected keyframe, if there is one and every
    /// selected curve belongs to the same item
    pub fn single_keyframe_time_selected(&self) -> Option<f64> {
        let mut entries = self.keyframes.keys();
        let item = entries.next()?.item;
        if entries.any(|key| key.item != item) {
            return None;
        }
        let mut times = self.keyframes.values().flat_map(KeyFrameSet::times);
        let first = times.next()?;
        times.all(|t| t == first).then_some(first)
    }

    /// Whether the keyframes at `time` on the matched curves are all selected.
    ///
    /// Every matched curve needs a selection entry. When more than one curve is
    /// matched, a curve without a keyframe at `time` does not need one selected.
    pub fn is_keyframe_selected(
        &self,
        graph: &Graph,
        model: &AnimationModel,
        item: AnimItemRef,
        dim: DimSpec,
        view: ViewSetSpec,
        time: f64,
    ) -> bool {
        let Some(anim) = model.anim_item(item) else {
            return false;
        };
        let curves = anim.expand(graph, dim, view);
        let wildcard = curves.len() > 1;
        !curves.is_empty()
            && curves.into_iter().all(|(d, v)| {
                let Some(set) = self.keyframes.get(&AnimItemDimViewIndexId::new(item, v, d)) else {
                    return false;
                };
                set.contains(time)
                    || (wildcard && anim.curve(graph, d, v).is_some_and(|c| c.keyframe_at(time).is_none()))
            })
    }

    /// Whether a node is selected
    pub fn is_node_selected(&self, node: NodeAnimId) -> bool {
        self.nodes.contains(&node)
    }

    /// Whether a table row is selected
    pub fn is_table_item_selected(&self, item: TableItemAnimId) -> bool {
        self.table_items.contains(&item)
    }

    /// Selected keyframes per curve
    pub fn current_keyframes_selection(&self) -> &AnimItemDimViewKeyFramesMap {
        &self.keyframes
    }

    /// Selected nodes
    pub fn current_nodes_selection(&self) -> Vec<NodeAnimId> {
        self.nodes.iter().copied().collect()
    }

    /// Selected table rows
    pub fn current_table_items_selection(&self) -> Vec<TableItemAnimId> {
        self.table_items.iter().copied().collect()
    }

    /// Drop a node, its table rows and every curve they hold
    pub fn remove_any_reference_to_node(&mut self, model: &AnimationModel, node: NodeAnimId) {
        self.nodes.remove(&node);
        self.table_items
            .retain(|t| model.table_item_anim(*t).is_some_and(|anim| anim.node() != node));
        self.keyframes
            .retain(|key, _| model.owning_node(key.item.into()).is_some_and(|owner| owner != node));
    }

    /// Drop a table row, its descendants and every curve they hold
    pub fn remove_any_reference_to_table_item(&mut self, model: &AnimationModel, item: TableItemAnimId) {
        let mut removed = BTreeSet::new();
        let mut stack = vec![item];
        while let Some(current) = stack.pop() {
            if removed.insert(current) {
                if let Some(anim) = model.table_item_anim(current) {
                    stack.extend_from_slice(anim.children());
                }
            }
        }
        self.table_items.retain(|t| !removed.contains(t));
        self.keyframes.retain(|key, _| match key.item {
            AnimItemRef::TableItem(t) => !removed.contains(&t),
            AnimItemRef::Knob(k) => match model.knob_anim(k).map(|anim| anim.holder()) {
                Some(HolderRef::TableItem(t)) => !removed.contains(&t),
                Some(HolderRef::Node(_)) => true,
                None => false,
            },
        });
    }

    /// Select every keyframe of every curve and every node drawing a range
    pub fn select_all(&mut self, graph: &Graph, model: &AnimationModel) -> bool {
        let keys = collect_keys(graph, model, model.all_curve_keys(graph));
        let nodes: Vec<NodeAnimId> = model
            .node_anims()
            .filter(|n| n.is_range_drawing_enabled(graph))
            .map(|n| n.id())
            .collect();
        let items: Vec<TableItemAnimId> = model.table_item_anims().map(|t| t.id()).collect();
        self.make_selection(&keys, &items, &nodes, SelectionFlags::CLEAR | SelectionFlags::ADD)
    }

    /// Select every keyframe of the curves whose display row is shown
    pub fn select_all_visible_curves_keyframes(&mut self, graph: &Graph, model: &AnimationModel) -> bool {
        let visible = model.all_curve_keys(graph).into_iter().filter(|key| {
            model
                .anim_item(key.item)
                .and_then(|anim| anim.tree_item(DimSpec::Dim(key.dim), ViewSetSpec::View(key.view)))
                .is_some_and(|row| model.tree().is_item_visible_recursive(row))
        });
        let keys = collect_keys(graph, model, visible);
        self.make_selection(&keys, &[], &[], SelectionFlags::CLEAR | SelectionFlags::ADD)
    }

    /// Select what the given display rows show
    pub fn select_items(&mut self, graph: &Graph, model: &AnimationModel, rows: &[TreeNodeId]) -> bool {
        let mut keys = AnimItemDimViewKeyFramesMap::new();
        let mut nodes = Vec::new();
        let mut items = Vec::new();
        for row in rows {
            let Some(found) = model.find_item(*row) else {
                continue;
            };
            let curves: Option<(&dyn AnimItemBase, AnimItemRef)> = match (found.knob, found.table_item) {
                (Some(knob), _) => model
                    .knob_anim(knob)
                    .map(|k| (k as &dyn AnimItemBase, AnimItemRef::Knob(knob))),
                (None, Some(item)) => {
                    items.push(item);
                    model
                        .table_item_anim(item)
                        .map(|t| (t as &dyn AnimItemBase, AnimItemRef::TableItem(item)))
                }
                (None, None) => {
                    nodes.extend(found.node);
                    None
                }
            };
            if let Some((anim, item)) = curves {
                for (d, v) in anim.expand(graph, found.dim, found.view) {
                    let set = anim.keyframes(graph, DimSpec::Dim(d), ViewSetSpec::View(v), GetKeyframesType::Merged);
                    keys.insert(AnimItemDimViewIndexId::new(item, v, d), set);
                }
            }
        }
        self.make_selection(
            &keys,
            &items,
            &nodes,
            SelectionFlags::CLEAR | SelectionFlags::ADD | SelectionFlags::RECURSE,
        )
    }

    /// Select every keyframe of the matched curves of one entry
    pub fn select_keyframes(
        &mut self,
        graph: &Graph,
        model: &AnimationModel,
        item: AnimItemRef,
        dim: DimSpec,
        view: ViewSetSpec,
    ) -> bool {
        let Some(anim) = model.anim_item(item) else {
            return false;
        };
        let keys = collect_keys(
            graph,
            model,
            anim.expand(graph, dim, view)
                .into_iter()
                .map(|(d, v)| AnimItemDimViewIndexId::new(item, v, d)),
        );
        self.make_selection(&keys, &[], &[], SelectionFlags::CLEAR | SelectionFlags::ADD)
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) -> bool {
        self.make_selection(&AnimItemDimViewKeyFramesMap::new(), &[], &[], SelectionFlags::CLEAR)
    }

    /// Drop the selected keyframes but keep their curves selected
    pub fn clear_keyframes_from_selection(&mut self) -> bool {
        let mut changed = false;
        for set in self.keyframes.values_mut() {
            if !set.is_empty() {
                set.clear();
                changed = true;
            }
        }
        if changed {
            self.signal.emit(AnimationModuleEvent::SelectionChanged { recurse: false });
        }
        changed
    }

    /// Follow keyframes that moved, all moves applied at once
    pub fn apply_key_moves(&mut self, moves: &[KeyMove]) {
        if moves.is_empty() {
            return;
        }
        let mut moved = Vec::new();
        for m in moves {
            if let Some(key) = self.keyframes.get_mut(&m.key).and_then(|set| set.remove(m.from)) {
                moved.push((m.key, key, m.to));
            }
        }
        for (curve, mut key, to) in moved {
            key.time = to;
            if let Some(set) = self.keyframes.get_mut(&curve) {
                set.insert(key);
            }
        }
        self.signal.emit(AnimationModuleEvent::SelectionChanged { recurse: false });
    }

    /// Refresh the selected keyframes from their curves and drop those that no longer exist
    pub fn sync_with_curves(&mut self, graph: &Graph, model: &AnimationModel) {
        let mut changed = false;
        self.keyframes.retain(|key, set| {
            let Some(curve) = model
                .anim_item(key.item)
                .and_then(|anim| anim.curve(graph, key.dim, key.view))
            else {
                changed = true;
                return false;
            };
            let synced: KeyFrameSet = set
                .iter()
                .filter_map(|k| curve.keyframe_at(k.time).copied())
                .collect();
            changed |= synced != *set;
            *set = synced;
            true
        });
        let counts = (self.nodes.len(), self.table_items.len());
        self.nodes.retain(|n| model.node_anim(*n).is_some());
        self.table_items.retain(|t| model.table_item_anim(*t).is_some());
        changed |= counts != (self.nodes.len(), self.table_items.len());
        if changed {
            self.signal.emit(AnimationModuleEvent::SelectionChanged { recurse: false });
        }
    }
}

fn collect_keys(
    graph: &Graph,
    model: &AnimationModel,
    curves: impl IntoIterator<Item = AnimItemDimViewIndexId>,
) -> AnimItemDimViewKeyFramesMap {
    curves
        .into_iter()
        .filter_map(|key| {
            let anim = model.anim_item(key.item)?;
            anim.curve(graph, key.dim, key.view)?;
            let set = anim.keyframes(
                graph,
                DimSpec::Dim(key.dim),
                ViewSetSpec::View(key.view),
                GetKeyframesType::Merged,
            );
            Some((key, set))
        })
        .collect()
}
