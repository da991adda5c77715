// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identities of animation entries and the capabilities they share.

use crate::tree::{DisplayTree, TreeNodeId};
use compositor_graph::{Curve, CurveLocation, DimIdx, DimSpec, Graph, Keyframe, ViewIdx, ViewSetSpec};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

macro_rules! anim_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

anim_id!(
    /// Handle of a [`NodeAnim`](crate::node_anim::NodeAnim)
    NodeAnimId
);
anim_id!(
    /// Handle of a [`KnobAnim`](crate::knob_anim::KnobAnim)
    KnobAnimId
);
anim_id!(
    /// Handle of a [`TableItemAnim`](crate::table_item_anim::TableItemAnim)
    TableItemAnimId
);

/// Role of an animation entry, drives selection and frame range computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimatedItemType {
    /// Generic node
    Common,
    /// Media reader
    Reader,
    /// Speed change node
    Retime,
    /// Time shift node
    TimeOffset,
    /// Frame range node
    FrameRange,
    /// Group node
    Group,
    /// One dimension of a knob
    KnobDim,
    /// Every dimension and view of a knob
    KnobRoot,
    /// One view of a knob
    KnobView,
    /// A table item
    TableItemRoot,
}

impl AnimatedItemType {
    /// Whether this type describes a node entry
    pub fn is_node(&self) -> bool {
        matches!(
            self,
            Self::Common | Self::Reader | Self::Retime | Self::TimeOffset | Self::FrameRange | Self::Group
        )
    }

    /// Whether this type describes a knob entry
    pub fn is_knob(&self) -> bool {
        matches!(self, Self::KnobDim | Self::KnobRoot | Self::KnobView)
    }

    /// Whether nodes of this type remap time for their upstream nodes
    pub fn is_time_node(&self) -> bool {
        matches!(self, Self::Retime | Self::TimeOffset | Self::FrameRange)
    }
}

/// An entry carrying curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnimItemRef {
    /// A knob
    Knob(KnobAnimId),
    /// A table item's own animation
    TableItem(TableItemAnimId),
}

/// An entry holding knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HolderRef {
    /// A node
    Node(NodeAnimId),
    /// A table item
    TableItem(TableItemAnimId),
}

/// Any animation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemRef {
    /// A node
    Node(NodeAnimId),
    /// A knob
    Knob(KnobAnimId),
    /// A table item
    TableItem(TableItemAnimId),
}

impl From<AnimItemRef> for ItemRef {
    fn from(item: AnimItemRef) -> Self {
        match item {
            AnimItemRef::Knob(k) => Self::Knob(k),
            AnimItemRef::TableItem(t) => Self::TableItem(t),
        }
    }
}

impl From<HolderRef> for ItemRef {
    fn from(holder: HolderRef) -> Self {
        match holder {
            HolderRef::Node(n) => Self::Node(n),
            HolderRef::TableItem(t) => Self::TableItem(t),
        }
    }
}

/// Key of one curve: an animated entry, a view and a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnimItemDimViewIndexId {
    /// Animated entry
    pub item: AnimItemRef,
    /// View
    pub view: ViewIdx,
    /// Dimension
    pub dim: DimIdx,
}

impl AnimItemDimViewIndexId {
    /// Create a key
    pub fn new(item: AnimItemRef, view: ViewIdx, dim: DimIdx) -> Self {
        Self { item, view, dim }
    }
}

/// Keyframes of one curve indexed by time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFrameSet(BTreeMap<OrderedFloat<f64>, Keyframe>);

impl KeyFrameSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a keyframe, returns the keyframe previously at that time
    pub fn insert(&mut self, key: Keyframe) -> Option<Keyframe> {
        self.0.insert(OrderedFloat(key.time), key)
    }

    /// Remove the keyframe at `time`
    pub fn remove(&mut self, time: f64) -> Option<Keyframe> {
        self.0.remove(&OrderedFloat(time))
    }

    /// Whether a keyframe exists at `time`
    pub fn contains(&self, time: f64) -> bool {
        self.0.contains_key(&OrderedFloat(time))
    }

    /// Keyframe at `time`
    pub fn get(&self, time: f64) -> Option<&Keyframe> {
        self.0.get(&OrderedFloat(time))
    }

    /// Number of keyframes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keyframes in time order
    pub fn iter(&self) -> impl Iterator<Item = &Keyframe> {
        self.0.values()
    }

    /// Times in increasing order
    pub fn times(&self) -> Vec<f64> {
        self.0.keys().map(|t| t.0).collect()
    }

    /// Earliest keyframe
    pub fn first(&self) -> Option<&Keyframe> {
        self.0.values().next()
    }

    /// Remove every keyframe
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<Keyframe> for KeyFrameSet {
    fn from_iter<I: IntoIterator<Item = Keyframe>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// Keyframes per curve
pub type AnimItemDimViewKeyFramesMap = BTreeMap<AnimItemDimViewIndexId, KeyFrameSet>;

/// How keyframes of several views are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GetKeyframesType {
    /// Union of every requested view
    #[default]
    Merged,
    /// Only the first requested view
    Single,
}

/// Capabilities of an entry that owns curves
pub trait AnimItemBase {
    /// Reference to this entry
    fn anim_ref(&self) -> AnimItemRef;

    /// Location of the curve of a (dimension, view) pair in the graph
    fn curve_location(&self, graph: &Graph, dim: DimIdx, view: ViewIdx) -> Option<CurveLocation>;

    /// Number of dimensions
    fn n_dimensions(&self, graph: &Graph) -> usize;

    /// Views the entry has curves for
    fn views(&self, graph: &Graph) -> Vec<ViewIdx>;

    /// Whether every dimension of `view` is shown
    fn all_dimensions_visible(&self, graph: &Graph, tree: &DisplayTree, view: ViewIdx) -> bool;

    /// Display entry of a (dimension, view) selection
    fn tree_item(&self, dim: DimSpec, view: ViewSetSpec) -> Option<TreeNodeId>;

    /// Curve of a (dimension, view) pair
    fn curve<'g>(&self, graph: &'g Graph, dim: DimIdx, view: ViewIdx) -> Option<&'g Curve> {
        self.curve_location(graph, dim, view)
            .and_then(|location| graph.curve(location))
    }

    /// Every existing (dimension, view) pair matched by the specs
    fn expand(&self, graph: &Graph, dim: DimSpec, view: ViewSetSpec) -> Vec<(DimIdx, ViewIdx)> {
        let n_dims = self.n_dimensions(graph);
        let views = self.views(graph);
        view.expand(&views)
            .into_iter()
            .filter(|v| views.contains(v))
            .flat_map(|v| {
                dim.expand(n_dims)
                    .into_iter()
                    .filter(move |d| d.0 < n_dims)
                    .map(move |d| (d, v))
            })
            .collect()
    }

    /// Keyframes of the matched curves
    fn keyframes(&self, graph: &Graph, dim: DimSpec, view: ViewSetSpec, policy: GetKeyframesType) -> KeyFrameSet {
        let pairs = self.expand(graph, dim, view);
        let first_view = pairs.first().map(|(_, v)| *v);
        let mut out = KeyFrameSet::new();
        for (d, v) in pairs {
            if policy == GetKeyframesType::Single && Some(v) != first_view {
                continue;
            }
            if let Some(curve) = self.curve(graph, d, v) {
                for key in curve.keyframes() {
                    if !out.contains(key.time) {
                        out.insert(*key);
                    }
                }
            }
        }
        out
    }

    /// Whether any matched curve has keyframes
    fn has_animation(&self, graph: &Graph) -> bool {
        self.expand(graph, DimSpec::All, ViewSetSpec::All)
            .into_iter()
            .any(|(d, v)| self.curve(graph, d, v).is_some_and(|c| !c.is_empty()))
    }
}

/// Capabilities of an entry that owns knobs
pub trait KnobsHolderAnimBase {
    /// Reference to this holder
    fn holder_ref(&self) -> HolderRef;

    /// Knob entries of this holder
    fn knobs(&self) -> &[KnobAnimId];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyframe_set_orders_by_time() {
        let set: KeyFrameSet = [Keyframe::new(5.0, 1.0), Keyframe::new(-1.0, 0.0), Keyframe::new(5.0, 2.0)]
            .into_iter()
            .collect();
        assert_eq!(set.times(), vec![-1.0, 5.0]);
        assert_eq!(set.get(5.0).map(|k| k.value), Some(2.0));
    }

    #[test]
    fn test_index_id_equality_uses_all_components() {
        let knob = AnimItemRef::Knob(KnobAnimId::new());
        let a = AnimItemDimViewIndexId::new(knob, ViewIdx(0), DimIdx(0));
        let b = AnimItemDimViewIndexId::new(knob, ViewIdx(0), DimIdx(1));
        let other = AnimItemDimViewIndexId::new(AnimItemRef::Knob(KnobAnimId::new()), ViewIdx(0), DimIdx(0));
        assert_ne!(a, b);
        assert_ne!(a, other);
        assert_eq!(a, AnimItemDimViewIndexId::new(knob, ViewIdx(0), DimIdx(0)));
    }

    #[test]
    fn test_item_type_classification() {
        assert!(AnimatedItemType::Retime.is_time_node());
        assert!(!AnimatedItemType::Group.is_time_node());
        assert!(AnimatedItemType::Group.is_node());
        assert!(AnimatedItemType::KnobView.is_knob());
        assert!(!AnimatedItemType::TableItemRoot.is_node());
    }
}
