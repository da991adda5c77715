// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation module of the compositor: the model behind the dope sheet and the curve editor.
//!
//! This crate provides:
//! - Animation entries wrapping graph nodes, knobs and table rows
//! - Node frame ranges by node category
//! - The display tree shared by the animation views
//! - Keyframe, node and table row selection
//! - Undoable keyframe and node edits with a bounded history
//! - A keyframe clipboard
//!
//! ## Architecture
//!
//! [`AnimationModule`] is the facade. It owns the [`compositor_graph::Graph`],
//! an [`AnimationModel`] arena of entries addressed by handles, the
//! [`AnimationModuleSelectionModel`] and the [`History`]. Edits go through
//! [`AnimationCommand`]s whose touched state is snapshotted with bincode,
//! so undo restores exactly what was there.

pub mod anim_item;
pub mod tree;
pub mod knob_anim;
pub mod table_item_anim;
pub mod node_anim;
pub mod model;
pub mod selection;
pub mod history;
pub mod commands;
pub mod clipboard;
pub mod events;
pub mod settings;
pub mod error;
pub mod module;

pub use anim_item::{
    AnimItemBase, AnimItemDimViewIndexId, AnimItemDimViewKeyFramesMap, AnimItemRef, AnimatedItemType,
    GetKeyframesType, HolderRef, ItemRef, KeyFrameSet, KnobAnimId, KnobsHolderAnimBase, NodeAnimId, TableItemAnimId,
};
pub use tree::{DisplayTree, TreeEntry, TreeNodeId, TreeOwner};
pub use knob_anim::KnobAnim;
pub use table_item_anim::TableItemAnim;
pub use node_anim::{reader_range, NodeAnim};
pub use model::{AnimationModel, FoundItem};
pub use selection::{AnimationModuleSelectionModel, KeyMove, SelectionFlags};
pub use history::{History, HistoryError, OperationGroup, StateSnapshot, StateTarget};
pub use commands::{AnimationCommand, CommandEffect, CommandError, MergeKey, MovedKeyframe};
pub use clipboard::KeyFrameClipboard;
pub use events::{AnimationModuleEvent, Signal};
pub use settings::{AnimationModuleSettings, PasteMode, SettingsError};
pub use error::{AnimationError, EditOutcome};
pub use module::{AnimationModule, RowKeyframe};
