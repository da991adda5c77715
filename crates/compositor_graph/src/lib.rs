// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compositing node graph consumed by the animation module.
//!
//! This crate provides the data the animation editor works on:
//! - Nodes instantiated from plugin descriptors
//! - Knobs with per-(view, dimension) values and curves
//! - Item tables owned by nodes
//! - Keyframe curves and warps
//!
//! ## Architecture
//!
//! Every entity lives in an arena owned by [`Graph`] and is addressed by a
//! UUID-backed handle. Traversal queries (nearest time node downstream,
//! nearest reader upstream) are depth-first searches with visited sets and
//! terminate on cyclic graphs.

pub mod keyframe;
pub mod warp;
pub mod curve;
pub mod knob;
pub mod item_table;
pub mod node;
pub mod connection;
pub mod graph;

pub use keyframe::{Interpolation, Keyframe, KeyframeType};
pub use warp::{KeyframeWarp, Matrix3};
pub use curve::{Curve, CurveError, CurveType, WarpedKeyframe};
pub use knob::{DimIdx, DimSpec, Knob, KnobId, KnobKind, KnobTemplate, ViewIdx, ViewSetSpec};
pub use item_table::{ItemTable, TableItem, TableItemId};
pub use node::{knob_names, plugin_ids, Node, NodeId, NodeRegistry, PluginCategory, PluginDescriptor};
pub use connection::{Connection, ConnectionId};
pub use graph::{ConnectionError, CurveLocation, Graph, GraphError, KnobOwner};
