// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node and plugin definitions for the compositing graph.

use crate::item_table::ItemTable;
use crate::knob::{KnobId, KnobKind, KnobTemplate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifiers of the built-in plugins
pub mod plugin_ids {
    /// Image sequence reader
    pub const READ: &str = "compositor.Read";
    /// Speed change
    pub const RETIME: &str = "compositor.Retime";
    /// Constant time shift
    pub const TIME_OFFSET: &str = "compositor.TimeOffset";
    /// Explicit frame range restriction
    pub const FRAME_RANGE: &str = "compositor.FrameRange";
    /// Container of other nodes
    pub const GROUP: &str = "compositor.Group";
    /// Blur filter
    pub const BLUR: &str = "compositor.Blur";
    /// 2D transform
    pub const TRANSFORM: &str = "compositor.Transform";
    /// Point tracker, owns an item table of tracks
    pub const TRACKER: &str = "compositor.Tracker";
}

/// Script names of the knobs the animation module reads
pub mod knob_names {
    /// First frame of a reader's visible range
    pub const FIRST_FRAME: &str = "firstFrame";
    /// Last frame of a reader's visible range
    pub const LAST_FRAME: &str = "lastFrame";
    /// Source range of a reader, two dimensions
    pub const ORIGINAL_FRAME_RANGE: &str = "originalFrameRange";
    /// Time at which a reader's first frame is output
    pub const STARTING_TIME: &str = "startingTime";
    /// Time shift of a reader or time-offset node
    pub const TIME_OFFSET: &str = "timeOffset";
    /// Retime speed factor
    pub const SPEED: &str = "speed";
    /// Frame range of a frame-range node, two dimensions
    pub const FRAME_RANGE: &str = "frameRange";
    /// Whether a node's lifetime range is enabled
    pub const ENABLE_LIFETIME: &str = "enableLifetime";
    /// Lifetime range of a node, two dimensions
    pub const LIFETIME: &str = "lifetime";
}

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Plugin category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginCategory {
    /// Readers of media
    Input,
    /// Nodes remapping the time axis
    Time,
    /// Containers of other nodes
    Group,
    /// Image filters
    Filter,
    /// Geometric transforms
    Transform,
    /// Trackers and other item-table owners
    Tracking,
}

/// Plugin definition used to instantiate nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin identifier
    pub id: String,
    /// Display name
    pub label: String,
    /// Category
    pub category: PluginCategory,
    /// Number of input slots
    pub input_count: usize,
    /// Knobs created on each instance
    pub knobs: Vec<KnobTemplate>,
    /// Names of the item tables owned by each instance
    pub item_tables: Vec<String>,
}

impl PluginDescriptor {
    /// Create a descriptor with no knobs
    pub fn new(id: impl Into<String>, label: impl Into<String>, category: PluginCategory, input_count: usize) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category,
            input_count,
            knobs: lifetime_knobs(),
            item_tables: Vec::new(),
        }
    }

    /// Add a knob template
    pub fn with_knob(mut self, knob: KnobTemplate) -> Self {
        self.knobs.push(knob);
        self
    }

    /// Add an item table
    pub fn with_item_table(mut self, name: impl Into<String>) -> Self {
        self.item_tables.push(name.into());
        self
    }
}

fn lifetime_knobs() -> Vec<KnobTemplate> {
    vec![
        KnobTemplate::new(knob_names::ENABLE_LIFETIME, KnobKind::Bool, vec![0.0])
            .not_animatable()
            .secret(),
        KnobTemplate::new(knob_names::LIFETIME, KnobKind::Int, vec![1.0, 100.0])
            .not_animatable()
            .secret(),
    ]
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Plugin identifier
    pub plugin_id: String,
    /// Script name, unique among siblings
    pub name: String,
    /// Knobs, in declaration order
    pub knobs: Vec<KnobId>,
    /// Number of input slots
    pub input_count: usize,
    /// Enclosing group, `None` at the top level
    pub group: Option<NodeId>,
    /// Item tables owned by this node
    pub item_tables: Vec<ItemTable>,
    /// Whether the node's settings panel is open
    pub settings_panel_open: bool,
    /// Position in the node graph UI
    pub position: [f32; 2],
}

impl Node {
    /// Whether this node reads media
    pub fn is_reader(&self) -> bool {
        self.plugin_id == plugin_ids::READ
    }

    /// Whether this node contains other nodes
    pub fn is_group(&self) -> bool {
        self.plugin_id == plugin_ids::GROUP
    }

    /// Whether this node remaps time for everything upstream
    pub fn is_time_node(&self) -> bool {
        matches!(
            self.plugin_id.as_str(),
            plugin_ids::RETIME | plugin_ids::TIME_OFFSET | plugin_ids::FRAME_RANGE
        )
    }
}

/// Registry of available plugins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistry {
    plugins: indexmap::IndexMap<String, PluginDescriptor>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: indexmap::IndexMap::new(),
        }
    }

    /// Registry populated with the built-in plugins
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            PluginDescriptor::new(plugin_ids::READ, "Read", PluginCategory::Input, 0)
                .with_knob(KnobTemplate::new(knob_names::FIRST_FRAME, KnobKind::Int, vec![1.0]).not_animatable())
                .with_knob(KnobTemplate::new(knob_names::LAST_FRAME, KnobKind::Int, vec![100.0]).not_animatable())
                .with_knob(
                    KnobTemplate::new(knob_names::ORIGINAL_FRAME_RANGE, KnobKind::Int, vec![1.0, 100.0])
                        .not_animatable()
                        .secret(),
                )
                .with_knob(KnobTemplate::new(knob_names::STARTING_TIME, KnobKind::Int, vec![1.0]).not_animatable())
                .with_knob(KnobTemplate::new(knob_names::TIME_OFFSET, KnobKind::Int, vec![0.0]).not_animatable())
                .with_knob(KnobTemplate::new("exposure", KnobKind::Double, vec![0.0])),
        );
        registry.register(
            PluginDescriptor::new(plugin_ids::RETIME, "Retime", PluginCategory::Time, 1)
                .with_knob(KnobTemplate::new(knob_names::SPEED, KnobKind::Double, vec![1.0])),
        );
        registry.register(
            PluginDescriptor::new(plugin_ids::TIME_OFFSET, "TimeOffset", PluginCategory::Time, 1)
                .with_knob(KnobTemplate::new(knob_names::TIME_OFFSET, KnobKind::Int, vec![0.0]).not_animatable()),
        );
        registry.register(
            PluginDescriptor::new(plugin_ids::FRAME_RANGE, "FrameRange", PluginCategory::Time, 1)
                .with_knob(KnobTemplate::new(knob_names::FRAME_RANGE, KnobKind::Int, vec![1.0, 100.0]).not_animatable()),
        );
        registry.register(PluginDescriptor::new(plugin_ids::GROUP, "Group", PluginCategory::Group, 1));
        registry.register(
            PluginDescriptor::new(plugin_ids::BLUR, "Blur", PluginCategory::Filter, 1)
                .with_knob(KnobTemplate::new("size", KnobKind::Double, vec![0.0, 0.0]))
                .with_knob(KnobTemplate::new("filter", KnobKind::Choice, vec![0.0]))
                .with_knob(KnobTemplate::new("label", KnobKind::String, vec![0.0]))
                .with_knob(KnobTemplate::new("recompute", KnobKind::Button, vec![0.0])),
        );
        registry.register(
            PluginDescriptor::new(plugin_ids::TRANSFORM, "Transform", PluginCategory::Transform, 1)
                .with_knob(KnobTemplate::new("translate", KnobKind::Double, vec![0.0, 0.0]))
                .with_knob(KnobTemplate::new("rotate", KnobKind::Double, vec![0.0]))
                .with_knob(KnobTemplate::new("invert", KnobKind::Bool, vec![0.0])),
        );
        registry.register(
            PluginDescriptor::new(plugin_ids::TRACKER, "Tracker", PluginCategory::Tracking, 1)
                .with_knob(KnobTemplate::new("reference", KnobKind::Int, vec![1.0]))
                .with_item_table("tracks"),
        );
        registry
    }

    /// Register a plugin
    pub fn register(&mut self, plugin: PluginDescriptor) {
        self.plugins.insert(plugin.id.clone(), plugin);
    }

    /// Get a plugin by ID
    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(id)
    }

    /// Get all registered plugins
    pub fn plugins(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.values()
    }

    /// Get plugins by category
    pub fn plugins_in_category(&self, category: PluginCategory) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.values().filter(move |p| p.category == category)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_time_plugins() {
        let registry = NodeRegistry::with_builtins();
        assert_eq!(registry.plugins_in_category(PluginCategory::Time).count(), 3);
        let read = registry.get(plugin_ids::READ).unwrap();
        assert!(read.knobs.iter().any(|k| k.name == knob_names::ORIGINAL_FRAME_RANGE));
        assert!(read.knobs.iter().any(|k| k.name == knob_names::LIFETIME));
    }
}
