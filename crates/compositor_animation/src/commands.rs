// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undoable animation edits.
//!
//! A command names the graph state it touches and then mutates it. The
//! history snapshots that state around the mutation, so commands never need
//! to know how to revert themselves.

use crate::history::{History, HistoryError, OperationGroup, StateTarget};
use compositor_graph::{
    knob_names, plugin_ids, CurveError, CurveLocation, DimIdx, GraphError, Graph, Keyframe, KeyframeType,
    KeyframeWarp, Knob, KnobId, Node, NodeId, TableItemId, ViewIdx,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Trait for animation edits that can be undone/redone
pub trait AnimationCommand {
    /// Get a description of this command
    fn description(&self) -> String;

    /// Graph state the command may modify
    fn targets(&self, graph: &Graph) -> Vec<StateTarget>;

    /// Execute the command
    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError>;

    /// Consecutive commands with equal keys may share one undo entry
    fn merge_key(&self) -> Option<MergeKey> {
        None
    }
}

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Curve not found
    #[error("Curve not found: {0:?}")]
    CurveNotFound(CurveLocation),

    /// Knob not found
    #[error("Knob not found: {0:?}")]
    KnobNotFound(KnobId),

    /// A curve refused the edit
    #[error("Curve edit failed: {0}")]
    Curve(#[from] CurveError),

    /// The graph refused the edit
    #[error("Graph edit failed: {0}")]
    Graph(#[from] GraphError),
}

/// A keyframe whose time changed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovedKeyframe {
    /// Curve holding the keyframe
    pub location: CurveLocation,
    /// Time before the edit
    pub from: f64,
    /// Time after the edit
    pub to: f64,
}

/// What a command changed in the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandEffect {
    /// Keyframes whose time changed
    pub moved_keys: Vec<MovedKeyframe>,
    /// Knobs whose static values changed
    pub changed_knobs: Vec<KnobId>,
    /// Curves whose keyframes changed
    pub changed_curves: Vec<CurveLocation>,
}

impl CommandEffect {
    /// Effect of reverting the edit
    pub fn inverse(&self) -> Self {
        Self {
            moved_keys: self
                .moved_keys
                .iter()
                .map(|m| MovedKeyframe {
                    location: m.location,
                    from: m.to,
                    to: m.from,
                })
                .collect(),
            changed_knobs: self.changed_knobs.clone(),
            changed_curves: self.changed_curves.clone(),
        }
    }

    /// Effect of this edit followed by `later`
    pub fn then(mut self, later: Self) -> Self {
        let continued: Vec<Option<usize>> = later
            .moved_keys
            .iter()
            .map(|m| {
                self.moved_keys
                    .iter()
                    .position(|e| e.location == m.location && e.to == m.from)
            })
            .collect();
        for (m, index) in later.moved_keys.into_iter().zip(continued) {
            match index {
                Some(i) => self.moved_keys[i].to = m.to,
                None => self.moved_keys.push(m),
            }
        }
        for knob in later.changed_knobs {
            if !self.changed_knobs.contains(&knob) {
                self.changed_knobs.push(knob);
            }
        }
        for curve in later.changed_curves {
            if !self.changed_curves.contains(&curve) {
                self.changed_curves.push(curve);
            }
        }
        self
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.moved_keys.is_empty() && self.changed_knobs.is_empty() && self.changed_curves.is_empty()
    }

    fn touch_curve(&mut self, location: CurveLocation) {
        if !self.changed_curves.contains(&location) {
            self.changed_curves.push(location);
        }
    }

    fn touch_knob(&mut self, knob: KnobId) {
        if !self.changed_knobs.contains(&knob) {
            self.changed_knobs.push(knob);
        }
    }
}

/// Identity of a drag: the curves, nodes and table rows being moved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeKey {
    /// Curves whose keyframes move
    pub curves: Vec<CurveLocation>,
    /// Nodes that move
    pub nodes: Vec<NodeId>,
    /// Table rows that move
    pub table_items: Vec<TableItemId>,
}

/// Execute a command and record it in the history.
///
/// The graph is left untouched when the command fails.
pub fn push_command(
    history: &mut History,
    graph: &mut Graph,
    command: &dyn AnimationCommand,
    allow_merge: bool,
) -> Result<CommandEffect, CommandError> {
    let mut seen = HashSet::new();
    let targets: Vec<StateTarget> = command
        .targets(graph)
        .into_iter()
        .filter(|t| seen.insert(*t))
        .collect();
    let before = targets
        .iter()
        .map(|t| t.capture(graph))
        .collect::<Result<Vec<_>, _>>()?;

    let effect = match command.execute(graph) {
        Ok(effect) => effect,
        Err(err) => {
            for (target, snapshot) in targets.iter().zip(&before).rev() {
                if let Err(restore_err) = target.restore(graph, snapshot) {
                    tracing::error!("Failed to roll back {:?}: {}", target, restore_err);
                }
            }
            return Err(err);
        }
    };

    let mut group = OperationGroup::new(command.description());
    for (target, before) in targets.into_iter().zip(before) {
        let after = target.capture(graph)?;
        group.push(target, before, after);
    }
    group.effect = effect.clone();
    group.merge_key = command.merge_key();
    history.commit(group, allow_merge);
    Ok(effect)
}

/// Knob edit applied when a node is moved in time
#[derive(Debug, Clone, PartialEq)]
struct ShiftEdit {
    knob: KnobId,
    dims: Vec<usize>,
    curves: bool,
}

/// Time-defining knob values of a node itself
fn own_time_edits(graph: &Graph, node: &Node) -> Option<ShiftEdit> {
    let edit = |name: &str, dims: Vec<usize>| {
        graph.knob_id_by_name(node.id, name).map(|knob| ShiftEdit {
            knob,
            dims,
            curves: false,
        })
    };
    match node.plugin_id.as_str() {
        plugin_ids::READ => edit(knob_names::STARTING_TIME, vec![0]),
        plugin_ids::TIME_OFFSET => edit(knob_names::TIME_OFFSET, vec![0]),
        plugin_ids::FRAME_RANGE => edit(knob_names::FRAME_RANGE, vec![0, 1]),
        plugin_ids::GROUP | plugin_ids::RETIME => None,
        _ if graph.knob_value(node.id, knob_names::ENABLE_LIFETIME, 0) != 0.0 => {
            edit(knob_names::LIFETIME, vec![0, 1])
        }
        _ => None,
    }
}

/// Every knob edit that moves a node in time. A group moves everything it contains.
fn node_shift_plan(graph: &Graph, node_id: NodeId) -> Vec<ShiftEdit> {
    let Some(node) = graph.node(node_id) else {
        return Vec::new();
    };
    let mut plan: Vec<ShiftEdit> = own_time_edits(graph, node).into_iter().collect();
    if node.is_group() {
        for child in graph.nodes_in_group_recursive(node_id) {
            let Some(child) = graph.node(child) else {
                continue;
            };
            plan.extend(own_time_edits(graph, child));
            plan.extend(
                child
                    .knobs
                    .iter()
                    .filter(|k| graph.knob(**k).is_some_and(Knob::has_animation))
                    .map(|k| ShiftEdit {
                        knob: *k,
                        dims: Vec::new(),
                        curves: true,
                    }),
            );
        }
    }
    plan
}

fn shift_curve(
    graph: &mut Graph,
    location: CurveLocation,
    dt: f64,
    effect: &mut CommandEffect,
) -> Result<(), CommandError> {
    let curve = graph.curve_mut(location).ok_or(CommandError::CurveNotFound(location))?;
    if curve.is_empty() {
        return Ok(());
    }
    let times: Vec<f64> = curve.keyframes().iter().map(|k| k.time).collect();
    let warped = curve.transform_keyframes(&times, &KeyframeWarp::translation(dt, 0.0))?;
    effect.moved_keys.extend(warped.into_iter().map(|w| MovedKeyframe {
        location,
        from: w.original_time,
        to: w.keyframe.time,
    }));
    effect.touch_curve(location);
    Ok(())
}

/// Move keyframes with a warp, and with a translation also move nodes and table rows in time
#[derive(Debug, Clone)]
pub struct WarpKeysCommand {
    keys: Vec<(CurveLocation, Vec<f64>)>,
    nodes: Vec<NodeId>,
    table_items: Vec<TableItemId>,
    warp: KeyframeWarp,
}

impl WarpKeysCommand {
    /// Create the command. Times are sorted per curve.
    pub fn new(
        keys: Vec<(CurveLocation, Vec<f64>)>,
        nodes: Vec<NodeId>,
        table_items: Vec<TableItemId>,
        warp: KeyframeWarp,
    ) -> Self {
        let keys = keys
            .into_iter()
            .map(|(location, mut times)| {
                times.sort_by(f64::total_cmp);
                times.dedup();
                (location, times)
            })
            .collect();
        Self {
            keys,
            nodes,
            table_items,
            warp,
        }
    }

    fn node_dt(&self) -> Option<f64> {
        self.warp.time_offset().filter(|dt| *dt != 0.0)
    }

    fn moves_curve(&self, location: CurveLocation) -> bool {
        self.keys.iter().any(|(l, _)| *l == location)
    }

    fn table_item_curves<'a>(&'a self, graph: &'a Graph) -> impl Iterator<Item = CurveLocation> + 'a {
        self.table_items
            .iter()
            .map(|t| CurveLocation::TableItem(*t))
            .filter(|l| graph.curve(*l).is_some() && !self.moves_curve(*l))
    }
}

impl AnimationCommand for WarpKeysCommand {
    fn description(&self) -> String {
        match self.warp {
            KeyframeWarp::Translation { .. } => "Move keyframes".to_string(),
            KeyframeWarp::Affine(_) => "Transform keyframes".to_string(),
        }
    }

    fn targets(&self, graph: &Graph) -> Vec<StateTarget> {
        let mut targets: Vec<StateTarget> = self.keys.iter().map(|(l, _)| StateTarget::Curve(*l)).collect();
        if self.node_dt().is_some() {
            for node in &self.nodes {
                targets.extend(
                    node_shift_plan(graph, *node)
                        .into_iter()
                        .map(|edit| StateTarget::Knob(edit.knob)),
                );
            }
            targets.extend(self.table_item_curves(graph).map(StateTarget::Curve));
        }
        targets
    }

    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError> {
        let mut effect = CommandEffect::default();
        for (location, times) in &self.keys {
            let curve = graph.curve_mut(*location).ok_or(CommandError::CurveNotFound(*location))?;
            let warped = curve.transform_keyframes(times, &self.warp)?;
            effect.moved_keys.extend(warped.into_iter().map(|w| MovedKeyframe {
                location: *location,
                from: w.original_time,
                to: w.keyframe.time,
            }));
            effect.touch_curve(*location);
        }

        let Some(dt) = self.node_dt() else {
            return Ok(effect);
        };
        for node in &self.nodes {
            for edit in node_shift_plan(graph, *node) {
                let knob = graph.knob_mut(edit.knob).ok_or(CommandError::KnobNotFound(edit.knob))?;
                for d in &edit.dims {
                    let value = knob.value(DimIdx(*d), ViewIdx(0));
                    knob.set_value(DimIdx(*d), ViewIdx(0), value + dt);
                }
                let curves: Vec<CurveLocation> = if edit.curves {
                    let n_dims = knob.n_dimensions();
                    knob.views()
                        .iter()
                        .flat_map(|v| {
                            (0..n_dims).map(move |d| CurveLocation::Knob {
                                knob: edit.knob,
                                view: *v,
                                dim: DimIdx(d),
                            })
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                if !edit.dims.is_empty() {
                    effect.touch_knob(edit.knob);
                }
                for location in curves.into_iter().filter(|l| !self.moves_curve(*l)) {
                    shift_curve(graph, location, dt, &mut effect)?;
                }
            }
        }
        let item_curves: Vec<CurveLocation> = self.table_item_curves(graph).collect();
        for location in item_curves {
            shift_curve(graph, location, dt, &mut effect)?;
        }
        Ok(effect)
    }

    fn merge_key(&self) -> Option<MergeKey> {
        match self.warp {
            KeyframeWarp::Translation { .. } => Some(MergeKey {
                curves: self.keys.iter().map(|(l, _)| *l).collect(),
                nodes: self.nodes.clone(),
                table_items: self.table_items.clone(),
            }),
            KeyframeWarp::Affine(_) => None,
        }
    }
}

/// One static knob value to set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnobValueEdit {
    /// Knob to edit
    pub knob: KnobId,
    /// Dimension
    pub dim: DimIdx,
    /// View
    pub view: ViewIdx,
    /// New value
    pub value: f64,
}

/// Set static knob values atomically
#[derive(Debug, Clone)]
pub struct SetKnobValuesCommand {
    description: String,
    edits: Vec<KnobValueEdit>,
}

impl SetKnobValuesCommand {
    /// Create the command
    pub fn new(description: impl Into<String>, edits: Vec<KnobValueEdit>) -> Self {
        Self {
            description: description.into(),
            edits,
        }
    }
}

impl AnimationCommand for SetKnobValuesCommand {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn targets(&self, _graph: &Graph) -> Vec<StateTarget> {
        self.edits.iter().map(|e| StateTarget::Knob(e.knob)).collect()
    }

    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError> {
        let mut effect = CommandEffect::default();
        for edit in &self.edits {
            let knob = graph.knob_mut(edit.knob).ok_or(CommandError::KnobNotFound(edit.knob))?;
            if !knob.set_value(edit.dim, edit.view, edit.value) {
                return Err(CommandError::KnobNotFound(edit.knob));
            }
            effect.touch_knob(edit.knob);
        }
        Ok(effect)
    }
}

/// Rename a node
#[derive(Debug, Clone)]
pub struct RenameNodeCommand {
    node: NodeId,
    name: String,
}

impl RenameNodeCommand {
    /// Create the command
    pub fn new(node: NodeId, name: impl Into<String>) -> Self {
        Self { node, name: name.into() }
    }
}

impl AnimationCommand for RenameNodeCommand {
    fn description(&self) -> String {
        format!("Rename to {}", self.name)
    }

    fn targets(&self, _graph: &Graph) -> Vec<StateTarget> {
        vec![StateTarget::NodeName(self.node)]
    }

    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError> {
        graph.rename_node(self.node, &self.name)?;
        Ok(CommandEffect::default())
    }
}

/// Paste keyframes onto one curve, shifted by an offset
#[derive(Debug, Clone)]
pub struct PasteKeysCommand {
    target: CurveLocation,
    keys: Vec<Keyframe>,
    offset: f64,
}

impl PasteKeysCommand {
    /// Create the command
    pub fn new(target: CurveLocation, keys: Vec<Keyframe>, offset: f64) -> Self {
        Self { target, keys, offset }
    }
}

impl AnimationCommand for PasteKeysCommand {
    fn description(&self) -> String {
        "Paste keyframes".to_string()
    }

    fn targets(&self, _graph: &Graph) -> Vec<StateTarget> {
        vec![StateTarget::Curve(self.target)]
    }

    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError> {
        let curve = graph.curve_mut(self.target).ok_or(CommandError::CurveNotFound(self.target))?;
        for key in &self.keys {
            curve.set_keyframe(Keyframe {
                time: key.time + self.offset,
                ..*key
            });
        }
        let mut effect = CommandEffect::default();
        effect.touch_curve(self.target);
        Ok(effect)
    }
}

/// Change the interpolation of keyframes
#[derive(Debug, Clone)]
pub struct SetKeysInterpolationCommand {
    keys: Vec<(CurveLocation, Vec<f64>)>,
    interpolation: KeyframeType,
}

impl SetKeysInterpolationCommand {
    /// Create the command
    pub fn new(keys: Vec<(CurveLocation, Vec<f64>)>, interpolation: KeyframeType) -> Self {
        Self { keys, interpolation }
    }
}

impl AnimationCommand for SetKeysInterpolationCommand {
    fn description(&self) -> String {
        format!("Set interpolation to {}", self.interpolation.name())
    }

    fn targets(&self, _graph: &Graph) -> Vec<StateTarget> {
        self.keys.iter().map(|(l, _)| StateTarget::Curve(*l)).collect()
    }

    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError> {
        let mut effect = CommandEffect::default();
        for (location, times) in &self.keys {
            let curve = graph.curve_mut(*location).ok_or(CommandError::CurveNotFound(*location))?;
            if curve.set_interpolation_at_times(times, self.interpolation) > 0 {
                effect.touch_curve(*location);
            }
        }
        Ok(effect)
    }
}

/// Insert or replace keyframes
#[derive(Debug, Clone)]
pub struct AddKeysCommand {
    keys: Vec<(CurveLocation, Vec<Keyframe>)>,
}

impl AddKeysCommand {
    /// Create the command
    pub fn new(keys: Vec<(CurveLocation, Vec<Keyframe>)>) -> Self {
        Self { keys }
    }
}

impl AnimationCommand for AddKeysCommand {
    fn description(&self) -> String {
        "Set keyframes".to_string()
    }

    fn targets(&self, _graph: &Graph) -> Vec<StateTarget> {
        self.keys.iter().map(|(l, _)| StateTarget::Curve(*l)).collect()
    }

    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError> {
        let mut effect = CommandEffect::default();
        for (location, keys) in &self.keys {
            let curve = graph.curve_mut(*location).ok_or(CommandError::CurveNotFound(*location))?;
            for key in keys {
                curve.set_keyframe(*key);
            }
            effect.touch_curve(*location);
        }
        Ok(effect)
    }
}

/// Remove keyframes
#[derive(Debug, Clone)]
pub struct RemoveKeysCommand {
    keys: Vec<(CurveLocation, Vec<f64>)>,
}

impl RemoveKeysCommand {
    /// Create the command
    pub fn new(keys: Vec<(CurveLocation, Vec<f64>)>) -> Self {
        Self { keys }
    }
}

impl AnimationCommand for RemoveKeysCommand {
    fn description(&self) -> String {
        "Delete keyframes".to_string()
    }

    fn targets(&self, _graph: &Graph) -> Vec<StateTarget> {
        self.keys.iter().map(|(l, _)| StateTarget::Curve(*l)).collect()
    }

    fn execute(&self, graph: &mut Graph) -> Result<CommandEffect, CommandError> {
        let mut effect = CommandEffect::default();
        for (location, times) in &self.keys {
            let curve = graph.curve_mut(*location).ok_or(CommandError::CurveNotFound(*location))?;
            let removed = times.iter().filter(|t| curve.remove_keyframe_at(**t).is_some()).count();
            if removed > 0 {
                effect.touch_curve(*location);
            }
        }
        Ok(effect)
    }
}
