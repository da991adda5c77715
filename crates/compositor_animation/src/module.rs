// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing facade of the animation module.
//!
//! [`AnimationModule`] owns the graph, the animation model, the selection, the
//! undo history and the keyframe clipboard. Every edit it accepts is pushed as
//! exactly one undoable command; rejected edits leave everything untouched.

use crate::anim_item::{
    AnimItemDimViewKeyFramesMap, AnimItemRef, GetKeyframesType, KeyFrameSet, NodeAnimId, TableItemAnimId,
};
use crate::clipboard::KeyFrameClipboard;
use crate::commands::{
    push_command, AddKeysCommand, AnimationCommand, CommandEffect, CommandError, KnobValueEdit, PasteKeysCommand,
    RemoveKeysCommand, RenameNodeCommand, SetKeysInterpolationCommand, SetKnobValuesCommand, WarpKeysCommand,
};
use crate::error::{AnimationError, EditOutcome, Result};
use crate::events::{AnimationModuleEvent, Signal};
use crate::history::History;
use crate::model::{AnimationModel, FoundItem};
use crate::selection::{AnimationModuleSelectionModel, KeyMove, SelectionFlags};
use crate::settings::AnimationModuleSettings;
use crate::tree::TreeNodeId;
use compositor_graph::{
    knob_names, CurveLocation, DimIdx, DimSpec, Graph, Keyframe, KeyframeType, KeyframeWarp, KnobId, KnobOwner,
    Matrix3, NodeId, TableItemId, ViewIdx, ViewSetSpec,
};

/// Frame knobs of a reader
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReaderFrames {
    first: f64,
    last: f64,
    original_first: f64,
    original_last: f64,
}

/// A keyframe shown on a display row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowKeyframe {
    /// Keyframe of the first matched curve at that time
    pub keyframe: Keyframe,
    /// Whether it is selected on every matched curve
    pub selected: bool,
    /// Whether the row stands for several curves
    pub master: bool,
}

/// Aggregate of the animation model, its selection, its undo stack and its clipboard
#[derive(Debug)]
pub struct AnimationModule {
    graph: Graph,
    model: AnimationModel,
    selection: AnimationModuleSelectionModel,
    history: History,
    clipboard: KeyFrameClipboard,
    settings: AnimationModuleSettings,
    current_time: f64,
    draft_render: bool,
    events: Signal<AnimationModuleEvent>,
}

impl AnimationModule {
    /// Create a module over a graph. No node is wrapped until [`Self::add_node`] is called.
    pub fn new(graph: Graph, settings: AnimationModuleSettings) -> Self {
        Self {
            graph,
            model: AnimationModel::new(),
            selection: AnimationModuleSelectionModel::new(),
            history: History::with_max_depth(settings.max_undo_depth),
            clipboard: KeyFrameClipboard::new(),
            settings,
            current_time: 0.0,
            draft_render: false,
            events: Signal::new(),
        }
    }

    /// Create a module over a graph and wrap every node it holds
    pub fn with_all_nodes(graph: Graph, settings: AnimationModuleSettings) -> Self {
        let mut module = Self::new(graph, settings);
        let nodes: Vec<NodeId> = module.graph.node_ids().collect();
        for node in nodes {
            module.add_node(node);
        }
        module
    }

    /// The graph being animated
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable graph. Structural changes must be reported through the notification methods.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Animation entries and display tree
    pub fn model(&self) -> &AnimationModel {
        &self.model
    }

    /// Current selection
    pub fn selection(&self) -> &AnimationModuleSelectionModel {
        &self.selection
    }

    /// Keyframe clipboard
    pub fn clipboard(&self) -> &KeyFrameClipboard {
        &self.clipboard
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current settings
    pub fn settings(&self) -> &AnimationModuleSettings {
        &self.settings
    }

    /// Replace the settings and refresh what depends on them
    pub fn set_settings(&mut self, settings: AnimationModuleSettings) {
        self.history.set_max_depth(settings.max_undo_depth);
        self.settings = settings;
        self.model.refresh_visibility(&self.graph, &self.settings);
        self.events.emit(AnimationModuleEvent::ModelChanged);
    }

    /// Playhead time
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Move the playhead
    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
    }

    /// Whether an interactive edit switched rendering to draft quality
    pub fn is_draft_render_enabled(&self) -> bool {
        self.draft_render
    }

    /// End an interactive edit, e.g. on mouse release. The next move starts a new undo entry.
    pub fn end_draft_render(&mut self) {
        self.draft_render = false;
    }

    /// Module change notifications
    pub fn signal_mut(&mut self) -> &mut Signal<AnimationModuleEvent> {
        &mut self.events
    }

    /// Selection change notifications
    pub fn selection_signal_mut(&mut self) -> &mut Signal<AnimationModuleEvent> {
        self.selection.signal_mut()
    }

    /// Drain queued module and selection events
    pub fn take_events(&mut self) -> Vec<AnimationModuleEvent> {
        let mut events = self.events.take_events();
        events.extend(self.selection.signal_mut().take_events());
        events
    }

    // ========================================================================
    // Graph notifications
    // ========================================================================

    /// Wrap a graph node. Returns the existing entry when already wrapped.
    pub fn add_node(&mut self, node: NodeId) -> Option<NodeAnimId> {
        if let Some(existing) = self.model.node_anim_for(node) {
            return Some(existing);
        }
        let id = self.model.add_node(&self.graph, node)?;
        self.model.refresh_node_relationships(&self.graph);
        self.model.refresh_all_frame_ranges(&self.graph);
        self.model.refresh_visibility(&self.graph, &self.settings);
        tracing::debug!("Added node {:?} to the animation module", node);
        self.events.emit(AnimationModuleEvent::NodeAdded { anim: id, node });
        Some(id)
    }

    /// Drop the entry of a graph node. The selection forgets it first.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        let Some(id) = self.model.node_anim_for(node) else {
            return false;
        };
        self.selection.remove_any_reference_to_node(&self.model, id);
        self.events.emit(AnimationModuleEvent::NodeAboutToBeRemoved { anim: id, node });
        self.model.remove_node(id);
        self.model.refresh_node_relationships(&self.graph);
        self.model.refresh_all_frame_ranges(&self.graph);
        self.model.refresh_visibility(&self.graph, &self.settings);
        tracing::debug!("Removed node {:?} from the animation module", node);
        true
    }

    /// A row was inserted in an item table of a wrapped node
    pub fn on_table_item_inserted(&mut self, index: usize, item: TableItemId) -> Option<TableItemAnimId> {
        let id = self.model.insert_table_item(&self.graph, index, item)?;
        self.model.refresh_visibility(&self.graph, &self.settings);
        self.events.emit(AnimationModuleEvent::ModelChanged);
        Some(id)
    }

    /// A row is about to leave an item table
    pub fn on_table_item_removed(&mut self, item: TableItemId) -> bool {
        let Some(id) = self.model.table_item_anim_for(item) else {
            return false;
        };
        self.selection.remove_any_reference_to_table_item(&self.model, id);
        self.model.remove_table_item(item);
        self.model.refresh_visibility(&self.graph, &self.settings);
        self.events.emit(AnimationModuleEvent::ModelChanged);
        true
    }

    /// A knob value, curve or view layout changed outside of the module
    pub fn on_knob_changed(&mut self, knob: KnobId) {
        self.model.refresh_knob_views(&self.graph, knob);
        let mut nodes: Vec<NodeAnimId> = self
            .model
            .node_anims()
            .filter(|n| n.depends_on(knob))
            .map(|n| n.id())
            .collect();
        if let Some(owner) = self.knob_owner_node(knob).and_then(|n| self.model.node_anim_for(n)) {
            if !nodes.contains(&owner) {
                nodes.push(owner);
            }
        }
        for node in nodes {
            self.model.refresh_frame_range(&self.graph, node);
        }
        self.selection.sync_with_curves(&self.graph, &self.model);
        self.model.refresh_visibility(&self.graph, &self.settings);
        self.events.emit(AnimationModuleEvent::ModelChanged);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Resolve a display row
    pub fn find_item(&self, row: TreeNodeId) -> Option<FoundItem> {
        self.model.find_item(row)
    }

    /// Cached frame range of a wrapped node
    pub fn frame_range(&self, node: NodeId) -> Option<(f64, f64)> {
        let id = self.model.node_anim_for(node)?;
        self.model.node_anim(id).map(|n| n.frame_range())
    }

    /// Wrapped nodes shown under a node
    pub fn children_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let Some(id) = self.model.node_anim_for(node) else {
            return Vec::new();
        };
        self.model
            .children_nodes(&self.graph, id)
            .into_iter()
            .filter_map(|c| self.model.node_anim(c).map(|n| n.node()))
            .collect()
    }

    /// Nearest retime, time-offset or frame-range node downstream
    pub fn nearest_time_node_from_outputs(&self, node: NodeId) -> Option<NodeId> {
        self.graph.nearest_time_node_from_outputs(node)
    }

    /// Nearest reader upstream
    pub fn nearest_reader(&self, node: NodeId) -> Option<NodeId> {
        self.graph.nearest_reader(node)
    }

    /// Keyframes of every curve a display row covers, merged by time
    pub fn row_keyframes(&self, row: TreeNodeId) -> Vec<RowKeyframe> {
        let Some(found) = self.model.find_item(row) else {
            return Vec::new();
        };
        let item = match (found.knob, found.table_item) {
            (Some(knob), _) => AnimItemRef::Knob(knob),
            (None, Some(table_item)) => AnimItemRef::TableItem(table_item),
            (None, None) => return Vec::new(),
        };
        let Some(anim) = self.model.anim_item(item) else {
            return Vec::new();
        };
        let master = match (found.dim, found.view) {
            (_, ViewSetSpec::All) => true,
            (DimSpec::All, ViewSetSpec::View(view)) => anim.all_dimensions_visible(&self.graph, self.model.tree(), view),
            (DimSpec::Dim(_), ViewSetSpec::View(_)) => false,
        };
        anim.keyframes(&self.graph, found.dim, found.view, GetKeyframesType::Merged)
            .iter()
            .map(|keyframe| RowKeyframe {
                keyframe: *keyframe,
                selected: self.selection.is_keyframe_selected(
                    &self.graph,
                    &self.model,
                    item,
                    found.dim,
                    found.view,
                    keyframe.time,
                ),
                master,
            })
            .collect()
    }

    /// Span of a table row's own animation, when its range is drawn
    pub fn table_item_frame_range(&self, item: TableItemId) -> Option<(f64, f64)> {
        let id = self.model.table_item_anim_for(item)?;
        self.model.table_item_frame_range(&self.graph, id)
    }

    /// Draw or hide the range of a table row
    pub fn set_table_item_range_drawing(&mut self, item: TableItemId, enabled: bool) -> bool {
        let Some(anim) = self
            .model
            .table_item_anim_for(item)
            .and_then(|id| self.model.table_item_anim_mut(id))
        else {
            return false;
        };
        if anim.is_range_drawing_enabled() == enabled {
            return false;
        }
        anim.set_range_drawing_enabled(enabled);
        self.model.refresh_visibility(&self.graph, &self.settings);
        self.events.emit(AnimationModuleEvent::ModelChanged);
        true
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Combine entries with the current selection
    pub fn make_selection(
        &mut self,
        keys: &AnimItemDimViewKeyFramesMap,
        table_items: &[TableItemAnimId],
        nodes: &[NodeAnimId],
        flags: SelectionFlags,
    ) -> bool {
        self.selection.make_selection(keys, table_items, nodes, flags)
    }

    /// Select every keyframe, range-drawing node and table row
    pub fn select_all(&mut self) -> bool {
        self.selection.select_all(&self.graph, &self.model)
    }

    /// Select every keyframe of the shown curves
    pub fn select_all_visible_curves_keyframes(&mut self) -> bool {
        self.selection.select_all_visible_curves_keyframes(&self.graph, &self.model)
    }

    /// Select what display rows show
    pub fn select_items(&mut self, rows: &[TreeNodeId]) -> bool {
        self.selection.select_items(&self.graph, &self.model, rows)
    }

    /// Select every keyframe of the matched curves of one entry
    pub fn select_keyframes(&mut self, item: AnimItemRef, dim: DimSpec, view: ViewSetSpec) -> bool {
        self.selection.select_keyframes(&self.graph, &self.model, item, dim, view)
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear_selection()
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Move the selected keyframes by `(dt, dv)` and the selected nodes and table rows by `dt`.
    ///
    /// `dt` is clamped so that no selected keyframe reaches an unselected neighbor
    /// on its curve. Successive moves of the same selection while draft rendering
    /// is on share one undo entry.
    pub fn move_selected_keys_and_nodes(&mut self, dt: f64, dv: f64) -> Result<EditOutcome> {
        let mut max_left = f64::NEG_INFINITY;
        let mut max_right = f64::INFINITY;
        for (key, set) in self.selection.current_keyframes_selection() {
            let Some(curve) = self
                .model
                .anim_item(key.item)
                .and_then(|anim| anim.curve(&self.graph, key.dim, key.view))
            else {
                continue;
            };
            let epsilon = curve.move_epsilon();
            for keyframe in set.iter() {
                let t = keyframe.time;
                if let Some(next) = curve.next_keyframe(t).filter(|n| !set.contains(n.time)) {
                    max_right = (next.time - t - epsilon).min(max_right).max(0.0);
                }
                if let Some(prev) = curve.previous_keyframe(t).filter(|p| !set.contains(p.time)) {
                    max_left = (prev.time - t + epsilon).max(max_left).min(0.0);
                }
            }
        }
        let clamped = dt.max(max_left).min(max_right);
        if clamped != dt {
            tracing::debug!("Clamped keyframe move from {} to {}", dt, clamped);
        }

        let keys = self.selected_key_locations();
        let nodes: Vec<NodeId> = self
            .selection
            .current_nodes_selection()
            .into_iter()
            .filter_map(|n| self.model.node_anim(n).map(|n| n.node()))
            .collect();
        let table_items: Vec<TableItemId> = self
            .selection
            .current_table_items_selection()
            .into_iter()
            .filter_map(|t| self.model.table_item_anim(t).map(|t| t.item()))
            .collect();
        let nothing_to_move = keys.is_empty() && (clamped == 0.0 || (nodes.is_empty() && table_items.is_empty()));
        if (clamped == 0.0 && dv == 0.0) || nothing_to_move {
            return Ok(EditOutcome::Unchanged);
        }

        let command = WarpKeysCommand::new(keys, nodes, table_items, KeyframeWarp::translation(clamped, dv));
        let merge = self.draft_render;
        self.draft_render = true;
        self.push(&command, merge)
    }

    /// Apply an affine transform to the selected keyframes.
    ///
    /// The transform is tried on every curve first and nothing is pushed if any curve rejects it.
    pub fn transform_selected_keys(&mut self, matrix: Matrix3) -> Result<EditOutcome> {
        let keys = self.selected_key_locations();
        let warp = KeyframeWarp::Affine(matrix);
        if keys.is_empty() || warp.is_identity() {
            return Ok(EditOutcome::Unchanged);
        }
        for (location, times) in &keys {
            let Some(curve) = self.graph.curve(*location) else {
                continue;
            };
            if let Err(err) = curve.test_warp(times, &warp) {
                tracing::warn!("Rejected keyframe transform: {}", err);
                return Err(AnimationError::WarpRejected(err));
            }
        }
        let command = WarpKeysCommand::new(keys, Vec::new(), Vec::new(), warp);
        self.draft_render = true;
        self.push(&command, false)
    }

    /// Move the first frame of a reader, clamped to `[originalFirstFrame, lastFrame]`
    pub fn trim_reader_left(&mut self, reader: NodeId, new_first_frame: f64) -> Result<EditOutcome> {
        let frames = self.reader_frames(reader)?;
        let first = new_first_frame.max(frames.original_first).min(frames.last);
        if first == frames.first {
            tracing::debug!("Trim left of {:?} clamped to its current value", reader);
            return Ok(EditOutcome::Unchanged);
        }
        let edit = self.reader_edit(reader, knob_names::FIRST_FRAME, 0, first)?;
        self.draft_render = true;
        self.push(&SetKnobValuesCommand::new("Trim left", vec![edit]), false)
    }

    /// Move the last frame of a reader, clamped to `[firstFrame, originalLastFrame]`
    pub fn trim_reader_right(&mut self, reader: NodeId, new_last_frame: f64) -> Result<EditOutcome> {
        let frames = self.reader_frames(reader)?;
        let last = new_last_frame.min(frames.original_last).max(frames.first);
        if last == frames.last {
            tracing::debug!("Trim right of {:?} clamped to its current value", reader);
            return Ok(EditOutcome::Unchanged);
        }
        let edit = self.reader_edit(reader, knob_names::LAST_FRAME, 0, last)?;
        self.draft_render = true;
        self.push(&SetKnobValuesCommand::new("Trim right", vec![edit]), false)
    }

    /// Whether the reader shows less than its source range
    pub fn can_slip_reader(&self, reader: NodeId) -> bool {
        self.reader_frames(reader)
            .is_ok_and(|f| f.first != f.original_first || f.last != f.original_last)
    }

    /// Shift which source frames a reader shows without changing its output range.
    ///
    /// `dt` is clamped so that the first and last frames stay within the source range.
    pub fn slip_reader(&mut self, reader: NodeId, dt: f64) -> Result<EditOutcome> {
        let frames = self.reader_frames(reader)?;
        let dt = dt
            .max(frames.last - frames.original_last)
            .min(frames.first - frames.original_first);
        if dt == 0.0 {
            return Ok(EditOutcome::Unchanged);
        }
        let offset = self.graph.knob_value(reader, knob_names::TIME_OFFSET, 0);
        let edits = vec![
            self.reader_edit(reader, knob_names::FIRST_FRAME, 0, frames.first - dt)?,
            self.reader_edit(reader, knob_names::LAST_FRAME, 0, frames.last - dt)?,
            self.reader_edit(reader, knob_names::TIME_OFFSET, 0, offset + dt)?,
        ];
        self.draft_render = true;
        self.push(&SetKnobValuesCommand::new("Slip", edits), false)
    }

    /// Copy the selected keyframes, as stored in their curves, to the clipboard
    pub fn copy_selected_keys(&mut self) {
        let keys: AnimItemDimViewKeyFramesMap = self
            .selection
            .current_keyframes_selection()
            .iter()
            .filter_map(|(key, set)| {
                let curve = self.model.anim_item(key.item)?.curve(&self.graph, key.dim, key.view)?;
                let copied: KeyFrameSet = set.iter().filter_map(|k| curve.keyframe_at(k.time).copied()).collect();
                Some((*key, copied))
            })
            .collect();
        self.clipboard.set(&keys);
    }

    /// Paste keyframes onto the single selected curve.
    ///
    /// With `relative`, the earliest pasted keyframe lands on the playhead.
    pub fn paste_keys(&mut self, keys: &[Keyframe], relative: bool) -> Result<EditOutcome> {
        let selected = self.selection.current_keyframes_selection();
        let target = match selected.keys().collect::<Vec<_>>().as_slice() {
            [target] => **target,
            targets => {
                tracing::warn!("Paste rejected: {} targets selected", targets.len());
                return Err(AnimationError::PasteTargetCount(targets.len()));
            }
        };
        let location = self
            .model
            .location_for(&self.graph, &target)
            .ok_or(AnimationError::PasteTargetCount(0))?;
        let Some(min_time) = keys.iter().map(|k| k.time).min_by(f64::total_cmp) else {
            return Ok(EditOutcome::Unchanged);
        };
        let offset = if relative { self.current_time - min_time } else { 0.0 };
        self.push(&PasteKeysCommand::new(location, keys.to_vec(), offset), false)
    }

    /// Paste the clipboard with the configured paste mode
    pub fn paste_clipboard(&mut self) -> Result<EditOutcome> {
        let keys = self.clipboard.flattened();
        self.paste_keys(&keys, self.settings.paste_mode.is_relative())
    }

    /// Change the interpolation of every selected keyframe. Only numeric curves accept it.
    pub fn set_selected_keys_interpolation(&mut self, interpolation: KeyframeType) -> Result<EditOutcome> {
        for key in self.selection.current_keyframes_selection().keys() {
            let Some(curve) = self
                .model
                .anim_item(key.item)
                .and_then(|anim| anim.curve(&self.graph, key.dim, key.view))
            else {
                continue;
            };
            if !curve.curve_type().is_numeric() {
                tracing::warn!("Interpolation change rejected on a {} curve", curve.curve_type().name());
                return Err(AnimationError::NonNumericInterpolation(curve.curve_type().name().to_string()));
            }
        }
        let keys = self.selected_key_locations();
        if keys.is_empty() {
            return Err(AnimationError::EmptySelection("change the interpolation of"));
        }
        self.push(&SetKeysInterpolationCommand::new(keys, interpolation), false)
    }

    /// Delete the selected keyframes, keeping their curves selected
    pub fn delete_selected_keys(&mut self) -> Result<EditOutcome> {
        let keys = self.selected_key_locations();
        if keys.is_empty() {
            return Ok(EditOutcome::Unchanged);
        }
        let outcome = self.push(&RemoveKeysCommand::new(keys), false)?;
        self.selection.clear_keyframes_from_selection();
        Ok(outcome)
    }

    /// Insert or replace keyframes on the given curves
    pub fn set_keyframes(&mut self, keys: &AnimItemDimViewKeyFramesMap) -> Result<EditOutcome> {
        let keys: Vec<(CurveLocation, Vec<Keyframe>)> = keys
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .filter_map(|(key, set)| {
                let location = self.model.location_for(&self.graph, key)?;
                Some((location, set.iter().copied().collect()))
            })
            .collect();
        if keys.is_empty() {
            return Ok(EditOutcome::Unchanged);
        }
        self.push(&AddKeysCommand::new(keys), false)
    }

    /// Rename the single selected node
    pub fn rename_selected_node(&mut self, name: &str) -> Result<EditOutcome> {
        let nodes = self.selection.current_nodes_selection();
        let [id] = nodes.as_slice() else {
            tracing::warn!("Rename rejected: {} nodes selected", nodes.len());
            return Err(AnimationError::RenameTargetCount(nodes.len()));
        };
        let node = self
            .model
            .node_anim(*id)
            .map(|n| n.node())
            .ok_or(AnimationError::RenameTargetCount(0))?;
        if self.graph.node(node).is_some_and(|n| n.name == name) {
            return Ok(EditOutcome::Unchanged);
        }
        self.push(&RenameNodeCommand::new(node, name), false)
    }

    // ========================================================================
    // Undo
    // ========================================================================

    /// Revert the last edit
    pub fn undo(&mut self) -> Result<()> {
        let group = self.history.undo().map_err(CommandError::from)?;
        group
            .restore_before(&mut self.graph)
            .map_err(CommandError::from)?;
        tracing::debug!("Undo: {}", group.description);
        self.draft_render = false;
        self.apply_effect(&group.effect.inverse());
        Ok(())
    }

    /// Reapply the last reverted edit
    pub fn redo(&mut self) -> Result<()> {
        let group = self.history.redo().map_err(CommandError::from)?;
        group
            .restore_after(&mut self.graph)
            .map_err(CommandError::from)?;
        tracing::debug!("Redo: {}", group.description);
        self.draft_render = false;
        self.apply_effect(&group.effect);
        Ok(())
    }

    /// Whether there is an edit to revert
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether there is an edit to reapply
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Label of the edit [`Self::undo`] would revert, e.g. "Move keyframes"
    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    /// Label of the edit [`Self::redo`] would reapply
    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn push(&mut self, command: &dyn AnimationCommand, allow_merge: bool) -> Result<EditOutcome> {
        let effect = push_command(&mut self.history, &mut self.graph, command, allow_merge).map_err(|err| {
            tracing::warn!("{} failed: {}", command.description(), err);
            err
        })?;
        tracing::debug!("{}", command.description());
        self.apply_effect(&effect);
        Ok(EditOutcome::Applied)
    }

    /// Bring the selection, the frame ranges and the rows up to date after the graph changed
    fn apply_effect(&mut self, effect: &CommandEffect) {
        let moves: Vec<KeyMove> = effect
            .moved_keys
            .iter()
            .filter_map(|m| {
                Some(KeyMove {
                    key: self.model.index_id_for_location(m.location)?,
                    from: m.from,
                    to: m.to,
                })
            })
            .collect();
        self.selection.apply_key_moves(&moves);
        self.selection.sync_with_curves(&self.graph, &self.model);

        let mut nodes: Vec<NodeId> = Vec::new();
        let knobs = effect.changed_knobs.iter().copied().chain(
            effect.changed_curves.iter().filter_map(|c| match c {
                CurveLocation::Knob { knob, .. } => Some(*knob),
                CurveLocation::TableItem(_) => None,
            }),
        );
        for node in knobs.filter_map(|k| self.knob_owner_node(k)) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
        for item in effect.changed_curves.iter().filter_map(|c| match c {
            CurveLocation::TableItem(item) => Some(*item),
            CurveLocation::Knob { .. } => None,
        }) {
            if let Some(node) = self.graph.table_item(item).map(|t| t.node) {
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
        }
        for node in nodes {
            if let Some(id) = self.model.node_anim_for(node) {
                self.model.refresh_frame_range(&self.graph, id);
            }
        }

        let labels: Vec<(TreeNodeId, String)> = self
            .model
            .node_anims()
            .filter_map(|n| Some((n.root_item(), self.graph.node(n.node())?.name.clone())))
            .collect();
        for (row, label) in labels {
            self.model.tree_mut().set_label(row, label);
        }
        self.model.refresh_visibility(&self.graph, &self.settings);
        self.events.emit(AnimationModuleEvent::ModelChanged);
    }

    fn knob_owner_node(&self, knob: KnobId) -> Option<NodeId> {
        match self.graph.knob_owner(knob)? {
            KnobOwner::Node(node) => Some(node),
            KnobOwner::TableItem(item) => self.graph.table_item(item).map(|t| t.node),
        }
    }

    /// Curves and times of the selected keyframes, skipping curves with none selected
    fn selected_key_locations(&self) -> Vec<(CurveLocation, Vec<f64>)> {
        self.selection
            .current_keyframes_selection()
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .filter_map(|(key, set)| Some((self.model.location_for(&self.graph, key)?, set.times())))
            .collect()
    }

    fn reader_frames(&self, reader: NodeId) -> Result<ReaderFrames> {
        let node = self.graph.node(reader).ok_or(AnimationError::UnknownNode(reader))?;
        if !node.is_reader() {
            return Err(AnimationError::NotAReader(node.name.clone()));
        }
        Ok(ReaderFrames {
            first: self.graph.knob_value(reader, knob_names::FIRST_FRAME, 0),
            last: self.graph.knob_value(reader, knob_names::LAST_FRAME, 0),
            original_first: self.graph.knob_value(reader, knob_names::ORIGINAL_FRAME_RANGE, 0),
            original_last: self.graph.knob_value(reader, knob_names::ORIGINAL_FRAME_RANGE, 1),
        })
    }

    fn reader_edit(&self, reader: NodeId, name: &str, dim: usize, value: f64) -> Result<KnobValueEdit> {
        let knob = self
            .graph
            .knob_id_by_name(reader, name)
            .ok_or_else(|| AnimationError::NotAReader(name.to_string()))?;
        Ok(KnobValueEdit {
            knob,
            dim: DimIdx(dim),
            view: ViewIdx(0),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim_item::AnimItemDimViewIndexId;
    use compositor_graph::plugin_ids;

    struct Fixture {
        module: AnimationModule,
        blur: NodeId,
        size: AnimItemRef,
        label: AnimItemRef,
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("compositor_animation=debug")
            .with_test_writer()
            .try_init();
    }

    fn fixture(times: &[f64]) -> Fixture {
        init_tracing();
        let mut graph = Graph::default();
        let blur = graph.create_node(plugin_ids::BLUR, "Blur").unwrap();
        let size_knob = graph.knob_id_by_name(blur, "size").unwrap();
        let curve = graph
            .curve_mut(CurveLocation::Knob { knob: size_knob, view: ViewIdx(0), dim: DimIdx(0) })
            .unwrap();
        for t in times {
            curve.set_keyframe(Keyframe::new(*t, *t));
        }
        let label_knob = graph.knob_id_by_name(blur, "label").unwrap();
        let mut module = AnimationModule::new(graph, AnimationModuleSettings::default());
        module.add_node(blur).unwrap();
        let size = AnimItemRef::Knob(module.model().knob_anim_for(size_knob).unwrap());
        let label = AnimItemRef::Knob(module.model().knob_anim_for(label_knob).unwrap());
        Fixture { module, blur, size, label }
    }

    fn curve_key(item: AnimItemRef, dim: usize) -> AnimItemDimViewIndexId {
        AnimItemDimViewIndexId::new(item, ViewIdx(0), DimIdx(dim))
    }

    fn select(module: &mut AnimationModule, item: AnimItemRef, dim: usize, times: &[f64]) {
        let mut keys = AnimItemDimViewKeyFramesMap::new();
        keys.insert(curve_key(item, dim), times.iter().map(|t| Keyframe::new(*t, 0.0)).collect());
        module.make_selection(&keys, &[], &[], SelectionFlags::CLEAR | SelectionFlags::ADD);
    }

    fn times(module: &AnimationModule, item: AnimItemRef, dim: usize) -> Vec<f64> {
        module
            .model()
            .anim_item(item)
            .and_then(|a| a.curve(module.graph(), DimIdx(dim), ViewIdx(0)))
            .map(|c| c.keyframes().iter().map(|k| k.time).collect())
            .unwrap_or_default()
    }

    fn reader(module: &mut AnimationModule) -> NodeId {
        let read = module.graph_mut().create_node(plugin_ids::READ, "Read").unwrap();
        module.add_node(read).unwrap();
        read
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn test_move_clamps_to_unselected_neighbor() {
        let mut f = fixture(&[10.0, 20.0, 25.0]);
        select(&mut f.module, f.size, 0, &[10.0, 20.0]);
        let outcome = f.module.move_selected_keys_and_nodes(10.0, 0.0).unwrap();
        assert!(outcome.is_applied());
        assert_close(&times(&f.module, f.size, 0), &[14.9999, 24.9999, 25.0]);

        let selected = f.module.selection().current_keyframes_selection()[&curve_key(f.size, 0)].times();
        assert_close(&selected, &[14.9999, 24.9999]);
        assert!(f.module.is_draft_render_enabled());
    }

    #[test]
    fn test_move_never_crosses_neighbors() {
        for dt in [-100.0, -3.0, 0.5, 4.0, 7.0, 100.0] {
            let mut f = fixture(&[0.0, 10.0, 20.0, 25.0]);
            select(&mut f.module, f.size, 0, &[10.0, 20.0]);
            f.module.move_selected_keys_and_nodes(dt, 0.0).unwrap();
            let after = times(&f.module, f.size, 0);
            assert_eq!(after.len(), 4);
            assert_eq!(after[0], 0.0);
            assert_eq!(after[3], 25.0);
            assert!(after[1] >= 1e-4 - 1e-9, "dt {dt}: {after:?}");
            assert!(after[2] <= 25.0 - 1e-4 + 1e-9, "dt {dt}: {after:?}");
            assert!((after[2] - after[1] - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_null_move_is_a_no_op() {
        let mut f = fixture(&[10.0, 20.0]);
        select(&mut f.module, f.size, 0, &[10.0]);
        let location = f.module.model().location_for(f.module.graph(), &curve_key(f.size, 0)).unwrap();
        let before = f.module.graph().curve(location).cloned();
        assert_eq!(f.module.move_selected_keys_and_nodes(0.0, 0.0).unwrap(), EditOutcome::Unchanged);
        assert_eq!(f.module.graph().curve(location).cloned(), before);
        assert!(!f.module.can_undo());

        f.module.clear_selection();
        assert_eq!(f.module.move_selected_keys_and_nodes(5.0, 1.0).unwrap(), EditOutcome::Unchanged);
    }

    #[test]
    fn test_drag_merges_until_draft_render_ends() {
        let mut f = fixture(&[10.0, 20.0]);
        select(&mut f.module, f.size, 0, &[10.0]);
        f.module.move_selected_keys_and_nodes(1.0, 0.0).unwrap();
        f.module.move_selected_keys_and_nodes(1.0, 0.0).unwrap();
        assert_eq!(f.module.history().undo_depth(), 1);
        f.module.end_draft_render();
        f.module.move_selected_keys_and_nodes(1.0, 0.0).unwrap();
        assert_eq!(f.module.history().undo_depth(), 2);
        assert_eq!(times(&f.module, f.size, 0), vec![13.0, 20.0]);

        f.module.undo().unwrap();
        assert_eq!(times(&f.module, f.size, 0), vec![12.0, 20.0]);
        f.module.undo().unwrap();
        assert_eq!(times(&f.module, f.size, 0), vec![10.0, 20.0]);
        let selected = f.module.selection().current_keyframes_selection()[&curve_key(f.size, 0)].times();
        assert_eq!(selected, vec![10.0]);

        f.module.redo().unwrap();
        assert_eq!(times(&f.module, f.size, 0), vec![12.0, 20.0]);
        let selected = f.module.selection().current_keyframes_selection()[&curve_key(f.size, 0)].times();
        assert_eq!(selected, vec![12.0]);
        assert!(f.module.can_redo());
    }

    #[test]
    fn test_moving_a_reader_node_refreshes_its_range() {
        let mut f = fixture(&[]);
        let read = reader(&mut f.module);
        let id = f.module.model().node_anim_for(read).unwrap();
        f.module.make_selection(&AnimItemDimViewKeyFramesMap::new(), &[], &[id], SelectionFlags::ADD);
        f.module.move_selected_keys_and_nodes(5.0, 0.0).unwrap();
        assert_eq!(f.module.graph().knob_value(read, knob_names::STARTING_TIME, 0), 6.0);
        assert_eq!(f.module.frame_range(read), Some((6.0, 106.0)));
        f.module.undo().unwrap();
        assert_eq!(f.module.frame_range(read), Some((1.0, 101.0)));
    }

    #[test]
    fn test_trim_reader_is_clamped() {
        let mut f = fixture(&[]);
        let read = reader(&mut f.module);
        assert_eq!(f.module.trim_reader_left(read, -5.0).unwrap(), EditOutcome::Unchanged);
        assert!(!f.module.can_undo());

        assert!(f.module.trim_reader_left(read, 30.0).unwrap().is_applied());
        assert_eq!(f.module.graph().knob_value(read, knob_names::FIRST_FRAME, 0), 30.0);
        f.module.trim_reader_left(read, 500.0).unwrap();
        assert_eq!(f.module.graph().knob_value(read, knob_names::FIRST_FRAME, 0), 100.0);

        f.module.trim_reader_left(read, 40.0).unwrap();
        f.module.trim_reader_right(read, 10.0).unwrap();
        assert_eq!(f.module.graph().knob_value(read, knob_names::LAST_FRAME, 0), 40.0);
        assert_eq!(f.module.trim_reader_right(read, 400.0).unwrap(), EditOutcome::Applied);
        assert_eq!(f.module.graph().knob_value(read, knob_names::LAST_FRAME, 0), 100.0);
        assert_eq!(f.module.frame_range(read), Some((1.0, 62.0)));

        assert!(matches!(
            f.module.trim_reader_left(f.blur, 3.0),
            Err(AnimationError::NotAReader(_))
        ));
    }

    #[test]
    fn test_slip_reader_keeps_output_length() {
        let mut f = fixture(&[]);
        let read = reader(&mut f.module);
        assert!(!f.module.can_slip_reader(read));
        f.module.graph_mut().set_knob_value(read, knob_names::FIRST_FRAME, 0, 10.0).unwrap();
        assert!(f.module.can_slip_reader(read));

        assert!(f.module.slip_reader(read, 50.0).unwrap().is_applied());
        let graph = f.module.graph();
        assert_eq!(graph.knob_value(read, knob_names::FIRST_FRAME, 0), 1.0);
        assert_eq!(graph.knob_value(read, knob_names::LAST_FRAME, 0), 91.0);
        assert_eq!(graph.knob_value(read, knob_names::TIME_OFFSET, 0), 9.0);

        assert_eq!(f.module.slip_reader(read, 5.0).unwrap(), EditOutcome::Unchanged);
        f.module.slip_reader(read, -50.0).unwrap();
        let graph = f.module.graph();
        assert_eq!(graph.knob_value(read, knob_names::FIRST_FRAME, 0), 10.0);
        assert_eq!(graph.knob_value(read, knob_names::LAST_FRAME, 0), 100.0);
        assert_eq!(graph.knob_value(read, knob_names::TIME_OFFSET, 0), 0.0);

        f.module.undo().unwrap();
        assert_eq!(f.module.graph().knob_value(read, knob_names::TIME_OFFSET, 0), 9.0);
    }

    #[test]
    fn test_paste_requires_one_target() {
        let mut f = fixture(&[10.0, 20.0]);
        f.module.select_keyframes(f.size, DimSpec::All, ViewSetSpec::All);
        f.module.copy_selected_keys();
        assert_eq!(f.module.clipboard().len(), 2);

        let err = f.module.paste_clipboard().unwrap_err();
        assert!(matches!(err, AnimationError::PasteTargetCount(2)));
        assert!(err.to_string().starts_with("You must select exactly one target item"));
        assert_eq!(f.module.clipboard().len(), 2);
        assert_eq!(times(&f.module, f.size, 1), Vec::<f64>::new());

        f.module.clear_selection();
        assert!(matches!(f.module.paste_clipboard(), Err(AnimationError::PasteTargetCount(0))));
        assert!(!f.module.can_undo());
    }

    #[test]
    fn test_paste_relative_and_absolute() {
        let mut f = fixture(&[10.0, 20.0]);
        select(&mut f.module, f.size, 0, &[10.0, 20.0]);
        f.module.copy_selected_keys();

        let mut target = AnimItemDimViewKeyFramesMap::new();
        target.insert(curve_key(f.size, 1), KeyFrameSet::new());
        f.module.make_selection(&target, &[], &[], SelectionFlags::CLEAR | SelectionFlags::ADD);
        f.module.set_current_time(50.0);
        f.module.paste_clipboard().unwrap();
        assert_eq!(times(&f.module, f.size, 1), vec![50.0, 60.0]);

        let keys = f.module.clipboard().flattened();
        f.module.paste_keys(&keys, false).unwrap();
        assert_eq!(times(&f.module, f.size, 1), vec![10.0, 20.0, 50.0, 60.0]);
        assert_eq!(f.module.clipboard().len(), 2);
    }

    #[test]
    fn test_interpolation_only_on_numeric_curves() {
        let mut f = fixture(&[10.0, 20.0]);
        let label_location = f.module.model().location_for(f.module.graph(), &curve_key(f.label, 0)).unwrap();
        f.module
            .graph_mut()
            .curve_mut(label_location)
            .unwrap()
            .set_keyframe(Keyframe::new(5.0, 0.0));

        let mut keys = AnimItemDimViewKeyFramesMap::new();
        keys.insert(curve_key(f.size, 0), [Keyframe::new(10.0, 10.0)].into_iter().collect());
        keys.insert(curve_key(f.label, 0), [Keyframe::new(5.0, 0.0)].into_iter().collect());
        f.module.make_selection(&keys, &[], &[], SelectionFlags::CLEAR | SelectionFlags::ADD);
        assert!(matches!(
            f.module.set_selected_keys_interpolation(KeyframeType::Constant),
            Err(AnimationError::NonNumericInterpolation(_))
        ));
        assert!(!f.module.can_undo());

        select(&mut f.module, f.size, 0, &[10.0]);
        f.module.set_selected_keys_interpolation(KeyframeType::Constant).unwrap();
        let location = f.module.model().location_for(f.module.graph(), &curve_key(f.size, 0)).unwrap();
        let curve = f.module.graph().curve(location).unwrap();
        assert_eq!(curve.keyframe_at(10.0).unwrap().interpolation, KeyframeType::Constant);
        assert_ne!(curve.keyframe_at(20.0).unwrap().interpolation, KeyframeType::Constant);

        f.module.clear_selection();
        assert!(matches!(
            f.module.set_selected_keys_interpolation(KeyframeType::Linear),
            Err(AnimationError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_transform_is_dry_run_first() {
        let mut f = fixture(&[10.0, 20.0, 25.0]);
        select(&mut f.module, f.size, 0, &[10.0, 20.0]);
        let err = f
            .module
            .transform_selected_keys(Matrix3::scale_around(1.5, 1.0, 10.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, AnimationError::WarpRejected(_)));
        assert_eq!(times(&f.module, f.size, 0), vec![10.0, 20.0, 25.0]);
        assert!(!f.module.can_undo());

        let outcome = f
            .module
            .transform_selected_keys(Matrix3::scale_around(0.5, 1.0, 10.0, 0.0))
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(times(&f.module, f.size, 0), vec![10.0, 15.0, 25.0]);
        let selected = f.module.selection().current_keyframes_selection()[&curve_key(f.size, 0)].times();
        assert_eq!(selected, vec![10.0, 15.0]);
    }

    #[test]
    fn test_delete_and_set_keyframes() {
        let mut f = fixture(&[10.0, 20.0]);
        select(&mut f.module, f.size, 0, &[10.0]);
        f.module.delete_selected_keys().unwrap();
        assert_eq!(times(&f.module, f.size, 0), vec![20.0]);
        let selection = f.module.selection().current_keyframes_selection();
        assert!(selection[&curve_key(f.size, 0)].is_empty());
        assert_eq!(f.module.delete_selected_keys().unwrap(), EditOutcome::Unchanged);

        let mut keys = AnimItemDimViewKeyFramesMap::new();
        keys.insert(curve_key(f.size, 1), [Keyframe::new(3.0, 1.0)].into_iter().collect());
        f.module.set_keyframes(&keys).unwrap();
        assert_eq!(times(&f.module, f.size, 1), vec![3.0]);
        f.module.undo().unwrap();
        f.module.undo().unwrap();
        assert_eq!(times(&f.module, f.size, 0), vec![10.0, 20.0]);
        assert!(times(&f.module, f.size, 1).is_empty());
    }

    #[test]
    fn test_rename_selected_node() {
        let mut f = fixture(&[]);
        assert!(matches!(
            f.module.rename_selected_node("Soften"),
            Err(AnimationError::RenameTargetCount(0))
        ));
        let id = f.module.model().node_anim_for(f.blur).unwrap();
        f.module.make_selection(&AnimItemDimViewKeyFramesMap::new(), &[], &[id], SelectionFlags::ADD);
        f.module.rename_selected_node("Soften").unwrap();
        let row = f.module.model().node_anim(id).unwrap().root_item();
        assert_eq!(f.module.model().tree().entry(row).unwrap().label, "Soften");
        f.module.undo().unwrap();
        assert_eq!(f.module.graph().node(f.blur).unwrap().name, "Blur");
        assert_eq!(f.module.model().tree().entry(row).unwrap().label, "Blur");
    }

    #[test]
    fn test_remove_node_purges_selection() {
        let mut f = fixture(&[10.0]);
        let id = f.module.model().node_anim_for(f.blur).unwrap();
        select(&mut f.module, f.size, 0, &[10.0]);
        f.module.make_selection(&AnimItemDimViewKeyFramesMap::new(), &[], &[id], SelectionFlags::ADD);
        f.module.take_events();

        assert!(f.module.remove_node(f.blur));
        assert!(f.module.selection().current_keyframes_selection().is_empty());
        assert!(f.module.selection().current_nodes_selection().is_empty());
        assert!(f.module.model().node_anim_for(f.blur).is_none());
        assert!(f
            .module
            .take_events()
            .contains(&AnimationModuleEvent::NodeAboutToBeRemoved { anim: id, node: f.blur }));
        assert!(!f.module.remove_node(f.blur));
    }

    #[test]
    fn test_table_item_notifications() {
        let mut graph = Graph::default();
        let tracker = graph.create_node(plugin_ids::TRACKER, "Tracker").unwrap();
        let track = graph.insert_table_item(tracker, 0, None, 0, "track1", &[]).unwrap();
        let mut module = AnimationModule::with_all_nodes(graph, AnimationModuleSettings::default());
        let anim = module.model().table_item_anim_for(track).unwrap();
        module.make_selection(&AnimItemDimViewKeyFramesMap::new(), &[anim], &[], SelectionFlags::ADD);

        let child = module
            .graph_mut()
            .insert_table_item(tracker, 0, Some(track), 0, "child", &[])
            .unwrap();
        let child_anim = module.on_table_item_inserted(0, child).unwrap();
        assert_eq!(module.model().table_item_anim(anim).unwrap().children(), &[child_anim]);

        assert!(module.on_table_item_removed(track));
        assert!(module.selection().current_table_items_selection().is_empty());
        assert!(module.model().table_item_anim_for(child).is_none());
    }

    #[test]
    fn test_knob_change_refreshes_ranges() {
        let mut f = fixture(&[]);
        let read = reader(&mut f.module);
        f.module.graph_mut().set_knob_value(read, knob_names::STARTING_TIME, 0, 11.0).unwrap();
        let knob = f.module.graph().knob_id_by_name(read, knob_names::STARTING_TIME).unwrap();
        f.module.on_knob_changed(knob);
        assert_eq!(f.module.frame_range(read), Some((11.0, 111.0)));
    }

    #[test]
    fn test_settings_apply_to_history_depth() {
        let mut f = fixture(&[10.0]);
        select(&mut f.module, f.size, 0, &[10.0]);
        f.module.set_settings(AnimationModuleSettings { max_undo_depth: 2, ..Default::default() });
        for _ in 0..4 {
            f.module.move_selected_keys_and_nodes(1.0, 0.0).unwrap();
            f.module.end_draft_render();
        }
        assert_eq!(f.module.history().undo_depth(), 2);
    }

    #[test]
    fn test_toggled_off_curve_stays_paste_target() {
        let mut f = fixture(&[10.0, 20.0]);
        select(&mut f.module, f.size, 0, &[10.0]);
        f.module.copy_selected_keys();

        let mut toggled = AnimItemDimViewKeyFramesMap::new();
        toggled.insert(curve_key(f.size, 0), [Keyframe::new(10.0, 10.0)].into_iter().collect());
        assert!(f.module.make_selection(&toggled, &[], &[], SelectionFlags::TOGGLE));
        let selected = f.module.selection().current_keyframes_selection();
        assert!(selected.get(&curve_key(f.size, 0)).is_some_and(KeyFrameSet::is_empty));

        f.module.set_current_time(40.0);
        assert!(f.module.paste_clipboard().unwrap().is_applied());
        assert_eq!(times(&f.module, f.size, 0), vec![10.0, 20.0, 40.0]);
    }

    #[test]
    fn test_history_labels() {
        let mut f = fixture(&[10.0]);
        assert_eq!(f.module.undo_description(), None);
        select(&mut f.module, f.size, 0, &[10.0]);
        f.module.move_selected_keys_and_nodes(2.0, 0.0).unwrap();
        assert_eq!(f.module.undo_description(), Some("Move keyframes"));
        f.module.undo().unwrap();
        assert_eq!(f.module.undo_description(), None);
        assert_eq!(f.module.redo_description(), Some("Move keyframes"));
    }

    #[test]
    fn test_row_keyframes() {
        let mut f = fixture(&[10.0, 20.0]);
        let size_knob = f.module.graph().knob_id_by_name(f.blur, "size").unwrap();
        f.module
            .graph_mut()
            .curve_mut(CurveLocation::Knob { knob: size_knob, view: ViewIdx(0), dim: DimIdx(1) })
            .unwrap()
            .set_keyframe(Keyframe::new(30.0, 1.0));
        f.module.on_knob_changed(size_knob);
        let anim = f.module.model().anim_item(f.size).unwrap();
        let knob_row = anim.tree_item(DimSpec::All, ViewSetSpec::All).unwrap();
        let dim0_row = anim.tree_item(DimSpec::Dim(DimIdx(0)), ViewSetSpec::View(ViewIdx(0))).unwrap();

        select(&mut f.module, f.size, 0, &[10.0]);
        let row = f.module.row_keyframes(knob_row);
        assert_eq!(row.iter().map(|k| k.keyframe.time).collect::<Vec<_>>(), vec![10.0, 20.0, 30.0]);
        assert!(row.iter().all(|k| k.master));
        // dimension 1 has no selection entry
        assert!(row.iter().all(|k| !k.selected));

        let row = f.module.row_keyframes(dim0_row);
        assert_eq!(row.len(), 2);
        assert!(row[0].selected && !row[1].selected);
        assert!(!row[0].master);

        let node_row = f.module.model().node_anim_for(f.blur).and_then(|n| f.module.model().node_anim(n)).unwrap();
        assert!(f.module.row_keyframes(node_row.root_item()).is_empty());
    }

    #[test]
    fn test_table_item_range_drawing() {
        let mut graph = Graph::default();
        let tracker = graph.create_node(plugin_ids::TRACKER, "Tracker").unwrap();
        let track = graph.insert_table_item(tracker, 0, None, 0, "track1", &[]).unwrap();
        let mut own = compositor_graph::Curve::new(compositor_graph::CurveType::Double);
        own.set_keyframe(Keyframe::new(5.0, 0.0));
        own.set_keyframe(Keyframe::new(15.0, 0.0));
        graph.table_item_mut(track).unwrap().animation = Some(own);
        let mut module = AnimationModule::with_all_nodes(graph, AnimationModuleSettings::default());
        assert_eq!(module.table_item_frame_range(track), None);

        module.take_events();
        assert!(module.set_table_item_range_drawing(track, true));
        assert!(!module.set_table_item_range_drawing(track, true));
        assert_eq!(module.take_events(), vec![AnimationModuleEvent::ModelChanged]);
        assert_eq!(module.table_item_frame_range(track), Some((5.0, 15.0)));
    }
}
