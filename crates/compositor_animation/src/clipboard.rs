// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe clipboard.

use crate::anim_item::{AnimItemDimViewKeyFramesMap, KeyFrameSet};
use compositor_graph::Keyframe;

/// Copied keyframes, kept per curve
#[derive(Debug, Clone, Default)]
pub struct KeyFrameClipboard {
    keys: AnimItemDimViewKeyFramesMap,
}

impl KeyFrameClipboard {
    /// Create an empty clipboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content. Curves with no keyframe are dropped.
    pub fn set(&mut self, keys: &AnimItemDimViewKeyFramesMap) {
        self.keys = keys
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(key, set)| (*key, set.clone()))
            .collect();
    }

    /// Copied keyframes per curve
    pub fn content(&self) -> &AnimItemDimViewKeyFramesMap {
        &self.keys
    }

    /// Every copied keyframe, sorted by time. Keyframes of different curves at
    /// the same time are merged, the first curve wins.
    pub fn flattened(&self) -> Vec<Keyframe> {
        let merged: KeyFrameSet = self
            .keys
            .values()
            .rev()
            .flat_map(|set| set.iter().copied())
            .collect();
        merged.iter().copied().collect()
    }

    /// Earliest copied time
    pub fn min_time(&self) -> Option<f64> {
        self.keys
            .values()
            .filter_map(|set| set.first().map(|k| k.time))
            .min_by(f64::total_cmp)
    }

    /// Number of copied keyframes
    pub fn len(&self) -> usize {
        self.keys.values().map(KeyFrameSet::len).sum()
    }

    /// Whether nothing was copied
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Forget the content
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
