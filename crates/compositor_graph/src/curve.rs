// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation curves: ordered keyframe sequences owned by one parameter dimension and view.

use crate::keyframe::{Interpolation, Keyframe, KeyframeType};
use crate::warp::KeyframeWarp;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum gap kept between keyframes of a curve whose times are clamped to integers
pub const INTEGER_TIME_EPSILON: f64 = 1.0;

/// Minimum gap kept between keyframes of a curve with continuous times
pub const CONTINUOUS_TIME_EPSILON: f64 = 1e-4;

/// Data type animated by a curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveType {
    /// Floating point values
    Double,
    /// Integer values
    Int,
    /// Boolean values stored as 0 or 1
    Bool,
    /// String values stored as indices, not editable in value
    String,
}

impl CurveType {
    /// Whether interpolation can be changed on curves of this type
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Double | Self::Int)
    }

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Double => "Double",
            Self::Int => "Int",
            Self::Bool => "Bool",
            Self::String => "String",
        }
    }
}

/// Error raised when a curve edit would break the curve invariants
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    /// Warp input times were not strictly increasing
    #[error("Keyframe times to transform must be strictly increasing")]
    UnsortedTimes,

    /// A requested keyframe does not exist on the curve
    #[error("No keyframe at time {0}")]
    KeyframeNotFound(f64),

    /// Two keyframes would end up at the same time
    #[error("Two keyframes would share time {0}")]
    Collision(f64),
}

/// A keyframe moved by a warp, with the time it had before
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpedKeyframe {
    /// Time before the warp
    pub original_time: f64,
    /// Keyframe after the warp
    pub keyframe: Keyframe,
}

/// An ordered sequence of keyframes, at most one per distinct time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    keyframes: Vec<Keyframe>,
    curve_type: CurveType,
    clamp_time_to_integers: bool,
    time_epsilon: Option<f64>,
}

impl Curve {
    /// Create an empty curve
    pub fn new(curve_type: CurveType) -> Self {
        Self {
            keyframes: Vec::new(),
            curve_type,
            clamp_time_to_integers: false,
            time_epsilon: None,
        }
    }

    /// Clamp keyframe times to integers
    pub fn with_time_clamped_to_integers(mut self, clamp: bool) -> Self {
        self.clamp_time_to_integers = clamp;
        self
    }

    /// Override the minimum gap kept to unmoved neighbors when moving keyframes
    pub fn with_time_epsilon(mut self, epsilon: f64) -> Self {
        self.time_epsilon = Some(epsilon);
        self
    }

    /// Data type of the curve
    pub fn curve_type(&self) -> CurveType {
        self.curve_type
    }

    /// All keyframes, sorted by time
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Keyframe count
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the curve has no keyframe
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Whether keyframe times are rounded to integers
    pub fn are_times_clamped_to_integers(&self) -> bool {
        self.clamp_time_to_integers
    }

    /// Whether values are rounded to integers
    pub fn are_values_clamped_to_integers(&self) -> bool {
        matches!(self.curve_type, CurveType::Int | CurveType::Bool)
    }

    /// Whether values are clamped to 0 or 1
    pub fn are_values_clamped_to_boolean(&self) -> bool {
        self.curve_type == CurveType::Bool
    }

    /// Whether keyframe values can be edited (string curves cannot)
    pub fn is_y_component_movable(&self) -> bool {
        self.curve_type != CurveType::String
    }

    /// Gap kept between a moved keyframe and its nearest unmoved neighbor
    pub fn move_epsilon(&self) -> f64 {
        self.time_epsilon.unwrap_or(if self.clamp_time_to_integers {
            INTEGER_TIME_EPSILON
        } else {
            CONTINUOUS_TIME_EPSILON
        })
    }

    fn find(&self, time: f64) -> Result<usize, usize> {
        self.keyframes.binary_search_by(|k| k.time.total_cmp(&time))
    }

    fn clamp_time(&self, time: f64) -> f64 {
        if self.clamp_time_to_integers {
            (time + 0.5).floor()
        } else {
            time
        }
    }

    fn clamp_value(&self, value: f64) -> f64 {
        match self.curve_type {
            CurveType::Double => value,
            CurveType::Int | CurveType::String => value.round(),
            CurveType::Bool => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Keyframe at exactly `time`
    pub fn keyframe_at(&self, time: f64) -> Option<&Keyframe> {
        self.find(time).ok().map(|i| &self.keyframes[i])
    }

    /// Nearest keyframe strictly before `time`
    pub fn previous_keyframe(&self, time: f64) -> Option<&Keyframe> {
        let idx = self.keyframes.partition_point(|k| k.time < time);
        if idx == 0 {
            None
        } else {
            self.keyframes.get(idx - 1)
        }
    }

    /// Nearest keyframe strictly after `time`
    pub fn next_keyframe(&self, time: f64) -> Option<&Keyframe> {
        let idx = self.keyframes.partition_point(|k| k.time <= time);
        self.keyframes.get(idx)
    }

    /// Time of the first keyframe
    pub fn first_keyframe_time(&self) -> Option<f64> {
        self.keyframes.first().map(|k| k.time)
    }

    /// Time of the last keyframe
    pub fn last_keyframe_time(&self) -> Option<f64> {
        self.keyframes.last().map(|k| k.time)
    }

    /// Insert a keyframe, replacing any keyframe at the same time.
    /// Returns true if a new keyframe was added.
    pub fn set_keyframe(&mut self, key: Keyframe) -> bool {
        let key = Keyframe {
            time: self.clamp_time(key.time),
            value: self.clamp_value(key.value),
            ..key
        };
        let added = match self.find(key.time) {
            Ok(i) => {
                self.keyframes[i] = key;
                false
            }
            Err(i) => {
                self.keyframes.insert(i, key);
                true
            }
        };
        self.refresh_derivatives();
        added
    }

    /// Remove the keyframe at `time`
    pub fn remove_keyframe_at(&mut self, time: f64) -> Option<Keyframe> {
        let idx = self.find(time).ok()?;
        let removed = self.keyframes.remove(idx);
        self.refresh_derivatives();
        Some(removed)
    }

    /// Remove every keyframe
    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    /// Set the interpolation of the keyframes at the given times, returns how many changed
    pub fn set_interpolation_at_times(&mut self, times: &[f64], interpolation: KeyframeType) -> usize {
        let mut changed = 0;
        for time in times {
            if let Ok(i) = self.find(*time) {
                if self.keyframes[i].interpolation != interpolation {
                    self.keyframes[i].interpolation = interpolation;
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            self.refresh_derivatives();
        }
        changed
    }

    /// Evaluate the curve at `time`
    pub fn evaluate(&self, time: f64) -> Option<f64> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        if time <= first.time {
            return Some(first.value);
        }
        if time >= last.time {
            return Some(last.value);
        }
        let idx = self.keyframes.partition_point(|k| k.time <= time);
        let a = &self.keyframes[idx - 1];
        let b = &self.keyframes[idx];
        Some(self.clamp_value(Interpolation::segment(a, b, time)))
    }

    /// Dry-run a warp of the keyframes at `times`
    pub fn test_warp(&self, times: &[f64], warp: &KeyframeWarp) -> Result<(), CurveError> {
        self.compute_warp(times, warp).map(|_| ())
    }

    /// Warp the keyframes at `times`, which must be strictly increasing.
    ///
    /// The curve is left untouched if the warp fails.
    pub fn transform_keyframes(
        &mut self,
        times: &[f64],
        warp: &KeyframeWarp,
    ) -> Result<Vec<WarpedKeyframe>, CurveError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        if warp.is_identity() {
            return Ok(times
                .iter()
                .filter_map(|t| self.keyframe_at(*t))
                .map(|k| WarpedKeyframe {
                    original_time: k.time,
                    keyframe: *k,
                })
                .collect());
        }
        let (keyframes, moved) = self.compute_warp(times, warp)?;
        self.keyframes = keyframes;
        self.refresh_derivatives();
        Ok(moved
            .into_iter()
            .map(|w| WarpedKeyframe {
                keyframe: self.keyframe_at(w.keyframe.time).copied().unwrap_or(w.keyframe),
                ..w
            })
            .collect())
    }

    /// Shift every keyframe by `dt`
    pub fn offset_all(&mut self, dt: f64) -> Result<(), CurveError> {
        let times: Vec<f64> = self.keyframes.iter().map(|k| k.time).collect();
        self.transform_keyframes(&times, &KeyframeWarp::translation(dt, 0.0))
            .map(|_| ())
    }

    fn compute_warp(
        &self,
        times: &[f64],
        warp: &KeyframeWarp,
    ) -> Result<(Vec<Keyframe>, Vec<WarpedKeyframe>), CurveError> {
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CurveError::UnsortedTimes);
        }

        let mut untouched = self.keyframes.clone();
        let mut warped: BTreeMap<OrderedFloat<f64>, WarpedKeyframe> = BTreeMap::new();
        for &time in times {
            let idx = untouched
                .iter()
                .position(|k| k.time == time)
                .ok_or(CurveError::KeyframeNotFound(time))?;
            let original = untouched.remove(idx);
            let mut key = warp.apply(&original);
            key.time = self.clamp_time(key.time);
            key.value = if self.is_y_component_movable() {
                self.clamp_value(key.value)
            } else {
                original.value
            };
            let moved = WarpedKeyframe {
                original_time: original.time,
                keyframe: key,
            };
            if warped.insert(OrderedFloat(key.time), moved).is_some() {
                return Err(CurveError::Collision(key.time));
            }
        }

        let mut keyframes = untouched;
        for moved in warped.values() {
            if keyframes.iter().any(|k| k.time == moved.keyframe.time) {
                return Err(CurveError::Collision(moved.keyframe.time));
            }
            keyframes.push(moved.keyframe);
        }
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut moved: Vec<WarpedKeyframe> = warped.into_values().collect();
        moved.sort_by(|a, b| a.original_time.total_cmp(&b.original_time));
        Ok((keyframes, moved))
    }

    fn refresh_derivatives(&mut self) {
        let n = self.keyframes.len();
        for i in 0..n {
            let key = self.keyframes[i];
            let prev = if i > 0 { Some(self.keyframes[i - 1]) } else { None };
            let next = self.keyframes.get(i + 1).copied();
            let slope = |a: &Keyframe, b: &Keyframe| {
                let span = b.time - a.time;
                if span.abs() > f64::EPSILON {
                    (b.value - a.value) / span
                } else {
                    0.0
                }
            };
            let (left, right) = match key.interpolation {
                KeyframeType::Constant | KeyframeType::Horizontal => (0.0, 0.0),
                KeyframeType::Free | KeyframeType::Broken => {
                    (key.left_derivative, key.right_derivative)
                }
                KeyframeType::Linear => {
                    let left = prev.map(|p| slope(&p, &key));
                    let right = next.map(|n| slope(&key, &n));
                    (
                        left.or(right).unwrap_or(0.0),
                        right.or(left).unwrap_or(0.0),
                    )
                }
                KeyframeType::Smooth | KeyframeType::CatmullRom | KeyframeType::Cubic => {
                    let d = match (prev, next) {
                        (Some(p), Some(n)) => {
                            let is_extremum = (key.value >= p.value && key.value >= n.value)
                                || (key.value <= p.value && key.value <= n.value);
                            if key.interpolation == KeyframeType::Smooth && is_extremum {
                                0.0
                            } else {
                                slope(&p, &n)
                            }
                        }
                        (Some(p), None) => slope(&p, &key),
                        (None, Some(n)) => slope(&key, &n),
                        (None, None) => 0.0,
                    };
                    (d, d)
                }
            };
            self.keyframes[i].left_derivative = left;
            self.keyframes[i].right_derivative = right;
        }
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::new(CurveType::Double)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::Matrix3;

    fn curve_with(times: &[f64]) -> Curve {
        let mut curve = Curve::new(CurveType::Double);
        for t in times {
            curve.set_keyframe(Keyframe::new(*t, *t * 2.0));
        }
        curve
    }

    #[test]
    fn test_one_keyframe_per_time() {
        let mut curve = curve_with(&[1.0, 5.0]);
        assert!(!curve.set_keyframe(Keyframe::new(5.0, 42.0)));
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.keyframe_at(5.0).map(|k| k.value), Some(42.0));
    }

    #[test]
    fn test_neighbor_queries() {
        let curve = curve_with(&[10.0, 20.0, 25.0]);
        assert_eq!(curve.next_keyframe(20.0).map(|k| k.time), Some(25.0));
        assert_eq!(curve.previous_keyframe(20.0).map(|k| k.time), Some(10.0));
        assert!(curve.previous_keyframe(10.0).is_none());
        assert!(curve.next_keyframe(25.0).is_none());
        assert_eq!(curve.next_keyframe(12.0).map(|k| k.time), Some(20.0));
    }

    #[test]
    fn test_move_epsilon_depends_on_time_clamping() {
        let curve = Curve::new(CurveType::Double);
        assert_eq!(curve.move_epsilon(), CONTINUOUS_TIME_EPSILON);
        let curve = curve.with_time_clamped_to_integers(true);
        assert_eq!(curve.move_epsilon(), INTEGER_TIME_EPSILON);
        let curve = curve.with_time_epsilon(0.5);
        assert_eq!(curve.move_epsilon(), 0.5);
    }

    #[test]
    fn test_warp_collision_leaves_curve_untouched() {
        let mut curve = curve_with(&[1.0, 2.0, 3.0]);
        let before = curve.clone();
        let result = curve.transform_keyframes(&[1.0], &KeyframeWarp::translation(1.0, 0.0));
        assert_eq!(result, Err(CurveError::Collision(2.0)));
        assert_eq!(curve, before);
    }

    #[test]
    fn test_warp_moves_selected_block() {
        let mut curve = curve_with(&[1.0, 2.0, 10.0]);
        let moved = curve
            .transform_keyframes(&[1.0, 2.0], &KeyframeWarp::translation(3.0, 1.0))
            .unwrap();
        assert_eq!(moved.len(), 2);
        assert_eq!(moved[0].original_time, 1.0);
        assert_eq!(moved[0].keyframe.time, 4.0);
        let times: Vec<f64> = curve.keyframes().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![4.0, 5.0, 10.0]);
        assert_eq!(curve.keyframe_at(4.0).map(|k| k.value), Some(3.0));
    }

    #[test]
    fn test_warp_rejects_unsorted_or_missing_times() {
        let curve = curve_with(&[1.0, 2.0]);
        let warp = KeyframeWarp::translation(0.5, 0.0);
        assert_eq!(curve.test_warp(&[2.0, 1.0], &warp), Err(CurveError::UnsortedTimes));
        assert_eq!(curve.test_warp(&[7.0], &warp), Err(CurveError::KeyframeNotFound(7.0)));
    }

    #[test]
    fn test_affine_scale_collapsing_keys_fails() {
        let curve = curve_with(&[1.0, 2.0]).with_time_clamped_to_integers(true);
        let warp = KeyframeWarp::Affine(Matrix3::scale_around(0.1, 1.0, 0.0, 0.0));
        assert!(matches!(
            curve.test_warp(&[1.0, 2.0], &warp),
            Err(CurveError::Collision(_))
        ));
    }

    #[test]
    fn test_string_curve_values_are_not_moved() {
        let mut curve = Curve::new(CurveType::String);
        curve.set_keyframe(Keyframe::new(1.0, 3.0));
        curve
            .transform_keyframes(&[1.0], &KeyframeWarp::translation(2.0, 5.0))
            .unwrap();
        assert_eq!(curve.keyframe_at(3.0).map(|k| k.value), Some(3.0));
        assert!(!curve.is_y_component_movable());
    }

    #[test]
    fn test_bool_values_clamped() {
        let mut curve = Curve::new(CurveType::Bool);
        curve.set_keyframe(Keyframe::new(0.0, 0.7));
        assert_eq!(curve.keyframe_at(0.0).map(|k| k.value), Some(1.0));
    }

    #[test]
    fn test_linear_evaluation() {
        let mut curve = Curve::new(CurveType::Double);
        curve.set_keyframe(Keyframe::new(0.0, 0.0).with_interpolation(KeyframeType::Linear));
        curve.set_keyframe(Keyframe::new(10.0, 10.0).with_interpolation(KeyframeType::Linear));
        assert!((curve.evaluate(2.5).unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(curve.evaluate(-5.0), Some(0.0));
        assert_eq!(curve.evaluate(50.0), Some(10.0));
    }

    #[test]
    fn test_set_interpolation_counts_changes() {
        let mut curve = curve_with(&[1.0, 2.0]);
        assert_eq!(curve.set_interpolation_at_times(&[1.0, 9.0], KeyframeType::Constant), 1);
        assert_eq!(curve.set_interpolation_at_times(&[1.0], KeyframeType::Constant), 0);
    }
}
