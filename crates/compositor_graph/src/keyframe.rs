// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for parameter curves.

use serde::{Deserialize, Serialize};

/// Interpolation type of a keyframe, applied on the segment leaving it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeyframeType {
    /// Step to the next keyframe
    Constant,
    /// Straight line to the next keyframe
    Linear,
    /// Smooth tangents, flattened at extrema
    #[default]
    Smooth,
    /// Catmull-Rom spline tangents
    CatmullRom,
    /// Cubic spline tangents
    Cubic,
    /// Flat tangents
    Horizontal,
    /// User-edited tangents, kept aligned
    Free,
    /// User-edited tangents, left and right independent
    Broken,
}

impl KeyframeType {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::Linear => "Linear",
            Self::Smooth => "Smooth",
            Self::CatmullRom => "Catmull-Rom",
            Self::Cubic => "Cubic",
            Self::Horizontal => "Horizontal",
            Self::Free => "Free",
            Self::Broken => "Broken",
        }
    }

    /// Whether the tangents of this keyframe are set by the user rather than computed
    pub fn has_user_tangents(&self) -> bool {
        matches!(self, Self::Free | Self::Broken)
    }
}

/// A single animation sample on a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time (frame) of the keyframe
    pub time: f64,
    /// Value at this keyframe
    pub value: f64,
    /// Derivative entering the keyframe
    pub left_derivative: f64,
    /// Derivative leaving the keyframe
    pub right_derivative: f64,
    /// Interpolation on the segment leaving this keyframe
    pub interpolation: KeyframeType,
}

impl Keyframe {
    /// Create a new keyframe with the default interpolation
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            left_derivative: 0.0,
            right_derivative: 0.0,
            interpolation: KeyframeType::default(),
        }
    }

    /// Set interpolation type
    pub fn with_interpolation(mut self, interpolation: KeyframeType) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set both derivatives
    pub fn with_derivatives(mut self, left: f64, right: f64) -> Self {
        self.left_derivative = left;
        self.right_derivative = right;
        self
    }
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two values
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }

    /// Hermite spline interpolation with tangents already scaled to the segment length
    pub fn hermite(p0: f64, m0: f64, p1: f64, m1: f64, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
    }

    /// Evaluate the segment between two keyframes at an absolute time
    pub fn segment(a: &Keyframe, b: &Keyframe, time: f64) -> f64 {
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        let t = (time - a.time) / span;
        match a.interpolation {
            KeyframeType::Constant => a.value,
            KeyframeType::Linear if b.interpolation == KeyframeType::Linear => {
                Self::lerp(a.value, b.value, t)
            }
            _ => Self::hermite(
                a.value,
                a.right_derivative * span,
                b.value,
                b.left_derivative * span,
                t,
            ),
        }
    }
}
