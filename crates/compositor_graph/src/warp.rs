// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe warps: transformations applied to the time and value of keyframes.

use crate::keyframe::Keyframe;
use serde::{Deserialize, Serialize};

/// Row-major 3x3 matrix acting on `(time, value, 1)` column vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3 {
    /// Matrix rows
    pub m: [[f64; 3]; 3],
}

impl Matrix3 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Create from rows
    pub fn new(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    /// Translation by `(dt, dv)`
    pub fn translation(dt: f64, dv: f64) -> Self {
        Self::new([[1.0, 0.0, dt], [0.0, 1.0, dv], [0.0, 0.0, 1.0]])
    }

    /// Scale by `(st, sv)` around `(center_time, center_value)`
    pub fn scale_around(st: f64, sv: f64, center_time: f64, center_value: f64) -> Self {
        Self::translation(center_time, center_value)
            .multiply(&Self::new([[st, 0.0, 0.0], [0.0, sv, 0.0], [0.0, 0.0, 1.0]]))
            .multiply(&Self::translation(-center_time, -center_value))
    }

    /// Matrix product `self * other`
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Self::new(out)
    }

    /// Determinant
    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse, if the matrix is not singular
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let m = &self.m;
        let inv_det = 1.0 / det;
        let mut out = [[0.0; 3]; 3];
        out[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
        out[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        out[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        out[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        out[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        out[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
        out[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
        out[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
        out[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;
        Some(Self::new(out))
    }

    /// Transform a `(time, value)` point
    pub fn transform_point(&self, time: f64, value: f64) -> (f64, f64) {
        let m = &self.m;
        let x = m[0][0] * time + m[0][1] * value + m[0][2];
        let y = m[1][0] * time + m[1][1] * value + m[1][2];
        let w = m[2][0] * time + m[2][1] * value + m[2][2];
        if w.abs() > f64::EPSILON && w != 1.0 {
            (x / w, y / w)
        } else {
            (x, y)
        }
    }

    /// Whether this is the identity matrix
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A warp applied to a set of keyframes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeyframeWarp {
    /// Offset time and value
    Translation {
        /// Time offset
        dt: f64,
        /// Value offset
        dv: f64,
    },
    /// Affine transform of the `(time, value)` plane
    Affine(Matrix3),
}

impl KeyframeWarp {
    /// Translation warp
    pub fn translation(dt: f64, dv: f64) -> Self {
        Self::Translation { dt, dv }
    }

    /// Whether applying the warp leaves keyframes untouched
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Translation { dt, dv } => *dt == 0.0 && *dv == 0.0,
            Self::Affine(matrix) => matrix.is_identity(),
        }
    }

    /// Inverse warp, `None` for a singular affine transform
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::Translation { dt, dv } => Some(Self::Translation { dt: -dt, dv: -dv }),
            Self::Affine(matrix) => matrix.inverse().map(Self::Affine),
        }
    }

    /// Time offset carried by a translation warp
    pub fn time_offset(&self) -> Option<f64> {
        match self {
            Self::Translation { dt, .. } => Some(*dt),
            Self::Affine(_) => None,
        }
    }

    /// Fold `other` into this warp so that applying the result equals applying both in turn
    pub fn merge(&mut self, other: &KeyframeWarp) -> bool {
        match (self, other) {
            (Self::Translation { dt, dv }, Self::Translation { dt: odt, dv: odv }) => {
                *dt += odt;
                *dv += odv;
                true
            }
            (Self::Affine(matrix), Self::Affine(other)) => {
                *matrix = other.multiply(matrix);
                true
            }
            _ => false,
        }
    }

    /// Apply the warp to a keyframe, derivatives included
    pub fn apply(&self, key: &Keyframe) -> Keyframe {
        match self {
            Self::Translation { dt, dv } => Keyframe {
                time: key.time + dt,
                value: key.value + dv,
                ..*key
            },
            Self::Affine(matrix) => {
                let (time, value) = matrix.transform_point(key.time, key.value);
                let m = &matrix.m;
                let warp_slope = |slope: f64| {
                    let dx = m[0][0] + m[0][1] * slope;
                    let dy = m[1][0] + m[1][1] * slope;
                    if dx.abs() > f64::EPSILON {
                        dy / dx
                    } else {
                        slope
                    }
                };
                Keyframe {
                    time,
                    value,
                    left_derivative: warp_slope(key.left_derivative),
                    right_derivative: warp_slope(key.right_derivative),
                    interpolation: key.interpolation,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_inverse() {
        let m = Matrix3::scale_around(2.0, 0.5, 10.0, 1.0);
        let inv = m.inverse().unwrap();
        let (t, v) = m.transform_point(14.0, 3.0);
        let (t2, v2) = inv.transform_point(t, v);
        assert!((t2 - 14.0).abs() < 1e-9);
        assert!((v2 - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let m = Matrix3::new([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(m.inverse().is_none());
        assert!(KeyframeWarp::Affine(m).inverse().is_none());
    }

    #[test]
    fn test_translation_merge() {
        let mut warp = KeyframeWarp::translation(1.0, 2.0);
        assert!(warp.merge(&KeyframeWarp::translation(3.0, -1.0)));
        assert_eq!(warp, KeyframeWarp::translation(4.0, 1.0));
        assert!(!warp.merge(&KeyframeWarp::Affine(Matrix3::IDENTITY)));
    }

    #[test]
    fn test_affine_scales_derivatives() {
        let warp = KeyframeWarp::Affine(Matrix3::scale_around(2.0, 1.0, 0.0, 0.0));
        let key = Keyframe::new(5.0, 1.0).with_derivatives(1.0, 1.0);
        let warped = warp.apply(&key);
        assert_eq!(warped.time, 10.0);
        assert!((warped.right_derivative - 0.5).abs() < 1e-9);
    }
}
