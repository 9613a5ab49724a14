//! Rotation algebra.
//!
//! Axis-angle rotation in direct (vector) and matrix form, quaternion/matrix
//! conversion, and the inverse problem of recovering the angle and axis of a
//! rotation matrix.
//!
//! # Angle-Axis Extraction
//!
//! ```text
//! θ = acos((trace(R) - 1) / 2)            θ ∈ [0, π]
//! n = (R₂₁ - R₁₂, R₀₂ - R₂₀, R₁₀ - R₀₁) / (2 sin θ)
//! ```
//!
//! The skew part vanishes as θ approaches π, so there the axis is read from
//! the diagonal instead (`R = 2nnᵀ - I`), starting from the dominant diagonal
//! element to keep the square root well conditioned.

use nalgebra::{Matrix3, Quaternion, Vector3};

use crate::vector::safe_normalize;

/// Skew magnitude below which the diagonal branch of [`angle_axis`] is used.
const SKEW_EPSILON: f64 = 1e-6;

/// Rotation matrix for `angle` radians about the unit vector `axis`.
#[must_use]
pub fn rotation_matrix(angle: f64, axis: &Vector3<f64>) -> Matrix3<f64> {
    rotation_matrix_cs(angle.cos(), angle.sin(), axis)
}

/// Rotation matrix from a precomputed cosine/sine pair.
#[must_use]
pub fn rotation_matrix_cs(c: f64, s: f64, axis: &Vector3<f64>) -> Matrix3<f64> {
    let (x, y, z) = (axis.x, axis.y, axis.z);
    let t = 1.0 - c;
    Matrix3::new(
        x * x * t + c,
        x * y * t - z * s,
        x * z * t + y * s,
        y * x * t + z * s,
        y * y * t + c,
        y * z * t - x * s,
        x * z * t - y * s,
        y * z * t + x * s,
        z * z * t + c,
    )
}

/// Rotate `v` by `angle` radians about the unit vector `axis`.
///
/// Equivalent to `rotation_matrix(angle, axis) * v` without building the matrix.
#[must_use]
pub fn rotate_vector(v: &Vector3<f64>, angle: f64, axis: &Vector3<f64>) -> Vector3<f64> {
    let (c, s) = (angle.cos(), angle.sin());
    v * c + axis.cross(v) * s + axis * (axis.dot(v) * (1.0 - c))
}

/// Recover the rotation angle (in `[0, π]`) and unit axis of a rotation matrix.
///
/// For (near) identity matrices the axis is arbitrary and `+X` is returned.
#[must_use]
pub fn angle_axis(m: &Matrix3<f64>) -> (f64, Vector3<f64>) {
    let angle = (0.5 * (m.trace() - 1.0)).clamp(-1.0, 1.0).acos();

    let skew = Vector3::new(
        m[(2, 1)] - m[(1, 2)],
        m[(0, 2)] - m[(2, 0)],
        m[(1, 0)] - m[(0, 1)],
    );
    if skew.norm() > SKEW_EPSILON {
        return (angle, skew.normalize());
    }
    if angle < std::f64::consts::FRAC_PI_2 {
        return (angle, Vector3::x());
    }

    (angle, half_turn_axis(m))
}

/// Axis of a rotation by π, read from the symmetric part `R = 2nnᵀ - I`.
fn half_turn_axis(m: &Matrix3<f64>) -> Vector3<f64> {
    let (xx, yy, zz) = (m[(0, 0)], m[(1, 1)], m[(2, 2)]);
    let mut axis = Vector3::zeros();
    if xx >= yy && xx >= zz {
        axis.x = 0.5 * (xx - yy - zz + 1.0).max(0.0).sqrt();
        let k = 0.5 / axis.x.max(f64::MIN_POSITIVE);
        axis.y = m[(0, 1)] * k;
        axis.z = m[(0, 2)] * k;
    } else if yy >= zz {
        axis.y = 0.5 * (yy - xx - zz + 1.0).max(0.0).sqrt();
        let k = 0.5 / axis.y.max(f64::MIN_POSITIVE);
        axis.x = m[(0, 1)] * k;
        axis.z = m[(1, 2)] * k;
    } else {
        axis.z = 0.5 * (zz - xx - yy + 1.0).max(0.0).sqrt();
        let k = 0.5 / axis.z.max(f64::MIN_POSITIVE);
        axis.x = m[(0, 2)] * k;
        axis.y = m[(1, 2)] * k;
    }
    safe_normalize(&axis, Vector3::x())
}

/// Quaternion for `angle` radians about the unit vector `axis`.
#[must_use]
pub fn quaternion_from_angle_axis(angle: f64, axis: &Vector3<f64>) -> Quaternion<f64> {
    let s = (0.5 * angle).sin();
    Quaternion::new((0.5 * angle).cos(), s * axis.x, s * axis.y, s * axis.z)
}

/// Convert a rotation matrix to a quaternion.
///
/// Uses the trace when it is positive and otherwise pivots on the largest
/// diagonal element, so the square root argument never approaches zero.
#[must_use]
pub fn quaternion_from_matrix(m: &Matrix3<f64>) -> Quaternion<f64> {
    let (xx, yy, zz) = (m[(0, 0)], m[(1, 1)], m[(2, 2)]);
    let trace = xx + yy + zz;
    if trace > 0.0 {
        let r = (1.0 + trace).sqrt();
        let inv = 0.5 / r;
        Quaternion::new(
            0.5 * r,
            (m[(2, 1)] - m[(1, 2)]) * inv,
            (m[(0, 2)] - m[(2, 0)]) * inv,
            (m[(1, 0)] - m[(0, 1)]) * inv,
        )
    } else if xx > yy && xx > zz {
        let r = (1.0 + xx - yy - zz).sqrt();
        let inv = 0.5 / r;
        Quaternion::new(
            (m[(2, 1)] - m[(1, 2)]) * inv,
            0.5 * r,
            (m[(1, 0)] + m[(0, 1)]) * inv,
            (m[(0, 2)] + m[(2, 0)]) * inv,
        )
    } else if yy > zz {
        let r = (1.0 + yy - xx - zz).sqrt();
        let inv = 0.5 / r;
        Quaternion::new(
            (m[(0, 2)] - m[(2, 0)]) * inv,
            (m[(1, 0)] + m[(0, 1)]) * inv,
            0.5 * r,
            (m[(2, 1)] + m[(1, 2)]) * inv,
        )
    } else {
        let r = (1.0 + zz - xx - yy).sqrt();
        let inv = 0.5 / r;
        Quaternion::new(
            (m[(1, 0)] - m[(0, 1)]) * inv,
            (m[(0, 2)] + m[(2, 0)]) * inv,
            (m[(2, 1)] + m[(1, 2)]) * inv,
            0.5 * r,
        )
    }
}

/// Convert a (not necessarily unit) quaternion to a rotation matrix.
///
/// The result is divided by `|q|²`, so any non-zero scalar multiple of a unit
/// quaternion yields the same rotation. A zero quaternion yields identity.
#[must_use]
pub fn matrix_from_quaternion(q: &Quaternion<f64>) -> Matrix3<f64> {
    let (x, y, z, w) = (q.i, q.j, q.k, q.w);
    let (ww, xx, yy, zz) = (w * w, x * x, y * y, z * z);
    let (xy, xz, yz) = (x * y, x * z, y * z);
    let (wx, wy, wz) = (w * x, w * y, w * z);
    let rr = ww + xx + yy + zz;
    if rr <= f64::MIN_POSITIVE {
        return Matrix3::identity();
    }
    Matrix3::new(
        ww + xx - yy - zz,
        2.0 * (xy - wz),
        2.0 * (xz + wy),
        2.0 * (xy + wz),
        ww + yy - xx - zz,
        2.0 * (yz - wx),
        2.0 * (xz - wy),
        2.0 * (yz + wx),
        ww + zz - xx - yy,
    ) / rr
}

/// Whether `m` is orthonormal within `tolerance`.
#[must_use]
pub fn is_orthonormal(m: &Matrix3<f64>, tolerance: f64) -> bool {
    (m * m.transpose() - Matrix3::identity())
        .iter()
        .all(|e| e.abs() <= tolerance)
}
