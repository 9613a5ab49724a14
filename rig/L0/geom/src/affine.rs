//! 3×4 affine transforms.

use std::ops::Mul;

use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An affine transform `p ↦ L·p + t` stored as a 3×3 linear part and a
/// translation.
///
/// Joint transforms in a rig are rigid (orthonormal `L`), but nothing here
/// assumes it except [`Affine3::inverse_transform_point`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Affine3 {
    /// Linear (rotation/scale) part.
    pub linear: Matrix3<f64>,
    /// Translation applied after the linear part.
    pub translation: Vector3<f64>,
}

impl Default for Affine3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine3 {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            linear: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Build from a linear part and translation.
    #[must_use]
    pub const fn new(linear: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            linear,
            translation,
        }
    }

    /// Pure translation.
    #[must_use]
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::new(Matrix3::identity(), translation)
    }

    /// Transform a point.
    #[must_use]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.linear * p + self.translation
    }

    /// Transform a direction (translation ignored).
    #[must_use]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.linear * v
    }

    /// Undo a rigid transform: `Lᵀ·(p - t)`.
    #[must_use]
    pub fn inverse_transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.linear.transpose() * (p - self.translation)
    }

    /// Inverse of a rigid transform.
    #[must_use]
    pub fn rigid_inverse(&self) -> Self {
        let lt = self.linear.transpose();
        Self::new(lt, -(lt * self.translation))
    }

    /// Row-major 3×4 layout: each row is three linear entries followed by the
    /// translation component for that row.
    #[must_use]
    pub fn to_rows(&self) -> [f64; 12] {
        let (l, t) = (&self.linear, &self.translation);
        #[rustfmt::skip]
        let rows = [
            l[(0, 0)], l[(0, 1)], l[(0, 2)], t.x,
            l[(1, 0)], l[(1, 1)], l[(1, 2)], t.y,
            l[(2, 0)], l[(2, 1)], l[(2, 2)], t.z,
        ];
        rows
    }

    /// Inverse of [`Affine3::to_rows`].
    #[must_use]
    pub fn from_rows(r: &[f64; 12]) -> Self {
        Self::new(
            Matrix3::new(r[0], r[1], r[2], r[4], r[5], r[6], r[8], r[9], r[10]),
            Vector3::new(r[3], r[7], r[11]),
        )
    }
}

impl Mul for Affine3 {
    type Output = Self;

    /// `(a * b).transform_point(p) == a.transform_point(&b.transform_point(p))`
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.linear * rhs.linear,
            self.linear * rhs.translation + self.translation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::rotation_matrix;
    use approx::assert_relative_eq;

    fn sample() -> Affine3 {
        Affine3::new(
            rotation_matrix(0.6, &Vector3::new(1.0, 1.0, 0.0).normalize()),
            Vector3::new(1.0, -2.0, 3.0),
        )
    }

    #[test]
    fn test_identity() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(Affine3::identity().transform_point(&p), p);
        assert_eq!(Affine3::default(), Affine3::identity());
    }

    #[test]
    fn test_composition_order() {
        let a = sample();
        let b = Affine3::from_translation(Vector3::new(0.0, 0.0, 5.0));
        let p = Vector3::new(0.5, 0.25, -1.0);
        assert_relative_eq!(
            (a * b).transform_point(&p),
            a.transform_point(&b.transform_point(&p)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rigid_inverse() {
        let a = sample();
        let p = Vector3::new(4.0, 5.0, 6.0);
        assert_relative_eq!(
            a.inverse_transform_point(&a.transform_point(&p)),
            p,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            (a.rigid_inverse() * a).linear,
            Matrix3::identity(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rows_layout() {
        let a = sample();
        let rows = a.to_rows();
        assert_eq!(rows[3], 1.0);
        assert_eq!(rows[7], -2.0);
        assert_eq!(rows[11], 3.0);
        assert_eq!(Affine3::from_rows(&rows), a);
    }
}
