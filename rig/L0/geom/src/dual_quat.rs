//! Dual quaternions for rigid transforms.

use std::ops::{Add, Mul};

use nalgebra::{Quaternion, Vector3};

use crate::affine::Affine3;
use crate::rotation::{matrix_from_quaternion, quaternion_from_matrix};

/// A rigid transform encoded as `real + ε·dual`.
///
/// `real` holds the rotation and `dual = ½·t·real` encodes the translation
/// `t`. Weighted sums of dual quaternions followed by [`DualQuat::normalize`]
/// give the blend used by dual quaternion skinning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuat {
    /// Rotation part.
    pub real: Quaternion<f64>,
    /// Translation part.
    pub dual: Quaternion<f64>,
}

impl Default for DualQuat {
    fn default() -> Self {
        Self::identity()
    }
}

impl DualQuat {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            real: Quaternion::identity(),
            dual: Quaternion::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Rotation by `rotation` followed by translation by `translation`.
    #[must_use]
    pub fn from_rotation_translation(rotation: Quaternion<f64>, translation: &Vector3<f64>) -> Self {
        let t = Quaternion::new(0.0, translation.x, translation.y, translation.z);
        Self {
            real: rotation,
            dual: t * rotation * 0.5,
        }
    }

    /// Encode the rigid part of an affine transform.
    #[must_use]
    pub fn from_affine(a: &Affine3) -> Self {
        Self::from_rotation_translation(quaternion_from_matrix(&a.linear), &a.translation)
    }

    /// Scale both parts by `s`.
    #[must_use]
    pub fn scale(&self, s: f64) -> Self {
        Self {
            real: self.real * s,
            dual: self.dual * s,
        }
    }

    /// Flip sign if `self` lies in the opposite hemisphere from `other`, so a
    /// blend of the two takes the short way round.
    pub fn fix_antipodal(&mut self, other: &Self) {
        if self.real.dot(&other.real) < 0.0 {
            self.real = -self.real;
            self.dual = -self.dual;
        }
    }

    /// Normalize to a unit dual quaternion. A zero real part yields identity.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let norm = self.real.norm();
        if norm < crate::EPSILON {
            return Self::identity();
        }
        self.scale(1.0 / norm)
    }

    /// Translation encoded by a unit dual quaternion: `2·dual·conj(real)`.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        (self.dual * self.real.conjugate() * 2.0).imag()
    }

    /// Transform a point by a unit dual quaternion.
    #[must_use]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        let q = Quaternion::new(0.0, p.x, p.y, p.z);
        (self.real * q * self.real.conjugate()).imag() + self.translation()
    }

    /// Convert to an affine transform.
    #[must_use]
    pub fn to_affine(&self) -> Affine3 {
        Affine3::new(matrix_from_quaternion(&self.real), self.translation())
    }
}

impl Mul for DualQuat {
    type Output = Self;

    /// Composition: `self` applied after `rhs`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            real: self.real * rhs.real,
            dual: self.real * rhs.dual + self.dual * rhs.real,
        }
    }
}

impl Add for DualQuat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            real: self.real + rhs.real,
            dual: self.dual + rhs.dual,
        }
    }
}
