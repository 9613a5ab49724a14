//! Triangular reference frames.
//!
//! A frame is three particles plus the orthonormal basis they span:
//!
//! ```text
//!          p3
//!          ●          x = normalize(p2 - p1)
//!         / \         z = normalize(x × (p3 - p1))
//!        /   \        y = z × x
//!   p1  ●─────●  p2
//!       └──x──┘
//! ```
//!
//! The basis is stored with the axes as rows, so `orientation * v` expresses
//! a world vector in frame coordinates.

use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, remap_index};
use crate::particle::Particle;

/// Compute the orientation basis of the triangle `(p1, p2, p3)`.
///
/// Returns `None` when two points coincide or all three are collinear.
#[must_use]
pub fn orientation_from_points(
    p1: &Vector3<f64>,
    p2: &Vector3<f64>,
    p3: &Vector3<f64>,
) -> Option<Matrix3<f64>> {
    let x = (p2 - p1).try_normalize(rig_geom::EPSILON)?;
    let z = x.cross(&(p3 - p1)).try_normalize(rig_geom::EPSILON)?;
    let y = z.cross(&x);
    Some(Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]))
}

/// Twice the area of the triangle `(p1, p2, p3)`.
#[must_use]
pub fn doubled_area(p1: &Vector3<f64>, p2: &Vector3<f64>, p3: &Vector3<f64>) -> f64 {
    (p2 - p1).cross(&(p3 - p1)).norm()
}

/// A reference frame built from three particles.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    particles: [usize; 3],
    #[cfg_attr(feature = "serde", serde(skip, default = "Matrix3::identity"))]
    orientation: Matrix3<f64>,
}

impl Frame {
    /// Create a frame over three particle indices with identity orientation.
    ///
    /// Call [`Frame::update_orientation`] before reading the orientation.
    #[must_use]
    pub fn new(particles: [usize; 3]) -> Self {
        Self {
            particles,
            orientation: Matrix3::identity(),
        }
    }

    /// The three particle indices.
    #[must_use]
    pub const fn particles(&self) -> [usize; 3] {
        self.particles
    }

    /// Current orientation basis (axes as rows).
    #[must_use]
    pub const fn orientation(&self) -> &Matrix3<f64> {
        &self.orientation
    }

    /// Positions of the three particles, or `None` if an index is dangling.
    #[must_use]
    pub fn positions(&self, particles: &[Particle]) -> Option<[Vector3<f64>; 3]> {
        let [a, b, c] = self.particles;
        Some([
            particles.get(a)?.position,
            particles.get(b)?.position,
            particles.get(c)?.position,
        ])
    }

    /// Recompute the orientation from current particle positions.
    ///
    /// A degenerate triangle keeps the previous orientation and returns
    /// `false`.
    pub fn update_orientation(&mut self, particles: &[Particle]) -> bool {
        let Some([p1, p2, p3]) = self.positions(particles) else {
            return false;
        };
        match orientation_from_points(&p1, &p2, &p3) {
            Some(orientation) => {
                self.orientation = orientation;
                true
            }
            None => false,
        }
    }

    /// Centroid of the three particles.
    #[must_use]
    pub fn centroid(&self, particles: &[Particle]) -> Option<Vector3<f64>> {
        self.positions(particles).map(|[a, b, c]| (a + b + c) / 3.0)
    }

    /// Whether the frame depends on `entity`.
    #[must_use]
    pub fn uses(&self, entity: Entity) -> bool {
        match entity {
            Entity::Particle(i) => self.particles.contains(&i),
            Entity::Frame(_) | Entity::Joint(_) => false,
        }
    }

    /// Shift particle indices above a removed particle down by one.
    pub fn remap(&mut self, removed: Entity) {
        if let Entity::Particle(i) = removed {
            for p in &mut self.particles {
                remap_index(p, i);
            }
        }
    }
}
