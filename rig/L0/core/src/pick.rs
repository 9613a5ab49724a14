//! Ray picking of particles, joints and frames.

use nalgebra::{Matrix4, Vector3};

use rig_geom::homogeneous::{MIN_DETERMINANT, cursor_ray, invert};
use rig_geom::ray::{intersect_ray_sphere, intersect_ray_triangle};

use crate::entity::Entity;
use crate::scene::Scene;
use crate::skeleton::JOINT_PICK_RADIUS;

/// Nearest entity under a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// The entity hit.
    pub entity: Entity,
    /// Ray parameter of the hit.
    pub distance: f64,
}

/// Which entity kinds a pick considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickFilter {
    /// Test particles.
    pub particles: bool,
    /// Test visible joints.
    pub joints: bool,
    /// Test frames.
    pub frames: bool,
}

impl Default for PickFilter {
    fn default() -> Self {
        Self {
            particles: true,
            joints: true,
            frames: true,
        }
    }
}

/// Ray through a cursor position (normalized device coordinates) for a
/// camera with the given view-projection matrix.
///
/// Returns `None` if the matrix is not invertible.
#[must_use]
pub fn pick_ray(view_projection: &Matrix4<f64>, x: f64, y: f64) -> Option<(Vector3<f64>, Vector3<f64>)> {
    let inverse = invert(view_projection, MIN_DETERMINANT)?;
    cursor_ray(&inverse, x, y)
}

impl Scene {
    /// Nearest particle, visible joint or frame hit by `origin + t·ray`.
    ///
    /// Particles are tested as spheres of `radius · contact_scale`, joints as
    /// small spheres around their current position. Ties go to the kind
    /// tested first.
    #[must_use]
    pub fn pick(
        &self,
        origin: &Vector3<f64>,
        ray: &Vector3<f64>,
        contact_scale: f64,
        filter: PickFilter,
    ) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        let mut consider = |entity: Entity, distance: Option<f64>| {
            if let Some(distance) = distance {
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(Hit { entity, distance });
                }
            }
        };

        if filter.particles {
            for (i, p) in self.particles.iter().enumerate() {
                let radius = p.contact_height(contact_scale);
                consider(
                    Entity::Particle(i),
                    intersect_ray_sphere(origin, ray, &p.position, radius),
                );
            }
        }
        if filter.joints {
            for (i, j) in self.skeleton.joints().iter().enumerate() {
                if j.hidden {
                    continue;
                }
                consider(
                    Entity::Joint(i),
                    intersect_ray_sphere(origin, ray, &j.position(), JOINT_PICK_RADIUS),
                );
            }
        }
        if filter.frames {
            for (i, f) in self.frames.iter().enumerate() {
                let hit = f
                    .positions(&self.particles)
                    .and_then(|[a, b, c]| intersect_ray_triangle(origin, ray, &a, &b, &c));
                consider(Entity::Frame(i), hit);
            }
        }
        best
    }
}
