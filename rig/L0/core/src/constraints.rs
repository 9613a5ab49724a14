//! Distance and rotation-limit constraints.
//!
//! - [`DistanceConstraint`] - Keeps two particles at a target separation
//! - [`RotationConstraint`] - Limits the relative rotation of two frames
//!
//! # Accumulate-Then-Average
//!
//! Constraints never write particle positions. Each relaxation pass they
//! propose, for every particle they touch, where that particle should be,
//! weighted by an integer weight:
//!
//! ```text
//! proposed += target · weight
//! count    += weight
//! ```
//!
//! After every constraint has been applied the solver moves each free
//! particle to `proposed / count`. Raising a weight makes that kind of
//! constraint dominate the average.
//!
//! # Rotation Error
//!
//! With frame bases `O1`, `O2` (axes as rows) and the rest relative
//! orientation `M = O1·O2ᵀ` captured at creation, the current error is
//!
//! ```text
//! E = O1ᵀ · M · O2
//! ```
//!
//! which is the identity while both frames keep their rest relationship.
//! Only the part of the angle of `E` beyond the limit is corrected.

use nalgebra::{Matrix3, Vector3};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rig_geom::rotation::{angle_axis, rotation_matrix};
use rig_geom::vector::safe_normalize;

use crate::config::{RotationPivot, SolverConfig};
use crate::entity::{Entity, EntityKind, remap_index};
use crate::error::{Result, RigError};
use crate::frame::{Frame, doubled_area};
use crate::particle::Particle;
use crate::record::{Fields, fmt_float, split_tag};

/// Limit used when a rotation constraint is created without one (degrees).
pub const DEFAULT_MAX_ANGLE_DEGREES: f64 = 60.0;

/// Trial rotation used to estimate a frame's angular inertia (degrees).
const INERTIA_PROBE_DEGREES: f64 = 0.5;

/// Record tag of a distance constraint.
pub const DISTANCE_TAG: char = 'd';

/// Record tag of a rotation constraint.
pub const ROTATION_TAG: char = 'r';

/// Type of constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintType {
    /// Distance between two particles.
    Distance,
    /// Relative rotation limit between two frames.
    Rotation,
}

/// A rig constraint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Constraint {
    /// Distance constraint.
    Distance(DistanceConstraint),
    /// Rotation limit constraint.
    Rotation(RotationConstraint),
}

impl From<DistanceConstraint> for Constraint {
    fn from(c: DistanceConstraint) -> Self {
        Self::Distance(c)
    }
}

impl From<RotationConstraint> for Constraint {
    fn from(c: RotationConstraint) -> Self {
        Self::Rotation(c)
    }
}

impl Constraint {
    /// Get the type of this constraint.
    #[must_use]
    pub const fn constraint_type(&self) -> ConstraintType {
        match self {
            Self::Distance(_) => ConstraintType::Distance,
            Self::Rotation(_) => ConstraintType::Rotation,
        }
    }

    /// Particles whose accumulators this constraint writes to.
    #[must_use]
    pub fn particles(&self, frames: &[Frame]) -> SmallVec<[usize; 6]> {
        match self {
            Self::Distance(c) => SmallVec::from_slice(&c.particles),
            Self::Rotation(c) => c
                .frames
                .iter()
                .filter_map(|&f| frames.get(f))
                .flat_map(Frame::particles)
                .collect(),
        }
    }

    /// Add this constraint's proposals to the particle accumulators.
    ///
    /// Returns `true` if anything was proposed.
    pub fn apply(&self, particles: &mut [Particle], frames: &[Frame], config: &SolverConfig) -> bool {
        match self {
            Self::Distance(c) => c.apply(particles, config.linear_weight),
            Self::Rotation(c) => config.apply_rotations && c.apply(particles, frames, config),
        }
    }

    /// Whether this constraint depends on `entity`, directly or through a
    /// frame.
    #[must_use]
    pub fn uses(&self, entity: Entity, frames: &[Frame]) -> bool {
        match self {
            Self::Distance(c) => c.uses(entity),
            Self::Rotation(c) => c.uses(entity, frames),
        }
    }

    /// Shift stored indices above a removed entity down by one.
    pub fn remap(&mut self, removed: Entity) {
        match self {
            Self::Distance(c) => c.remap(removed),
            Self::Rotation(c) => c.remap(removed),
        }
    }

    /// Re-capture the rest state from the current configuration.
    pub fn update(&mut self, particles: &[Particle], frames: &[Frame]) {
        match self {
            Self::Distance(c) => c.update(particles),
            Self::Rotation(c) => c.update(frames),
        }
    }

    /// Serialize to a single record line (without newline).
    #[must_use]
    pub fn to_record(&self) -> String {
        match self {
            Self::Distance(c) => c.to_record(),
            Self::Rotation(c) => c.to_record(),
        }
    }

    /// Parse a record line of either variant.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidRecord`] for an unknown tag or too few
    /// fields, and [`RigError::IndexOutOfBounds`] for indices outside the
    /// given stores.
    pub fn from_record(line: &str, particles: &[Particle], frames: &[Frame]) -> Result<Self> {
        let (tag, text) =
            split_tag(line).ok_or_else(|| RigError::invalid_record("empty constraint record"))?;
        match tag {
            DISTANCE_TAG => DistanceConstraint::from_fields(Fields::new(text), particles).map(Self::from),
            ROTATION_TAG => RotationConstraint::from_fields(Fields::new(text), frames).map(Self::from),
            other => Err(RigError::invalid_record(format!(
                "unknown constraint tag '{other}'"
            ))),
        }
    }

    /// Downcast to a distance constraint.
    #[must_use]
    pub const fn as_distance(&self) -> Option<&DistanceConstraint> {
        match self {
            Self::Distance(c) => Some(c),
            Self::Rotation(_) => None,
        }
    }

    /// Downcast to a rotation constraint.
    #[must_use]
    pub const fn as_rotation(&self) -> Option<&RotationConstraint> {
        match self {
            Self::Rotation(c) => Some(c),
            Self::Distance(_) => None,
        }
    }
}

fn checked_index(index: Option<usize>, kind: EntityKind, len: usize) -> Result<usize> {
    match index {
        Some(i) if i < len => Ok(i),
        Some(i) => Err(RigError::out_of_bounds(kind, i, len)),
        None => Err(RigError::invalid_record(format!("negative {kind} index"))),
    }
}

/// Keeps two particles at a target distance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceConstraint {
    /// The two particle indices.
    pub particles: [usize; 2],
    /// Target separation.
    pub distance: f64,
}

impl DistanceConstraint {
    /// Constraint with an explicit target distance.
    #[must_use]
    pub const fn new(a: usize, b: usize, distance: f64) -> Self {
        Self {
            particles: [a, b],
            distance,
        }
    }

    /// Constraint whose target is the particles' current separation.
    #[must_use]
    pub fn from_positions(a: usize, b: usize, particles: &[Particle]) -> Self {
        let mut c = Self::new(a, b, 0.0);
        c.update(particles);
        c
    }

    fn endpoints(&self, particles: &[Particle]) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let [a, b] = self.particles;
        Some((particles.get(a)?.position, particles.get(b)?.position))
    }

    /// Current separation.
    #[must_use]
    pub fn current_distance(&self, particles: &[Particle]) -> Option<f64> {
        self.endpoints(particles).map(|(p1, p2)| (p2 - p1).norm())
    }

    /// Absolute deviation from the target distance.
    #[must_use]
    pub fn error(&self, particles: &[Particle]) -> f64 {
        self.current_distance(particles)
            .map_or(0.0, |d| (d - self.distance).abs())
    }

    /// Propose both endpoints at the target distance about their midpoint.
    ///
    /// Coincident endpoints are separated along +Z.
    pub fn apply(&self, particles: &mut [Particle], weight: u32) -> bool {
        let Some((p1, p2)) = self.endpoints(particles) else {
            return false;
        };
        let dir = safe_normalize(&(p2 - p1), Vector3::z());
        let center = (p1 + p2) * 0.5;
        let half = dir * (self.distance * 0.5);
        let [a, b] = self.particles;
        particles[a].propose(&(center - half), weight);
        particles[b].propose(&(center + half), weight);
        true
    }

    /// Whether this constraint references `entity`.
    #[must_use]
    pub fn uses(&self, entity: Entity) -> bool {
        matches!(entity, Entity::Particle(i) if self.particles.contains(&i))
    }

    /// Shift particle indices above a removed particle down by one.
    pub fn remap(&mut self, removed: Entity) {
        if let Entity::Particle(i) = removed {
            for p in &mut self.particles {
                remap_index(p, i);
            }
        }
    }

    /// Set the target to the current separation.
    pub fn update(&mut self, particles: &[Particle]) {
        if let Some(d) = self.current_distance(particles) {
            self.distance = d;
        }
    }

    /// `d a b distance`
    #[must_use]
    pub fn to_record(&self) -> String {
        format!(
            "{DISTANCE_TAG} {} {} {}",
            self.particles[0],
            self.particles[1],
            fmt_float(self.distance)
        )
    }

    /// Parse the fields of a distance record. A missing distance is taken
    /// from the current particle positions.
    ///
    /// # Errors
    ///
    /// Fails if fewer than two indices parse or an index is out of range.
    pub fn from_fields(mut fields: Fields<'_>, particles: &[Particle]) -> Result<Self> {
        let a = fields.index();
        let b = fields.index();
        let distance = fields.float();
        let (Some(a), Some(b)) = (a, b) else {
            return Err(RigError::invalid_record(
                "distance record needs two particle indices",
            ));
        };
        let a = checked_index(a, EntityKind::Particle, particles.len())?;
        let b = checked_index(b, EntityKind::Particle, particles.len())?;
        Ok(match distance {
            Some(d) => Self::new(a, b, d),
            None => Self::from_positions(a, b, particles),
        })
    }
}

/// Limits how far two frames may rotate relative to their rest relationship.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotationConstraint {
    /// The two frame indices.
    pub frames: [usize; 2],
    /// Maximum relative rotation (radians) before correction kicks in.
    pub max_angle: f64,
    /// Rest relative orientation `O1·O2ᵀ`.
    pub rest: Matrix3<f64>,
}

/// Where each side of a rotation correction pivots.
struct Pivots {
    first: Vector3<f64>,
    second: Vector3<f64>,
}

impl RotationConstraint {
    /// Constraint with an explicit rest orientation.
    #[must_use]
    pub const fn new(f1: usize, f2: usize, max_angle: f64, rest: Matrix3<f64>) -> Self {
        Self {
            frames: [f1, f2],
            max_angle,
            rest,
        }
    }

    /// Constraint whose rest orientation is the frames' current relationship.
    #[must_use]
    pub fn from_frames(f1: usize, f2: usize, max_angle: f64, frames: &[Frame]) -> Self {
        let mut c = Self::new(f1, f2, max_angle, Matrix3::identity());
        c.update(frames);
        c
    }

    fn orientations<'f>(&self, frames: &'f [Frame]) -> Option<(&'f Frame, &'f Frame)> {
        let [a, b] = self.frames;
        Some((frames.get(a)?, frames.get(b)?))
    }

    /// Angle and axis of the current deviation from the rest relationship.
    #[must_use]
    pub fn deviation(&self, frames: &[Frame]) -> Option<(f64, Vector3<f64>)> {
        let (t1, t2) = self.orientations(frames)?;
        let error = t1.orientation().transpose() * self.rest * t2.orientation();
        Some(angle_axis(&error))
    }

    /// Whether the current deviation exceeds the limit.
    #[must_use]
    pub fn is_violated(&self, frames: &[Frame]) -> bool {
        self.deviation(frames)
            .is_some_and(|(angle, _)| angle > self.max_angle)
    }

    /// Propose rigid rotations of both frames that bring the deviation back
    /// inside the limit. Does nothing while within the limit.
    pub fn apply(&self, particles: &mut [Particle], frames: &[Frame], config: &SolverConfig) -> bool {
        let Some((angle, axis)) = self.deviation(frames) else {
            return false;
        };
        if angle <= self.max_angle {
            return false;
        }
        let Some((t1, t2)) = self.orientations(frames) else {
            return false;
        };
        let (Some(q1), Some(q2)) = (t1.positions(particles), t2.positions(particles)) else {
            return false;
        };

        // Negative: rotate back towards the limit, slightly past it
        let correction = self.max_angle - angle + config.limit_epsilon;

        let pivots = Self::pivots(&q1, &q2, config.pivot);
        let probe = rotation_matrix(INERTIA_PROBE_DEGREES.to_radians(), &axis);
        let inertia = |points: &[Vector3<f64>; 3], pivot: &Vector3<f64>| -> f64 {
            points
                .iter()
                .map(|p| {
                    let r = p - pivot;
                    (probe * r - r).norm()
                })
                .sum()
        };
        let w = (inertia(&q1, &pivots.first), inertia(&q2, &pivots.second));
        let a = (
            doubled_area(&q1[0], &q1[1], &q1[2]),
            doubled_area(&q2[0], &q2[1], &q2[2]),
        );
        let (s1, s2) = config.distribution.split(w, a);

        let scaled = correction * config.rotation_stiffness;
        let rot1 = rotation_matrix(scaled * s1, &axis);
        let rot2 = rotation_matrix(scaled * s2, &axis).transpose();

        let weight = config.rotation_weight;
        let mut propose = |indices: [usize; 3], points: &[Vector3<f64>; 3], rot: &Matrix3<f64>, pivot: &Vector3<f64>| {
            let mut drift = Vector3::zeros();
            for (&i, p) in indices.iter().zip(points) {
                let target = rot * (p - pivot) + pivot;
                drift += target - p;
                particles[i].propose(&target, weight);
            }
            drift / 3.0
        };
        let mut drift1 = propose(t1.particles(), &q1, &rot1, &pivots.first);
        let mut drift2 = propose(t2.particles(), &q2, &rot2, &pivots.second);

        if config.pivot != RotationPivot::Centroids {
            let shared = (drift1 + drift2) * 0.5;
            drift1 = shared;
            drift2 = shared;
        }

        // Cancel the net translation the rotations introduced
        let w = f64::from(weight);
        for i in t1.particles() {
            particles[i].shift_proposal(&(-drift1 * w));
        }
        for i in t2.particles() {
            particles[i].shift_proposal(&(-drift2 * w));
        }
        true
    }

    fn pivots(q1: &[Vector3<f64>; 3], q2: &[Vector3<f64>; 3], pivot: RotationPivot) -> Pivots {
        let c1 = (q1[0] + q1[1] + q1[2]) / 3.0;
        let c2 = (q2[0] + q2[1] + q2[2]) / 3.0;
        match pivot {
            RotationPivot::Centroids | RotationPivot::SharedShift => Pivots {
                first: c1,
                second: c2,
            },
            RotationPivot::CommonCenter => {
                let mid = (c1 + c2) * 0.5;
                Pivots {
                    first: mid,
                    second: mid,
                }
            }
        }
    }

    /// Whether this constraint references `entity`, directly for frames or
    /// through either frame for particles.
    #[must_use]
    pub fn uses(&self, entity: Entity, frames: &[Frame]) -> bool {
        match entity {
            Entity::Frame(i) => self.frames.contains(&i),
            Entity::Particle(_) => self
                .frames
                .iter()
                .filter_map(|&f| frames.get(f))
                .any(|f| f.uses(entity)),
            Entity::Joint(_) => false,
        }
    }

    /// Shift frame indices above a removed frame down by one.
    pub fn remap(&mut self, removed: Entity) {
        if let Entity::Frame(i) = removed {
            for f in &mut self.frames {
                remap_index(f, i);
            }
        }
    }

    /// Capture the frames' current relative orientation as the rest state.
    pub fn update(&mut self, frames: &[Frame]) {
        if let Some((t1, t2)) = self.orientations(frames) {
            self.rest = t1.orientation() * t2.orientation().transpose();
        }
    }

    /// `r f1 f2 max_angle m00 m01 m02 m10 m11 m12 m20 m21 m22`
    #[must_use]
    pub fn to_record(&self) -> String {
        let mut line = format!(
            "{ROTATION_TAG} {} {} {}",
            self.frames[0],
            self.frames[1],
            fmt_float(self.max_angle)
        );
        for r in 0..3 {
            for c in 0..3 {
                line.push(' ');
                line.push_str(&fmt_float(self.rest[(r, c)]));
            }
        }
        line
    }

    /// Parse the fields of a rotation record. An incomplete rest matrix is
    /// recaptured from the current frame orientations.
    ///
    /// # Errors
    ///
    /// Fails if the two indices and the angle do not parse or an index is
    /// out of range.
    pub fn from_fields(mut fields: Fields<'_>, frames: &[Frame]) -> Result<Self> {
        let f1 = fields.index();
        let f2 = fields.index();
        let max_angle = fields.float();
        let (Some(f1), Some(f2), Some(max_angle)) = (f1, f2, max_angle) else {
            return Err(RigError::invalid_record(
                "rotation record needs two frame indices and an angle",
            ));
        };
        let f1 = checked_index(f1, EntityKind::Frame, frames.len())?;
        let f2 = checked_index(f2, EntityKind::Frame, frames.len())?;
        Ok(match fields.floats::<9>() {
            Some(m) => Self::new(f1, f2, max_angle, Matrix3::from_row_slice(&m)),
            None => Self::from_frames(f1, f2, max_angle, frames),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AngularDistribution;
    use approx::assert_relative_eq;

    fn particle_store(points: &[[f64; 3]]) -> Vec<Particle> {
        points
            .iter()
            .map(|&[x, y, z]| Particle::new(Vector3::new(x, y, z), 1.0))
            .collect()
    }

    /// Two frames sharing the hinge particles 0 and 1 along X.
    fn hinge(fold: f64) -> (Vec<Particle>, Vec<Frame>) {
        let (s, c) = fold.sin_cos();
        let particles = particle_store(&[
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [1.0, 2.0, 0.0],
            [1.0, -2.0 * c, 2.0 * s],
        ]);
        let mut frames = vec![Frame::new([0, 1, 2]), Frame::new([0, 1, 3])];
        for f in &mut frames {
            f.update_orientation(&particles);
        }
        (particles, frames)
    }

    fn relax_once(c: &Constraint, particles: &mut [Particle], frames: &mut [Frame], config: &SolverConfig) {
        for f in frames.iter_mut() {
            f.update_orientation(particles);
        }
        for p in particles.iter_mut() {
            p.reset_accumulator();
        }
        c.apply(particles, frames, config);
        for p in particles.iter_mut() {
            if let Some(target) = p.resolved() {
                p.position = target;
            }
        }
    }

    #[test]
    fn test_distance_apply_targets() {
        let mut particles = particle_store(&[[0.0, 0.0, 0.0], [0.0, 0.0, 2.0]]);
        let c = DistanceConstraint::new(0, 1, 1.0);
        assert!(c.apply(&mut particles, 1));
        let a = particles[0].resolved().unwrap_or_else(Vector3::zeros);
        let b = particles[1].resolved().unwrap_or_else(Vector3::zeros);
        assert_relative_eq!(a, Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-12);
        assert_relative_eq!(b, Vector3::new(0.0, 0.0, 1.5), epsilon = 1e-12);
    }

    #[test]
    fn test_distance_weight() {
        let mut particles = particle_store(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]]);
        DistanceConstraint::new(0, 1, 2.0).apply(&mut particles, 3);
        assert_eq!(particles[0].contributions(), 3);
        let a = particles[0].resolved().unwrap_or_else(Vector3::zeros);
        assert_relative_eq!(a, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_distance_coincident_does_not_nan() {
        let mut particles = particle_store(&[[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]);
        DistanceConstraint::new(0, 1, 2.0).apply(&mut particles, 1);
        for p in &particles {
            let r = p.resolved().unwrap_or_else(Vector3::zeros);
            assert!(r.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_distance_update_and_uses() {
        let particles = particle_store(&[[0.0, 0.0, 0.0], [3.0, 4.0, 0.0]]);
        let mut c = DistanceConstraint::new(0, 1, 1.0);
        c.update(&particles);
        assert_relative_eq!(c.distance, 5.0);
        assert!(c.uses(Entity::Particle(1)));
        assert!(!c.uses(Entity::Frame(0)));
    }

    #[test]
    fn test_rotation_rest_is_identity_error() {
        let (_, frames) = hinge(0.3);
        let c = RotationConstraint::from_frames(0, 1, 0.1, &frames);
        let (angle, _) = c.deviation(&frames).unwrap_or((f64::NAN, Vector3::zeros()));
        assert_relative_eq!(angle, 0.0, epsilon = 1e-9);
        assert!(!c.is_violated(&frames));
    }

    #[test]
    fn test_rotation_within_limit_is_noop() {
        let (mut particles, mut frames) = hinge(0.0);
        let c = RotationConstraint::from_frames(0, 1, 0.5, &frames);

        // Fold the second frame by less than the limit
        let (s, co) = 0.3f64.sin_cos();
        particles[3].position = Vector3::new(1.0, -2.0 * co, 2.0 * s);
        for f in &mut frames {
            f.update_orientation(&particles);
        }
        for p in &mut particles {
            p.reset_accumulator();
        }
        assert!(!c.apply(&mut particles, &frames, &SolverConfig::default()));
        assert!(particles.iter().all(|p| p.contributions() == 0));
    }

    #[test]
    fn test_rotation_beyond_limit_reduces_deviation() {
        let (mut particles, mut frames) = hinge(0.0);
        let c = Constraint::from(RotationConstraint::from_frames(0, 1, 0.2, &frames));

        let (s, co) = 1.0f64.sin_cos();
        particles[3].position = Vector3::new(1.0, -2.0 * co, 2.0 * s);
        for f in &mut frames {
            f.update_orientation(&particles);
        }
        let before = c.as_rotation().and_then(|r| r.deviation(&frames)).map_or(0.0, |d| d.0);
        assert_relative_eq!(before, 1.0, epsilon = 1e-9);

        let config = SolverConfig::default();
        for policy in AngularDistribution::ALL {
            let mut ps = particles.clone();
            let mut fs = frames.clone();
            let config = config.with_distribution(policy);
            relax_once(&c, &mut ps, &mut fs, &config);
            for f in &mut fs {
                f.update_orientation(&ps);
            }
            let after = c.as_rotation().and_then(|r| r.deviation(&fs)).map_or(f64::NAN, |d| d.0);
            assert!(after < before, "{policy:?}: {after} !< {before}");
        }
    }

    #[test]
    fn test_rotation_disabled() {
        let (mut particles, mut frames) = hinge(0.0);
        let c = Constraint::from(RotationConstraint::from_frames(0, 1, 0.1, &frames));
        particles[3].position = Vector3::new(1.0, 0.0, 2.0);
        for f in &mut frames {
            f.update_orientation(&particles);
        }
        let config = SolverConfig::default().with_rotations(false);
        assert!(!c.apply(&mut particles, &frames, &config));
    }

    #[test]
    fn test_rotation_uses_through_frames() {
        let (_, frames) = hinge(0.0);
        let c = RotationConstraint::from_frames(0, 1, 0.5, &frames);
        assert!(c.uses(Entity::Frame(1), &frames));
        assert!(c.uses(Entity::Particle(3), &frames));
        assert!(!c.uses(Entity::Particle(9), &frames));
        assert!(!c.uses(Entity::Joint(0), &frames));

        let all = Constraint::from(c).particles(&frames);
        assert_eq!(all.as_slice(), &[0, 1, 2, 0, 1, 3]);
    }

    #[test]
    fn test_remap_only_matching_kind() {
        let mut d = Constraint::from(DistanceConstraint::new(2, 5, 1.0));
        d.remap(Entity::Frame(0));
        d.remap(Entity::Particle(3));
        assert_eq!(d.as_distance().map(|c| c.particles), Some([2, 4]));

        let mut r = Constraint::from(RotationConstraint::new(1, 4, 0.5, Matrix3::identity()));
        r.remap(Entity::Particle(0));
        r.remap(Entity::Frame(2));
        assert_eq!(r.as_rotation().map(|c| c.frames), Some([1, 3]));
    }

    #[test]
    fn test_records_roundtrip() {
        let (particles, frames) = hinge(0.4);
        let d = Constraint::from(DistanceConstraint::from_positions(0, 3, &particles));
        let r = Constraint::from(RotationConstraint::from_frames(0, 1, 0.75, &frames));
        for c in [d, r] {
            let line = c.to_record();
            let parsed = Constraint::from_record(&line, &particles, &frames);
            assert_eq!(parsed, Ok(c));
        }
    }

    #[test]
    fn test_record_missing_fields_call_update() {
        let (particles, frames) = hinge(0.4);

        let d = Constraint::from_record("d 0 1", &particles, &frames);
        let d = d.ok().and_then(|c| c.as_distance().copied());
        assert_relative_eq!(d.map_or(0.0, |c| c.distance), 2.0, epsilon = 1e-12);

        let r = Constraint::from_record("r 0 1 0.5 1 0 0", &particles, &frames);
        let r = r.ok().and_then(|c| c.as_rotation().copied());
        let expected = RotationConstraint::from_frames(0, 1, 0.5, &frames);
        assert_eq!(r, Some(expected));
    }

    #[test]
    fn test_record_rejects_malformed() {
        let (particles, frames) = hinge(0.0);
        assert!(Constraint::from_record("d 0", &particles, &frames).is_err());
        assert!(Constraint::from_record("d 0 x 1.0", &particles, &frames).is_err());
        assert!(Constraint::from_record("r 0 1", &particles, &frames).is_err());
        assert!(Constraint::from_record("q 0 1", &particles, &frames).is_err());
        assert!(Constraint::from_record("", &particles, &frames).is_err());

        let err = Constraint::from_record("d 0 9 1.0", &particles, &frames);
        assert_eq!(err, Err(RigError::out_of_bounds(EntityKind::Particle, 9, 4)));
        let err = Constraint::from_record("r 0 -1 1.0", &particles, &frames);
        assert!(err.is_err());
    }
}
