//! Solver configuration.
//!
//! All tunables of the relaxation solver live in [`SolverConfig`]. The
//! defaults reproduce the behaviour artists tune rigs against, so changing
//! them changes how an existing rig settles.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};

/// Upper bound for [`SolverConfig::iterations`].
pub const MAX_ITERATIONS: u32 = 100;

/// Upper bound for the accumulator weights.
pub const MAX_WEIGHT: u32 = 10;

/// How a rotation constraint splits its corrective rotation between the two
/// frames it links.
///
/// `w` is an angular inertia proxy (how far the frame's particles travel
/// under a small trial rotation about the error axis), `a` is the frame's
/// triangle area (twice the geometric area). Policies with a zero
/// denominator fall back to [`AngularDistribution::Even`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AngularDistribution {
    /// Half of the correction on each side.
    Even,
    /// `w1/(w1+w2)` on the first frame, `w2/(w1+w2)` on the second.
    Inertia,
    /// `w2/(w1+w2)` on the first frame, `w1/(w1+w2)` on the second, so the
    /// lighter frame turns more.
    #[default]
    InverseInertia,
    /// `w2/w1` on the first frame, `w1/w2` on the second.
    InertiaRatio,
    /// `a1/(a1+a2)` and `a2/(a1+a2)`.
    Area,
    /// `a2/(a1+a2)` and `a1/(a1+a2)`.
    InverseArea,
    /// `a2/a1` and `a1/a2`.
    AreaRatio,
    /// The whole correction on the first frame.
    FirstOnly,
    /// The whole correction on the second frame.
    SecondOnly,
}

impl AngularDistribution {
    /// Every policy, in the order of their legacy numeric codes (0..=6 map to
    /// the first seven).
    pub const ALL: [Self; 9] = [
        Self::Even,
        Self::Inertia,
        Self::InverseInertia,
        Self::InertiaRatio,
        Self::Area,
        Self::InverseArea,
        Self::AreaRatio,
        Self::FirstOnly,
        Self::SecondOnly,
    ];

    /// Fractions of the corrective angle applied to the first and second
    /// frame, given their inertia proxies and areas.
    #[must_use]
    pub fn split(self, inertia: (f64, f64), area: (f64, f64)) -> (f64, f64) {
        const EVEN: (f64, f64) = (0.5, 0.5);
        let eps = rig_geom::EPSILON;
        let share = |(x1, x2): (f64, f64)| {
            let sum = x1 + x2;
            if sum > eps { Some((x1 / sum, x2 / sum)) } else { None }
        };
        let ratio = |(x1, x2): (f64, f64)| {
            if x1 > eps && x2 > eps { Some((x2 / x1, x1 / x2)) } else { None }
        };
        let swap = |(x1, x2): (f64, f64)| (x2, x1);

        let split = match self {
            Self::Even => Some(EVEN),
            Self::Inertia => share(inertia),
            Self::InverseInertia => share(inertia).map(swap),
            Self::InertiaRatio => ratio(inertia),
            Self::Area => share(area),
            Self::InverseArea => share(area).map(swap),
            Self::AreaRatio => ratio(area),
            Self::FirstOnly => Some((1.0, 0.0)),
            Self::SecondOnly => Some((0.0, 1.0)),
        };
        split.unwrap_or(EVEN)
    }
}

/// Where a rotation constraint pivots each frame, and whether the net
/// translation it introduces is removed per frame or jointly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RotationPivot {
    /// Each frame turns about its own centroid; translation drift is
    /// cancelled per frame.
    #[default]
    Centroids,
    /// Each frame turns about its own centroid; the drift of both frames is
    /// averaged and cancelled jointly.
    SharedShift,
    /// Both frames turn about the midpoint of their centroids; drift is
    /// averaged and cancelled jointly.
    CommonCenter,
}

/// Configuration for the relaxation solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Relaxation passes per step. 0 disables constraints entirely.
    pub iterations: u32,

    /// World acceleration (Z up).
    pub gravity: Vector3<f64>,

    /// Fraction of last step's displacement kept while airborne.
    pub air_friction: f64,

    /// Fraction of last step's displacement kept while touching the ground.
    pub ground_friction: f64,

    /// Squared displacement below which inertia is dropped.
    pub velocity_cutoff: f64,

    /// Contact threshold as a multiple of particle radius.
    pub contact_scale: f64,

    /// Height of the ground plane.
    pub ground_height: f64,

    /// Accumulator weight of each distance constraint contribution.
    pub linear_weight: u32,

    /// Accumulator weight of each rotation constraint contribution.
    pub rotation_weight: u32,

    /// Whether rotation constraints are applied at all.
    pub apply_rotations: bool,

    /// Scale of the corrective angle. Values above 1 overshoot, negative
    /// values push the wrong way (useful only for experiments).
    pub rotation_stiffness: f64,

    /// Split policy for rotation corrections.
    pub distribution: AngularDistribution,

    /// Pivot policy for rotation corrections.
    pub pivot: RotationPivot,

    /// Extra angle (radians) pushed past the limit so a violated constraint
    /// does not settle exactly on its boundary.
    pub limit_epsilon: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            gravity: Vector3::new(0.0, 0.0, -50.0),
            air_friction: 0.99,
            ground_friction: 0.7,
            velocity_cutoff: 1e-5,
            contact_scale: 0.2,
            ground_height: 0.0,
            linear_weight: 1,
            rotation_weight: 1,
            apply_rotations: true,
            rotation_stiffness: 1.0,
            distribution: AngularDistribution::default(),
            pivot: RotationPivot::default(),
            limit_epsilon: 1e-3,
        }
    }
}

impl SolverConfig {
    /// A single relaxation pass per step, for large rigs edited live.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            iterations: 1,
            ..Self::default()
        }
    }

    /// Many passes and heavier rotation limits, for a rig that should hold
    /// its shape.
    #[must_use]
    pub fn stiff() -> Self {
        Self {
            iterations: 10,
            rotation_weight: 2,
            ..Self::default()
        }
    }

    /// Constraints only: no gravity and no retained motion. Useful to relax
    /// a freshly authored rig in place.
    #[must_use]
    pub fn settle() -> Self {
        Self {
            gravity: Vector3::zeros(),
            air_friction: 0.0,
            ground_friction: 0.0,
            ..Self::default()
        }
    }

    /// Set the number of relaxation passes.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the gravity vector.
    #[must_use]
    pub const fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the distance and rotation accumulator weights.
    #[must_use]
    pub const fn with_weights(mut self, linear: u32, rotation: u32) -> Self {
        self.linear_weight = linear;
        self.rotation_weight = rotation;
        self
    }

    /// Set the rotation split policy.
    #[must_use]
    pub const fn with_distribution(mut self, distribution: AngularDistribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Set the rotation pivot policy.
    #[must_use]
    pub const fn with_pivot(mut self, pivot: RotationPivot) -> Self {
        self.pivot = pivot;
        self
    }

    /// Enable or disable rotation constraints.
    #[must_use]
    pub const fn with_rotations(mut self, apply: bool) -> Self {
        self.apply_rotations = apply;
        self
    }

    /// Check every field against its permitted range.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.iterations > MAX_ITERATIONS {
            return Err(RigError::invalid_config(format!(
                "iterations must be <= {MAX_ITERATIONS}, got {}",
                self.iterations
            )));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(RigError::invalid_config("gravity must be finite"));
        }
        for (name, value) in [
            ("air_friction", self.air_friction),
            ("ground_friction", self.ground_friction),
            ("velocity_cutoff", self.velocity_cutoff),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RigError::invalid_config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if !(0.0..=10.0).contains(&self.contact_scale) {
            return Err(RigError::invalid_config(format!(
                "contact_scale must be in [0, 10], got {}",
                self.contact_scale
            )));
        }
        if !self.ground_height.is_finite() {
            return Err(RigError::invalid_config("ground_height must be finite"));
        }
        for (name, value) in [
            ("linear_weight", self.linear_weight),
            ("rotation_weight", self.rotation_weight),
        ] {
            if !(1..=MAX_WEIGHT).contains(&value) {
                return Err(RigError::invalid_config(format!(
                    "{name} must be in [1, {MAX_WEIGHT}], got {value}"
                )));
            }
        }
        if !(-10.0..=10.0).contains(&self.rotation_stiffness) {
            return Err(RigError::invalid_config(format!(
                "rotation_stiffness must be in [-10, 10], got {}",
                self.rotation_stiffness
            )));
        }
        if !(self.limit_epsilon >= 0.0 && self.limit_epsilon.is_finite()) {
            return Err(RigError::invalid_config(format!(
                "limit_epsilon must be finite and >= 0, got {}",
                self.limit_epsilon
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = SolverConfig::default();
        assert_eq!(config.iterations, 3);
        assert_eq!(config.distribution, AngularDistribution::InverseInertia);
        assert_eq!(config.pivot, RotationPivot::Centroids);
        assert!(config.validate().is_ok());

        for preset in [SolverConfig::realtime(), SolverConfig::stiff(), SolverConfig::settle()] {
            assert!(preset.validate().is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(SolverConfig::default().with_iterations(101).validate().is_err());
        assert!(SolverConfig::default().with_weights(0, 1).validate().is_err());
        assert!(SolverConfig::default().with_weights(1, 11).validate().is_err());

        let config = SolverConfig {
            air_friction: 1.5,
            ..SolverConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("air_friction"));

        let config = SolverConfig::default().with_gravity(Vector3::new(0.0, 0.0, f64::NAN));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_iterations_is_valid() {
        assert!(SolverConfig::default().with_iterations(0).validate().is_ok());
    }

    #[test]
    fn test_split_policies() {
        let inertia = (1.0, 3.0);
        let area = (2.0, 2.0);

        assert_eq!(AngularDistribution::Even.split(inertia, area), (0.5, 0.5));
        assert_eq!(AngularDistribution::Inertia.split(inertia, area), (0.25, 0.75));
        assert_eq!(AngularDistribution::InverseInertia.split(inertia, area), (0.75, 0.25));

        let (r1, r2) = AngularDistribution::InertiaRatio.split(inertia, area);
        assert_relative_eq!(r1, 3.0);
        assert_relative_eq!(r2, 1.0 / 3.0);

        assert_eq!(AngularDistribution::Area.split(inertia, area), (0.5, 0.5));
        assert_eq!(AngularDistribution::FirstOnly.split(inertia, area), (1.0, 0.0));
        assert_eq!(AngularDistribution::SecondOnly.split(inertia, area), (0.0, 1.0));
    }

    #[test]
    fn test_split_degenerate_falls_back_to_even() {
        for policy in [
            AngularDistribution::Inertia,
            AngularDistribution::InverseInertia,
            AngularDistribution::InertiaRatio,
            AngularDistribution::Area,
            AngularDistribution::InverseArea,
            AngularDistribution::AreaRatio,
        ] {
            assert_eq!(policy.split((0.0, 0.0), (0.0, 0.0)), (0.5, 0.5));
        }
        assert_eq!(AngularDistribution::AreaRatio.split((1.0, 1.0), (0.0, 2.0)), (0.5, 0.5));
    }
}
