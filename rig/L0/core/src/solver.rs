//! Relaxation solver for the particle rig.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each step of length dt:
//!   1. Integrate every particle:
//!        dragged  -> snap to drag target + offset
//!        free     -> x += (x - x_prev) · friction + g · dt²
//!        pinned   -> stay
//!   2. Ground clamp: z >= ground + radius · contact_scale
//!   3. Repeat `iterations` times:
//!        a. recompute frame orientations
//!        b. clear accumulators
//!        c. every constraint proposes positions
//!        d. free particles move to the weighted average
//!   4. Recompute joint transforms
//! ```
//!
//! Friction is a displacement retention factor chosen by whether the particle
//! touched the ground on the previous step. Convergence is approximate; more
//! iterations trade responsiveness for stiffness.

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::constraints::Constraint;
use crate::particle::{Particle, ParticleFlags};
use crate::scene::Scene;

/// Relaxation solver.
#[derive(Debug, Clone)]
pub struct RelaxSolver {
    /// Solver configuration.
    config: SolverConfig,
    /// Whether joint transforms follow the rig.
    map_joints: bool,
    /// Statistics from the last step.
    stats: SolverStats,
}

/// Statistics from a solver step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverStats {
    /// Relaxation passes performed.
    pub iterations: u32,
    /// Number of constraints applied per pass.
    pub num_constraints: usize,
    /// Rotation constraints beyond their limit in the last pass.
    pub active_rotations: usize,
    /// Degenerate frames seen in the last pass.
    pub degenerate_frames: usize,
    /// Largest distance constraint error after relaxation.
    pub max_distance_error: f64,
    /// Particles in ground contact after integration.
    pub grounded: usize,
}

impl Default for RelaxSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl RelaxSolver {
    /// Create a new solver with the given configuration.
    #[must_use]
    pub const fn new(config: SolverConfig) -> Self {
        Self {
            config,
            map_joints: true,
            stats: SolverStats {
                iterations: 0,
                num_constraints: 0,
                active_rotations: 0,
                degenerate_frames: 0,
                max_distance_error: 0.0,
                grounded: 0,
            },
        }
    }

    /// Get the solver configuration.
    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Set the solver configuration.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Get statistics from the last step.
    #[must_use]
    pub const fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Whether joint transforms follow the rig.
    #[must_use]
    pub const fn maps_joints(&self) -> bool {
        self.map_joints
    }

    /// Enable or disable joint mapping. When disabled every joint transform
    /// is the identity.
    pub fn set_map_joints(&mut self, map: bool) {
        self.map_joints = map;
    }

    /// Advance the scene by `dt` seconds. A non-positive `dt` skips inertia
    /// and gravity but still clamps, relaxes and maps joints.
    pub fn step(&mut self, scene: &mut Scene, dt: f64) {
        self.stats.grounded = self.integrate(scene, dt);
        self.relax(scene);
        scene.update_joints(self.map_joints);

        debug!(
            dt,
            iterations = self.stats.iterations,
            active_rotations = self.stats.active_rotations,
            degenerate_frames = self.stats.degenerate_frames,
            max_distance_error = self.stats.max_distance_error,
            grounded = self.stats.grounded,
            "solver step"
        );
    }

    /// Move every particle by inertia and gravity and clamp it above the
    /// ground. Returns the number of grounded particles.
    pub fn integrate(&self, scene: &mut Scene, dt: f64) -> usize {
        let drag_target = scene.drag_target;
        let cfg = &self.config;
        let mut grounded = 0;

        for p in &mut scene.particles {
            let current = p.position;
            match (p.drag_offset, drag_target) {
                (Some(offset), Some(target)) => p.position = target + offset,
                _ if !p.is_pinned() && dt > 0.0 => {
                    let friction = if p.is_grounded() {
                        cfg.ground_friction
                    } else {
                        cfg.air_friction
                    };
                    let inertia = (current - p.previous) * friction;
                    if inertia.norm_squared() > cfg.velocity_cutoff {
                        p.position += inertia;
                    }
                    p.position += cfg.gravity * (dt * dt);
                }
                _ => {}
            }

            if Self::clamp_to_ground(p, cfg) {
                grounded += 1;
            }
            p.previous = current;
        }
        grounded
    }

    fn clamp_to_ground(p: &mut Particle, cfg: &SolverConfig) -> bool {
        let floor = cfg.ground_height + p.contact_height(cfg.contact_scale);
        let below = p.position.z < floor;
        p.flags.set(ParticleFlags::GROUNDED, below);
        if below {
            p.position.z = floor;
        }
        below
    }

    /// Run the configured number of relaxation passes.
    pub fn relax(&mut self, scene: &mut Scene) {
        self.relax_passes(scene, self.config.iterations);
    }

    /// Run `passes` relaxation passes without integrating, e.g. to settle an
    /// edited pose.
    pub fn settle(&mut self, scene: &mut Scene, passes: u32) {
        self.relax_passes(scene, passes);
        scene.update_joints(self.map_joints);
    }

    fn relax_passes(&mut self, scene: &mut Scene, passes: u32) {
        self.stats.iterations = passes;
        self.stats.num_constraints = scene.constraints.len();
        self.stats.active_rotations = 0;
        self.stats.degenerate_frames = 0;

        for _ in 0..passes {
            self.stats.degenerate_frames = scene.update_frames();

            for p in &mut scene.particles {
                p.reset_accumulator();
            }
            let mut active_rotations = 0;
            for c in &scene.constraints {
                let applied = c.apply(&mut scene.particles, &scene.frames, &self.config);
                if applied && matches!(c, Constraint::Rotation(_)) {
                    active_rotations += 1;
                }
            }
            self.stats.active_rotations = active_rotations;

            for p in &mut scene.particles {
                if let Some(target) = p.resolved().filter(|_| p.is_free()) {
                    p.position = target;
                }
            }
        }

        if self.stats.degenerate_frames > 0 {
            debug!(count = self.stats.degenerate_frames, "degenerate frames kept previous orientation");
        }
        self.stats.max_distance_error = scene
            .constraints
            .iter()
            .filter_map(Constraint::as_distance)
            .map(|c| c.error(&scene.particles))
            .fold(0.0, f64::max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn still_config() -> SolverConfig {
        SolverConfig::default().with_gravity(Vector3::zeros())
    }

    #[test]
    fn test_gravity_accelerates_free_particle() {
        let mut scene = Scene::new();
        scene.add_particle(Vector3::new(0.0, 0.0, 100.0), 1.0);
        let mut solver = RelaxSolver::default();

        solver.step(&mut scene, 0.1);
        let z1 = scene.particles()[0].position.z;
        assert_relative_eq!(z1, 100.0 - 50.0 * 0.01, epsilon = 1e-12);

        solver.step(&mut scene, 0.1);
        let z2 = scene.particles()[0].position.z;
        // Second step carries the first step's displacement, damped by air friction
        assert_relative_eq!(z2, z1 - 0.5 * 0.99 - 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_pinned_particle_holds() {
        let mut scene = Scene::new();
        scene.add_particle(Vector3::new(1.0, 2.0, 3.0), 1.0);
        scene.toggle_pinned(&[0]).unwrap_or(());
        let mut solver = RelaxSolver::default();
        for _ in 0..10 {
            solver.step(&mut scene, 0.016);
        }
        assert_eq!(scene.particles()[0].position, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_ground_clamp_and_friction_state() {
        let mut scene = Scene::new();
        scene.add_particle(Vector3::new(0.0, 0.0, 0.05), 2.0);
        let mut solver = RelaxSolver::default();
        solver.step(&mut scene, 0.5);

        let p = &scene.particles()[0];
        assert_relative_eq!(p.position.z, 0.4);
        assert!(p.is_grounded());
        assert_eq!(solver.stats().grounded, 1);
    }

    #[test]
    fn test_small_motion_is_cut() {
        let mut scene = Scene::new();
        scene.add_particle(Vector3::new(0.0, 0.0, 10.0), 1.0);
        if let Some(p) = scene.particle_mut(0) {
            p.previous = Vector3::new(0.0, -0.001, 10.0);
        }
        let mut solver = RelaxSolver::new(still_config());
        solver.step(&mut scene, 0.016);
        assert_eq!(scene.particles()[0].position, Vector3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn test_drag_overrides_integration_and_relaxation() {
        let mut scene = Scene::new();
        let a = scene.add_particle(Vector3::new(0.0, 0.0, 5.0), 1.0);
        let b = scene.add_particle(Vector3::new(1.0, 0.0, 5.0), 1.0);
        scene.add_distance_constraint(a, b).unwrap_or(0);
        scene.begin_drag(a, &[]).unwrap_or(());
        scene.update_drag(Vector3::new(-3.0, 0.0, 5.0));

        let mut solver = RelaxSolver::new(still_config().with_iterations(10));
        solver.step(&mut scene, 0.016);
        assert_eq!(scene.particles()[a].position, Vector3::new(-3.0, 0.0, 5.0));
        let d = (scene.particles()[b].position - scene.particles()[a].position).norm();
        assert!(d < 4.0);
    }

    #[test]
    fn test_zero_iterations_disables_constraints() {
        let mut scene = Scene::new();
        let a = scene.add_particle(Vector3::new(0.0, 0.0, 5.0), 1.0);
        let b = scene.add_particle(Vector3::new(0.0, 0.0, 7.0), 1.0);
        scene
            .add_constraint(crate::DistanceConstraint::new(a, b, 1.0).into())
            .unwrap_or(0);
        let mut solver = RelaxSolver::new(still_config().with_iterations(0));
        solver.step(&mut scene, 0.016);
        assert_relative_eq!(scene.particles()[b].position.z, 7.0);
        assert_relative_eq!(solver.stats().max_distance_error, 1.0);
    }

    #[test]
    fn test_settle_without_gravity() {
        let mut scene = Scene::new();
        let a = scene.add_particle(Vector3::new(0.0, 0.0, 5.0), 1.0);
        let b = scene.add_particle(Vector3::new(0.0, 0.0, 7.0), 1.0);
        scene
            .add_constraint(crate::DistanceConstraint::new(a, b, 1.0).into())
            .unwrap_or(0);
        let mut solver = RelaxSolver::default();
        solver.settle(&mut scene, 1);
        assert_relative_eq!(scene.particles()[a].position.z, 5.5, epsilon = 1e-12);
        assert_relative_eq!(scene.particles()[b].position.z, 6.5, epsilon = 1e-12);
        assert_relative_eq!(solver.stats().max_distance_error, 0.0, epsilon = 1e-12);
    }
}
