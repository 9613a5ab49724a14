//! Property-based tests for frames, ground contact and rotation limits.
//!
//! Run with: cargo test -p rig-core -- proptest

use proptest::prelude::*;
use rig_core::frame::orientation_from_points;
use rig_core::{RelaxSolver, Scene, SolverConfig};
use rig_geom::Vector3;
use rig_geom::rotation::is_orthonormal;

// =============================================================================
// Strategies
// =============================================================================

fn arb_point() -> impl Strategy<Value = Vector3<f64>> {
    prop::array::uniform3(-20.0..20.0f64).prop_map(|[x, y, z]| Vector3::new(x, y, z))
}

/// A triangle whose area is clearly away from zero.
fn arb_triangle() -> impl Strategy<Value = [Vector3<f64>; 3]> {
    (arb_point(), arb_point(), arb_point())
        .prop_filter("triangle must be non-degenerate", |(a, b, c)| {
            (b - a).norm() > 0.1 && (c - a).cross(&(b - a)).norm() > 0.1 * (b - a).norm()
        })
        .prop_map(|(a, b, c)| [a, b, c])
}

fn arb_axis() -> impl Strategy<Value = Vector3<f64>> {
    prop::array::uniform3(-1.0..1.0f64)
        .prop_filter("axis must be non-degenerate", |[x, y, z]| {
            x * x + y * y + z * z > 0.01
        })
        .prop_map(|[x, y, z]| Vector3::new(x, y, z).normalize())
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn proptest_frame_orientation_is_orthonormal(tri in arb_triangle()) {
        let [a, b, c] = tri;
        let m = orientation_from_points(&a, &b, &c);
        prop_assert!(m.is_some());
        prop_assert!(m.is_some_and(|m| is_orthonormal(&m, 1e-9)));
    }

    #[test]
    fn proptest_ground_clamp_holds(
        z in -10.0..10.0f64,
        fall in -5.0..5.0f64,
        radius in 1.0..8.0f64,
        dt in 0.0..0.5f64,
    ) {
        let mut scene = Scene::new();
        let i = scene.add_particle(Vector3::new(0.0, 0.0, z), radius);
        if let Some(p) = scene.particle_mut(i) {
            p.previous.z = z + fall;
        }
        let solver = RelaxSolver::default();
        solver.integrate(&mut scene, dt);

        let cfg = solver.config();
        let floor = cfg.ground_height + scene.particles()[i].radius() * cfg.contact_scale;
        prop_assert!(scene.particles()[i].position.z >= floor);
    }

    #[test]
    fn proptest_rotation_below_limit_is_noop(
        limit_degrees in 10.0..90.0f64,
        fraction in 0.0..0.9f64,
        axis in arb_axis(),
    ) {
        let mut scene = Scene::new();
        for p in [
            Vector3::new(0.0, 0.0, 10.0),
            Vector3::new(2.0, 0.0, 10.0),
            Vector3::new(0.0, 2.0, 10.0),
            Vector3::new(0.0, 0.0, 14.0),
            Vector3::new(2.0, 0.0, 14.0),
            Vector3::new(0.0, 2.0, 14.0),
        ] {
            scene.add_particle(p, 1.0);
        }
        prop_assert!(scene.add_frame([0, 1, 2]).is_ok());
        prop_assert!(scene.add_frame([3, 4, 5]).is_ok());
        prop_assert!(scene.add_rotation_constraint(0, 1, limit_degrees).is_ok());

        let angle = (limit_degrees * fraction).to_radians();
        prop_assert!(scene.rotate_particles(&[3, 4, 5], angle, &axis, None).is_ok());
        let before: Vec<_> = scene.particles().iter().map(|p| p.position).collect();

        let mut solver = RelaxSolver::new(SolverConfig::default().with_gravity(Vector3::zeros()));
        solver.settle(&mut scene, 3);

        prop_assert_eq!(solver.stats().active_rotations, 0);
        for (p, q) in scene.particles().iter().zip(&before) {
            prop_assert_eq!(p.position, *q);
        }
    }
}
