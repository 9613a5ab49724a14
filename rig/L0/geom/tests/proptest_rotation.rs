//! Property-based tests for the rotation algebra.
//!
//! Run with: cargo test -p rig-geom -- proptest

use approx::relative_eq;
use proptest::prelude::*;
use rig_geom::rotation::{
    angle_axis, is_orthonormal, matrix_from_quaternion, quaternion_from_matrix, rotation_matrix,
};
use rig_geom::{Affine3, DualQuat, Vector3};

// =============================================================================
// Strategies
// =============================================================================

/// A unit axis, rejecting near-zero samples.
fn arb_axis() -> impl Strategy<Value = Vector3<f64>> {
    prop::array::uniform3(-1.0..1.0f64)
        .prop_filter("axis must be non-degenerate", |[x, y, z]| {
            x * x + y * y + z * z > 0.01
        })
        .prop_map(|[x, y, z]| Vector3::new(x, y, z).normalize())
}

fn arb_point() -> impl Strategy<Value = Vector3<f64>> {
    prop::array::uniform3(-50.0..50.0f64).prop_map(|[x, y, z]| Vector3::new(x, y, z))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn proptest_rotation_is_orthonormal(angle in -10.0..10.0f64, axis in arb_axis()) {
        let m = rotation_matrix(angle, &axis);
        prop_assert!(is_orthonormal(&m, 1e-9));
        prop_assert!(relative_eq!(m.determinant(), 1.0, epsilon = 1e-9));
    }

    #[test]
    fn proptest_angle_axis_recovers_rotation(angle in 0.0..std::f64::consts::PI, axis in arb_axis()) {
        let m = rotation_matrix(angle, &axis);
        let (a, n) = angle_axis(&m);
        prop_assert!((0.0..=std::f64::consts::PI).contains(&a));
        prop_assert!(relative_eq!(n.norm(), 1.0, epsilon = 1e-9));
        // The recovered pair must rebuild the same matrix, whatever branch was taken
        prop_assert!(relative_eq!(rotation_matrix(a, &n), m, epsilon = 1e-5));
    }

    #[test]
    fn proptest_quaternion_roundtrip(angle in -6.0..6.0f64, axis in arb_axis()) {
        let m = rotation_matrix(angle, &axis);
        let q = quaternion_from_matrix(&m);
        prop_assert!(relative_eq!(matrix_from_quaternion(&q), m, epsilon = 1e-9));
    }

    #[test]
    fn proptest_dual_quat_matches_affine(
        angle in -3.0..3.0f64,
        axis in arb_axis(),
        t in arb_point(),
        p in arb_point(),
    ) {
        let a = Affine3::new(rotation_matrix(angle, &axis), t);
        let dq = DualQuat::from_affine(&a);
        prop_assert!(relative_eq!(dq.transform_point(&p), a.transform_point(&p), epsilon = 1e-7));
    }
}
