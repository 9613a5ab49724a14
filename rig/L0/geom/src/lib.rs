//! Geometry kernel for ragdoll rigging.
//!
//! This crate layers the rotation algebra a particle rig needs on top of
//! [`nalgebra`]:
//!
//! - [`rotation`] - Axis-angle rotation matrices, matrix/quaternion conversion,
//!   matrix to angle-axis extraction
//! - [`Affine3`] - 3×4 rigid/affine transform (linear part + translation)
//! - [`DualQuat`] - Dual quaternion rigid transforms for skinning
//! - [`homogeneous`] - Guarded 4×4 inverse and viewport unprojection
//! - [`ray`] - Ray/sphere and ray/triangle intersection for picking
//! - [`vector`] - Safe normalisation and small vector helpers
//!
//! # Conventions
//!
//! All matrices act on column vectors, so composition is right-multiplication
//! consistent: applying `a * b` to a point transforms by `b` first, then `a`.
//!
//! Orientation bases are stored with the basis axes as **rows**. Multiplying
//! such a matrix by a world vector yields the vector's coordinates in the
//! basis; its transpose maps basis coordinates back to world space.
//!
//! ```text
//!        ┌ x-axis ┐
//!   M =  │ y-axis │     M · v_world = v_local
//!        └ z-axis ┘     Mᵀ · v_local = v_world
//! ```
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up (the ground plane is horizontal in X/Y)
//!
//! # Example
//!
//! ```
//! use rig_geom::rotation::{angle_axis, rotation_matrix};
//! use nalgebra::Vector3;
//!
//! let m = rotation_matrix(0.5, &Vector3::z());
//! let (angle, axis) = angle_axis(&m);
//! assert!((angle - 0.5).abs() < 1e-12);
//! assert!((axis - Vector3::z()).norm() < 1e-12);
//! ```

#![doc(html_root_url = "https://docs.rs/rig-geom/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(
    clippy::many_single_char_names, // standard notation for matrix and quaternion math
    clippy::suboptimal_flops,       // keep formulas readable over mul_add
    clippy::similar_names,
)]
#![cfg_attr(test, allow(clippy::float_cmp))]

mod affine;
mod dual_quat;
pub mod homogeneous;
pub mod ray;
pub mod rotation;
pub mod vector;

pub use affine::Affine3;
pub use dual_quat::DualQuat;

// Re-export math types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point3, Quaternion, UnitQuaternion, Vector3, Vector4};

/// Threshold below which vector lengths are treated as zero.
pub const EPSILON: f64 = 1e-10;
