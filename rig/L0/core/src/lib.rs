//! Ragdoll rig authoring core.
//!
//! A rig is a cloud of spherical particles held together by constraints and
//! relaxed by a position-based solver. Skeleton joints are bound to triangle
//! frames of particles so the rig can drive an animated character.
//!
//! - [`Particle`] - Sphere with position, previous position, flags and
//!   snapshot slots
//! - [`Frame`] - Ordered particle triple defining a local orthonormal basis
//! - [`Constraint`] - Distance and rotation limits between particles/frames
//! - [`RelaxSolver`] - Verlet integration, ground clamp, constraint relaxation
//! - [`Skeleton`] - Joints bound to frames, mapped to world transforms
//! - [`Scene`] - Owns everything above and implements the editing operations
//! - [`SkinnedMesh`] - Linear blend / dual quaternion skinning by joint transforms
//!
//! # Relaxation
//!
//! ```text
//! For each step:
//!   1. Integrate: x += (x - x_prev) · friction + g · dt²
//!   2. Clamp to the ground plane
//!   3. For each pass:
//!      a. Update frame orientations
//!      b. Every constraint proposes target positions
//!      c. Free particles move to the weighted average of proposals
//!   4. Map bound joints from their frames
//! ```
//!
//! # Entities and Indices
//!
//! Particles, frames, joints and constraints live in dense arrays and refer to
//! each other by index. Deleting an entity cascades to its dependents and
//! shifts every higher index down by one:
//!
//! ```text
//!   particles ──► frames ──► rotation constraints
//!       │            └─────► joint bindings
//!       └──────► distance constraints
//! ```
//!
//! # Quick Start
//!
//! ```
//! use rig_core::{RelaxSolver, Scene, SolverConfig};
//! use nalgebra::Vector3;
//!
//! let mut scene = Scene::new();
//! let a = scene.add_particle(Vector3::new(0.0, 0.0, 5.0), 1.0);
//! let b = scene.add_particle(Vector3::new(0.0, 0.0, 7.0), 1.0);
//! scene.add_distance_constraint(a, b).unwrap();
//!
//! let mut solver = RelaxSolver::new(SolverConfig::default());
//! for _ in 0..10 {
//!     solver.step(&mut scene, 1.0 / 60.0);
//! }
//! let d = (scene.particles()[b].position - scene.particles()[a].position).norm();
//! assert!((d - 2.0).abs() < 1e-2);
//! ```

#![doc(html_root_url = "https://docs.rs/rig-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
// Allow precision loss when converting counts to f64 - these are small values
#![allow(clippy::cast_precision_loss)]
#![allow(
    clippy::many_single_char_names, // standard notation for vector math
    clippy::suboptimal_flops,
    clippy::similar_names,
)]
// Test-related lints - these are style preferences
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::float_cmp))]

pub mod config;
pub mod constraints;
pub mod entity;
pub mod error;
pub mod frame;
pub mod particle;
pub mod pick;
pub mod record;
pub mod scene;
pub mod selection;
pub mod skeleton;
pub mod skinning;
pub mod solver;

// Re-export main types at crate root
pub use config::{AngularDistribution, RotationPivot, SolverConfig};
pub use constraints::{Constraint, ConstraintType, DistanceConstraint, RotationConstraint};
pub use entity::{Entity, EntityKind};
pub use error::{Result, RigError};
pub use frame::Frame;
pub use particle::{Particle, ParticleFlags};
pub use pick::{Hit, PickFilter, pick_ray};
pub use scene::{DeleteSummary, Scene};
pub use selection::Selection;
pub use skeleton::{Joint, JointBinding, Skeleton};
pub use skinning::{JointWeight, SkinnedMesh, SkinningMethod, VertexWeights};
pub use solver::{RelaxSolver, SolverStats};
