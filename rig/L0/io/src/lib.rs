//! Rig persistence for ragdoll rigs.
//!
//! This crate reads and writes the line-oriented text formats used around a
//! [`rig_core::Scene`]:
//!
//! - **Scene files** - Particles, frames, constraints, joint bindings and the
//!   editor camera, loaded leniently (bad records are skipped)
//! - **Ragdoll configs** - The engine-side export in model units
//!
//! # Example
//!
//! ```no_run
//! use rig_core::Skeleton;
//! use rig_io::{load_scene, save_scene, write_ragdoll_config};
//!
//! let file = load_scene("quicksave.txt", Skeleton::new()).unwrap();
//! save_scene(&file, "backup.txt").unwrap();
//!
//! let scale = file.model.as_ref().map_or(1.0, |m| m.scale);
//! write_ragdoll_config(&file.scene, "ragdoll.cfg", scale, 0.0).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::float_cmp))]

mod error;
mod ragdoll_cfg;
mod scene_file;

pub use error::{SceneIoError, SceneIoResult};
pub use ragdoll_cfg::{export_ragdoll_config, write_ragdoll_config};
pub use scene_file::{Camera, ModelRef, SceneFile, load_scene, save_scene};
