//! Engine-side ragdoll config export.
//!
//! The engine reads particles in model units, so positions are lowered by
//! the model's vertical offset and divided by its scale:
//!
//! ```text
//! rdvert x y z [radius]          radius only when larger than 1
//! rdeye particle
//! rdtri p1 p2 p3
//! rdjoint joint frame [p0 [p1 [p2]]]
//! rdlimitdist a b distance
//! rdlimitrot f1 f2 max_degrees qx qy qz qw
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use rig_core::record::fmt_float;
use rig_core::{Constraint, Scene};
use rig_geom::rotation::quaternion_from_matrix;

use crate::error::{SceneIoError, SceneIoResult};

/// Render the ragdoll config for `scene` authored against a model with the
/// given `scale` and vertical `offset`. A non-positive scale means 1.
#[must_use]
pub fn export_ragdoll_config(scene: &Scene, scale: f64, offset: f64) -> String {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let mut out = String::new();

    for (i, p) in scene.particles().iter().enumerate() {
        let mut pos = p.position;
        pos.z -= offset;
        pos /= scale;
        let _ = write!(
            out,
            "rdvert {} {} {}",
            fmt_float(pos.x),
            fmt_float(pos.y),
            fmt_float(pos.z)
        );
        if p.radius() > 1.0 {
            let _ = write!(out, " {}", fmt_float(p.radius()));
        }
        out.push('\n');
        if p.is_eye() {
            let _ = writeln!(out, "rdeye {i}");
        }
    }

    for f in scene.frames() {
        let [a, b, c] = f.particles();
        let _ = writeln!(out, "rdtri {a} {b} {c}");
    }

    for (i, joint) in scene.skeleton().joints().iter().enumerate() {
        let Some(binding) = &joint.binding else {
            continue;
        };
        let _ = write!(out, "rdjoint {i} {}", binding.frame);
        for p in &binding.particles {
            let _ = write!(out, " {p}");
        }
        out.push('\n');
    }

    for c in scene.constraints() {
        match c {
            Constraint::Distance(d) => {
                let [a, b] = d.particles;
                let _ = writeln!(out, "rdlimitdist {a} {b} {}", fmt_float(d.distance / scale));
            }
            Constraint::Rotation(r) => {
                let q = quaternion_from_matrix(&r.rest);
                let [f1, f2] = r.frames;
                let _ = writeln!(
                    out,
                    "rdlimitrot {f1} {f2} {} {} {} {} {}",
                    fmt_float(r.max_angle.to_degrees()),
                    fmt_float(q.i),
                    fmt_float(q.j),
                    fmt_float(q.k),
                    fmt_float(q.w)
                );
            }
        }
    }
    out
}

/// Write the ragdoll config for `scene` to `path`.
///
/// # Errors
///
/// Returns an error if `scale` or `offset` is not finite or the file cannot
/// be written.
pub fn write_ragdoll_config<P: AsRef<Path>>(
    scene: &Scene,
    path: P,
    scale: f64,
    offset: f64,
) -> SceneIoResult<()> {
    if !scale.is_finite() || !offset.is_finite() {
        return Err(SceneIoError::invalid_content(format!(
            "model scale {scale} and offset {offset} must be finite"
        )));
    }
    let path = path.as_ref();
    fs::write(path, export_ragdoll_config(scene, scale, offset))?;
    info!(path = %path.display(), "wrote ragdoll config");
    Ok(())
}
