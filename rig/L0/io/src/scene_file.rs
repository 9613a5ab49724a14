//! Scene save files.
//!
//! One record per line, tag first, fields separated by whitespace:
//!
//! ```text
//! c x y z yaw pitch                      camera
//! s x y z radius pinned [s0xyz [s1xyz [s2xyz]]]
//! e particle                             eye marker
//! t p1 p2 p3                             frame
//! d a b distance                         distance constraint
//! r f1 f2 max_angle m00 .. m22           rotation constraint (rest row-major)
//! m scale name                           model reference
//! j joint frame p0 p1 p2 a00 .. a23      joint binding (-1 = no particle)
//! ```
//!
//! Snapshot triples are written only while they differ from the position,
//! so most particles take a single short line. Records that fail to parse
//! or reference missing entities are skipped with a warning; a load never
//! fails because of file content alone.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use rig_core::particle::SNAPSHOT_SLOTS;
use rig_core::record::{Fields, fmt_float, split_tag};
use rig_core::{Constraint, JointBinding, ParticleFlags, Scene, Skeleton};
use rig_geom::Affine3;

use crate::error::{SceneIoError, SceneIoResult};

/// Saved editor camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub origin: Vector3<f64>,
    /// Heading in degrees.
    pub yaw: f64,
    /// Elevation in degrees.
    pub pitch: f64,
}

/// Model the rig was authored against.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRef {
    /// Uniform model scale, always positive.
    pub scale: f64,
    /// Model file name.
    pub name: String,
}

/// A scene together with the editor state stored next to it.
#[derive(Debug, Clone, Default)]
pub struct SceneFile {
    /// The rig.
    pub scene: Scene,
    /// Camera, if the file had one.
    pub camera: Option<Camera>,
    /// Model reference, if the file had one.
    pub model: Option<ModelRef>,
    /// Bindings for joints the skeleton does not have (yet), by joint index.
    pub unresolved_bindings: Vec<(usize, JointBinding)>,
}

impl SceneFile {
    /// Wrap a scene with no camera or model.
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            ..Self::default()
        }
    }

    /// Parse save-file text. Joint bindings resolve against `skeleton`;
    /// records for joints it lacks are kept in `unresolved_bindings`.
    #[must_use]
    pub fn parse(text: &str, skeleton: Skeleton) -> Self {
        let mut file = Self::new(Scene::with_skeleton(skeleton));
        let mut skipped = 0;
        for (number, line) in text.lines().enumerate() {
            if let Err(reason) = file.apply_record(line) {
                warn!(line = number + 1, %reason, "skipping scene record");
                skipped += 1;
            }
        }
        file.scene.update_frames();
        file.scene.update_joints(true);
        info!(
            particles = file.scene.particles().len(),
            frames = file.scene.frames().len(),
            constraints = file.scene.constraints().len(),
            bound_joints = file.scene.skeleton().bound_count(),
            skipped,
            "parsed scene"
        );
        file
    }

    fn apply_record(&mut self, line: &str) -> Result<(), String> {
        let Some((tag, text)) = split_tag(line.trim_end()) else {
            return Ok(());
        };
        let mut fields = Fields::new(text);
        match tag {
            'c' => {
                let [x, y, z, yaw, pitch] = fields
                    .floats::<5>()
                    .ok_or("camera record needs five values")?;
                self.camera = Some(Camera {
                    origin: Vector3::new(x, y, z),
                    yaw,
                    pitch,
                });
            }
            's' => self.read_particle(fields)?,
            'e' => {
                let index = fields
                    .index()
                    .flatten()
                    .ok_or("eye record needs a particle index")?;
                self.scene.set_eye(index).map_err(|e| e.to_string())?;
            }
            't' => {
                let mut indices = [0; 3];
                for slot in &mut indices {
                    *slot = fields
                        .index()
                        .flatten()
                        .ok_or("frame record needs three particle indices")?;
                }
                self.scene.add_frame(indices).map_err(|e| e.to_string())?;
            }
            'd' | 'r' => {
                let constraint =
                    Constraint::from_record(line, self.scene.particles(), self.scene.frames())
                        .map_err(|e| e.to_string())?;
                self.scene
                    .add_constraint(constraint)
                    .map_err(|e| e.to_string())?;
            }
            'm' => self.model = Some(read_model(fields).ok_or("model record needs a name")?),
            'j' => self.read_binding(fields)?,
            other => return Err(format!("unknown record tag '{other}'")),
        }
        Ok(())
    }

    fn read_particle(&mut self, mut fields: Fields<'_>) -> Result<(), String> {
        let [x, y, z, radius] = fields
            .floats::<4>()
            .ok_or("particle record needs a position and radius")?;
        let pinned = fields.int().is_some_and(|p| p != 0);
        let mut snapshots = Vec::with_capacity(SNAPSHOT_SLOTS);
        while snapshots.len() < SNAPSHOT_SLOTS {
            let Some([sx, sy, sz]) = fields.floats::<3>() else {
                break;
            };
            snapshots.push(Vector3::new(sx, sy, sz));
        }

        let index = self.scene.add_particle(Vector3::new(x, y, z), radius);
        if let Some(p) = self.scene.particle_mut(index) {
            p.set_pinned(pinned);
            for (slot, saved) in p.snapshots.iter_mut().zip(snapshots) {
                *slot = saved;
            }
        }
        Ok(())
    }

    fn read_binding(&mut self, mut fields: Fields<'_>) -> Result<(), String> {
        let joint = fields.index().flatten().ok_or("binding record needs a joint index")?;
        let frame = fields.index().ok_or("binding record needs a frame index")?;
        let [p0, p1, p2] = [fields.index(), fields.index(), fields.index()];
        let rows = fields
            .floats::<12>()
            .ok_or("binding record needs a 3x4 offset")?;
        let Some(frame) = frame else {
            // Unbound joints are written with frame -1
            return Ok(());
        };
        let particles = [p0, p1, p2].into_iter().flatten().flatten();
        let binding = JointBinding {
            frame,
            particles: particles.collect(),
            offset: Affine3::from_rows(&rows),
        };
        if self.scene.frame(binding.frame).is_none()
            || binding.particles.iter().any(|&i| self.scene.particle(i).is_none())
        {
            return Err(format!("binding for joint {joint} references missing rig entities"));
        }

        if joint < self.scene.skeleton().len() {
            self.scene
                .skeleton_mut()
                .set_binding(joint, Some(binding))
                .map_err(|e| e.to_string())?;
        } else {
            debug!(joint, "binding kept for a joint outside the skeleton");
            self.unresolved_bindings.push((joint, binding));
        }
        Ok(())
    }

    /// Install a newly imported skeleton and apply every pending binding it
    /// has a joint for. Returns the number of bindings applied.
    pub fn attach_skeleton(&mut self, skeleton: Skeleton) -> usize {
        let len = skeleton.len();
        self.scene.set_skeleton(skeleton);
        let pending = std::mem::take(&mut self.unresolved_bindings);
        let (ready, still_pending): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|(joint, _)| *joint < len);
        self.unresolved_bindings = still_pending;

        let applied = ready.len();
        for (joint, binding) in ready {
            // In range by the partition above
            let _ = self.scene.skeleton_mut().set_binding(joint, Some(binding));
        }
        self.scene.update_frames();
        self.scene.update_joints(true);
        applied
    }

    /// Serialize to save-file text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(c) = &self.camera {
            let _ = writeln!(
                out,
                "c {} {} {} {} {}",
                fmt_float(c.origin.x),
                fmt_float(c.origin.y),
                fmt_float(c.origin.z),
                fmt_float(c.yaw),
                fmt_float(c.pitch)
            );
        }

        for (i, p) in self.scene.particles().iter().enumerate() {
            let _ = write!(
                out,
                "s {} {} {}",
                fmt_vector(&p.position),
                fmt_float(p.radius()),
                u8::from(p.is_pinned())
            );
            // Later slots force the earlier ones out so positions stay aligned
            let needed = p
                .snapshots
                .iter()
                .rposition(|s| *s != p.position)
                .map_or(0, |last| last + 1);
            for s in &p.snapshots[..needed] {
                let _ = write!(out, " {}", fmt_vector(s));
            }
            out.push('\n');
            if p.flags.contains(ParticleFlags::EYE) {
                let _ = writeln!(out, "e {i}");
            }
        }

        for f in self.scene.frames() {
            let [a, b, c] = f.particles();
            let _ = writeln!(out, "t {a} {b} {c}");
        }
        for c in self.scene.constraints() {
            out.push_str(&c.to_record());
            out.push('\n');
        }

        if let Some(m) = &self.model {
            let _ = writeln!(out, "m {} {}", fmt_float(m.scale), m.name);
        }
        let bound = self
            .scene
            .skeleton()
            .joints()
            .iter()
            .enumerate()
            .filter_map(|(i, j)| j.binding.as_ref().map(|b| (i, b)));
        let pending = self.unresolved_bindings.iter().map(|(i, b)| (*i, b));
        for (joint, binding) in bound.chain(pending) {
            write_binding(&mut out, joint, binding);
        }
        out
    }
}

fn read_model(mut fields: Fields<'_>) -> Option<ModelRef> {
    let first = fields.word()?;
    let (scale, name) = match first.parse::<f64>() {
        Ok(scale) => (scale, fields.word()?),
        Err(_) => (1.0, first),
    };
    Some(ModelRef {
        scale: if scale > 0.0 { scale } else { 1.0 },
        name: name.to_owned(),
    })
}

fn write_binding(out: &mut String, joint: usize, binding: &JointBinding) {
    let _ = write!(out, "j {joint} {}", binding.frame);
    for k in 0..3 {
        match binding.particles.get(k) {
            Some(p) => {
                let _ = write!(out, " {p}");
            }
            None => out.push_str(" -1"),
        }
    }
    for v in binding.offset.to_rows() {
        let _ = write!(out, " {}", fmt_float(v));
    }
    out.push('\n');
}

fn fmt_vector(v: &Vector3<f64>) -> String {
    format!("{} {} {}", fmt_float(v.x), fmt_float(v.y), fmt_float(v.z))
}

/// Load a scene file, resolving joint bindings against `skeleton`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not UTF-8 text.
pub fn load_scene<P: AsRef<Path>>(path: P, skeleton: Skeleton) -> SceneIoResult<SceneFile> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| SceneIoError::from_open(e, path))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        SceneIoError::invalid_content(format!("{} is not UTF-8 text: {e}", path.display()))
    })?;
    Ok(SceneFile::parse(&text, skeleton))
}

/// Save a scene file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_scene<P: AsRef<Path>>(file: &SceneFile, path: P) -> SceneIoResult<()> {
    let path = path.as_ref();
    fs::write(path, file.to_text())?;
    info!(path = %path.display(), particles = file.scene.particles().len(), "saved scene");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
c 1 2 3 45 -10
s 0 0 10 2 1
e 0
s 4 0 10 1 0 4 0 12
s 0 4 10 1 0
t 0 1 2
d 0 1 4
d 1 2
m 0 body.iqm
j 1 0 0 1 -1 1 0 0 0 0 1 0 0 0 0 1 -5
";

    #[test]
    fn test_parse_sample() {
        let skeleton = Skeleton::from_joints([
            ("root", None, Vector3::zeros()),
            ("spine", Some(0), Vector3::new(0.0, 0.0, 5.0)),
        ]);
        let file = SceneFile::parse(SAMPLE, skeleton);
        let scene = &file.scene;

        assert_eq!(
            file.camera,
            Some(Camera {
                origin: Vector3::new(1.0, 2.0, 3.0),
                yaw: 45.0,
                pitch: -10.0,
            })
        );
        assert_eq!(scene.particles().len(), 3);
        assert!(scene.particles()[0].is_pinned());
        assert_eq!(scene.eye(), Some(0));
        assert_eq!(scene.particles()[1].snapshots[0], Vector3::new(4.0, 0.0, 12.0));
        assert_eq!(scene.particles()[1].snapshots[1], Vector3::new(4.0, 0.0, 10.0));
        assert_eq!(scene.frames().len(), 1);

        // Missing distance falls back to the current separation
        let d = scene.constraints()[1].as_distance().map(|c| c.distance);
        assert_relative_eq!(d.unwrap_or(0.0), 32.0_f64.sqrt(), epsilon = 1e-12);

        assert_eq!(
            file.model,
            Some(ModelRef {
                scale: 1.0,
                name: "body.iqm".to_owned(),
            })
        );
        let binding = scene.skeleton().joints()[1].binding.as_ref();
        assert_eq!(binding.map(|b| b.particles.len()), Some(2));
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let text = "s 0 0 0\ns 1 1 1 1 0\nt 0 0 0\nd 0 9 1\nr 0 1\nx what\n\nj 0 0 0\n";
        let file = SceneFile::parse(text, Skeleton::new());
        assert_eq!(file.scene.particles().len(), 1);
        assert!(file.scene.frames().is_empty());
        assert!(file.scene.constraints().is_empty());
        assert!(file.unresolved_bindings.is_empty());
    }

    #[test]
    fn test_snapshots_written_only_when_needed() {
        let mut scene = Scene::new();
        scene.add_particle(Vector3::new(0.0, 0.0, 5.0), 1.0);
        scene.add_particle(Vector3::new(1.0, 0.0, 5.0), 1.0);
        if let Some(p) = scene.particle_mut(1) {
            p.snapshots[1] = Vector3::new(1.0, 0.0, 7.0);
        }
        let text = SceneFile::new(scene).to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "s 0 0 5 1 0");
        assert_eq!(lines[1], "s 1 0 5 1 0 1 0 5 1 0 7");
    }

    #[test]
    fn test_pending_bindings_resolve_later() {
        let file_text = "s 0 0 0 1 0\ns 2 0 0 1 0\ns 0 2 0 1 0\nt 0 1 2\nj 3 0 0 -1 -1 1 0 0 0 0 1 0 0 0 0 1 0\n";
        let mut file = SceneFile::parse(file_text, Skeleton::new());
        assert_eq!(file.unresolved_bindings.len(), 1);
        // Pending bindings survive a save
        assert!(file.to_text().contains("j 3 0 0 -1 -1"));

        let skeleton = Skeleton::from_joints((0..4).map(|i| (format!("j{i}"), None, Vector3::zeros())));
        assert_eq!(file.attach_skeleton(skeleton), 1);
        assert!(file.unresolved_bindings.is_empty());
        assert!(file.scene.skeleton().joints()[3].is_bound());
    }

    #[test]
    fn test_model_without_scale() {
        let file = SceneFile::parse("m body.iqm\n", Skeleton::new());
        assert_eq!(file.model.map(|m| (m.scale, m.name)), Some((1.0, "body.iqm".to_owned())));
    }
}
