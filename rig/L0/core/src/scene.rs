//! The rig being authored: particle, frame and constraint stores plus the
//! model skeleton, and the editing operations that keep their cross
//! references valid.
//!
//! Constraints, frames and joint bindings refer to particles and frames by
//! index. Any operation that removes entities therefore collects everything
//! that depends on them, remaps surviving indices from the highest removed
//! index down, and only then removes the entities themselves.

use nalgebra::Vector3;
use tracing::{debug, info};

use rig_geom::rotation::rotation_matrix;
use rig_geom::vector::safe_normalize;

use crate::constraints::{
    Constraint, DEFAULT_MAX_ANGLE_DEGREES, DistanceConstraint, RotationConstraint,
};
use crate::entity::{Entity, EntityKind};
use crate::error::{Result, RigError};
use crate::frame::Frame;
use crate::particle::{Particle, ParticleFlags};
use crate::selection::Selection;
use crate::skeleton::Skeleton;

/// Default particle radius for editor-created particles.
pub const DEFAULT_RADIUS: f64 = 1.0;

/// What a [`Scene::delete`] call removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Particles removed.
    pub particles: usize,
    /// Frames removed, selected or dependent.
    pub frames: usize,
    /// Constraints removed.
    pub constraints: usize,
    /// Joints unbound.
    pub joints_unbound: usize,
}

/// A ragdoll rig under construction.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub(crate) particles: Vec<Particle>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) skeleton: Skeleton,
    pub(crate) drag_target: Option<Vector3<f64>>,
}

fn push_unique(list: &mut Vec<usize>, items: impl IntoIterator<Item = usize>) {
    for i in items {
        if !list.contains(&i) {
            list.push(i);
        }
    }
}

fn sort_descending(list: &mut Vec<usize>) {
    list.sort_unstable_by(|a, b| b.cmp(a));
    list.dedup();
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty rig for an imported skeleton.
    #[must_use]
    pub fn with_skeleton(skeleton: Skeleton) -> Self {
        Self {
            skeleton,
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    /// All particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Get a particle by index.
    #[must_use]
    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    /// Get a mutable particle by index.
    pub fn particle_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    /// All frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Get a frame by index.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// All constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The model skeleton.
    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Mutable access to the model skeleton.
    pub fn skeleton_mut(&mut self) -> &mut Skeleton {
        &mut self.skeleton
    }

    /// Replace the model skeleton (loading a new model).
    pub fn set_skeleton(&mut self, skeleton: Skeleton) {
        self.skeleton = skeleton;
    }

    /// Current drag target, if a drag is in progress.
    #[must_use]
    pub const fn drag_target(&self) -> Option<Vector3<f64>> {
        self.drag_target
    }

    /// Index of the eye particle.
    #[must_use]
    pub fn eye(&self) -> Option<usize> {
        self.particles.iter().position(Particle::is_eye)
    }

    fn check(&self, entity: Entity) -> Result<()> {
        let len = match entity {
            Entity::Particle(_) => self.particles.len(),
            Entity::Frame(_) => self.frames.len(),
            Entity::Joint(_) => self.skeleton.len(),
        };
        let index = entity.index();
        if index < len {
            Ok(())
        } else {
            Err(RigError::out_of_bounds(entity.kind(), index, len))
        }
    }

    fn check_particles(&self, indices: &[usize]) -> Result<()> {
        indices
            .iter()
            .try_for_each(|&i| self.check(Entity::Particle(i)))
    }

    /// Check that every stored cross reference points at an existing entity.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for the first dangling index.
    pub fn validate(&self) -> Result<()> {
        for frame in &self.frames {
            self.check_particles(&frame.particles())?;
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Distance(c) => self.check_particles(&c.particles)?,
                Constraint::Rotation(c) => {
                    for &f in &c.frames {
                        self.check(Entity::Frame(f))?;
                    }
                }
            }
        }
        for binding in self.skeleton.joints().iter().filter_map(|j| j.binding.as_ref()) {
            self.check(Entity::Frame(binding.frame))?;
            self.check_particles(&binding.particles)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Remove all particles, frames and constraints. The skeleton is kept but
    /// unbound.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.frames.clear();
        self.constraints.clear();
        self.drag_target = None;
        self.skeleton.unbind_all();
        self.skeleton.reset_transforms();
    }

    /// Drop the model skeleton.
    pub fn clear_model(&mut self) {
        self.skeleton = Skeleton::new();
    }

    /// Kill all motion.
    pub fn stop(&mut self) {
        for p in &mut self.particles {
            p.stop();
        }
    }

    /// Recompute every frame orientation; returns the number of degenerate
    /// frames, which keep their previous orientation.
    pub fn update_frames(&mut self) -> usize {
        let mut degenerate = 0;
        for frame in &mut self.frames {
            if !frame.update_orientation(&self.particles) {
                degenerate += 1;
            }
        }
        degenerate
    }

    /// Recompute joint transforms from the rig, or reset them to the
    /// identity when `mapping` is off.
    pub fn update_joints(&mut self, mapping: bool) {
        if mapping {
            self.skeleton.update_transforms(&self.particles, &self.frames);
        } else {
            self.skeleton.reset_transforms();
        }
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Add a particle at rest.
    pub fn add_particle(&mut self, position: Vector3<f64>, radius: f64) -> usize {
        self.particles.push(Particle::new(position, radius));
        self.particles.len() - 1
    }

    /// Add two particles `separation` apart along `axis`, centred on
    /// `center`. A non-positive separation means 1.
    pub fn add_particle_pair(
        &mut self,
        center: Vector3<f64>,
        axis: &Vector3<f64>,
        separation: f64,
    ) -> [usize; 2] {
        let half = if separation <= 0.0 { 0.5 } else { separation * 0.5 };
        let dir = safe_normalize(axis, Vector3::x());
        let a = self.add_particle(center - dir * half, DEFAULT_RADIUS);
        let b = self.add_particle(center + dir * half, DEFAULT_RADIUS);
        [a, b]
    }

    /// Add a frame over three distinct particles.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles and
    /// [`RigError::DegenerateFrame`] for repeated ones.
    pub fn add_frame(&mut self, particles: [usize; 3]) -> Result<usize> {
        self.check_particles(&particles)?;
        let [a, b, c] = particles;
        if a == b || b == c || a == c {
            return Err(RigError::DegenerateFrame(particles));
        }
        let mut frame = Frame::new(particles);
        if !frame.update_orientation(&self.particles) {
            debug!(?particles, "frame created from degenerate triangle");
        }
        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    /// Add a constraint after checking its indices.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] if the constraint references a
    /// particle or frame that does not exist.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<usize> {
        match &constraint {
            Constraint::Distance(c) => self.check_particles(&c.particles)?,
            Constraint::Rotation(c) => {
                for &f in &c.frames {
                    self.check(Entity::Frame(f))?;
                }
            }
        }
        debug!(kind = ?constraint.constraint_type(), "added constraint");
        self.constraints.push(constraint);
        Ok(self.constraints.len() - 1)
    }

    /// Constrain two particles to their current distance.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles.
    pub fn add_distance_constraint(&mut self, a: usize, b: usize) -> Result<usize> {
        self.check_particles(&[a, b])?;
        let c = DistanceConstraint::from_positions(a, b, &self.particles);
        self.add_constraint(c.into())
    }

    /// Constrain each consecutive pair in `chain` to its current distance.
    /// Returns the number of constraints added.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles; nothing
    /// is added in that case.
    pub fn add_distance_constraints(&mut self, chain: &[usize]) -> Result<usize> {
        self.check_particles(chain)?;
        for pair in chain.windows(2) {
            self.add_distance_constraint(pair[0], pair[1])?;
        }
        Ok(chain.len().saturating_sub(1))
    }

    /// Limit the rotation between two frames relative to their current
    /// relationship. A non-positive limit means 60 degrees.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown frames.
    pub fn add_rotation_constraint(&mut self, f1: usize, f2: usize, max_degrees: f64) -> Result<usize> {
        self.check(Entity::Frame(f1))?;
        self.check(Entity::Frame(f2))?;
        let degrees = if max_degrees <= 0.0 {
            DEFAULT_MAX_ANGLE_DEGREES
        } else {
            max_degrees
        };
        self.update_frames();
        let c = RotationConstraint::from_frames(f1, f2, degrees.to_radians(), &self.frames);
        self.add_constraint(c.into())
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Re-capture every constraint's rest state from the current pose.
    pub fn update_constraints(&mut self) {
        self.update_frames();
        for c in &mut self.constraints {
            c.update(&self.particles, &self.frames);
        }
    }

    /// Re-capture only distance constraint targets.
    pub fn update_distances(&mut self) {
        for c in &mut self.constraints {
            if let Constraint::Distance(d) = c {
                d.update(&self.particles);
            }
        }
    }

    /// Place two particles `distance` apart about their midpoint, along
    /// `axis` or their current direction. A non-positive distance means 1.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles.
    pub fn set_pair_distance(
        &mut self,
        a: usize,
        b: usize,
        distance: f64,
        axis: Option<Vector3<f64>>,
    ) -> Result<()> {
        self.check_particles(&[a, b])?;
        let (p1, p2) = (self.particles[a].position, self.particles[b].position);
        let dir = safe_normalize(&axis.unwrap_or(p2 - p1), Vector3::x());
        let half = if distance <= 0.0 { 0.5 } else { distance * 0.5 };
        let center = (p1 + p2) * 0.5;
        self.particles[a].position = center - dir * half;
        self.particles[b].position = center + dir * half;
        Ok(())
    }

    /// Rotate particles by `angle` radians about `axis` through `center`,
    /// or through their centroid.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles.
    pub fn rotate_particles(
        &mut self,
        indices: &[usize],
        angle: f64,
        axis: &Vector3<f64>,
        center: Option<Vector3<f64>>,
    ) -> Result<()> {
        self.check_particles(indices)?;
        let Some(center) = center.or_else(|| {
            rig_geom::vector::centroid(indices.iter().map(|&i| &self.particles[i].position))
        }) else {
            return Ok(());
        };
        let rot = rotation_matrix(angle, &safe_normalize(axis, Vector3::z()));
        for &i in indices {
            let p = &mut self.particles[i];
            p.position = rot * (p.position - center) + center;
        }
        Ok(())
    }

    /// Move particles by `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles.
    pub fn translate_particles(&mut self, indices: &[usize], delta: &Vector3<f64>) -> Result<()> {
        self.check_particles(indices)?;
        for &i in indices {
            self.particles[i].position += delta;
        }
        Ok(())
    }

    /// Set the radius of particles (clamped to the minimum radius).
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles.
    pub fn set_radius(&mut self, indices: &[usize], radius: f64) -> Result<()> {
        self.check_particles(indices)?;
        for &i in indices {
            self.particles[i].set_radius(radius);
        }
        Ok(())
    }

    /// Flip the pinned flag of particles.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles.
    pub fn toggle_pinned(&mut self, indices: &[usize]) -> Result<()> {
        self.check_particles(indices)?;
        for &i in indices {
            self.particles[i].flags.toggle(ParticleFlags::PINNED);
        }
        Ok(())
    }

    /// Pin or unpin every particle.
    pub fn set_all_pinned(&mut self, pinned: bool) {
        for p in &mut self.particles {
            p.set_pinned(pinned);
        }
    }

    /// Flip the pinned flag of every particle.
    pub fn invert_pinned(&mut self) {
        for p in &mut self.particles {
            p.flags.toggle(ParticleFlags::PINNED);
        }
    }

    /// Make `index` the only eye particle.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for an unknown particle.
    pub fn set_eye(&mut self, index: usize) -> Result<()> {
        self.check(Entity::Particle(index))?;
        for (i, p) in self.particles.iter_mut().enumerate() {
            p.flags.set(ParticleFlags::EYE, i == index);
        }
        Ok(())
    }

    /// Save every particle position into snapshot `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidSnapshotSlot`] for a bad slot.
    pub fn save_positions(&mut self, slot: usize) -> Result<()> {
        self.particles.iter_mut().try_for_each(|p| p.save_snapshot(slot))
    }

    /// Restore every particle from snapshot `slot`, at rest.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidSnapshotSlot`] for a bad slot.
    pub fn load_positions(&mut self, slot: usize) -> Result<()> {
        self.particles.iter_mut().try_for_each(|p| p.load_snapshot(slot))
    }

    /// Shift particles up by `offset` and compensate every binding so joint
    /// transforms are unchanged (models imported with a vertical offset).
    pub fn fix_model_offset(&mut self, offset: f64) {
        for p in &mut self.particles {
            p.position.z += offset;
            p.previous.z += offset;
        }
        for binding in self.skeleton.bindings_mut() {
            let up = binding.offset.linear.column(2).into_owned();
            binding.offset.translation -= up * offset;
        }
    }

    // ------------------------------------------------------------------
    // Dragging
    // ------------------------------------------------------------------

    /// Start dragging `anchor`; `followers` keep their offset from it.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown particles.
    pub fn begin_drag(&mut self, anchor: usize, followers: &[usize]) -> Result<()> {
        self.check(Entity::Particle(anchor))?;
        self.check_particles(followers)?;
        self.end_drag();
        let origin = self.particles[anchor].position;
        for &i in followers {
            let p = &mut self.particles[i];
            p.drag_offset = Some(p.position - origin);
        }
        self.particles[anchor].drag_offset = Some(Vector3::zeros());
        self.drag_target = Some(origin);
        Ok(())
    }

    /// Move the drag target; dragged particles follow on the next step.
    pub fn update_drag(&mut self, target: Vector3<f64>) {
        if self.drag_target.is_some() {
            self.drag_target = Some(target);
        }
    }

    /// Release all dragged particles.
    pub fn end_drag(&mut self) {
        self.drag_target = None;
        for p in &mut self.particles {
            p.drag_offset = None;
        }
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag_target.is_some()
    }

    // ------------------------------------------------------------------
    // Joints
    // ------------------------------------------------------------------

    /// Bind a joint to a frame using the current pose.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for unknown entities.
    pub fn bind_joint(&mut self, joint: usize, frame: usize, influence: &[usize]) -> Result<()> {
        self.update_frames();
        self.skeleton
            .bind_joint(joint, frame, influence, &self.frames, &self.particles)
    }

    /// Unbind the given joints.
    pub fn unbind_joints(&mut self, joints: &[usize]) {
        for &j in joints {
            self.skeleton.unbind(j);
        }
    }

    /// Hide joints from picking.
    pub fn hide_joints(&mut self, joints: &[usize]) {
        for &j in joints {
            if let Some(joint) = self.skeleton.joint_mut(j) {
                joint.hidden = true;
            }
        }
    }

    /// Make every joint pickable again.
    pub fn unhide_joints(&mut self) {
        for j in 0..self.skeleton.len() {
            if let Some(joint) = self.skeleton.joint_mut(j) {
                joint.hidden = false;
            }
        }
    }

    /// Move particles referenced by bound joints back into the rest pose by
    /// undoing the joint transforms. Returns the number of particles moved.
    pub fn unmap_particles(&mut self) -> usize {
        let rest = self.skeleton.rest_positions(&self.particles);
        let mut moved = 0;
        for (p, target) in self.particles.iter_mut().zip(rest) {
            if let Some(target) = target {
                p.teleport(target);
                moved += 1;
            }
        }
        moved
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    fn frames_using(&self, entity: Entity) -> impl Iterator<Item = usize> + '_ {
        self.frames
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.uses(entity))
            .map(|(i, _)| i)
    }

    fn constraints_using(&self, entity: Entity) -> impl Iterator<Item = usize> + '_ {
        self.constraints
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.uses(entity, &self.frames))
            .map(|(i, _)| i)
    }

    /// Delete the selected entities and everything that depends on them.
    ///
    /// Frames using a deleted particle are deleted; constraints using a
    /// deleted particle or frame are deleted; joints using either are
    /// unbound (selected joints are unbound too). Surviving indices are
    /// remapped. Out-of-range selections are ignored.
    pub fn delete(&mut self, selection: &Selection) -> DeleteSummary {
        let mut particles: Vec<usize> = selection
            .particles
            .iter()
            .copied()
            .filter(|&i| i < self.particles.len())
            .collect();
        let mut frames: Vec<usize> = Vec::new();
        push_unique(
            &mut frames,
            selection.frames.iter().copied().filter(|&i| i < self.frames.len()),
        );
        let mut joints: Vec<usize> = Vec::new();
        push_unique(
            &mut joints,
            selection.joints.iter().copied().filter(|&i| i < self.skeleton.len()),
        );
        let mut constraints: Vec<usize> = Vec::new();

        for &p in &particles {
            let e = Entity::Particle(p);
            push_unique(&mut frames, self.frames_using(e));
            push_unique(&mut joints, self.skeleton.joints_using(e));
            push_unique(&mut constraints, self.constraints_using(e));
        }
        for &f in &frames {
            let e = Entity::Frame(f);
            push_unique(&mut joints, self.skeleton.joints_using(e));
            push_unique(&mut constraints, self.constraints_using(e));
        }

        sort_descending(&mut particles);
        sort_descending(&mut frames);
        sort_descending(&mut joints);
        sort_descending(&mut constraints);

        if particles.iter().any(|&i| self.particles[i].is_dragged()) {
            self.end_drag();
        }

        for &p in &particles {
            let removed = Entity::Particle(p);
            for f in &mut self.frames {
                f.remap(removed);
            }
            self.skeleton.remap(removed);
            for c in &mut self.constraints {
                c.remap(removed);
            }
        }
        for &f in &frames {
            let removed = Entity::Frame(f);
            self.skeleton.remap(removed);
            for c in &mut self.constraints {
                c.remap(removed);
            }
        }

        for &c in &constraints {
            self.constraints.remove(c);
        }
        for &j in &joints {
            self.skeleton.unbind(j);
        }
        for &f in &frames {
            self.frames.remove(f);
        }
        for &p in &particles {
            self.particles.remove(p);
        }

        let summary = DeleteSummary {
            particles: particles.len(),
            frames: frames.len(),
            constraints: constraints.len(),
            joints_unbound: joints.len(),
        };
        info!(
            particles = summary.particles,
            frames = summary.frames,
            constraints = summary.constraints,
            joints = summary.joints_unbound,
            "deleted selection"
        );
        summary
    }

    /// Indices of constraints that use every selected entity, provided at
    /// least two entities are selected.
    #[must_use]
    pub fn constraints_among(&self, selection: &Selection) -> Vec<usize> {
        if selection.len() < 2 {
            return Vec::new();
        }
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| selection.entities().all(|e| c.uses(e, &self.frames)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Remove the constraints returned by [`Scene::constraints_among`].
    /// Returns how many were removed.
    pub fn remove_constraints_among(&mut self, selection: &Selection) -> usize {
        let mut doomed = self.constraints_among(selection);
        sort_descending(&mut doomed);
        for &c in &doomed {
            self.constraints.remove(c);
        }
        if !doomed.is_empty() {
            info!(count = doomed.len(), "removed constraints");
        }
        doomed.len()
    }

    /// Number of entities of `kind`.
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Particle => self.particles.len(),
            EntityKind::Frame => self.frames.len(),
            EntityKind::Joint => self.skeleton.len(),
            EntityKind::Constraint => self.constraints.len(),
        }
    }
}
