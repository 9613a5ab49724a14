//! Skeleton joints driven by the simulated rig.
//!
//! Joints come from the imported model (name, parent, rest position) and
//! start unbound. Binding a joint attaches it to one frame plus up to three
//! influence particles and captures a local offset so that, at bind time,
//! the joint transform is the identity:
//!
//! ```text
//! anchor    = mean(influence particle positions)
//! offset    = [ O | -O·anchor ]          (captured once)
//! transform = [ Oᵀ | anchor ] · offset   (every step)
//! ```
//!
//! where `O` is the frame orientation (axes as rows). Unbound joints follow
//! the nearest moved ancestor, or stay at the identity.

use nalgebra::{Matrix3, Vector3};
use smallvec::SmallVec;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rig_geom::Affine3;

use crate::entity::{Entity, EntityKind, remap_index};
use crate::error::{Result, RigError};
use crate::frame::Frame;
use crate::particle::Particle;

/// Maximum number of influence particles per binding.
pub const MAX_INFLUENCES: usize = 3;

/// Radius of the pick sphere around a joint position.
pub const JOINT_PICK_RADIUS: f64 = 0.1;

/// Attachment of a joint to the rig.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointBinding {
    /// Frame providing the orientation.
    pub frame: usize,
    /// Particles whose mean position anchors the joint.
    pub particles: SmallVec<[usize; MAX_INFLUENCES]>,
    /// Offset captured at bind time.
    pub offset: Affine3,
}

impl JointBinding {
    /// Mean position of the influence particles that still exist.
    #[must_use]
    pub fn anchor(&self, particles: &[Particle]) -> Option<Vector3<f64>> {
        rig_geom::vector::centroid(
            self.particles
                .iter()
                .filter_map(|&i| particles.get(i))
                .map(|p| &p.position),
        )
    }

    /// Transform implied by the given orientation and anchor.
    #[must_use]
    pub fn transform(&self, orientation: &Matrix3<f64>, anchor: Vector3<f64>) -> Affine3 {
        Affine3::new(orientation.transpose(), anchor) * self.offset
    }

    fn uses(&self, entity: Entity) -> bool {
        match entity {
            Entity::Particle(i) => self.particles.contains(&i),
            Entity::Frame(i) => self.frame == i,
            Entity::Joint(_) => false,
        }
    }

    fn remap(&mut self, removed: Entity) {
        match removed {
            Entity::Particle(i) => {
                for p in &mut self.particles {
                    remap_index(p, i);
                }
            }
            Entity::Frame(i) => remap_index(&mut self.frame, i),
            Entity::Joint(_) => {}
        }
    }
}

/// A skeleton joint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Joint {
    /// Joint name from the model.
    pub name: String,
    /// Parent joint, `None` for roots.
    pub parent: Option<usize>,
    /// Bind-pose position in model space.
    pub rest_position: Vector3<f64>,
    /// Rig attachment, if bound.
    pub binding: Option<JointBinding>,
    /// Excluded from picking.
    pub hidden: bool,
    transform: Affine3,
    moved: bool,
}

impl Joint {
    /// Create an unbound joint.
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>, rest_position: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            parent,
            rest_position,
            binding: None,
            hidden: false,
            transform: Affine3::identity(),
            moved: false,
        }
    }

    /// Current world transform.
    #[must_use]
    pub const fn transform(&self) -> &Affine3 {
        &self.transform
    }

    /// Whether the transform was driven by the rig in the last update.
    #[must_use]
    pub const fn is_moved(&self) -> bool {
        self.moved
    }

    /// Whether the joint is attached to a frame.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Current position of the joint (its rest position carried by the
    /// transform).
    #[must_use]
    pub fn position(&self) -> Vector3<f64> {
        self.transform.transform_point(&self.rest_position)
    }

    /// Whether the joint's binding references `entity`.
    #[must_use]
    pub fn uses(&self, entity: Entity) -> bool {
        self.binding.as_ref().is_some_and(|b| b.uses(entity))
    }
}

/// The joint hierarchy of the rigged model.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Skeleton {
    joints: Vec<Joint>,
}

impl Skeleton {
    /// Create an empty skeleton.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed unbound joints from imported `(name, parent, rest position)`
    /// triples. Parent indices outside the list are dropped.
    #[must_use]
    pub fn from_joints<I, S>(joints: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<usize>, Vector3<f64>)>,
        S: Into<String>,
    {
        let mut joints: Vec<Joint> = joints
            .into_iter()
            .map(|(name, parent, rest)| Joint::new(name, parent, rest))
            .collect();
        let len = joints.len();
        for (i, joint) in joints.iter_mut().enumerate() {
            if joint.parent.is_some_and(|p| p >= len || p == i) {
                joint.parent = None;
            }
        }
        Self { joints }
    }

    /// Append an unbound joint and return its index.
    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        rest_position: Vector3<f64>,
    ) -> usize {
        let parent = parent.filter(|&p| p < self.joints.len());
        self.joints.push(Joint::new(name, parent, rest_position));
        self.joints.len() - 1
    }

    /// Number of joints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Whether there are no joints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// All joints.
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Get a joint by index.
    #[must_use]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Get a mutable joint by index.
    pub fn joint_mut(&mut self, index: usize) -> Option<&mut Joint> {
        self.joints.get_mut(index)
    }

    /// Find a joint by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Number of bound joints.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.joints.iter().filter(|j| j.is_bound()).count()
    }

    fn check_joint(&self, joint: usize) -> Result<()> {
        if joint < self.joints.len() {
            Ok(())
        } else {
            Err(RigError::out_of_bounds(EntityKind::Joint, joint, self.joints.len()))
        }
    }

    /// Bind `joint` to `frame`, anchored at the mean of `influence`.
    ///
    /// Only the first [`MAX_INFLUENCES`] particles are kept; an empty
    /// influence set uses the frame's own particles. The frame orientation
    /// must be current.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] if the joint, frame or any
    /// influence particle does not exist.
    pub fn bind_joint(
        &mut self,
        joint: usize,
        frame: usize,
        influence: &[usize],
        frames: &[Frame],
        particles: &[Particle],
    ) -> Result<()> {
        self.check_joint(joint)?;
        let f = frames
            .get(frame)
            .ok_or_else(|| RigError::out_of_bounds(EntityKind::Frame, frame, frames.len()))?;

        let mut chosen: SmallVec<[usize; MAX_INFLUENCES]> = influence
            .iter()
            .copied()
            .take(MAX_INFLUENCES)
            .collect();
        if chosen.is_empty() {
            chosen.extend(f.particles());
        }
        if let Some(&bad) = chosen.iter().find(|&&i| i >= particles.len()) {
            return Err(RigError::out_of_bounds(EntityKind::Particle, bad, particles.len()));
        }

        let mut binding = JointBinding {
            frame,
            particles: chosen,
            offset: Affine3::identity(),
        };
        let anchor = binding.anchor(particles).unwrap_or_else(Vector3::zeros);
        let orientation = f.orientation();
        binding.offset = Affine3::new(*orientation, orientation * -anchor);

        let j = &mut self.joints[joint];
        debug!(joint = %j.name, frame, influences = binding.particles.len(), "bound joint");
        j.transform = binding.transform(orientation, anchor);
        j.moved = true;
        j.binding = Some(binding);
        Ok(())
    }

    /// Install a binding verbatim (used when loading a saved rig).
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] if the joint does not exist.
    pub fn set_binding(&mut self, joint: usize, binding: Option<JointBinding>) -> Result<()> {
        self.check_joint(joint)?;
        self.joints[joint].binding = binding;
        Ok(())
    }

    /// Detach a joint from the rig. Out-of-range indices are ignored.
    pub fn unbind(&mut self, joint: usize) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.binding = None;
        }
    }

    /// Detach every joint.
    pub fn unbind_all(&mut self) {
        for j in &mut self.joints {
            j.binding = None;
        }
    }

    /// Indices of joints whose binding references `entity`.
    #[must_use]
    pub fn joints_using(&self, entity: Entity) -> Vec<usize> {
        self.joints
            .iter()
            .enumerate()
            .filter(|(_, j)| j.uses(entity))
            .map(|(i, _)| i)
            .collect()
    }

    /// Bindings of all bound joints.
    pub fn bindings_mut(&mut self) -> impl Iterator<Item = &mut JointBinding> + '_ {
        self.joints.iter_mut().filter_map(|j| j.binding.as_mut())
    }

    /// Shift binding indices above a removed particle or frame down by one.
    pub fn remap(&mut self, removed: Entity) {
        for binding in self.bindings_mut() {
            binding.remap(removed);
        }
    }

    /// Recompute every joint transform from the current rig state.
    ///
    /// Bound joints follow their frame. A bound joint whose anchor cannot be
    /// computed keeps its previous transform. Unbound joints then inherit
    /// from their nearest moved ancestor, or reset to the identity.
    pub fn update_transforms(&mut self, particles: &[Particle], frames: &[Frame]) {
        for joint in &mut self.joints {
            let Some(binding) = &joint.binding else {
                joint.moved = false;
                continue;
            };
            let (Some(frame), Some(anchor)) = (frames.get(binding.frame), binding.anchor(particles))
            else {
                continue;
            };
            joint.transform = binding.transform(frame.orientation(), anchor);
            joint.moved = true;
        }

        for i in 0..self.joints.len() {
            if self.joints[i].is_bound() {
                continue;
            }
            let inherited = self
                .moved_ancestor(i)
                .map_or_else(Affine3::identity, |a| self.joints[a].transform);
            self.joints[i].transform = inherited;
        }
    }

    /// Nearest ancestor of `joint` whose transform was driven this update.
    fn moved_ancestor(&self, joint: usize) -> Option<usize> {
        let mut current = self.joints.get(joint)?.parent;
        // A malformed hierarchy may contain cycles
        for _ in 0..self.joints.len() {
            let index = current?;
            let ancestor = self.joints.get(index)?;
            if ancestor.moved {
                return Some(index);
            }
            current = ancestor.parent;
        }
        None
    }

    /// Reset every joint to the identity transform.
    pub fn reset_transforms(&mut self) {
        for joint in &mut self.joints {
            joint.transform = Affine3::identity();
            joint.moved = false;
        }
    }

    /// Rest-space position of every particle referenced by a bound joint,
    /// averaged over those joints. Unreferenced particles map to `None`.
    #[must_use]
    pub fn rest_positions(&self, particles: &[Particle]) -> Vec<Option<Vector3<f64>>> {
        let mut sums = vec![(Vector3::zeros(), 0u32); particles.len()];
        for joint in &self.joints {
            let Some(binding) = &joint.binding else {
                continue;
            };
            for &i in &binding.particles {
                if let (Some(p), Some(sum)) = (particles.get(i), sums.get_mut(i)) {
                    sum.0 += joint.transform.inverse_transform_point(&p.position);
                    sum.1 += 1;
                }
            }
        }
        sums.into_iter()
            .map(|(sum, n)| (n > 0).then(|| sum / f64::from(n)))
            .collect()
    }
}
