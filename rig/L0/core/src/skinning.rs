//! Skinned mesh deformation from rig-driven joint transforms.
//!
//! Joint transforms produced by [`Skeleton::update_transforms`] map bind-pose
//! (model space) points to their simulated positions, so no inverse bind
//! matrix is needed here.
//!
//! # Linear Blend Skinning (LBS)
//!
//! ```text
//! v' = Σᵢ wᵢ · Tᵢ · v
//! ```
//!
//! # Dual Quaternion Skinning (DQS)
//!
//! ```text
//! dq  = Σᵢ wᵢ · DQ(Tᵢ)      (each term flipped into the first one's hemisphere)
//! v'  = normalize(dq) · v
//! ```
//!
//! DQS avoids the volume loss LBS shows around strongly twisted joints.
//!
//! [`Skeleton::update_transforms`]: crate::skeleton::Skeleton::update_transforms

use nalgebra::Vector3;
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rig_geom::DualQuat;

use crate::entity::EntityKind;
use crate::error::{Result, RigError};
use crate::skeleton::Skeleton;

/// Maximum number of joints influencing a vertex.
pub const MAX_JOINT_WEIGHTS: usize = 4;

/// Weight of a single joint's influence on a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointWeight {
    /// Index of the joint.
    pub joint: usize,
    /// Influence weight.
    pub weight: f64,
}

impl JointWeight {
    /// Create a new joint weight.
    #[must_use]
    pub const fn new(joint: usize, weight: f64) -> Self {
        Self { joint, weight }
    }
}

/// Joint weights of one vertex, at most [`MAX_JOINT_WEIGHTS`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexWeights {
    weights: SmallVec<[JointWeight; MAX_JOINT_WEIGHTS]>,
}

impl VertexWeights {
    /// Create empty vertex weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an influence. Once full, it replaces the smallest existing weight
    /// if it is larger; otherwise it is dropped.
    pub fn add(&mut self, joint: usize, weight: f64) {
        let w = JointWeight::new(joint, weight);
        if self.weights.len() < MAX_JOINT_WEIGHTS {
            self.weights.push(w);
            return;
        }
        let smallest = self
            .weights
            .iter_mut()
            .min_by(|a, b| a.weight.total_cmp(&b.weight));
        if let Some(slot) = smallest.filter(|s| weight > s.weight) {
            *slot = w;
        }
    }

    /// The stored influences.
    #[must_use]
    pub fn weights(&self) -> &[JointWeight] {
        &self.weights
    }

    /// Whether there are no influences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Scale weights to sum to one. Zero-sum weights are left untouched.
    pub fn normalize(&mut self) {
        let total: f64 = self.weights.iter().map(|w| w.weight).sum();
        if total.abs() > rig_geom::EPSILON {
            for w in &mut self.weights {
                w.weight /= total;
            }
        }
    }
}

impl FromIterator<(usize, f64)> for VertexWeights {
    fn from_iter<T: IntoIterator<Item = (usize, f64)>>(iter: T) -> Self {
        let mut weights = Self::new();
        for (joint, weight) in iter {
            weights.add(joint, weight);
        }
        weights
    }
}

/// Skinning algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SkinningMethod {
    /// Linear blend skinning.
    #[default]
    LinearBlend,
    /// Dual quaternion skinning.
    DualQuaternion,
}

/// A visual mesh deformed by the skeleton.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkinnedMesh {
    bind_vertices: Vec<Vector3<f64>>,
    weights: Vec<VertexWeights>,
}

impl SkinnedMesh {
    /// Create a mesh with unweighted vertices.
    #[must_use]
    pub fn new(bind_vertices: Vec<Vector3<f64>>) -> Self {
        let weights = vec![VertexWeights::new(); bind_vertices.len()];
        Self {
            bind_vertices,
            weights,
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.bind_vertices.len()
    }

    /// Bind-pose vertex positions.
    #[must_use]
    pub fn bind_vertices(&self) -> &[Vector3<f64>] {
        &self.bind_vertices
    }

    /// Weights of one vertex.
    #[must_use]
    pub fn vertex_weights(&self, vertex: usize) -> Option<&VertexWeights> {
        self.weights.get(vertex)
    }

    /// Replace the weights of one vertex (normalized).
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidRecord`] if the vertex does not exist.
    pub fn set_vertex_weights(&mut self, vertex: usize, weights: &[(usize, f64)]) -> Result<()> {
        let len = self.weights.len();
        let slot = self
            .weights
            .get_mut(vertex)
            .ok_or_else(|| RigError::invalid_record(format!("vertex {vertex} out of bounds (len {len})")))?;
        *slot = weights.iter().copied().collect();
        slot.normalize();
        Ok(())
    }

    /// Check that every referenced joint exists in `skeleton`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::IndexOutOfBounds`] for the first unknown joint.
    pub fn validate(&self, skeleton: &Skeleton) -> Result<()> {
        let len = skeleton.len();
        self.weights
            .iter()
            .flat_map(VertexWeights::weights)
            .find(|w| w.joint >= len)
            .map_or(Ok(()), |w| Err(RigError::out_of_bounds(EntityKind::Joint, w.joint, len)))
    }

    /// Deformed vertex positions for the skeleton's current transforms.
    /// Unweighted vertices keep their bind position; unknown joints are
    /// skipped.
    #[must_use]
    pub fn skin(&self, skeleton: &Skeleton, method: SkinningMethod) -> Vec<Vector3<f64>> {
        self.bind_vertices
            .iter()
            .zip(&self.weights)
            .map(|(v, weights)| match method {
                SkinningMethod::LinearBlend => Self::linear_blend(v, weights, skeleton),
                SkinningMethod::DualQuaternion => Self::dual_quaternion(v, weights, skeleton),
            })
            .collect()
    }

    fn linear_blend(v: &Vector3<f64>, weights: &VertexWeights, skeleton: &Skeleton) -> Vector3<f64> {
        let mut sum = Vector3::zeros();
        let mut total = 0.0;
        for w in weights.weights() {
            if let Some(joint) = skeleton.joint(w.joint) {
                sum += joint.transform().transform_point(v) * w.weight;
                total += w.weight;
            }
        }
        if total.abs() > rig_geom::EPSILON { sum } else { *v }
    }

    fn dual_quaternion(v: &Vector3<f64>, weights: &VertexWeights, skeleton: &Skeleton) -> Vector3<f64> {
        let mut blend: Option<DualQuat> = None;
        let mut pivot = DualQuat::identity();
        for w in weights.weights() {
            let Some(joint) = skeleton.joint(w.joint) else {
                continue;
            };
            let mut dq = DualQuat::from_affine(joint.transform());
            blend = Some(match blend {
                None => {
                    pivot = dq;
                    dq.scale(w.weight)
                }
                Some(acc) => {
                    dq.fix_antipodal(&pivot);
                    acc + dq.scale(w.weight)
                }
            });
        }
        blend.map_or(*v, |dq| dq.normalize().transform_point(v))
    }
}
