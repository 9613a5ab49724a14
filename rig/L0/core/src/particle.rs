//! Simulated particles.
//!
//! A particle carries its current and previous position (the difference is
//! its implicit velocity) plus a per-pass accumulator: constraints never
//! move particles directly, they add weighted proposals which the solver
//! averages at the end of each relaxation pass.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};

/// Number of position snapshot slots per particle.
pub const SNAPSHOT_SLOTS: usize = 3;

/// Smallest particle radius.
pub const MIN_RADIUS: f64 = 1.0;

bitflags::bitflags! {
    /// Per-particle state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ParticleFlags: u8 {
        /// Excluded from integration and from accumulator averaging.
        const PINNED = 0b0000_0001;
        /// Touched the ground during the last integration step.
        const GROUNDED = 0b0000_0010;
        /// Marks the rig's eye position.
        const EYE = 0b0000_0100;
    }
}

/// A simulated point mass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particle {
    /// Current position.
    pub position: Vector3<f64>,
    /// Position before the most recent integration step.
    pub previous: Vector3<f64>,
    /// Visual/pick radius, never below [`MIN_RADIUS`].
    radius: f64,
    /// State flags.
    pub flags: ParticleFlags,
    /// Offset from the drag target while being dragged.
    pub drag_offset: Option<Vector3<f64>>,
    /// Saved positions.
    pub snapshots: [Vector3<f64>; SNAPSHOT_SLOTS],
    /// Sum of weighted proposed positions for the current pass.
    #[cfg_attr(feature = "serde", serde(skip))]
    proposed: Vector3<f64>,
    /// Total weight of proposals for the current pass.
    #[cfg_attr(feature = "serde", serde(skip))]
    contributions: u32,
}

impl Particle {
    /// Create a particle at rest at `position`.
    #[must_use]
    pub fn new(position: Vector3<f64>, radius: f64) -> Self {
        Self {
            position,
            previous: position,
            radius: radius.max(MIN_RADIUS),
            flags: ParticleFlags::empty(),
            drag_offset: None,
            snapshots: [position; SNAPSHOT_SLOTS],
            proposed: Vector3::zeros(),
            contributions: 0,
        }
    }

    /// Radius.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Set the radius, clamped to [`MIN_RADIUS`].
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius.max(MIN_RADIUS);
    }

    /// Height above the ground plane below which the particle is in contact.
    #[must_use]
    pub fn contact_height(&self, contact_scale: f64) -> f64 {
        self.radius * contact_scale
    }

    /// Whether the particle is pinned.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.flags.contains(ParticleFlags::PINNED)
    }

    /// Pin or unpin the particle.
    pub fn set_pinned(&mut self, pinned: bool) {
        self.flags.set(ParticleFlags::PINNED, pinned);
    }

    /// Whether the particle touched the ground on the last step.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.flags.contains(ParticleFlags::GROUNDED)
    }

    /// Whether this particle is the eye marker.
    #[must_use]
    pub fn is_eye(&self) -> bool {
        self.flags.contains(ParticleFlags::EYE)
    }

    /// Whether the particle is under interactive manipulation.
    #[must_use]
    pub const fn is_dragged(&self) -> bool {
        self.drag_offset.is_some()
    }

    /// Whether relaxation may overwrite this particle's position.
    #[must_use]
    pub fn is_free(&self) -> bool {
        !self.is_pinned() && !self.is_dragged()
    }

    /// Implicit velocity (displacement over the last step).
    #[must_use]
    pub fn displacement(&self) -> Vector3<f64> {
        self.position - self.previous
    }

    /// Kill motion by forgetting the previous position.
    pub fn stop(&mut self) {
        self.previous = self.position;
    }

    /// Move to `position` at rest.
    pub fn teleport(&mut self, position: Vector3<f64>) {
        self.position = position;
        self.previous = position;
    }

    /// Save the current position into `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidSnapshotSlot`] if `slot >= SNAPSHOT_SLOTS`.
    pub fn save_snapshot(&mut self, slot: usize) -> Result<()> {
        let saved = self
            .snapshots
            .get_mut(slot)
            .ok_or(RigError::InvalidSnapshotSlot(slot))?;
        *saved = self.position;
        Ok(())
    }

    /// Restore the position saved in `slot`, at rest.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidSnapshotSlot`] if `slot >= SNAPSHOT_SLOTS`.
    pub fn load_snapshot(&mut self, slot: usize) -> Result<()> {
        let saved = *self
            .snapshots
            .get(slot)
            .ok_or(RigError::InvalidSnapshotSlot(slot))?;
        self.teleport(saved);
        Ok(())
    }

    /// Clear the accumulator before a relaxation pass.
    pub fn reset_accumulator(&mut self) {
        self.proposed = Vector3::zeros();
        self.contributions = 0;
    }

    /// Add a proposed position with the given weight.
    pub fn propose(&mut self, position: &Vector3<f64>, weight: u32) {
        self.proposed += position * f64::from(weight);
        self.contributions += weight;
    }

    /// Shift the accumulated sum without adding a contribution.
    pub fn shift_proposal(&mut self, delta: &Vector3<f64>) {
        self.proposed += delta;
    }

    /// Total weight proposed this pass.
    #[must_use]
    pub const fn contributions(&self) -> u32 {
        self.contributions
    }

    /// Weighted average of this pass's proposals, if any.
    #[must_use]
    pub fn resolved(&self) -> Option<Vector3<f64>> {
        (self.contributions > 0).then(|| self.proposed / f64::from(self.contributions))
    }
}
