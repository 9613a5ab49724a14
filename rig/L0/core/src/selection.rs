//! Sets of selected entities that editing operations act on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Ordered selection of particles, frames and joints.
///
/// Order matters for some operations (the first two particles define an
/// axis, the first frame is the one a joint is bound to), so indices are kept
/// in insertion order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Selection {
    /// Selected particle indices.
    pub particles: Vec<usize>,
    /// Selected frame indices.
    pub frames: Vec<usize>,
    /// Selected joint indices.
    pub joints: Vec<usize>,
}

impl Selection {
    /// An empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection of the given particles.
    #[must_use]
    pub fn of_particles(particles: impl IntoIterator<Item = usize>) -> Self {
        let mut s = Self::new();
        s.extend(particles.into_iter().map(Entity::Particle));
        s
    }

    /// Selection of the given frames.
    #[must_use]
    pub fn of_frames(frames: impl IntoIterator<Item = usize>) -> Self {
        let mut s = Self::new();
        s.extend(frames.into_iter().map(Entity::Frame));
        s
    }

    /// Add frames to the selection.
    #[must_use]
    pub fn with_frames(mut self, frames: impl IntoIterator<Item = usize>) -> Self {
        self.extend(frames.into_iter().map(Entity::Frame));
        self
    }

    /// Add joints to the selection.
    #[must_use]
    pub fn with_joints(mut self, joints: impl IntoIterator<Item = usize>) -> Self {
        self.extend(joints.into_iter().map(Entity::Joint));
        self
    }

    fn list_mut(&mut self, entity: Entity) -> &mut Vec<usize> {
        match entity {
            Entity::Particle(_) => &mut self.particles,
            Entity::Frame(_) => &mut self.frames,
            Entity::Joint(_) => &mut self.joints,
        }
    }

    /// Add an entity; returns `false` if it was already selected.
    pub fn select(&mut self, entity: Entity) -> bool {
        let list = self.list_mut(entity);
        if list.contains(&entity.index()) {
            return false;
        }
        list.push(entity.index());
        true
    }

    /// Remove an entity; returns `false` if it was not selected.
    pub fn deselect(&mut self, entity: Entity) -> bool {
        let list = self.list_mut(entity);
        let before = list.len();
        list.retain(|&i| i != entity.index());
        list.len() != before
    }

    /// Whether `entity` is selected.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        match entity {
            Entity::Particle(i) => self.particles.contains(&i),
            Entity::Frame(i) => self.frames.contains(&i),
            Entity::Joint(i) => self.joints.contains(&i),
        }
    }

    /// Total number of selected entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len() + self.frames.len() + self.joints.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.frames.clear();
        self.joints.clear();
    }

    /// All selected entities: particles, then frames, then joints.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        let particles = self.particles.iter().map(|&i| Entity::Particle(i));
        let frames = self.frames.iter().map(|&i| Entity::Frame(i));
        let joints = self.joints.iter().map(|&i| Entity::Joint(i));
        particles.chain(frames).chain(joints)
    }
}

impl Extend<Entity> for Selection {
    fn extend<T: IntoIterator<Item = Entity>>(&mut self, iter: T) {
        for entity in iter {
            self.select(entity);
        }
    }
}

impl FromIterator<Entity> for Selection {
    fn from_iter<T: IntoIterator<Item = Entity>>(iter: T) -> Self {
        let mut s = Self::new();
        s.extend(iter);
        s
    }
}
