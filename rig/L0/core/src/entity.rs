//! Typed references into the scene's stores.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of store an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityKind {
    /// Particle store.
    Particle,
    /// Frame store.
    Frame,
    /// Skeleton joints.
    Joint,
    /// Constraint set.
    Constraint,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Particle => "particle",
            Self::Frame => "frame",
            Self::Joint => "joint",
            Self::Constraint => "constraint",
        };
        f.write_str(name)
    }
}

/// An index tagged with the store it refers to.
///
/// Used for dependency queries (`uses`) and index maintenance (`remap`)
/// when entities are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Entity {
    /// A particle index.
    Particle(usize),
    /// A frame index.
    Frame(usize),
    /// A joint index.
    Joint(usize),
}

impl Entity {
    /// Store this entity lives in.
    #[must_use]
    pub const fn kind(self) -> EntityKind {
        match self {
            Self::Particle(_) => EntityKind::Particle,
            Self::Frame(_) => EntityKind::Frame,
            Self::Joint(_) => EntityKind::Joint,
        }
    }

    /// Raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Particle(i) | Self::Frame(i) | Self::Joint(i) => i,
        }
    }
}

/// Shift `index` down by one if it lies above a removed index.
#[inline]
pub(crate) fn remap_index(index: &mut usize, removed: usize) {
    if *index > removed {
        *index -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_accessors() {
        assert_eq!(Entity::Particle(3).kind(), EntityKind::Particle);
        assert_eq!(Entity::Frame(5).index(), 5);
        assert_eq!(EntityKind::Joint.to_string(), "joint");
    }

    #[test]
    fn test_remap_index() {
        let mut i = 4;
        remap_index(&mut i, 2);
        assert_eq!(i, 3);
        remap_index(&mut i, 3);
        assert_eq!(i, 3);
        remap_index(&mut i, 9);
        assert_eq!(i, 3);
    }
}
