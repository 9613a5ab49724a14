//! Error types for rig editing and simulation.

use thiserror::Error;

use crate::entity::EntityKind;

/// Errors that can occur while editing or simulating a rig.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RigError {
    /// Invalid solver configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// An index does not refer to an existing entity.
    #[error("{kind} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Kind of entity the index refers to.
        kind: EntityKind,
        /// The offending index.
        index: usize,
        /// Number of entities of that kind.
        len: usize,
    },

    /// Position snapshot slot outside `0..SNAPSHOT_SLOTS`.
    #[error("invalid snapshot slot {0}")]
    InvalidSnapshotSlot(usize),

    /// A frame would reference the same particle more than once.
    #[error("degenerate frame: particles {0:?} are not distinct")]
    DegenerateFrame([usize; 3]),

    /// A persisted record could not be parsed.
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// Description of what is wrong with the record.
        reason: String,
    },
}

impl RigError {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an index out of bounds error.
    #[must_use]
    pub const fn out_of_bounds(kind: EntityKind, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { kind, index, len }
    }

    /// Create an invalid record error.
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }

    /// Whether this error was caused by a bad index.
    #[must_use]
    pub const fn is_index_error(&self) -> bool {
        matches!(self, Self::IndexOutOfBounds { .. })
    }
}

/// Result type for rig operations.
pub type Result<T> = std::result::Result<T, RigError>;
