//! Error types for Project Wayfarer.
//!
//! Most bad input in the simulation is recovered locally (clamped, defaulted,
//! or ignored with a log line). The variants here cover the conditions that
//! cannot be recovered: the entity registry no longer describes a valid world.

use thiserror::Error;

use crate::ids::EntityId;

/// Top-level error type for Wayfarer operations.
#[derive(Debug, Error)]
pub enum WayfarerError {
    /// Entity registry invariant violated
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Entity registry invariant violations.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// Referenced entity does not exist
    #[error("Entity {0} not found")]
    MissingEntity(EntityId),

    /// Entity position is NaN or infinite
    #[error("Entity {id} has a non-finite position ({x}, {y})")]
    InvalidPosition {
        /// Offending entity
        id: EntityId,
        /// X coordinate
        x: f32,
        /// Y coordinate
        y: f32,
    },

    /// Entity already registered
    #[error("Entity {0} already exists")]
    Duplicate(EntityId),
}

/// Result type alias for Wayfarer operations.
pub type WayfarerResult<T> = Result<T, WayfarerError>;
