//! # Wayfarer Common
//!
//! Common types, utilities, and shared abstractions for Project Wayfarer.
//!
//! This crate provides foundational types used across all Wayfarer subsystems:
//! - Spatial primitives (positions, distances, directions, world bounds)
//! - ID types (EntityId)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

/// Re-exported so downstream crates share one vector type.
pub use glam::Vec2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.0, 2.0);
        assert_eq!(direction_normalized(a, b), Vec2::new(0.0, 1.0));
        assert!(EntityId::new().is_valid());
    }
}
