//! # Wayfarer World
//!
//! World management for Project Wayfarer.
//!
//! This crate handles:
//! - Overworld terrain field generation
//! - Battlefield generation with spawn safe zones
//! - Overworld settlements and location-entry lookups
//!
//! All generated terrain is immutable once built; the simulation only reads it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod battlefield;
pub mod settlement;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::battlefield::*;
    pub use crate::settlement::*;
    pub use crate::terrain::*;
}

pub use prelude::*;
