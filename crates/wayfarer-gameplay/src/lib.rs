//! # Wayfarer Gameplay
//!
//! Entity simulation for Project Wayfarer.
//!
//! This crate provides the entity layer and the systems that drive it:
//! - Characters, weapons, skills and NPC needs
//! - Point-mass movement integration
//! - NPC decision state machine
//! - Cooldown-gated combat resolution
//! - Encounter detection between the player and overworld NPCs
//! - Background dialogue generation with a polled mailbox
//! - Event bus for reporting to the host
//! - The update scheduler ([`Simulation`]) tying it all together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ai;
pub mod character;
pub mod combat;
pub mod config;
pub mod dialogue;
pub mod encounter;
pub mod events;
pub mod movement;
pub mod needs;
pub mod npc;
pub mod player;
pub mod scheduler;
pub mod skills;
pub mod weapon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ai::*;
    pub use crate::character::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::dialogue::*;
    pub use crate::encounter::*;
    pub use crate::events::*;
    pub use crate::movement::*;
    pub use crate::needs::*;
    pub use crate::npc::*;
    pub use crate::player::*;
    pub use crate::scheduler::*;
    pub use crate::skills::*;
    pub use crate::weapon::*;
}

pub use prelude::*;
