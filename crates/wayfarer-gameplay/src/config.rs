//! Simulation configuration.
//!
//! Every section deserializes with defaults for missing fields, so a
//! partial TOML or JSON document is enough.

use serde::{Deserialize, Serialize};
use wayfarer_world::TerrainConfig;

use crate::ai::AiConfig;
use crate::combat::CombatConfig;
use crate::encounter::EncounterConfig;

/// Overworld generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Terrain generator settings
    pub terrain: TerrainConfig,
    /// Settlements scattered over the overworld
    pub settlement_count: usize,
    /// Minimum distance of settlements from the world edge
    pub settlement_margin: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            settlement_count: 6,
            settlement_margin: 150.0,
        }
    }
}

impl WorldSettings {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.terrain.validate();
        if !self.settlement_margin.is_finite() || self.settlement_margin < 0.0 {
            self.settlement_margin = 0.0;
        }
    }
}

/// Configuration for a [`crate::Simulation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Overworld
    pub world: WorldSettings,
    /// NPC decision making
    pub ai: AiConfig,
    /// Attack resolution
    pub combat: CombatConfig,
    /// Encounter detection
    pub encounter: EncounterConfig,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world: WorldSettings::default(),
            ai: AiConfig::default(),
            combat: CombatConfig::default(),
            encounter: EncounterConfig::default(),
            event_capacity: 4096,
        }
    }
}

impl SimConfig {
    /// Clamps every section into usable ranges.
    pub fn validate(&mut self) {
        self.world.validate();
        self.ai.validate();
        self.combat.validate();
        self.encounter.validate();
        self.event_capacity = self.event_capacity.max(16);
    }

    /// Reseeds every random source from one seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.world.terrain.seed = seed;
        self.ai.seed = seed.wrapping_add(1);
        self.combat.seed = seed.wrapping_add(2);
        self.encounter.battlefield.seed = seed.wrapping_add(3);
        self
    }
}
