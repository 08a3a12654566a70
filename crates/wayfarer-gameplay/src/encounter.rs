//! Proximity encounters between the player and overworld NPCs.
//!
//! The detector classifies the first NPC within the trigger radius:
//! aggressive factions raise a hostile encounter on every in-range tick,
//! peaceful ones raise a neutral encounter once per approach. The neutral
//! latch lives on the NPC and is cleared when the pair separates beyond the
//! trigger radius. The detector never switches scenes itself; it reports the
//! encounter together with battlefield parameters for the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wayfarer_common::{EntityId, Position};
use wayfarer_world::{BattlefieldConfig, SettlementId, SettlementMap};

use crate::npc::NpcRegistry;

/// Default player/NPC encounter radius.
pub const DEFAULT_TRIGGER_RADIUS: f32 = 20.0;

/// Default settlement entry radius.
pub const DEFAULT_LOCATION_ENTRY_RADIUS: f32 = 100.0;

/// Encounter classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncounterKind {
    /// Nothing in range
    #[default]
    None,
    /// Fight starts immediately
    Hostile,
    /// Player chooses how to respond
    Neutral,
}

/// Result of one detection pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Encounter {
    /// Classification
    pub kind: EncounterKind,
    /// The NPC involved
    pub other: Option<EntityId>,
    /// Battlefield parameters for a hostile encounter
    pub battlefield: Option<BattlefieldConfig>,
}

impl Encounter {
    /// No encounter.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// True when nothing was detected.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.kind == EncounterKind::None
    }
}

/// Encounter detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Player/NPC encounter radius
    pub trigger_radius: f32,
    /// Settlement entry radius
    pub location_entry_radius: f32,
    /// Seconds between combat end and teardown
    pub combat_end_delay: f64,
    /// Template for generated battlefields
    pub battlefield: BattlefieldConfig,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            trigger_radius: DEFAULT_TRIGGER_RADIUS,
            location_entry_radius: DEFAULT_LOCATION_ENTRY_RADIUS,
            combat_end_delay: 2.0,
            battlefield: BattlefieldConfig::default(),
        }
    }
}

impl EncounterConfig {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        if !self.trigger_radius.is_finite() || self.trigger_radius < 0.0 {
            self.trigger_radius = DEFAULT_TRIGGER_RADIUS;
        }
        if !self.location_entry_radius.is_finite() || self.location_entry_radius < 0.0 {
            self.location_entry_radius = DEFAULT_LOCATION_ENTRY_RADIUS;
        }
        if !self.combat_end_delay.is_finite() || self.combat_end_delay < 0.0 {
            self.combat_end_delay = 2.0;
        }
        self.battlefield.validate();
    }
}

/// Detects player encounters and settlement arrivals.
#[derive(Debug, Clone)]
pub struct EncounterDetector {
    config: EncounterConfig,
    trigger_radius_sq: f32,
    location_radius_sq: f32,
    battles_started: u64,
    current_location: Option<SettlementId>,
}

impl EncounterDetector {
    /// Creates a detector.
    #[must_use]
    pub fn new(mut config: EncounterConfig) -> Self {
        config.validate();
        let trigger_radius_sq = config.trigger_radius * config.trigger_radius;
        let location_radius_sq = config.location_entry_radius * config.location_entry_radius;
        Self {
            config,
            trigger_radius_sq,
            location_radius_sq,
            battles_started: 0,
            current_location: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EncounterConfig {
        &self.config
    }

    /// Returns the trigger radius.
    #[must_use]
    pub const fn trigger_radius(&self) -> f32 {
        self.config.trigger_radius
    }

    /// Changes the trigger radius. The squared threshold follows.
    pub fn set_trigger_radius(&mut self, radius: f32) {
        self.config.trigger_radius = radius;
        self.config.validate();
        self.trigger_radius_sq = self.config.trigger_radius * self.config.trigger_radius;
    }

    /// Settlement the player is currently inside, if any.
    #[must_use]
    pub const fn current_location(&self) -> Option<SettlementId> {
        self.current_location
    }

    /// Runs one detection pass. At most one encounter is reported.
    pub fn detect(&mut self, player: Position, npcs: &mut NpcRegistry) -> Encounter {
        let mut found: Option<(EncounterKind, EntityId)> = None;

        for npc in npcs.iter_mut() {
            let in_range = npc.position().distance_sq(player) <= self.trigger_radius_sq;
            let eligible = npc.is_alive() && npc.is_world_entity;
            if !eligible || !in_range {
                if npc.encounter_triggered {
                    debug!("{} left encounter range, latch cleared", npc.name());
                    npc.encounter_triggered = false;
                }
                continue;
            }
            if found.is_some() {
                continue;
            }

            if npc.faction().is_aggressive() {
                found = Some((EncounterKind::Hostile, npc.id()));
            } else if !npc.encounter_triggered {
                npc.encounter_triggered = true;
                found = Some((EncounterKind::Neutral, npc.id()));
            }
        }

        let Some((kind, other)) = found else {
            return Encounter::none();
        };

        let battlefield = (kind == EncounterKind::Hostile).then(|| {
            self.battles_started += 1;
            self.config
                .battlefield
                .clone()
                .with_seed(self.config.battlefield.seed.wrapping_add(self.battles_started))
        });
        info!("{:?} encounter with NPC {}", kind, other);

        Encounter {
            kind,
            other: Some(other),
            battlefield,
        }
    }

    /// Reports a settlement once when the player comes within the entry
    /// radius. Leaving the radius re-arms it.
    pub fn check_location(
        &mut self,
        player: Position,
        settlements: &SettlementMap,
    ) -> Option<SettlementId> {
        match settlements.nearest_within(player, self.location_radius_sq) {
            Some(settlement) => {
                if self.current_location == Some(settlement.id) {
                    return None;
                }
                self.current_location = Some(settlement.id);
                info!("Reached {}", settlement.name);
                Some(settlement.id)
            },
            None => {
                self.current_location = None;
                None
            },
        }
    }
}

// ============================================================================
// Combat sessions
// ============================================================================

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatOutcome {
    /// The player fell
    PlayerDefeated,
    /// The enemy fell
    EnemyDefeated,
}

/// A battle in progress, with the state needed to return to the overworld.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatSession {
    /// The opposing NPC
    pub enemy: EntityId,
    /// Player overworld position before the battle
    pub player_return: Position,
    /// Enemy overworld position before the battle
    pub enemy_return: Position,
    /// Seed of the battlefield in use
    pub battlefield_seed: u64,
    /// Simulation time at which the battle ended
    pub ended_at: Option<f64>,
    /// How the battle ended
    pub outcome: Option<CombatOutcome>,
}

impl CombatSession {
    /// Starts a session.
    #[must_use]
    pub fn new(enemy: EntityId, player_return: Position, enemy_return: Position, seed: u64) -> Self {
        Self {
            enemy,
            player_return,
            enemy_return,
            battlefield_seed: seed,
            ended_at: None,
            outcome: None,
        }
    }

    /// Records the end of the battle. Returns the outcome only the first time.
    pub fn check_end(
        &mut self,
        player_alive: bool,
        enemy_alive: bool,
        now: f64,
    ) -> Option<CombatOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        let outcome = if !player_alive {
            CombatOutcome::PlayerDefeated
        } else if !enemy_alive {
            CombatOutcome::EnemyDefeated
        } else {
            return None;
        };
        info!("Combat with NPC {} ended: {:?}", self.enemy, outcome);
        self.outcome = Some(outcome);
        self.ended_at = Some(now);
        Some(outcome)
    }

    /// True once the end-of-combat display delay has passed.
    #[must_use]
    pub fn ready_for_teardown(&self, now: f64, delay: f64) -> bool {
        self.ended_at.is_some_and(|ended| now - ended >= delay)
    }
}
