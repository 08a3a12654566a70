//! Character stats shared by the player and NPCs.
//!
//! A [`Character`] holds only what combat and movement need. NPC-only state
//! (AI, needs, encounter latch) lives in [`crate::npc::Npc`], which embeds a
//! character by composition.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use wayfarer_common::{EntityId, Position};

use crate::skills::SkillSet;
use crate::weapon::Weapon;

/// Base movement speed before dexterity is applied.
pub const BASE_MOVE_SPEED: f32 = 50.0;

/// Allegiance of a character relative to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Indifferent; can be talked to
    #[default]
    Neutral,
    /// Attacks on sight
    Hostile,
    /// Outlaws; attack on sight
    Bandit,
    /// Friendly to the player
    Allied,
}

impl Faction {
    /// Parses a faction name, accepting the legacy aliases `enemy` and
    /// `alliance`. Unknown names fall back to [`Faction::Neutral`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "neutral" => Self::Neutral,
            "hostile" | "enemy" => Self::Hostile,
            "bandit" | "bandits" => Self::Bandit,
            "allied" | "alliance" | "ally" => Self::Allied,
            other => {
                warn!("Unknown faction '{}', treating as neutral", other);
                Self::Neutral
            },
        }
    }

    /// True for factions that start combat on contact.
    #[must_use]
    pub const fn is_aggressive(self) -> bool {
        matches!(self, Self::Hostile | Self::Bandit)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Hostile => "hostile",
            Self::Bandit => "bandit",
            Self::Allied => "allied",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Faction {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

/// A combatant: player, companion, or NPC body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Unique id
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// World position
    pub position: Position,
    /// Current health
    pub health: f32,
    /// Maximum health
    pub max_health: f32,
    /// Melee damage bonus
    pub strength: f32,
    /// Attack rate, hit, dodge and crit bonus
    pub dexterity: f32,
    /// Health pool
    pub constitution: f32,
    /// Character level
    pub level: u32,
    /// Allegiance; `None` resolves to neutral
    pub faction: Option<Faction>,
    /// Equipped weapon, owned so durability is per wielder
    pub equipped_weapon: Option<Weapon>,
    /// Attack interval override in seconds per attack
    pub attack_speed: Option<f64>,
    /// Time of the last attack that passed the cooldown gate
    pub last_attack_time: Option<f64>,
    /// Trained skills
    pub skills: SkillSet,
}

impl Character {
    /// Creates a character with all attributes at 10.
    #[must_use]
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        let mut character = Self {
            id: EntityId::new(),
            name: name.into(),
            position,
            health: 0.0,
            max_health: 0.0,
            strength: 10.0,
            dexterity: 10.0,
            constitution: 10.0,
            level: 1,
            faction: None,
            equipped_weapon: None,
            attack_speed: None,
            last_attack_time: None,
            skills: SkillSet::new(),
        };
        character.recompute_max_health();
        character.health = character.max_health;
        character
    }

    /// Sets strength, dexterity and constitution, refilling health.
    #[must_use]
    pub fn with_attributes(mut self, strength: f32, dexterity: f32, constitution: f32) -> Self {
        self.strength = strength;
        self.dexterity = dexterity;
        self.constitution = constitution;
        self.recompute_max_health();
        self.health = self.max_health;
        self
    }

    /// Sets the faction.
    #[must_use]
    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.faction = Some(faction);
        self
    }

    /// Equips a weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.equipped_weapon = Some(weapon);
        self
    }

    /// Sets the attack interval override in seconds per attack.
    #[must_use]
    pub fn with_attack_interval(mut self, seconds: f64) -> Self {
        self.attack_speed = Some(seconds);
        self
    }

    /// Sets the skill set.
    #[must_use]
    pub fn with_skills(mut self, skills: SkillSet) -> Self {
        self.skills = skills;
        self
    }

    /// Resolved faction.
    #[must_use]
    pub fn faction(&self) -> Faction {
        self.faction.unwrap_or_default()
    }

    /// Recomputes `max_health = 100 + 5 × constitution`.
    pub fn recompute_max_health(&mut self) {
        self.max_health = 100.0 + sanitize_stat(self.constitution) * 5.0;
        self.health = self.health.min(self.max_health);
    }

    /// Travel speed derived from dexterity.
    #[must_use]
    pub fn movement_speed(&self) -> f32 {
        BASE_MOVE_SPEED + sanitize_stat(self.dexterity) * 2.0
    }

    /// Returns true while health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Health as a fraction of max health.
    #[must_use]
    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Applies damage and returns the amount actually taken.
    ///
    /// Any positive hit removes at least one point. Dead characters take
    /// nothing.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if !self.is_alive() || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let actual = amount.max(1.0).min(self.health);
        self.health -= actual;
        if self.health <= 0.0 {
            self.health = 0.0;
        }
        actual
    }

    /// Restores health up to max.
    pub fn heal(&mut self, amount: f32) {
        if self.is_alive() && amount.is_finite() && amount > 0.0 {
            self.health = (self.health + amount).min(self.max_health);
        }
    }
}

/// Replaces negative or non-finite attribute values with zero.
#[must_use]
pub fn sanitize_stat(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_parse_aliases() {
        assert_eq!(Faction::parse("enemy"), Faction::Hostile);
        assert_eq!(Faction::parse("Alliance"), Faction::Allied);
        assert_eq!(Faction::parse("bandit"), Faction::Bandit);
        assert_eq!(Faction::parse("pirates"), Faction::Neutral);
    }

    #[test]
    fn test_missing_faction_is_neutral() {
        let c = Character::new("Nobody", Position::ZERO);
        assert_eq!(c.faction, None);
        assert_eq!(c.faction(), Faction::Neutral);
    }

    #[test]
    fn test_derived_stats() {
        let c = Character::new("Hero", Position::ZERO).with_attributes(12.0, 15.0, 20.0);
        assert!((c.max_health - 200.0).abs() < f32::EPSILON);
        assert!((c.health - 200.0).abs() < f32::EPSILON);
        assert!((c.movement_speed() - 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_take_damage_minimum_and_death() {
        let mut c = Character::new("Target", Position::ZERO);
        assert!((c.take_damage(0.3) - 1.0).abs() < f32::EPSILON);
        assert!((c.take_damage(0.0)).abs() < f32::EPSILON);

        let dealt = c.take_damage(10_000.0);
        assert!((dealt - 149.0).abs() < f32::EPSILON);
        assert!(!c.is_alive());
        assert!((c.take_damage(5.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut c = Character::new("Target", Position::ZERO);
        c.take_damage(50.0);
        c.heal(500.0);
        assert!((c.health - c.max_health).abs() < f32::EPSILON);
    }

    #[test]
    fn test_faction_serde_lowercase() {
        let json = serde_json::to_string(&Faction::Bandit).expect("serialize");
        assert_eq!(json, "\"bandit\"");
    }
}
