//! The player's party on the overworld.
//!
//! The player is a [`Character`] plus the companions travelling with it,
//! gold, and an optional travel destination. Overworld movement reuses the
//! same integration as NPC movement, at the character's dexterity-derived
//! travel speed.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wayfarer_common::{Position, WorldBounds};

use crate::character::Character;
use crate::movement::{sanitize_delta, step_toward, MoveStep};

/// Gold a new player starts with.
pub const STARTING_GOLD: u64 = 1000;

/// The player character and party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Player character
    pub character: Character,
    /// Companions, not including the player
    pub companions: Vec<Character>,
    /// Gold
    pub gold: u64,
    /// Where the party is travelling to
    pub destination: Option<Position>,
}

impl Player {
    /// Creates a player with no companions.
    #[must_use]
    pub fn new(character: Character) -> Self {
        Self {
            character,
            companions: Vec::new(),
            gold: STARTING_GOLD,
            destination: None,
        }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.character.position
    }

    /// Returns true while the player character is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.character.is_alive()
    }

    /// Sets a travel destination.
    pub fn travel_to(&mut self, destination: Position) {
        self.destination = Some(destination);
    }

    /// Advances travel toward the destination. Returns true on arrival.
    pub fn travel(&mut self, delta_time: f32, snap_threshold: f32, bounds: Option<WorldBounds>) -> bool {
        let Some(mut goal) = self.destination else {
            return false;
        };
        if let Some(bounds) = bounds {
            goal = bounds.clamp(goal);
        }
        let speed = self.character.movement_speed();
        let step = step_toward(
            &mut self.character.position,
            goal,
            speed,
            delta_time,
            snap_threshold,
        );
        if step == MoveStep::Arrived {
            debug!("{} arrived at ({:.1}, {:.1})", self.character.name, goal.x, goal.y);
            self.destination = None;
            return true;
        }
        false
    }

    /// Moves directly along `direction` for one tick, cancelling travel.
    pub fn nudge(&mut self, direction: Vec2, delta_time: f32, bounds: Option<WorldBounds>) {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return;
        }
        self.destination = None;
        let step = self.character.movement_speed() * sanitize_delta(delta_time);
        let mut next = self.character.position.offset(direction * step);
        if let Some(bounds) = bounds {
            next = bounds.clamp(next);
        }
        self.character.position = next;
    }

    /// Restores the player to full health in place, cancelling travel.
    pub fn revive(&mut self) {
        self.character.health = self.character.max_health;
        self.destination = None;
    }

    /// Adds a companion.
    pub fn add_companion(&mut self, companion: Character) {
        if self.companions.iter().any(|c| c.id == companion.id) {
            return;
        }
        self.companions.push(companion);
    }

    /// Adds or removes gold, never going below zero.
    pub fn add_gold(&mut self, amount: i64) {
        self.gold = if amount >= 0 {
            self.gold.saturating_add(amount.unsigned_abs())
        } else {
            self.gold.saturating_sub(amount.unsigned_abs())
        };
    }

    /// Returns whether the player can pay `cost`.
    #[must_use]
    pub fn can_afford(&self, cost: u64) -> bool {
        self.gold >= cost
    }

    /// Number of living party members, including the player.
    #[must_use]
    pub fn alive_members(&self) -> usize {
        usize::from(self.is_alive()) + self.companions.iter().filter(|c| c.is_alive()).count()
    }

    /// Rough fighting strength of the living party, for auto-battle estimates.
    ///
    /// Each member contributes `level + attributes / 10 + level × health / 2`.
    #[must_use]
    pub fn party_strength(&self) -> u32 {
        std::iter::once(&self.character)
            .chain(self.companions.iter())
            .filter(|c| c.is_alive())
            .map(member_strength)
            .sum()
    }
}

fn member_strength(member: &Character) -> u32 {
    let level = member.level as f32;
    let attributes = member.strength.max(0.0) + member.dexterity.max(0.0) + member.constitution.max(0.0);
    let health_bonus = (level * member.health_ratio() * 0.5).floor();
    (level + (attributes / 10.0).floor() + health_bonus) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(Character::new("Hero", Position::new(100.0, 100.0)))
    }

    #[test]
    fn test_travel_uses_dexterity_speed() {
        let mut p = player();
        // dex 10 -> 70 units/s
        p.travel_to(Position::new(240.0, 100.0));
        assert!(!p.travel(1.0, 1.0, None));
        assert!((p.position().x - 170.0).abs() < 1e-3);
        assert!(p.travel(1.0, 1.0, None));
        assert_eq!(p.position(), Position::new(240.0, 100.0));
        assert_eq!(p.destination, None);
        assert!(!p.travel(1.0, 1.0, None));
    }

    #[test]
    fn test_travel_clamped_to_bounds() {
        let mut p = player();
        let bounds = WorldBounds::new(200.0, 200.0);
        p.travel_to(Position::new(5000.0, 100.0));
        for _ in 0..10 {
            p.travel(1.0, 1.0, Some(bounds));
        }
        assert!(bounds.contains(p.position()));
    }

    #[test]
    fn test_nudge_cancels_travel() {
        let mut p = player();
        p.travel_to(Position::new(500.0, 500.0));
        p.nudge(Vec2::new(0.0, -3.0), 0.5, None);
        assert_eq!(p.destination, None);
        assert!((p.position().y - 65.0).abs() < 1e-3);
    }

    #[test]
    fn test_revive_restores_health() {
        let mut player = Player::new(Character::new("Hero", Position::new(0.0, 0.0)));
        player.travel_to(Position::new(50.0, 0.0));
        player.character.take_damage(1000.0);
        assert!(!player.is_alive());

        player.revive();
        assert!(player.is_alive());
        assert_eq!(player.character.health, player.character.max_health);
        assert!(player.destination.is_none());
    }

    #[test]
    fn test_gold_never_negative() {
        let mut p = player();
        p.add_gold(-5000);
        assert_eq!(p.gold, 0);
        p.add_gold(250);
        assert!(p.can_afford(250));
        assert!(!p.can_afford(251));
    }

    #[test]
    fn test_party_strength() {
        let mut p = player();
        // level 1, attrs 30 -> 1 + 3 + floor(0.5) = 4
        assert_eq!(p.party_strength(), 4);
        let mut hurt = Character::new("Squire", Position::ZERO);
        hurt.level = 4;
        hurt.health = hurt.max_health / 2.0;
        p.add_companion(hurt.clone());
        p.add_companion(hurt);
        assert_eq!(p.companions.len(), 1);
        // 4 + 3 + floor(4 * 0.5 * 0.5) = 8
        assert_eq!(p.party_strength(), 12);
        assert_eq!(p.alive_members(), 2);
    }
}
