//! Cooldown-gated attack resolution.
//!
//! This module provides:
//! - Attack interval derivation from character, weapon, or dexterity
//! - The cooldown gate, reported separately from a combat miss
//! - Miss, block, critical and damage rolls
//! - Range checks against squared weapon reach
//!
//! Callers may invoke [`CombatResolver::resolve_attack`] every tick; the
//! resolver alone decides whether enough time has passed since the previous
//! attack. A gated attempt never rolls and never mutates the attacker.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::character::{sanitize_stat, Character};
use crate::skills::{SkillKind, SkillSet};
use crate::weapon::Weapon;

/// Reach of an unarmed attack.
pub const UNARMED_RANGE: f32 = 50.0;

/// Tunable combat constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Miss chance before dexterity modifiers
    pub base_miss_chance: f32,
    /// Upper bound on miss chance
    pub max_miss_chance: f32,
    /// Block chance before shield skill and weapon modifiers
    pub base_block_chance: f32,
    /// Block chance added at full shield skill
    pub shield_block_bonus: f32,
    /// Upper bound on block chance
    pub max_block_chance: f32,
    /// Critical chance before dexterity and weapon modifiers
    pub base_crit_chance: f32,
    /// Upper bound on critical chance
    pub max_crit_chance: f32,
    /// Damage multiplier on a critical hit
    pub crit_multiplier: f32,
    /// Fraction of base damage added at full weapon skill
    pub skill_damage_bonus: f32,
    /// Unarmed damage before the strength bonus
    pub unarmed_base_damage: f32,
    /// Unarmed reach
    pub unarmed_range: f32,
    /// Unarmed interval at zero dexterity, in seconds
    pub unarmed_base_interval: f64,
    /// Fastest possible unarmed interval, in seconds
    pub min_unarmed_interval: f64,
    /// Interval reduction per 100 dexterity
    pub dexterity_interval_factor: f64,
    /// Interval used when a weapon reports a non-positive rate
    pub default_weapon_interval: f64,
    /// Durability lost by a weapon per hit
    pub weapon_wear_per_hit: u32,
    /// Weapon skill experience gained per hit
    pub experience_per_hit: u32,
    /// Seed for combat rolls
    pub seed: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_miss_chance: 0.05,
            max_miss_chance: 0.5,
            base_block_chance: 0.05,
            shield_block_bonus: 0.2,
            max_block_chance: 0.5,
            base_crit_chance: 0.1,
            max_crit_chance: 0.5,
            crit_multiplier: 1.5,
            skill_damage_bonus: 0.3,
            unarmed_base_damage: 10.0,
            unarmed_range: UNARMED_RANGE,
            unarmed_base_interval: 1.0,
            min_unarmed_interval: 0.5,
            dexterity_interval_factor: 0.3,
            default_weapon_interval: 1.0,
            weapon_wear_per_hit: 1,
            experience_per_hit: 5,
            seed: 0x5EED,
        }
    }
}

impl CombatConfig {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        let unit = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        self.base_miss_chance = unit(self.base_miss_chance);
        self.max_miss_chance = unit(self.max_miss_chance);
        self.base_block_chance = unit(self.base_block_chance);
        self.shield_block_bonus = unit(self.shield_block_bonus);
        self.max_block_chance = unit(self.max_block_chance);
        self.base_crit_chance = unit(self.base_crit_chance);
        self.max_crit_chance = unit(self.max_crit_chance);
        if !self.crit_multiplier.is_finite() || self.crit_multiplier < 1.0 {
            self.crit_multiplier = 1.5;
        }
        if !self.unarmed_range.is_finite() || self.unarmed_range < 0.0 {
            self.unarmed_range = UNARMED_RANGE;
        }
        if !self.min_unarmed_interval.is_finite() || self.min_unarmed_interval < 0.0 {
            self.min_unarmed_interval = 0.5;
        }
        if !self.default_weapon_interval.is_finite() || self.default_weapon_interval < 0.0 {
            self.default_weapon_interval = 1.0;
        }
    }
}

/// Outcome of one call to [`CombatResolver::resolve_attack`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatResult {
    /// The cooldown gate passed and the attack was rolled
    pub attack_succeeded: bool,
    /// The attack connected and dealt damage
    pub hit: bool,
    /// Damage actually removed from the defender
    pub damage_dealt: f32,
    /// Critical hit
    pub was_critical: bool,
    /// Defender blocked the attack
    pub was_blocked: bool,
}

impl CombatResult {
    /// Result for an attempt rejected by the cooldown gate.
    #[must_use]
    pub const fn gated() -> Self {
        Self {
            attack_succeeded: false,
            hit: false,
            damage_dealt: 0.0,
            was_critical: false,
            was_blocked: false,
        }
    }

    /// True when the attack passed the gate but missed outright.
    #[must_use]
    pub const fn missed(&self) -> bool {
        self.attack_succeeded && !self.hit && !self.was_blocked
    }
}

/// Seconds required between two attacks by `attacker`.
///
/// Resolution order: the character's own interval override, then the
/// weapon's rate converted to an interval, then the unarmed dexterity
/// formula `max(min, base − dex/100 × factor)`.
#[must_use]
pub fn attack_interval(attacker: &Character, weapon: Option<&Weapon>, config: &CombatConfig) -> f64 {
    if let Some(interval) = attacker.attack_speed {
        if interval.is_finite() && interval >= 0.0 {
            return interval;
        }
        warn!(
            "{} has invalid attack interval {}, ignoring override",
            attacker.name, interval
        );
    }

    if let Some(weapon) = weapon {
        if weapon.attack_speed.is_finite() && weapon.attack_speed > 0.0 {
            return 1.0 / weapon.attack_speed;
        }
        return config.default_weapon_interval;
    }

    let dexterity = f64::from(sanitize_stat(attacker.dexterity).min(100.0));
    (config.unarmed_base_interval - dexterity / 100.0 * config.dexterity_interval_factor)
        .max(config.min_unarmed_interval)
}

/// Reach of `weapon`, or the unarmed reach.
#[must_use]
pub fn attack_range(weapon: Option<&Weapon>, config: &CombatConfig) -> f32 {
    weapon.map_or(config.unarmed_range, |w| w.range)
}

/// Rolls attacks and enforces attack cooldowns.
#[derive(Debug, Clone)]
pub struct CombatResolver {
    config: CombatConfig,
    rng: fastrand::Rng,
}

impl Default for CombatResolver {
    fn default() -> Self {
        Self::new(CombatConfig::default())
    }
}

impl CombatResolver {
    /// Creates a resolver seeded from `config.seed`.
    #[must_use]
    pub fn new(mut config: CombatConfig) -> Self {
        config.validate();
        let rng = fastrand::Rng::with_seed(config.seed);
        Self { config, rng }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Attempts an attack at `current_time`.
    ///
    /// Returns `attack_succeeded = false` without touching either character
    /// when the attacker is still cooling down or is attacking itself.
    pub fn resolve_attack(
        &mut self,
        attacker: &mut Character,
        defender: &mut Character,
        current_time: f64,
        weapon: Option<&Weapon>,
        skills: Option<&SkillSet>,
    ) -> CombatResult {
        if attacker.id == defender.id {
            warn!("{} tried to attack itself", attacker.name);
            return CombatResult::gated();
        }
        if !current_time.is_finite() {
            warn!("Ignoring attack at non-finite time {}", current_time);
            return CombatResult::gated();
        }

        let last = *attacker.last_attack_time.get_or_insert(0.0);
        let interval = attack_interval(attacker, weapon, &self.config);
        if current_time - last < interval {
            return CombatResult::gated();
        }
        attacker.last_attack_time = Some(current_time);

        let result = self.roll(attacker, defender, weapon, skills);
        debug!(
            "{} -> {}: hit={} blocked={} crit={} dmg={:.1}",
            attacker.name,
            defender.name,
            result.hit,
            result.was_blocked,
            result.was_critical,
            result.damage_dealt
        );
        result
    }

    /// Attacks with the attacker's equipped weapon and own skills, wearing
    /// the weapon and training its skill on a hit.
    pub fn resolve_equipped_attack(
        &mut self,
        attacker: &mut Character,
        defender: &mut Character,
        current_time: f64,
    ) -> CombatResult {
        let weapon = attacker.equipped_weapon.clone();
        let skills = attacker.skills.clone();
        let result =
            self.resolve_attack(attacker, defender, current_time, weapon.as_ref(), Some(&skills));

        if result.hit {
            if let Some(equipped) = attacker.equipped_weapon.as_mut() {
                equipped.wear(self.config.weapon_wear_per_hit);
                let skill = equipped.kind.skill();
                if attacker.skills.add_experience(skill, self.config.experience_per_hit) > 0 {
                    debug!("{} improved {:?}", attacker.name, skill);
                }
            }
        }
        result
    }

    /// Seconds until `attacker` may attack again. Never negative, never mutates.
    #[must_use]
    pub fn remaining_cooldown(
        &self,
        attacker: &Character,
        current_time: f64,
        weapon: Option<&Weapon>,
    ) -> f64 {
        let interval = attack_interval(attacker, weapon, &self.config);
        let elapsed = current_time - attacker.last_attack_time.unwrap_or(0.0);
        (interval - elapsed).max(0.0)
    }

    /// True when `defender` is within the reach of `weapon` (or unarmed reach).
    #[must_use]
    pub fn in_range(&self, attacker: &Character, defender: &Character, weapon: Option<&Weapon>) -> bool {
        let range = attack_range(weapon, &self.config);
        attacker.position.distance_sq(defender.position) <= range * range
    }

    fn roll(
        &mut self,
        attacker: &Character,
        defender: &mut Character,
        weapon: Option<&Weapon>,
        skills: Option<&SkillSet>,
    ) -> CombatResult {
        let cfg = &self.config;
        let atk_dex = sanitize_stat(attacker.dexterity);
        let def_dex = sanitize_stat(defender.dexterity);
        let mut result = CombatResult {
            attack_succeeded: true,
            ..CombatResult::default()
        };

        let miss_chance =
            (cfg.base_miss_chance - atk_dex / 200.0 + def_dex / 300.0).clamp(0.0, cfg.max_miss_chance);
        if self.rng.f32() < miss_chance {
            return result;
        }

        let shield = defender.skills.effectiveness(SkillKind::Shield) * cfg.shield_block_bonus;
        let weapon_block = defender.equipped_weapon.as_ref().map_or(0.0, |w| w.block_chance);
        let block_chance = (cfg.base_block_chance + shield + weapon_block).min(cfg.max_block_chance);
        if self.rng.f32() < block_chance {
            result.was_blocked = true;
            return result;
        }

        let strength = sanitize_stat(attacker.strength);
        let base = match weapon {
            Some(w) => {
                let spread = (w.damage_max - w.damage_min).max(0.0);
                w.effective_damage(w.damage_min + self.rng.f32() * spread)
            },
            None => cfg.unarmed_base_damage + strength / 2.0,
        };
        let stat_bonus = match weapon {
            Some(w) if w.kind.is_ranged() => atk_dex / 2.0,
            _ => strength / 2.0,
        };
        let skill_bonus = match (weapon, skills) {
            (Some(w), Some(set)) => base * set.effectiveness(w.kind.skill()) * cfg.skill_damage_bonus,
            _ => 0.0,
        };
        let mut damage = base + stat_bonus + skill_bonus;

        let weapon_crit = weapon.map_or(0.0, |w| w.crit_chance);
        let crit_chance = (cfg.base_crit_chance + atk_dex / 200.0 + weapon_crit).min(cfg.max_crit_chance);
        if self.rng.f32() < crit_chance {
            damage *= cfg.crit_multiplier;
            result.was_critical = true;
        }

        result.damage_dealt = defender.take_damage(damage);
        result.hit = result.damage_dealt > 0.0;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::{DamageKind, WeaponKind};
    use proptest::prelude::*;
    use wayfarer_common::Position;

    fn fighter(name: &str) -> Character {
        Character::new(name, Position::ZERO)
    }

    fn sword(rate: f64) -> Weapon {
        Weapon::new("sword", WeaponKind::Sword, DamageKind::Slash, (10.0, 10.0), rate, 60.0)
    }

    /// No misses, blocks or crits.
    fn certain_hits() -> CombatConfig {
        CombatConfig {
            base_miss_chance: 0.0,
            base_block_chance: 0.0,
            base_crit_chance: 0.0,
            max_crit_chance: 0.0,
            ..CombatConfig::default()
        }
    }

    #[test]
    fn test_interval_priority_prefers_character() {
        let attacker = fighter("a").with_attack_interval(0.7);
        let weapon = sword(1.2);
        let interval = attack_interval(&attacker, Some(&weapon), &CombatConfig::default());
        assert!((interval - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_weapon_rate_converted_to_interval() {
        let attacker = fighter("a");
        let weapon = sword(1.2);
        let interval = attack_interval(&attacker, Some(&weapon), &CombatConfig::default());
        assert!((interval - 1.0 / 1.2).abs() < 1e-6);
        assert!((interval - 0.8333).abs() < 1e-4);
    }

    #[test]
    fn test_non_positive_weapon_rate_uses_default() {
        let attacker = fighter("a");
        let interval = attack_interval(&attacker, Some(&sword(0.0)), &CombatConfig::default());
        assert!((interval - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dexterity_interval_bounds() {
        let cfg = CombatConfig::default();
        let mut attacker = fighter("a");
        attacker.dexterity = 0.0;
        assert!((attack_interval(&attacker, None, &cfg) - 1.0).abs() < 1e-12);
        attacker.dexterity = 1000.0;
        assert!((attack_interval(&attacker, None, &cfg) - 0.5).abs() < 1e-12);
        attacker.dexterity = -50.0;
        assert!((attack_interval(&attacker, None, &cfg) - 1.0).abs() < 1e-12);
        attacker.dexterity = f32::NAN;
        assert!((attack_interval(&attacker, None, &cfg) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dexterity_clamped_without_floor() {
        let cfg = CombatConfig {
            min_unarmed_interval: 0.0,
            ..CombatConfig::default()
        };
        let mut attacker = fighter("a");
        attacker.dexterity = 100.0;
        let at_cap = attack_interval(&attacker, None, &cfg);
        attacker.dexterity = 1000.0;
        assert!((attack_interval(&attacker, None, &cfg) - at_cap).abs() < 1e-12);
        assert!(at_cap > 0.0);
    }

    #[test]
    fn test_lazy_last_attack_time() {
        let mut resolver = CombatResolver::default();
        let mut a = fighter("a");
        let mut d = fighter("d");
        assert_eq!(a.last_attack_time, None);
        // Unarmed dex 10: interval 0.97, so t=0.5 is still gated.
        let result = resolver.resolve_attack(&mut a, &mut d, 0.5, None, None);
        assert!(!result.attack_succeeded);
        assert_eq!(a.last_attack_time, Some(0.0));
    }

    #[test]
    fn test_gated_attack_has_no_effect() {
        let mut resolver = CombatResolver::new(certain_hits());
        let mut a = fighter("a").with_attack_interval(1.0);
        let mut d = fighter("d");

        let first = resolver.resolve_attack(&mut a, &mut d, 5.0, None, None);
        assert!(first.attack_succeeded && first.hit);
        let health = d.health;

        let second = resolver.resolve_attack(&mut a, &mut d, 5.5, None, None);
        assert_eq!(second, CombatResult::gated());
        assert!((d.health - health).abs() < f32::EPSILON);
        assert_eq!(a.last_attack_time, Some(5.0));
    }

    #[test]
    fn test_self_attack_rejected() {
        let mut resolver = CombatResolver::default();
        let mut a = fighter("a");
        let mut clone = a.clone();
        let result = resolver.resolve_attack(&mut a, &mut clone, 100.0, None, None);
        assert!(!result.attack_succeeded);
        assert_eq!(a.last_attack_time, None);
    }

    #[test]
    fn test_unarmed_damage() {
        let mut resolver = CombatResolver::new(certain_hits());
        let mut a = fighter("a");
        let mut d = fighter("d");
        let result = resolver.resolve_attack(&mut a, &mut d, 10.0, None, None);
        // 10 base + 5 strength + 5 stat bonus
        assert!((result.damage_dealt - 20.0).abs() < 1e-4);
        assert!((d.health - 130.0).abs() < 1e-4);
    }

    #[test]
    fn test_critical_multiplier() {
        let mut resolver = CombatResolver::new(CombatConfig {
            base_crit_chance: 1.0,
            max_crit_chance: 1.0,
            ..certain_hits()
        });
        let mut a = fighter("a");
        let mut d = fighter("d");
        let result = resolver.resolve_attack(&mut a, &mut d, 10.0, None, None);
        assert!(result.was_critical);
        assert!((result.damage_dealt - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_block_prevents_damage() {
        let mut resolver = CombatResolver::new(CombatConfig {
            base_block_chance: 1.0,
            max_block_chance: 1.0,
            ..certain_hits()
        });
        let mut a = fighter("a");
        let mut d = fighter("d");
        let result = resolver.resolve_attack(&mut a, &mut d, 10.0, None, None);
        assert!(result.attack_succeeded && result.was_blocked && !result.hit);
        assert!((result.damage_dealt).abs() < f32::EPSILON);
        assert!((d.health - d.max_health).abs() < f32::EPSILON);
    }

    #[test]
    fn test_weapon_skill_and_ranged_bonus() {
        let mut resolver = CombatResolver::new(certain_hits());
        let bow = Weapon::new("bow", WeaponKind::Bow, DamageKind::Pierce, (20.0, 20.0), 1.0, 200.0);
        let skills = SkillSet::new().with_level(SkillKind::Archery, 100);
        let mut a = fighter("a").with_attributes(10.0, 30.0, 10.0);
        let mut d = fighter("d").with_attributes(10.0, 0.0, 100.0);
        let result = resolver.resolve_attack(&mut a, &mut d, 10.0, Some(&bow), Some(&skills));
        // 20 base + 15 dex bonus + 20 × 1.0 × 0.3 skill bonus
        assert!((result.damage_dealt - 41.0).abs() < 1e-3);
    }

    #[test]
    fn test_equipped_attack_wears_weapon() {
        let mut resolver = CombatResolver::new(certain_hits());
        let mut a = fighter("a").with_weapon(sword(2.0));
        let mut d = fighter("d");
        let result = resolver.resolve_equipped_attack(&mut a, &mut d, 1.0);
        assert!(result.hit);
        assert_eq!(a.equipped_weapon.as_ref().map(|w| w.durability), Some(99));
        assert_eq!(a.skills.get(SkillKind::OneHanded).experience, 5);
    }

    #[test]
    fn test_remaining_cooldown() {
        let mut resolver = CombatResolver::new(certain_hits());
        let mut a = fighter("a").with_attack_interval(2.0);
        let mut d = fighter("d");
        assert!((resolver.remaining_cooldown(&a, 0.5, None) - 1.5).abs() < 1e-9);
        resolver.resolve_attack(&mut a, &mut d, 3.0, None, None);
        assert!((resolver.remaining_cooldown(&a, 3.5, None) - 1.5).abs() < 1e-9);
        assert!((resolver.remaining_cooldown(&a, 10.0, None)).abs() < 1e-12);
        assert_eq!(a.last_attack_time, Some(3.0));
    }

    #[test]
    fn test_in_range_uses_weapon_reach() {
        let resolver = CombatResolver::default();
        let a = fighter("a");
        let mut d = fighter("d");
        d.position = Position::new(55.0, 0.0);
        assert!(!resolver.in_range(&a, &d, None));
        assert!(resolver.in_range(&a, &d, Some(&sword(1.0))));
        d.position = Position::new(50.0, 0.0);
        assert!(resolver.in_range(&a, &d, None));
    }

    proptest! {
        #[test]
        fn test_cooldown_gating(
            interval in 0.05f64..5.0,
            start in 0.0f64..1000.0,
            fraction in 0.0f64..0.999,
        ) {
            let mut resolver = CombatResolver::default();
            let mut a = fighter("a").with_attack_interval(interval);
            let mut d = fighter("d").with_attributes(10.0, 10.0, 1000.0);
            let t = start + interval;

            let first = resolver.resolve_attack(&mut a, &mut d, t, None, None);
            prop_assert!(first.attack_succeeded);
            prop_assert_eq!(a.last_attack_time, Some(t));

            let second = resolver.resolve_attack(&mut a, &mut d, t + interval * fraction, None, None);
            prop_assert!(!second.attack_succeeded);
            prop_assert_eq!(a.last_attack_time, Some(t));
        }

        #[test]
        fn test_cooldown_release(
            interval in 0.05f64..5.0,
            start in 0.0f64..1000.0,
            extra in 1.0e-6f64..10.0,
        ) {
            let mut resolver = CombatResolver::default();
            let mut a = fighter("a").with_attack_interval(interval);
            let mut d = fighter("d").with_attributes(10.0, 10.0, 1000.0);
            let t = start + interval;
            resolver.resolve_attack(&mut a, &mut d, t, None, None);

            let later = t + interval + extra;
            let second = resolver.resolve_attack(&mut a, &mut d, later, None, None);
            prop_assert!(second.attack_succeeded);
            prop_assert_eq!(a.last_attack_time, Some(later));
        }
    }
}
