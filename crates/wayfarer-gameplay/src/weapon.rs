//! Weapons and the stock weapon catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::skills::SkillKind;

/// Weapon family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    /// One-handed sword
    Sword,
    /// Axe
    Axe,
    /// Mace
    Mace,
    /// Spear
    Spear,
    /// Bow
    Bow,
    /// Crossbow
    Crossbow,
    /// Dagger
    Dagger,
    /// Two-handed sword
    Greatsword,
}

impl WeaponKind {
    /// True for weapons that use dexterity for their damage bonus.
    #[must_use]
    pub const fn is_ranged(self) -> bool {
        matches!(self, Self::Bow | Self::Crossbow)
    }

    /// Skill trained by and boosting this weapon.
    #[must_use]
    pub const fn skill(self) -> SkillKind {
        match self {
            Self::Sword | Self::Axe | Self::Mace | Self::Dagger => SkillKind::OneHanded,
            Self::Greatsword => SkillKind::TwoHanded,
            Self::Spear => SkillKind::Polearm,
            Self::Bow | Self::Crossbow => SkillKind::Archery,
        }
    }
}

/// Kind of damage dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageKind {
    /// Edged
    Slash,
    /// Pointed
    Pierce,
    /// Crushing
    Blunt,
}

/// A weapon instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Catalog identifier
    pub id: String,
    /// Weapon family
    pub kind: WeaponKind,
    /// Damage kind
    pub damage_kind: DamageKind,
    /// Minimum base damage
    pub damage_min: f32,
    /// Maximum base damage
    pub damage_max: f32,
    /// Attacks per second
    pub attack_speed: f64,
    /// Reach in world units
    pub range: f32,
    /// Added to the wielder's critical chance
    pub crit_chance: f32,
    /// Added to the wielder's block chance when defending
    pub block_chance: f32,
    /// Current durability
    pub durability: u32,
    /// Durability when new
    pub max_durability: u32,
}

impl Weapon {
    /// Creates a new weapon at full durability.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: WeaponKind,
        damage_kind: DamageKind,
        damage: (f32, f32),
        attack_speed: f64,
        range: f32,
    ) -> Self {
        let (min, max) = if damage.0 <= damage.1 {
            damage
        } else {
            (damage.1, damage.0)
        };
        Self {
            id: id.into(),
            kind,
            damage_kind,
            damage_min: min,
            damage_max: max,
            attack_speed,
            range,
            crit_chance: 0.0,
            block_chance: 0.0,
            durability: 100,
            max_durability: 100,
        }
    }

    /// Sets the critical and block modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, crit_chance: f32, block_chance: f32) -> Self {
        self.crit_chance = crit_chance;
        self.block_chance = block_chance;
        self
    }

    /// Durability as a fraction of max.
    #[must_use]
    pub fn durability_ratio(&self) -> f32 {
        if self.max_durability == 0 {
            return 0.0;
        }
        self.durability as f32 / self.max_durability as f32
    }

    /// Scales a rolled base damage by wear: `× (0.5 + 0.5 × ratio)`.
    #[must_use]
    pub fn effective_damage(&self, rolled: f32) -> f32 {
        rolled * (0.5 + 0.5 * self.durability_ratio())
    }

    /// Wears the weapon by `amount` points.
    pub fn wear(&mut self, amount: u32) {
        self.durability = self.durability.saturating_sub(amount);
    }

    /// Restores durability up to max.
    pub fn repair(&mut self, amount: u32) {
        self.durability = (self.durability + amount).min(self.max_durability);
    }

    /// Returns true once durability reaches zero.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.durability == 0
    }
}

/// Lookup table of weapon templates by identifier.
#[derive(Debug, Clone, Default)]
pub struct WeaponCatalog {
    weapons: HashMap<String, Weapon>,
}

impl WeaponCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog with the stock weapons.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register(
            Weapon::new("iron_sword", WeaponKind::Sword, DamageKind::Slash, (13.0, 17.0), 1.2, 60.0)
                .with_modifiers(0.0, 0.05),
        );
        catalog.register(
            Weapon::new("longbow", WeaponKind::Bow, DamageKind::Pierce, (17.0, 23.0), 0.8, 200.0)
                .with_modifiers(0.05, 0.0),
        );
        catalog.register(Weapon::new(
            "spear",
            WeaponKind::Spear,
            DamageKind::Pierce,
            (15.0, 21.0),
            1.0,
            120.0,
        ));
        catalog.register(Weapon::new(
            "axe",
            WeaponKind::Axe,
            DamageKind::Slash,
            (19.0, 25.0),
            0.9,
            55.0,
        ));
        catalog.register(
            Weapon::new("dagger", WeaponKind::Dagger, DamageKind::Pierce, (10.0, 14.0), 1.5, 40.0)
                .with_modifiers(0.1, 0.0),
        );
        catalog
    }

    /// Adds or replaces a template.
    pub fn register(&mut self, weapon: Weapon) {
        self.weapons.insert(weapon.id.clone(), weapon);
    }

    /// Returns a fresh copy of the template with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Weapon> {
        self.weapons.get(id).cloned()
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    /// True when the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Sorted template identifiers.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.weapons.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_defaults() {
        let catalog = WeaponCatalog::with_defaults();
        assert_eq!(catalog.len(), 5);
        let sword = catalog.get("iron_sword").expect("sword exists");
        assert!((sword.attack_speed - 1.2).abs() < f64::EPSILON);
        assert!((sword.range - 60.0).abs() < f32::EPSILON);
        assert!(catalog.get("laser").is_none());
    }

    #[test]
    fn test_catalog_returns_copies() {
        let catalog = WeaponCatalog::with_defaults();
        let mut a = catalog.get("axe").expect("axe exists");
        a.wear(40);
        let b = catalog.get("axe").expect("axe exists");
        assert_eq!(b.durability, 100);
    }

    #[test]
    fn test_durability_scaling() {
        let mut w = Weapon::new("w", WeaponKind::Mace, DamageKind::Blunt, (10.0, 10.0), 1.0, 50.0);
        assert!((w.effective_damage(20.0) - 20.0).abs() < f32::EPSILON);
        w.wear(100);
        assert!(w.is_broken());
        assert!((w.effective_damage(20.0) - 10.0).abs() < f32::EPSILON);
        w.repair(1000);
        assert_eq!(w.durability, 100);
    }

    #[test]
    fn test_skill_mapping() {
        assert_eq!(WeaponKind::Dagger.skill(), SkillKind::OneHanded);
        assert_eq!(WeaponKind::Greatsword.skill(), SkillKind::TwoHanded);
        assert_eq!(WeaponKind::Crossbow.skill(), SkillKind::Archery);
        assert!(WeaponKind::Bow.is_ranged());
        assert!(!WeaponKind::Spear.is_ranged());
    }

    #[test]
    fn test_swapped_damage_range_normalized() {
        let w = Weapon::new("w", WeaponKind::Sword, DamageKind::Slash, (9.0, 3.0), 1.0, 50.0);
        assert!(w.damage_min <= w.damage_max);
    }
}
