//! Trainable skills.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest reachable skill level.
pub const MAX_SKILL_LEVEL: u32 = 100;

/// Skill categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillKind {
    /// Swords, axes, maces, daggers
    OneHanded,
    /// Greatswords
    TwoHanded,
    /// Bows and crossbows
    Archery,
    /// Spears
    Polearm,
    /// Mounted movement and combat
    Riding,
    /// Blocking
    Shield,
    /// Buying and selling
    Trading,
    /// Party size and morale
    Leadership,
    /// Siege and construction
    Engineering,
    /// Healing
    Medicine,
    /// Making items
    Crafting,
}

impl SkillKind {
    /// All skill kinds.
    pub const ALL: [Self; 11] = [
        Self::OneHanded,
        Self::TwoHanded,
        Self::Archery,
        Self::Polearm,
        Self::Riding,
        Self::Shield,
        Self::Trading,
        Self::Leadership,
        Self::Engineering,
        Self::Medicine,
        Self::Crafting,
    ];
}

/// Level and experience of one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Skill {
    /// Level 0-100
    pub level: u32,
    /// Experience toward the next level
    pub experience: u32,
}

impl Skill {
    /// Experience needed to go from `level` to `level + 1`.
    #[must_use]
    pub const fn required_experience(level: u32) -> u32 {
        (level + 1) * 100
    }

    /// Adds experience, levelling up as many times as it covers.
    /// Returns the number of levels gained.
    pub fn add_experience(&mut self, amount: u32) -> u32 {
        let start = self.level;
        self.experience = self.experience.saturating_add(amount);
        while self.level < MAX_SKILL_LEVEL {
            let required = Self::required_experience(self.level);
            if self.experience < required {
                break;
            }
            self.experience -= required;
            self.level += 1;
        }
        self.level - start
    }

    /// Effectiveness in `[0, 1]`.
    #[must_use]
    pub fn effectiveness(&self) -> f32 {
        self.level.min(MAX_SKILL_LEVEL) as f32 / MAX_SKILL_LEVEL as f32
    }
}

/// All skills of one character. Missing skills read as level 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSet {
    skills: BTreeMap<SkillKind, Skill>,
}

impl SkillSet {
    /// Creates an empty skill set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a skill level directly.
    #[must_use]
    pub fn with_level(mut self, kind: SkillKind, level: u32) -> Self {
        self.skills.insert(
            kind,
            Skill {
                level: level.min(MAX_SKILL_LEVEL),
                experience: 0,
            },
        );
        self
    }

    /// Returns a skill.
    #[must_use]
    pub fn get(&self, kind: SkillKind) -> Skill {
        self.skills.get(&kind).copied().unwrap_or_default()
    }

    /// Effectiveness of a skill.
    #[must_use]
    pub fn effectiveness(&self, kind: SkillKind) -> f32 {
        self.get(kind).effectiveness()
    }

    /// Adds experience to a skill and returns levels gained.
    pub fn add_experience(&mut self, kind: SkillKind, amount: u32) -> u32 {
        self.skills.entry(kind).or_default().add_experience(amount)
    }

    /// Sum of all skill levels.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.skills.values().map(|s| s.level).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_up_thresholds() {
        let mut skill = Skill::default();
        assert_eq!(skill.add_experience(99), 0);
        assert_eq!(skill.add_experience(1), 1);
        assert_eq!(skill.level, 1);
        // 200 for level 1 -> 2, 300 for level 2 -> 3
        assert_eq!(skill.add_experience(550), 2);
        assert_eq!(skill.level, 3);
        assert_eq!(skill.experience, 50);
    }

    #[test]
    fn test_level_caps() {
        let mut skill = Skill::default();
        skill.add_experience(u32::MAX);
        assert_eq!(skill.level, MAX_SKILL_LEVEL);
        assert!((skill.effectiveness() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_skill_set_defaults_to_zero() {
        let set = SkillSet::new().with_level(SkillKind::Shield, 50);
        assert!((set.effectiveness(SkillKind::Shield) - 0.5).abs() < f32::EPSILON);
        assert_eq!(set.get(SkillKind::Archery).level, 0);
        assert_eq!(set.total_points(), 50);
    }
}
