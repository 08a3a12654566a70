//! NPC needs (food, rest, entertainment, safety) and the mood they drive.

use serde::{Deserialize, Serialize};

/// Which need an NPC is tending to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedKind {
    /// Hunger
    Food,
    /// Fatigue
    Rest,
    /// Boredom
    Entertainment,
    /// Sense of security
    Safety,
}

impl NeedKind {
    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Rest => "rest",
            Self::Entertainment => "entertainment",
            Self::Safety => "safety",
        }
    }
}

/// Status of a need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedStatus {
    /// Full (80-100%)
    Full,
    /// Satisfied (50-79%)
    Satisfied,
    /// Low (20-49%)
    Low,
    /// Critical (1-19%)
    Critical,
    /// Depleted (0%)
    Depleted,
}

impl NeedStatus {
    /// Returns status from percentage (0.0-1.0).
    #[must_use]
    pub fn from_percentage(pct: f32) -> Self {
        match pct {
            p if p <= 0.0 => Self::Depleted,
            p if p < 0.2 => Self::Critical,
            p if p < 0.5 => Self::Low,
            p if p < 0.8 => Self::Satisfied,
            _ => Self::Full,
        }
    }
}

/// A single need on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Need {
    /// Current value (0.0 to max)
    current: f32,
    /// Maximum value
    max: f32,
    /// Decay rate per second
    decay_rate: f32,
}

impl Need {
    /// Creates a need starting at `initial`.
    #[must_use]
    pub fn new(initial: f32, max: f32, decay_rate: f32) -> Self {
        Self {
            current: initial.clamp(0.0, max),
            max,
            decay_rate,
        }
    }

    /// Returns current value.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Returns max value.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Returns value as percentage (0.0-1.0).
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> NeedStatus {
        NeedStatus::from_percentage(self.percentage())
    }

    /// Decays the need by the given delta time (seconds).
    pub fn tick(&mut self, delta_seconds: f32) {
        self.current = (self.current - self.decay_rate * delta_seconds).max(0.0);
    }

    /// Restores the need by the given amount.
    pub fn restore(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }

    /// Sets current value directly.
    pub fn set(&mut self, value: f32) {
        self.current = value.clamp(0.0, self.max);
    }
}

/// Emotional state derived from the average need level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Average need ≥ 80
    Happy,
    /// Average need ≥ 50
    #[default]
    Neutral,
    /// Average need ≥ 30
    Sad,
    /// Average need < 30
    Stressed,
}

impl Mood {
    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Stressed => "stressed",
        }
    }
}

/// The needs tracked for an NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcNeeds {
    /// Food, decays 1.0/s
    pub food: Need,
    /// Rest, decays 0.5/s
    pub rest: Need,
    /// Entertainment, decays 0.3/s
    pub entertainment: Need,
    /// Safety, decays 0.2/s
    pub safety: Need,
}

impl Default for NpcNeeds {
    fn default() -> Self {
        Self {
            food: Need::new(100.0, 100.0, 1.0),
            rest: Need::new(100.0, 100.0, 0.5),
            entertainment: Need::new(50.0, 100.0, 0.3),
            safety: Need::new(70.0, 100.0, 0.2),
        }
    }
}

impl NpcNeeds {
    /// Creates needs with default levels and decay rates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a need by kind.
    #[must_use]
    pub fn get(&self, kind: NeedKind) -> &Need {
        match kind {
            NeedKind::Food => &self.food,
            NeedKind::Rest => &self.rest,
            NeedKind::Entertainment => &self.entertainment,
            NeedKind::Safety => &self.safety,
        }
    }

    /// Returns a need by kind, mutably.
    pub fn get_mut(&mut self, kind: NeedKind) -> &mut Need {
        match kind {
            NeedKind::Food => &mut self.food,
            NeedKind::Rest => &mut self.rest,
            NeedKind::Entertainment => &mut self.entertainment,
            NeedKind::Safety => &mut self.safety,
        }
    }

    /// Decays every need.
    pub fn tick(&mut self, delta_seconds: f32) {
        self.food.tick(delta_seconds);
        self.rest.tick(delta_seconds);
        self.entertainment.tick(delta_seconds);
        self.safety.tick(delta_seconds);
    }

    /// Restores a need.
    pub fn fulfill(&mut self, kind: NeedKind, amount: f32) {
        self.get_mut(kind).restore(amount);
    }

    /// First need below its floor. Food is checked before rest.
    #[must_use]
    pub fn below_floor(&self, food_floor: f32, rest_floor: f32) -> Option<NeedKind> {
        if self.food.current() < food_floor {
            Some(NeedKind::Food)
        } else if self.rest.current() < rest_floor {
            Some(NeedKind::Rest)
        } else {
            None
        }
    }

    /// Mean of all four needs.
    #[must_use]
    pub fn average(&self) -> f32 {
        (self.food.current()
            + self.rest.current()
            + self.entertainment.current()
            + self.safety.current())
            / 4.0
    }

    /// Mood for the current needs.
    #[must_use]
    pub fn mood(&self) -> Mood {
        match self.average() {
            a if a >= 80.0 => Mood::Happy,
            a if a >= 50.0 => Mood::Neutral,
            a if a >= 30.0 => Mood::Sad,
            _ => Mood::Stressed,
        }
    }
}
