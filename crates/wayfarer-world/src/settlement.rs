//! Overworld settlements.
//!
//! Settlements are fixed points of interest on the overworld. The party
//! enters one when it comes within the location-entry radius, which is a
//! separate and much larger constant than the encounter trigger radius.

use serde::{Deserialize, Serialize};
use wayfarer_common::{Position, WorldBounds};

/// Kind of settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementKind {
    /// Large trading town
    Town,
    /// Small farming village
    Village,
    /// Resource gathering site
    ResourcePoint,
    /// Hostile underground site
    Dungeon,
    /// Military stronghold
    Fortress,
    /// Open-air market
    Market,
}

impl SettlementKind {
    /// Default population when none is given.
    #[must_use]
    pub const fn default_population(self) -> u32 {
        match self {
            Self::Town => 500,
            Self::Village => 50,
            _ => 0,
        }
    }
}

/// Index of a settlement inside a [`SettlementMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettlementId(pub u32);

/// A settlement on the overworld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Identifier within its map
    pub id: SettlementId,
    /// Display name
    pub name: String,
    /// Overworld position
    pub position: Position,
    /// Settlement kind
    pub kind: SettlementKind,
    /// Owning faction name
    pub faction: String,
    /// Inhabitants
    pub population: u32,
    /// Prosperity (0-100)
    pub prosperity: u8,
}

/// All settlements of one overworld.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementMap {
    settlements: Vec<Settlement>,
}

impl SettlementMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a settlement and returns its id.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        position: Position,
        kind: SettlementKind,
        faction: impl Into<String>,
    ) -> SettlementId {
        let id = SettlementId(self.settlements.len() as u32);
        self.settlements.push(Settlement {
            id,
            name: name.into(),
            position,
            kind,
            faction: faction.into(),
            population: kind.default_population(),
            prosperity: 50,
        });
        id
    }

    /// Looks up a settlement.
    #[must_use]
    pub fn get(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements.get(id.0 as usize)
    }

    /// Iterates all settlements.
    pub fn iter(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.iter()
    }

    /// Number of settlements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    /// True when no settlements exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }

    /// Nearest settlement whose squared distance to `pos` is within `radius_sq`.
    #[must_use]
    pub fn nearest_within(&self, pos: Position, radius_sq: f32) -> Option<&Settlement> {
        self.settlements
            .iter()
            .map(|s| (s.position.distance_sq(pos), s))
            .filter(|(d, _)| *d <= radius_sq)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, s)| s)
    }

    /// Scatters `count` settlements inside `bounds`, keeping `margin` from the
    /// edges. Deterministic for a given seed.
    #[must_use]
    pub fn scatter(bounds: WorldBounds, count: usize, margin: f32, seed: u64) -> Self {
        const NAMES: [&str; 8] = [
            "Ashford", "Brightwater", "Coldharbor", "Dunmere", "Eastmarch", "Fallowmere",
            "Greystone", "Highcliff",
        ];
        const KINDS: [SettlementKind; 3] = [
            SettlementKind::Town,
            SettlementKind::Village,
            SettlementKind::Market,
        ];

        let mut rng = fastrand::Rng::with_seed(seed);
        let mut map = Self::new();
        let span_x = (bounds.width - 2.0 * margin).max(0.0);
        let span_y = (bounds.height - 2.0 * margin).max(0.0);
        for i in 0..count {
            let pos = Position::new(margin + rng.f32() * span_x, margin + rng.f32() * span_y);
            let name = NAMES[i % NAMES.len()];
            let kind = KINDS[rng.usize(..KINDS.len())];
            map.add(name, pos, kind, "neutral");
        }
        map
    }
}
