//! Battlefield generation for tactical encounters.
//!
//! A battlefield is a small, mostly open grid with scattered forest
//! obstacles. Two spawn points sit in opposite corners and every cell within
//! the safe-zone radius of either spawn is kept clear, so neither side starts
//! blocked.

use serde::{Deserialize, Serialize};
use tracing::info;
use wayfarer_common::Position;

use crate::terrain::{TerrainGrid, TerrainKind};

/// Battlefield generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlefieldConfig {
    /// Edge length of the square field in world units
    pub size: u32,
    /// Cell edge length in world units
    pub tile_size: u32,
    /// Probability that a cell outside the safe zones is forest
    pub obstacle_density: f32,
    /// Radius around each spawn kept free of obstacles, in world units
    pub safe_zone_radius: f32,
    /// Distance of each spawn point from the field edges
    pub spawn_margin: f32,
    /// Generation seed
    pub seed: u64,
}

impl Default for BattlefieldConfig {
    fn default() -> Self {
        Self {
            size: 1500,
            tile_size: 32,
            obstacle_density: 0.1,
            safe_zone_radius: 160.0,
            spawn_margin: 100.0,
            seed: 0,
        }
    }
}

impl BattlefieldConfig {
    /// Returns the config with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.tile_size = self.tile_size.max(1);
        self.size = self.size.max(self.tile_size);
        self.obstacle_density = if self.obstacle_density.is_finite() {
            self.obstacle_density.clamp(0.0, 1.0)
        } else {
            0.1
        };
        if !self.safe_zone_radius.is_finite() || self.safe_zone_radius < 0.0 {
            self.safe_zone_radius = 0.0;
        }
        let half = self.size as f32 / 2.0;
        if !self.spawn_margin.is_finite() {
            self.spawn_margin = 100.0;
        }
        self.spawn_margin = self.spawn_margin.clamp(0.0, half);
    }

    /// Player spawn: lower-left corner.
    #[must_use]
    pub fn player_spawn(&self) -> Position {
        Position::new(self.spawn_margin, self.size as f32 - self.spawn_margin)
    }

    /// Enemy spawn: upper-right corner.
    #[must_use]
    pub fn enemy_spawn(&self) -> Position {
        Position::new(self.size as f32 - self.spawn_margin, self.spawn_margin)
    }
}

/// A generated battlefield with its spawn points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battlefield {
    /// Terrain grid
    pub grid: TerrainGrid,
    /// Where the player's side starts
    pub player_spawn: Position,
    /// Where the opposing side starts
    pub enemy_spawn: Position,
    /// Seed the field was generated from
    pub seed: u64,
}

impl Battlefield {
    /// Generates a battlefield.
    #[must_use]
    pub fn generate(config: &BattlefieldConfig) -> Self {
        let mut config = config.clone();
        config.validate();

        let cells = config.size / config.tile_size;
        let tile = config.tile_size as f32;
        let player_spawn = config.player_spawn();
        let enemy_spawn = config.enemy_spawn();
        let safe_sq = config.safe_zone_radius * config.safe_zone_radius;

        let mut grid = TerrainGrid::filled(cells, cells, config.tile_size, TerrainKind::Plains);
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let mut obstacles = 0usize;

        for y in 0..cells {
            for x in 0..cells {
                let roll = rng.f32();
                if roll >= config.obstacle_density {
                    continue;
                }
                let center = Position::new((x as f32 + 0.5) * tile, (y as f32 + 0.5) * tile);
                if center.distance_sq(player_spawn) <= safe_sq
                    || center.distance_sq(enemy_spawn) <= safe_sq
                {
                    continue;
                }
                if grid
                    .set(i64::from(x), i64::from(y), TerrainKind::Forest)
                    .is_ok()
                {
                    obstacles += 1;
                }
            }
        }

        info!(
            "Generated battlefield {}x{} cells with {} obstacles (seed {})",
            cells, cells, obstacles, config.seed
        );

        Self {
            grid,
            player_spawn,
            enemy_spawn,
            seed: config.seed,
        }
    }

    /// Fraction of cells that are obstacles.
    #[must_use]
    pub fn obstacle_ratio(&self) -> f32 {
        let total = (self.grid.width() * self.grid.height()).max(1) as f32;
        self.grid.count(TerrainKind::Forest) as f32 / total
    }
}
