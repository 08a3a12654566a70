//! Terrain field generation.
//!
//! The overworld is a dense grid of [`TerrainKind`] cells classified from a
//! radial falloff: cells far from the center become mountains, the rest are
//! plains sprinkled with forest and water. The classification loop never takes
//! a square root; the center and maximum squared distance are computed once
//! and every cell compares squared ratios.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use wayfarer_common::{Position, WorldBounds};

/// Terrain errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerrainError {
    /// Cell coordinate outside the generated grid
    #[error("Cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        /// Requested column
        x: i64,
        /// Requested row
        y: i64,
        /// Grid width in cells
        width: u32,
        /// Grid height in cells
        height: u32,
    },
}

/// Result type for terrain queries.
pub type TerrainResult<T> = Result<T, TerrainError>;

/// Largest grid edge, in cells, that generation will allocate.
pub const MAX_GRID_CELLS_PER_AXIS: u32 = 4096;

/// Classification of a single terrain cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open ground
    #[default]
    Plains,
    /// Woodland, blocks battlefield movement
    Forest,
    /// Outer ring of the map
    Mountain,
    /// Lakes and rivers
    Water,
}

impl TerrainKind {
    /// Returns true if units may stand on this cell.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        matches!(self, Self::Plains)
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plains => "plains",
            Self::Forest => "forest",
            Self::Mountain => "mountain",
            Self::Water => "water",
        }
    }
}

/// Terrain generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World width in world units
    pub width: u32,
    /// World height in world units
    pub height: u32,
    /// Cell edge length in world units
    pub tile_size: u32,
    /// Probability that a non-mountain cell is forest
    pub forest_density: f32,
    /// Probability that a non-mountain cell is water
    pub water_density: f32,
    /// Squared distance ratio beyond which cells become mountain
    pub mountain_ratio_threshold: f32,
    /// World seed
    pub seed: u64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
            tile_size: 32,
            forest_density: 0.2,
            water_density: 0.1,
            mountain_ratio_threshold: 0.64,
            seed: 12345,
        }
    }
}

impl TerrainConfig {
    /// Creates a config for the given world size with default densities.
    #[must_use]
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        Self {
            width,
            height,
            seed,
            ..Default::default()
        }
    }

    /// Sets the forest density.
    #[must_use]
    pub fn with_forest_density(mut self, density: f32) -> Self {
        self.forest_density = density;
        self
    }

    /// Sets the water density.
    #[must_use]
    pub fn with_water_density(mut self, density: f32) -> Self {
        self.water_density = density;
        self
    }

    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.tile_size = self.tile_size.max(1);
        let max_extent = self.tile_size.saturating_mul(MAX_GRID_CELLS_PER_AXIS);
        if self.width > max_extent || self.height > max_extent {
            debug!(
                "Terrain {}x{} exceeds {} cells per axis, clamping",
                self.width, self.height, MAX_GRID_CELLS_PER_AXIS
            );
            self.width = self.width.min(max_extent);
            self.height = self.height.min(max_extent);
        }
        self.forest_density = sanitize_probability(self.forest_density);
        self.water_density = sanitize_probability(self.water_density);
        if self.forest_density + self.water_density > 1.0 {
            self.forest_density = 1.0 - self.water_density;
        }
        if !self.mountain_ratio_threshold.is_finite() || self.mountain_ratio_threshold < 0.0 {
            self.mountain_ratio_threshold = 0.64;
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub fn grid_width(&self) -> u32 {
        self.width / self.tile_size.max(1)
    }

    /// Grid height in cells.
    #[must_use]
    pub fn grid_height(&self) -> u32 {
        self.height / self.tile_size.max(1)
    }
}

fn sanitize_probability(p: f32) -> f32 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Dense, immutable grid of terrain cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    tile_size: u32,
    cells: Vec<TerrainKind>,
}

impl TerrainGrid {
    /// Generates a terrain grid from `config`.
    ///
    /// Output depends only on the config; the same config always yields the
    /// same grid.
    #[must_use]
    pub fn generate(config: &TerrainConfig) -> Self {
        let mut config = config.clone();
        config.validate();

        let grid_width = config.grid_width();
        let grid_height = config.grid_height();
        let mut rng = fastrand::Rng::with_seed(config.seed);

        let center_x = grid_width as f32 / 2.0;
        let center_y = grid_height as f32 / 2.0;
        let max_dist_sq = center_x * center_x + center_y * center_y;
        let forest_cutoff = config.water_density + config.forest_density;

        let mut cells = Vec::with_capacity(grid_width as usize * grid_height as usize);
        for y in 0..grid_height {
            for x in 0..grid_width {
                let dx = x as f32 - center_x;
                let dy = y as f32 - center_y;
                let ratio_sq = if max_dist_sq > 0.0 {
                    (dx * dx + dy * dy) / max_dist_sq
                } else {
                    0.0
                };

                // One roll per cell keeps the sequence stable regardless of
                // which branch is taken.
                let roll = rng.f32();
                let kind = if ratio_sq > config.mountain_ratio_threshold {
                    TerrainKind::Mountain
                } else if roll < config.water_density {
                    TerrainKind::Water
                } else if roll < forest_cutoff {
                    TerrainKind::Forest
                } else {
                    TerrainKind::Plains
                };
                cells.push(kind);
            }
        }

        info!(
            "Generated {}x{} terrain grid (seed {})",
            grid_width, grid_height, config.seed
        );

        Self {
            width: grid_width,
            height: grid_height,
            tile_size: config.tile_size,
            cells,
        }
    }

    /// Creates a grid filled with a single kind.
    #[must_use]
    pub fn filled(width: u32, height: u32, tile_size: u32, kind: TerrainKind) -> Self {
        Self {
            width,
            height,
            tile_size: tile_size.max(1),
            cells: vec![kind; width as usize * height as usize],
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell edge length in world units.
    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// World extent covered by the grid.
    #[must_use]
    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(
            (self.width * self.tile_size) as f32,
            (self.height * self.tile_size) as f32,
        )
    }

    fn index(&self, x: i64, y: i64) -> TerrainResult<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return Err(TerrainError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    /// Returns the terrain at cell `(x, y)`.
    pub fn get(&self, x: i64, y: i64) -> TerrainResult<TerrainKind> {
        let idx = self.index(x, y)?;
        Ok(self.cells[idx])
    }

    /// Overwrites cell `(x, y)`. Used while building a grid.
    pub(crate) fn set(&mut self, x: i64, y: i64, kind: TerrainKind) -> TerrainResult<()> {
        let idx = self.index(x, y)?;
        self.cells[idx] = kind;
        Ok(())
    }

    /// Converts a world position to the containing cell.
    #[must_use]
    pub fn cell_of(&self, pos: Position) -> (i64, i64) {
        let tile = self.tile_size as f32;
        ((pos.x / tile).floor() as i64, (pos.y / tile).floor() as i64)
    }

    /// Returns the terrain under a world position.
    pub fn at_position(&self, pos: Position) -> TerrainResult<TerrainKind> {
        let (x, y) = self.cell_of(pos);
        self.get(x, y)
    }

    /// Returns true if the cell under `pos` exists and is passable.
    #[must_use]
    pub fn is_passable_at(&self, pos: Position) -> bool {
        self.at_position(pos).is_ok_and(TerrainKind::is_passable)
    }

    /// Counts cells of the given kind.
    #[must_use]
    pub fn count(&self, kind: TerrainKind) -> usize {
        self.cells.iter().filter(|&&c| c == kind).count()
    }

    /// Iterates `(x, y, kind)` over every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, TerrainKind)> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &kind)| (i as u32 % width, i as u32 / width, kind))
    }

    /// Finds the passable cell center nearest to `pos`, searching outward in
    /// square rings up to `max_rings` cells.
    #[must_use]
    pub fn nearest_passable(&self, pos: Position, max_rings: u32) -> Option<Position> {
        let (cx, cy) = self.cell_of(pos);
        let tile = self.tile_size as f32;
        let center = |x: i64, y: i64| {
            Position::new((x as f32 + 0.5) * tile, (y as f32 + 0.5) * tile)
        };

        for ring in 0..=i64::from(max_rings) {
            let mut best: Option<(f32, Position)> = None;
            for y in (cy - ring)..=(cy + ring) {
                for x in (cx - ring)..=(cx + ring) {
                    let on_ring = (x - cx).abs() == ring || (y - cy).abs() == ring;
                    if !on_ring || !self.get(x, y).is_ok_and(TerrainKind::is_passable) {
                        continue;
                    }
                    let c = center(x, y);
                    let d = c.distance_sq(pos);
                    if best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, c));
                    }
                }
            }
            if let Some((_, found)) = best {
                debug!("Nearest passable cell found at ring {}", ring);
                return Some(found);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generation_deterministic() {
        let config = TerrainConfig::new(1000, 800, 42);
        let a = TerrainGrid::generate(&config);
        let b = TerrainGrid::generate(&config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_different_terrain() {
        let a = TerrainGrid::generate(&TerrainConfig::new(1000, 1000, 1));
        let b = TerrainGrid::generate(&TerrainConfig::new(1000, 1000, 2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = TerrainGrid::generate(&TerrainConfig::new(1000, 640, 7));
        assert_eq!(grid.width(), 31);
        assert_eq!(grid.height(), 20);
        assert_eq!(grid.iter().count(), 31 * 20);
    }

    #[test]
    fn test_corners_are_mountain_center_is_not() {
        let config = TerrainConfig::new(1600, 1600, 3)
            .with_forest_density(0.0)
            .with_water_density(0.0);
        let grid = TerrainGrid::generate(&config);
        assert_eq!(grid.get(0, 0), Ok(TerrainKind::Mountain));
        assert_eq!(grid.get(49, 49), Ok(TerrainKind::Mountain));
        assert_eq!(grid.get(25, 25), Ok(TerrainKind::Plains));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let grid = TerrainGrid::generate(&TerrainConfig::new(320, 320, 0));
        assert!(matches!(
            grid.get(10, 0),
            Err(TerrainError::OutOfBounds { x: 10, .. })
        ));
        assert!(grid.get(-1, 3).is_err());
        assert!(grid.at_position(Position::new(-5.0, 5.0)).is_err());
    }

    #[test]
    fn test_zero_densities_give_no_forest_or_water() {
        let config = TerrainConfig::new(960, 960, 9)
            .with_forest_density(0.0)
            .with_water_density(0.0);
        let grid = TerrainGrid::generate(&config);
        assert_eq!(grid.count(TerrainKind::Forest), 0);
        assert_eq!(grid.count(TerrainKind::Water), 0);
        assert!(grid.count(TerrainKind::Mountain) > 0);
    }

    #[test]
    fn test_validate_clamps_densities() {
        let mut config = TerrainConfig::default()
            .with_forest_density(0.9)
            .with_water_density(f32::NAN);
        config.tile_size = 0;
        config.validate();
        assert_eq!(config.tile_size, 1);
        assert!((config.water_density - 0.0).abs() < f32::EPSILON);
        assert!((config.forest_density - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_caps_grid_size() {
        let mut config = TerrainConfig::default();
        config.width = u32::MAX;
        config.height = 100_000 * config.tile_size;
        config.validate();
        assert_eq!(config.grid_width(), MAX_GRID_CELLS_PER_AXIS);
        assert_eq!(config.grid_height(), MAX_GRID_CELLS_PER_AXIS);

        let cells = config.grid_width() as usize * config.grid_height() as usize;
        assert_eq!(cells, 4096 * 4096);
    }

    #[test]
    fn test_filled_counts_cells_in_usize() {
        let grid = TerrainGrid::filled(70_000, 1, 1, TerrainKind::Water);
        assert_eq!(grid.count(TerrainKind::Water), 70_000);
    }

    #[test]
    fn test_nearest_passable() {
        let mut grid = TerrainGrid::filled(10, 10, 32, TerrainKind::Forest);
        grid.set(7, 2, TerrainKind::Plains).expect("in bounds");
        let found = grid
            .nearest_passable(Position::new(50.0, 50.0), 10)
            .expect("one plains cell");
        assert_eq!(grid.cell_of(found), (7, 2));
        assert!(grid.nearest_passable(Position::new(50.0, 50.0), 2).is_none());
    }

    proptest! {
        #[test]
        fn test_same_seed_same_grid(seed in any::<u64>(), w in 64u32..800, h in 64u32..800) {
            let config = TerrainConfig::new(w, h, seed);
            prop_assert_eq!(TerrainGrid::generate(&config), TerrainGrid::generate(&config));
        }
    }
}
