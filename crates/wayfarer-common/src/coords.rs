//! Spatial primitives for overworld and battlefield positions.
//!
//! This module provides:
//! - [`Position`], a 2D point in world units
//! - [`WorldBounds`], the playable rectangle `[0, width) × [0, height)`
//! - Free functions [`distance`], [`distance_sq`] and [`direction_normalized`]
//!
//! Proximity checks should compare [`distance_sq`] against a precomputed
//! squared radius. [`distance`] exists for movement integration, which needs
//! the true length to clamp overshoot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A point in world space, measured in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Position {
    /// Origin (0, 0).
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// Squared euclidean distance to another position.
    #[must_use]
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Unit vector pointing toward `other`.
    ///
    /// Returns [`Vec2::ZERO`] when both points coincide or the offset is not
    /// finite, so callers never divide by zero.
    #[must_use]
    pub fn direction_to(self, other: Self) -> Vec2 {
        let offset = Vec2::new(other.x - self.x, other.y - self.y);
        let len_sq = offset.length_squared();
        if len_sq <= f32::EPSILON * f32::EPSILON || !len_sq.is_finite() {
            return Vec2::ZERO;
        }
        offset / len_sq.sqrt()
    }

    /// Returns this position moved by `offset`.
    #[must_use]
    pub fn offset(self, offset: Vec2) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y)
    }

    /// True when both components are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Converts to a glam vector.
    #[must_use]
    pub const fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<(f32, f32)> for Position {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Euclidean distance between two positions.
#[must_use]
pub fn distance(a: Position, b: Position) -> f32 {
    a.distance(b)
}

/// Squared euclidean distance between two positions.
#[must_use]
pub fn distance_sq(a: Position, b: Position) -> f32 {
    a.distance_sq(b)
}

/// Unit direction from `from` to `to`, or the zero vector when they coincide.
#[must_use]
pub fn direction_normalized(from: Position, to: Position) -> Vec2 {
    from.direction_to(to)
}

/// Rectangular world extent, half-open on the far edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Width in world units
    pub width: f32,
    /// Height in world units
    pub height: f32,
}

impl WorldBounds {
    /// Creates bounds of the given size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when `pos` lies inside `[0, width) × [0, height)`.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0.0 && pos.y >= 0.0 && pos.x < self.width && pos.y < self.height
    }

    /// Clamps a position into the bounds.
    ///
    /// The far edge is pulled in by a small epsilon so the result satisfies
    /// [`WorldBounds::contains`].
    #[must_use]
    pub fn clamp(&self, pos: Position) -> Position {
        let max_x = (self.width - 1.0e-3).max(0.0);
        let max_y = (self.height - 1.0e-3).max(0.0);
        Position::new(pos.x.clamp(0.0, max_x), pos.y.clamp(0.0, max_y))
    }

    /// Center of the bounds.
    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(self.width * 0.5, self.height * 0.5)
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(2000.0, 2000.0)
    }
}
