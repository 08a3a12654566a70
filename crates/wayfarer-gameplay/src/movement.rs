//! Point-mass movement integration.
//!
//! Movement is a straight line toward a target at constant speed with
//! instantaneous direction changes. Arrival is clamped on both sides: a
//! position closer than the snap threshold is snapped onto the target, and a
//! step that would reach or pass the target ends exactly on it. Either clamp
//! alone leaves entities jittering around their destination.

use tracing::warn;
use wayfarer_common::Position;

/// Default distance below which a mover snaps onto its target.
pub const DEFAULT_SNAP_THRESHOLD: f32 = 1.0;

/// Outcome of one integration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStep {
    /// Position now equals the target
    Arrived,
    /// Position moved toward the target without reaching it
    Advanced,
}

/// Replaces a negative or non-finite time step with zero.
#[must_use]
pub fn sanitize_delta(delta_time: f32) -> f32 {
    if delta_time.is_finite() && delta_time > 0.0 {
        delta_time
    } else {
        if delta_time != 0.0 {
            warn!("Ignoring invalid delta_time {}", delta_time);
        }
        0.0
    }
}

/// Advances `position` toward `target` by `speed × delta_time`.
pub fn step_toward(
    position: &mut Position,
    target: Position,
    speed: f32,
    delta_time: f32,
    snap_threshold: f32,
) -> MoveStep {
    let distance = position.distance(target);
    if distance < snap_threshold {
        *position = target;
        return MoveStep::Arrived;
    }

    let direction = position.direction_to(target);
    if direction == glam::Vec2::ZERO {
        // Co-located within float precision.
        *position = target;
        return MoveStep::Arrived;
    }

    let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
    let move_distance = speed * sanitize_delta(delta_time);
    if move_distance >= distance {
        *position = target;
        return MoveStep::Arrived;
    }

    *position = position.offset(direction * move_distance);
    MoveStep::Advanced
}
