//! NPC decision state machine.
//!
//! This module provides:
//! - [`AiState`], the single state an NPC is in at any time
//! - [`AiEngine`], which advances one NPC per call
//! - [`TargetLocator`], the seam through which the engine sees other entities
//!
//! Each update runs in a fixed order: needs decay, health check for fleeing,
//! a decision step at most once per decision interval, then execution of the
//! current state. Attacks are not resolved here; the engine returns an attack
//! intent and the caller hands it to the combat resolver.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use wayfarer_common::{EntityId, Position, WorldBounds};

use crate::combat::CombatConfig;
use crate::movement::{step_toward, MoveStep, DEFAULT_SNAP_THRESHOLD};
use crate::needs::NeedKind;
use crate::npc::{Combatant, Npc};

// ============================================================================
// State and configuration
// ============================================================================

/// AI state of an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    /// Doing nothing
    #[default]
    Idle,
    /// Walking to `target_position`
    Moving,
    /// Attacking `combat_target`
    Attacking,
    /// Running from `combat_target`
    Fleeing,
    /// Recovering a need that fell below its floor
    SeekingNeed(NeedKind),
}

impl AiState {
    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Moving => "moving",
            Self::Attacking => "attacking",
            Self::Fleeing => "fleeing",
            Self::SeekingNeed(_) => "seeking_need",
        }
    }
}

/// AI tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Seconds between decisions
    pub decision_interval: f64,
    /// Distance below which movers snap onto their target
    pub snap_threshold: f32,
    /// Speed of NPCs without their own
    pub base_speed: f32,
    /// Health fraction below which an engaged NPC flees
    pub flee_health_ratio: f32,
    /// Distance from the threat at which fleeing stops
    pub flee_distance: f32,
    /// Speed multiplier while fleeing
    pub flee_speed_multiplier: f32,
    /// Food level that triggers seeking food
    pub food_floor: f32,
    /// Rest level that triggers resting
    pub rest_floor: f32,
    /// Food recovered per second while seeking food
    pub food_recovery_rate: f32,
    /// Rest recovered per second while resting
    pub rest_recovery_rate: f32,
    /// Level at which a sought need counts as satisfied
    pub satisfied_level: f32,
    /// Chance per decision that an idle wanderer picks a destination
    pub wander_chance: f32,
    /// Seed for wander rolls
    pub seed: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            decision_interval: 2.0,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            base_speed: 50.0,
            flee_health_ratio: 0.25,
            flee_distance: 150.0,
            flee_speed_multiplier: 1.5,
            food_floor: 30.0,
            rest_floor: 20.0,
            food_recovery_rate: 20.0,
            rest_recovery_rate: 20.0,
            satisfied_level: 80.0,
            wander_chance: 0.3,
            seed: 0xA1,
        }
    }
}

impl AiConfig {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        if !self.decision_interval.is_finite() || self.decision_interval < 0.0 {
            self.decision_interval = 2.0;
        }
        if !self.snap_threshold.is_finite() || self.snap_threshold < 0.0 {
            self.snap_threshold = DEFAULT_SNAP_THRESHOLD;
        }
        if !self.base_speed.is_finite() || self.base_speed < 0.0 {
            self.base_speed = 50.0;
        }
        self.flee_health_ratio = self.flee_health_ratio.clamp(0.0, 1.0);
        self.wander_chance = self.wander_chance.clamp(0.0, 1.0);
        self.satisfied_level = self.satisfied_level.clamp(0.0, 100.0);
    }
}

// ============================================================================
// Target lookup
// ============================================================================

/// What the engine needs to know about a combatant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    /// Current position
    pub position: Position,
    /// Whether it is alive
    pub alive: bool,
}

/// Read-only view of combatants, supplied by the caller.
pub trait TargetLocator {
    /// Looks up a combatant.
    fn locate(&self, target: Combatant) -> Option<TargetInfo>;
}

/// Positions captured once per tick, before any NPC moves.
#[derive(Debug, Clone, Default)]
pub struct PositionSnapshot {
    player: Option<TargetInfo>,
    npcs: HashMap<EntityId, TargetInfo>,
}

impl PositionSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the player.
    pub fn set_player(&mut self, position: Position, alive: bool) {
        self.player = Some(TargetInfo { position, alive });
    }

    /// Records an NPC.
    pub fn set_npc(&mut self, id: EntityId, position: Position, alive: bool) {
        self.npcs.insert(id, TargetInfo { position, alive });
    }
}

impl TargetLocator for PositionSnapshot {
    fn locate(&self, target: Combatant) -> Option<TargetInfo> {
        match target {
            Combatant::Player => self.player,
            Combatant::Npc(id) => self.npcs.get(&id).copied(),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Per-tick inputs.
#[derive(Debug, Clone, Copy)]
pub struct AiContext {
    /// Simulation time after this tick's advance
    pub now: f64,
    /// Sanitized tick length
    pub delta_time: f32,
    /// Area NPCs must stay inside
    pub bounds: Option<WorldBounds>,
    /// Upper limit on the distance at which attacks start, below weapon reach
    pub engage_range: Option<f32>,
}

/// What happened to one NPC during an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiOutcome {
    /// State before the update
    pub previous: AiState,
    /// State after the update
    pub current: AiState,
    /// Target to attack this tick, if any
    pub attack: Option<Combatant>,
}

impl AiOutcome {
    /// True when the state changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Advances NPC state machines.
#[derive(Debug, Clone)]
pub struct AiEngine {
    config: AiConfig,
    unarmed_range: f32,
    rng: fastrand::Rng,
}

impl AiEngine {
    /// Creates an engine. Weapon reach comes from the combat config.
    #[must_use]
    pub fn new(mut config: AiConfig, combat: &CombatConfig) -> Self {
        config.validate();
        let rng = fastrand::Rng::with_seed(config.seed);
        Self {
            config,
            unarmed_range: combat.unarmed_range,
            rng,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Sends an NPC to `target`.
    pub fn move_to(&self, npc: &mut Npc, target: Position) {
        npc.target_position = Some(target);
        npc.combat_target = None;
        self.transition(npc, AiState::Moving);
    }

    /// Puts an NPC into combat against `target`.
    pub fn start_combat(&self, npc: &mut Npc, target: Combatant) {
        npc.combat_target = Some(target);
        npc.target_position = None;
        self.transition(npc, AiState::Attacking);
    }

    /// Returns an NPC to idle, dropping any goal.
    pub fn stand_down(&self, npc: &mut Npc) {
        npc.combat_target = None;
        npc.target_position = None;
        self.transition(npc, AiState::Idle);
    }

    /// Advances one NPC by one tick.
    pub fn update(
        &mut self,
        npc: &mut Npc,
        ctx: &AiContext,
        targets: &impl TargetLocator,
    ) -> AiOutcome {
        let previous = npc.ai_state;
        if !npc.is_alive() {
            return AiOutcome {
                previous,
                current: previous,
                attack: None,
            };
        }

        if let Some(needs) = npc.needs.as_mut() {
            needs.tick(ctx.delta_time);
        }

        self.check_flee(npc);

        let due = npc
            .last_decision_time
            .map_or(true, |last| ctx.now - last >= self.config.decision_interval);
        if due {
            npc.last_decision_time = Some(ctx.now);
            self.decide(npc, targets);
        }

        let attack = self.execute(npc, ctx, targets);
        AiOutcome {
            previous,
            current: npc.ai_state,
            attack,
        }
    }

    fn transition(&self, npc: &mut Npc, next: AiState) {
        if npc.ai_state != next {
            debug!(
                "{} AI state: {} -> {}",
                npc.name(),
                npc.ai_state.name(),
                next.name()
            );
            npc.ai_state = next;
        }
    }

    fn is_engaged(npc: &Npc) -> bool {
        match npc.ai_state {
            AiState::Attacking | AiState::Fleeing => true,
            AiState::Moving => npc.combat_target.is_some(),
            _ => false,
        }
    }

    fn check_flee(&self, npc: &mut Npc) {
        let fighting = matches!(npc.ai_state, AiState::Attacking)
            || (npc.ai_state == AiState::Moving && npc.combat_target.is_some());
        if fighting && npc.character.health_ratio() < self.config.flee_health_ratio {
            npc.target_position = None;
            self.transition(npc, AiState::Fleeing);
        }
    }

    fn decide(&mut self, npc: &mut Npc, targets: &impl TargetLocator) {
        if Self::is_engaged(npc) {
            return;
        }

        // Needs pre-empt idling and plain travel.
        if let Some(kind) = npc
            .needs
            .as_ref()
            .and_then(|n| n.below_floor(self.config.food_floor, self.config.rest_floor))
        {
            if npc.ai_state != AiState::SeekingNeed(kind) {
                npc.target_position = None;
                self.transition(npc, AiState::SeekingNeed(kind));
            }
            return;
        }

        if npc.ai_state != AiState::Idle {
            return;
        }

        if let Some(radius) = npc.aggro_radius {
            if let Some(player) = targets.locate(Combatant::Player) {
                if player.alive && npc.position().distance_sq(player.position) <= radius * radius {
                    self.start_combat(npc, Combatant::Player);
                    return;
                }
            }
        }

        if let Some(radius) = npc.wander_radius {
            if self.rng.f32() < self.config.wander_chance {
                let angle = self.rng.f32() * std::f32::consts::TAU;
                let dist = self.rng.f32() * radius.max(0.0);
                let dest = npc.home.offset(Vec2::from_angle(angle) * dist);
                npc.target_position = Some(dest);
                self.transition(npc, AiState::Moving);
            }
        }
    }

    fn execute(
        &mut self,
        npc: &mut Npc,
        ctx: &AiContext,
        targets: &impl TargetLocator,
    ) -> Option<Combatant> {
        match npc.ai_state {
            AiState::Idle => None,
            AiState::Moving => {
                self.execute_moving(npc, ctx, targets);
                None
            },
            AiState::Attacking => self.execute_attacking(npc, ctx, targets),
            AiState::Fleeing => {
                self.execute_fleeing(npc, ctx, targets);
                None
            },
            AiState::SeekingNeed(kind) => {
                self.execute_seeking(npc, kind, ctx.delta_time);
                None
            },
        }
    }

    fn speed(&self, npc: &Npc) -> f32 {
        npc.current_speed.unwrap_or(self.config.base_speed)
    }

    fn reach(&self, npc: &Npc) -> f32 {
        npc.character
            .equipped_weapon
            .as_ref()
            .map_or(self.unarmed_range, |w| w.range)
    }

    fn target_in_reach(&self, npc: &Npc, target: TargetInfo, ctx: &AiContext) -> bool {
        let reach = match ctx.engage_range {
            Some(limit) => self.reach(npc).min(limit),
            None => self.reach(npc),
        };
        npc.position().distance_sq(target.position) <= reach * reach
    }

    fn execute_moving(&mut self, npc: &mut Npc, ctx: &AiContext, targets: &impl TargetLocator) {
        // A chase ends as soon as the target is within reach.
        if let Some(target) = npc.combat_target {
            match targets.locate(target) {
                Some(info) if info.alive => {
                    if self.target_in_reach(npc, info, ctx) {
                        npc.target_position = None;
                        self.transition(npc, AiState::Attacking);
                        return;
                    }
                    npc.target_position = Some(info.position);
                },
                _ => {
                    self.stand_down(npc);
                    return;
                },
            }
        }

        let Some(mut goal) = npc.target_position else {
            self.transition(npc, AiState::Idle);
            return;
        };
        if let Some(bounds) = ctx.bounds {
            goal = bounds.clamp(goal);
            npc.target_position = Some(goal);
        }

        let speed = self.speed(npc);
        let step = step_toward(
            &mut npc.character.position,
            goal,
            speed,
            ctx.delta_time,
            self.config.snap_threshold,
        );
        if step == MoveStep::Arrived {
            npc.target_position = None;
            let next = if npc.combat_target.is_some() {
                AiState::Attacking
            } else {
                AiState::Idle
            };
            self.transition(npc, next);
        }
    }

    fn execute_attacking(
        &mut self,
        npc: &mut Npc,
        ctx: &AiContext,
        targets: &impl TargetLocator,
    ) -> Option<Combatant> {
        let Some(target) = npc.combat_target else {
            self.transition(npc, AiState::Idle);
            return None;
        };
        let info = match targets.locate(target) {
            Some(info) if info.alive => info,
            _ => {
                debug!("{} lost its target", npc.name());
                self.stand_down(npc);
                return None;
            },
        };

        if self.target_in_reach(npc, info, ctx) {
            Some(target)
        } else {
            npc.target_position = Some(info.position);
            self.transition(npc, AiState::Moving);
            None
        }
    }

    fn execute_fleeing(&mut self, npc: &mut Npc, ctx: &AiContext, targets: &impl TargetLocator) {
        let threat = npc
            .combat_target
            .and_then(|t| targets.locate(t))
            .filter(|info| info.alive);
        let Some(threat) = threat else {
            self.stand_down(npc);
            return;
        };

        let flee_sq = self.config.flee_distance * self.config.flee_distance;
        if npc.position().distance_sq(threat.position) > flee_sq {
            self.stand_down(npc);
            return;
        }

        let mut away = threat.position.direction_to(npc.position());
        if away == Vec2::ZERO {
            away = Vec2::X;
        }
        let step = self.speed(npc) * self.config.flee_speed_multiplier * ctx.delta_time;
        let mut next = npc.position().offset(away * step);
        if let Some(bounds) = ctx.bounds {
            next = bounds.clamp(next);
        }
        npc.character.position = next;
    }

    fn execute_seeking(&mut self, npc: &mut Npc, kind: NeedKind, delta_time: f32) {
        let rate = match kind {
            NeedKind::Food => self.config.food_recovery_rate,
            NeedKind::Rest => self.config.rest_recovery_rate,
            NeedKind::Entertainment | NeedKind::Safety => 0.0,
        };
        let satisfied = match npc.needs.as_mut() {
            Some(needs) => {
                needs.fulfill(kind, rate * delta_time);
                needs.get(kind).current() >= self.config.satisfied_level || rate <= 0.0
            },
            None => true,
        };
        if satisfied {
            self.transition(npc, AiState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::needs::NpcNeeds;

    fn engine() -> AiEngine {
        AiEngine::new(AiConfig::default(), &CombatConfig::default())
    }

    fn npc_at(x: f32, y: f32) -> Npc {
        Npc::new(Character::new("Npc", Position::new(x, y)))
    }

    fn ctx(now: f64, dt: f32) -> AiContext {
        AiContext {
            now,
            delta_time: dt,
            bounds: None,
            engage_range: None,
        }
    }

    fn with_player(x: f32, y: f32) -> PositionSnapshot {
        let mut snapshot = PositionSnapshot::new();
        snapshot.set_player(Position::new(x, y), true);
        snapshot
    }

    #[test]
    fn test_moving_converges_and_idles() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0).with_speed(50.0);
        let targets = PositionSnapshot::new();
        ai.move_to(&mut npc, Position::new(200.0, 0.0));

        let mut ticks = 0;
        while npc.ai_state == AiState::Moving {
            ticks += 1;
            ai.update(&mut npc, &ctx(f64::from(ticks), 1.0), &targets);
            assert!(ticks <= 4);
        }
        assert_eq!(ticks, 4);
        assert_eq!(npc.position(), Position::new(200.0, 0.0));
        assert_eq!(npc.target_position, None);
        assert_eq!(npc.ai_state, AiState::Idle);
    }

    #[test]
    fn test_no_jitter_after_arrival() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0);
        let targets = PositionSnapshot::new();
        ai.move_to(&mut npc, Position::new(0.5, 0.0));
        ai.update(&mut npc, &ctx(0.1, 0.1), &targets);
        let settled = npc.position();
        assert_eq!(npc.ai_state, AiState::Idle);

        for i in 2..50 {
            ai.update(&mut npc, &ctx(f64::from(i) * 0.1, 0.1), &targets);
            assert_eq!(npc.position(), settled);
        }
    }

    #[test]
    fn test_moving_without_target_goes_idle() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0);
        npc.ai_state = AiState::Moving;
        npc.last_decision_time = Some(0.0);
        let out = ai.update(&mut npc, &ctx(0.1, 0.1), &PositionSnapshot::new());
        assert_eq!(out.current, AiState::Idle);
        assert!(out.changed());
    }

    #[test]
    fn test_default_speed_used() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0);
        ai.move_to(&mut npc, Position::new(1000.0, 0.0));
        ai.update(&mut npc, &ctx(1.0, 1.0), &PositionSnapshot::new());
        assert!((npc.position().x - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_attack_in_range_emits_intent() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0);
        ai.start_combat(&mut npc, Combatant::Player);
        let out = ai.update(&mut npc, &ctx(1.0, 0.1), &with_player(30.0, 0.0));
        assert_eq!(out.attack, Some(Combatant::Player));
        assert_eq!(out.current, AiState::Attacking);
    }

    #[test]
    fn test_chase_then_attack() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0).with_speed(100.0);
        ai.start_combat(&mut npc, Combatant::Player);
        let targets = with_player(300.0, 0.0);

        let out = ai.update(&mut npc, &ctx(0.1, 0.1), &targets);
        assert_eq!(out.current, AiState::Moving);
        assert_eq!(npc.target_position, Some(Position::new(300.0, 0.0)));
        assert_eq!(npc.combat_target, Some(Combatant::Player));

        let mut now = 0.1;
        let mut attacked = false;
        for _ in 0..40 {
            now += 0.1;
            let out = ai.update(&mut npc, &ctx(now, 0.1), &targets);
            if out.attack.is_some() {
                attacked = true;
                break;
            }
        }
        assert!(attacked);
        assert!(npc.position().distance(Position::new(300.0, 0.0)) <= 50.0);
    }

    #[test]
    fn test_engage_range_limits_reach() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0).with_speed(100.0);
        ai.start_combat(&mut npc, Combatant::Player);
        let targets = with_player(40.0, 0.0);
        let limited = AiContext {
            engage_range: Some(20.0),
            ..ctx(0.1, 0.1)
        };
        let out = ai.update(&mut npc, &limited, &targets);
        assert_eq!(out.attack, None);
        assert_eq!(out.current, AiState::Moving);

        let mut attacked = false;
        for i in 2..10 {
            let limited = AiContext {
                engage_range: Some(20.0),
                ..ctx(f64::from(i) * 0.1, 0.1)
            };
            if ai.update(&mut npc, &limited, &targets).attack.is_some() {
                attacked = true;
                break;
            }
        }
        assert!(attacked);
        assert!(npc.position().distance(Position::new(40.0, 0.0)) <= 20.0 + 1e-3);
    }

    #[test]
    fn test_dead_target_stands_down() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0);
        ai.start_combat(&mut npc, Combatant::Player);
        let mut targets = PositionSnapshot::new();
        targets.set_player(Position::new(10.0, 0.0), false);
        let out = ai.update(&mut npc, &ctx(1.0, 0.1), &targets);
        assert_eq!(out.current, AiState::Idle);
        assert_eq!(npc.combat_target, None);
    }

    #[test]
    fn test_low_health_flees_then_recovers() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0).with_speed(100.0);
        ai.start_combat(&mut npc, Combatant::Player);
        npc.character.health = npc.character.max_health * 0.1;
        let targets = with_player(10.0, 0.0);

        let out = ai.update(&mut npc, &ctx(0.5, 0.5), &targets);
        assert_eq!(out.current, AiState::Fleeing);
        assert!(npc.position().x < 0.0);

        let mut now = 0.5;
        while npc.ai_state == AiState::Fleeing {
            now += 0.5;
            ai.update(&mut npc, &ctx(now, 0.5), &targets);
            assert!(now < 10.0, "never escaped");
        }
        assert_eq!(npc.ai_state, AiState::Idle);
        assert!(npc.position().distance(Position::new(10.0, 0.0)) > 150.0);
    }

    #[test]
    fn test_need_preempts_movement() {
        let mut ai = engine();
        let mut needs = NpcNeeds::new();
        needs.food.set(10.0);
        let mut npc = npc_at(0.0, 0.0).with_needs(needs);
        ai.move_to(&mut npc, Position::new(500.0, 0.0));

        let out = ai.update(&mut npc, &ctx(0.0, 0.1), &PositionSnapshot::new());
        assert_eq!(out.current, AiState::SeekingNeed(NeedKind::Food));
        assert_eq!(npc.target_position, None);

        // 20/s recovery from ~10 reaches 80 in a few seconds.
        let mut now = 0.0;
        while npc.ai_state != AiState::Idle {
            now += 0.5;
            ai.update(&mut npc, &ctx(now, 0.5), &PositionSnapshot::new());
            assert!(now < 10.0);
        }
        assert!(npc.needs.as_ref().map_or(0.0, |n| n.food.current()) >= 80.0);
    }

    #[test]
    fn test_need_does_not_interrupt_combat() {
        let mut ai = engine();
        let mut needs = NpcNeeds::new();
        needs.rest.set(0.0);
        let mut npc = npc_at(0.0, 0.0).with_needs(needs);
        ai.start_combat(&mut npc, Combatant::Player);
        let out = ai.update(&mut npc, &ctx(0.0, 0.1), &with_player(10.0, 0.0));
        assert_eq!(out.current, AiState::Attacking);
    }

    #[test]
    fn test_decisions_are_rate_limited() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0).with_aggro_radius(100.0);
        ai.update(&mut npc, &ctx(0.0, 0.1), &PositionSnapshot::new());
        assert_eq!(npc.last_decision_time, Some(0.0));

        // Player walks into aggro range right after a decision.
        let targets = with_player(50.0, 0.0);
        ai.update(&mut npc, &ctx(1.0, 0.1), &targets);
        assert_eq!(npc.ai_state, AiState::Idle);
        ai.update(&mut npc, &ctx(2.0, 0.1), &targets);
        assert_eq!(npc.ai_state, AiState::Attacking);
    }

    #[test]
    fn test_wander_stays_near_home() {
        let mut ai = AiEngine::new(
            AiConfig {
                wander_chance: 1.0,
                ..AiConfig::default()
            },
            &CombatConfig::default(),
        );
        let mut npc = npc_at(500.0, 500.0).with_wander_radius(80.0);
        for i in 0..20 {
            ai.stand_down(&mut npc);
            ai.update(&mut npc, &ctx(f64::from(i) * 2.0, 0.0), &PositionSnapshot::new());
            // A destination under the snap threshold is reached immediately.
            let dest = npc.target_position.unwrap_or(npc.position());
            assert!(dest.distance(npc.home) <= 80.0 + 1e-3);
            assert_eq!(npc.last_decision_time, Some(f64::from(i) * 2.0));
        }
    }

    #[test]
    fn test_wander_near_edge_stays_in_world() {
        let mut ai = AiEngine::new(
            AiConfig {
                wander_chance: 1.0,
                ..AiConfig::default()
            },
            &CombatConfig::default(),
        );
        let bounds = WorldBounds::new(1000.0, 1000.0);
        let mut npc = npc_at(5.0, 5.0).with_wander_radius(120.0).with_speed(200.0);
        for i in 0..60 {
            let ctx = AiContext {
                bounds: Some(bounds),
                ..ctx(f64::from(i) * 0.5, 0.5)
            };
            ai.update(&mut npc, &ctx, &PositionSnapshot::new());
            assert!(bounds.contains(npc.position()), "Left the world at step {i}: {:?}", npc.position());
            if let Some(dest) = npc.target_position {
                assert!(bounds.contains(dest));
            }
        }
    }

    #[test]
    fn test_move_to_outside_world_is_clamped() {
        let mut ai = engine();
        let bounds = WorldBounds::new(200.0, 200.0);
        let mut npc = npc_at(100.0, 100.0).with_speed(50.0);
        ai.move_to(&mut npc, Position::new(-500.0, 100.0));
        for i in 0..10 {
            let ctx = AiContext {
                bounds: Some(bounds),
                ..ctx(f64::from(i), 1.0)
            };
            ai.update(&mut npc, &ctx, &PositionSnapshot::new());
            assert!(bounds.contains(npc.position()));
        }
        assert_eq!(npc.position(), Position::new(0.0, 100.0));
        assert_eq!(npc.ai_state, AiState::Idle);
    }

    #[test]
    fn test_dead_npc_not_advanced() {
        let mut ai = engine();
        let mut npc = npc_at(0.0, 0.0);
        ai.move_to(&mut npc, Position::new(100.0, 0.0));
        npc.character.health = 0.0;
        ai.update(&mut npc, &ctx(1.0, 1.0), &PositionSnapshot::new());
        assert_eq!(npc.position(), Position::ZERO);
    }
}
