//! The update scheduler.
//!
//! [`Simulation`] owns all world and entity state. One call to
//! [`Simulation::tick`] advances everything by one logical step:
//!
//! 1. Dialogue replies that arrived since the last tick are applied
//! 2. Registry invariants are checked
//! 3. The player travels
//! 4. Every NPC's AI runs (movement and state transitions)
//! 5. Attacks from the AI and from the player are resolved
//! 6. Combat end is checked
//! 7. Encounters and settlement arrivals are detected (overworld only)
//!
//! Terrain is read-only after generation. `tick` is independent of any frame
//! rate; hosts call it at whatever cadence they like.

use std::sync::Arc;
use tracing::{debug, info, warn};
use wayfarer_common::{EntityId, Position, RegistryError, WayfarerResult, WorldBounds};
use wayfarer_world::{Battlefield, SettlementId, SettlementMap, TerrainGrid};

use crate::ai::{AiContext, AiEngine, AiState, PositionSnapshot};
use crate::character::{Character, Faction};
use crate::combat::{CombatResolver, CombatResult};
use crate::config::SimConfig;
use crate::dialogue::{DialogueGenerator, DialogueReply, DialogueService};
use crate::encounter::{CombatOutcome, CombatSession, Encounter, EncounterDetector, EncounterKind};
use crate::events::{EventBus, SimEvent};
use crate::movement::sanitize_delta;
use crate::npc::{Combatant, Npc, NpcError, NpcRegistry, NpcResult};
use crate::player::Player;

/// Which scene the simulation is in.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneMode {
    /// Travelling the overworld
    Overworld,
    /// Fighting on a battlefield
    Battle(CombatSession),
}

/// Player response to a neutral encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralChoice {
    /// Start a conversation
    Talk,
    /// Open trade
    Trade,
    /// Turn the NPC hostile
    Attack,
}

/// Result of a neutral choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceOutcome {
    /// A dialogue reply is on its way, identified by ticket
    DialogueRequested(u64),
    /// Trade was offered
    TradeOffered,
    /// The NPC is now hostile; a hostile encounter follows on the next tick
    TurnedHostile,
}

/// One resolved attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackRecord {
    /// Who attacked
    pub attacker: Combatant,
    /// Who was attacked
    pub defender: Combatant,
    /// Resolver output
    pub result: CombatResult,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Simulation time after the tick
    pub time: f64,
    /// Time step actually applied
    pub delta_time: f32,
    /// Dialogue replies applied at the start of the tick
    pub dialogue: Vec<DialogueReply>,
    /// NPCs whose AI state changed
    pub state_changes: usize,
    /// Attacks that passed the cooldown gate
    pub attacks: Vec<AttackRecord>,
    /// Fight outcome, reported once: the battle result, or on the overworld
    /// the player's defeat or the first NPC slain this tick
    pub combat_ended: Option<(EntityId, CombatOutcome)>,
    /// NPCs killed by attacks during this tick
    pub slain: Vec<EntityId>,
    /// Player encounter, `None` kind when nothing was in range
    pub encounter: Encounter,
    /// Settlement the player just arrived at
    pub settlement: Option<SettlementId>,
}

/// The simulation core.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    terrain: TerrainGrid,
    settlements: SettlementMap,
    player: Player,
    npcs: NpcRegistry,
    ai: AiEngine,
    combat: CombatResolver,
    encounters: EncounterDetector,
    dialogue: DialogueService,
    events: EventBus,
    scene: SceneMode,
    battlefield: Option<Battlefield>,
    time: f64,
    queued_player_attack: Option<EntityId>,
    player_defeat_reported: bool,
}

impl Simulation {
    /// Generates the overworld and places the player.
    #[must_use]
    pub fn new(mut config: SimConfig, player: Character) -> Self {
        config.validate();
        let terrain = TerrainGrid::generate(&config.world.terrain);
        let settlements = SettlementMap::scatter(
            terrain.bounds(),
            config.world.settlement_count,
            config.world.settlement_margin,
            config.world.terrain.seed,
        );
        let mut player = Player::new(player);
        player.character.position = terrain.bounds().clamp(player.character.position);

        info!(
            "Simulation ready: {}x{} world, {} settlements",
            terrain.bounds().width,
            terrain.bounds().height,
            settlements.len()
        );

        Self {
            ai: AiEngine::new(config.ai.clone(), &config.combat),
            combat: CombatResolver::new(config.combat.clone()),
            encounters: EncounterDetector::new(config.encounter.clone()),
            dialogue: DialogueService::default(),
            events: EventBus::new(config.event_capacity),
            config,
            terrain,
            settlements,
            player,
            npcs: NpcRegistry::new(),
            scene: SceneMode::Overworld,
            battlefield: None,
            time: 0.0,
            queued_player_attack: None,
            player_defeat_reported: false,
        }
    }

    /// Replaces the dialogue generator.
    #[must_use]
    pub fn with_dialogue_generator(mut self, generator: Arc<dyn DialogueGenerator>) -> Self {
        self.dialogue = DialogueService::new(generator);
        self
    }

    /// Replaces the settlements.
    #[must_use]
    pub fn with_settlements(mut self, settlements: SettlementMap) -> Self {
        self.settlements = settlements;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Simulation time in seconds.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current scene.
    #[must_use]
    pub const fn scene(&self) -> &SceneMode {
        &self.scene
    }

    /// True while a battle is in progress.
    #[must_use]
    pub const fn in_battle(&self) -> bool {
        matches!(self.scene, SceneMode::Battle(_))
    }

    /// Overworld terrain.
    #[must_use]
    pub const fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    /// Battlefield of the current battle.
    #[must_use]
    pub const fn battlefield(&self) -> Option<&Battlefield> {
        self.battlefield.as_ref()
    }

    /// Overworld settlements.
    #[must_use]
    pub const fn settlements(&self) -> &SettlementMap {
        &self.settlements
    }

    /// The player.
    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// The player, mutably.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// All NPCs.
    #[must_use]
    pub const fn npcs(&self) -> &NpcRegistry {
        &self.npcs
    }

    /// All NPCs, mutably.
    pub fn npcs_mut(&mut self) -> &mut NpcRegistry {
        &mut self.npcs
    }

    /// Drains events published since the last call.
    pub fn drain_events(&self) -> Vec<SimEvent> {
        self.events.drain()
    }

    /// Bounds of the active scene.
    #[must_use]
    pub fn active_bounds(&self) -> WorldBounds {
        match (&self.scene, &self.battlefield) {
            (SceneMode::Battle(_), Some(field)) => field.grid.bounds(),
            _ => self.terrain.bounds(),
        }
    }

    /// Seconds until the player may attack again.
    #[must_use]
    pub fn player_cooldown(&self) -> f64 {
        let character = &self.player.character;
        self.combat
            .remaining_cooldown(character, self.time, character.equipped_weapon.as_ref())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Adds an NPC.
    pub fn spawn_npc(&mut self, npc: Npc) -> NpcResult<EntityId> {
        let id = self.npcs.insert(npc)?;
        debug!("Spawned NPC {}", id);
        Ok(id)
    }

    /// Queues a player attack, attempted during the next tick's combat phase.
    pub fn queue_player_attack(&mut self, target: EntityId) -> NpcResult<()> {
        if !self.npcs.contains(target) {
            return Err(NpcError::NotFound(target));
        }
        self.queued_player_attack = Some(target);
        Ok(())
    }

    /// Orders an NPC to fight `target`.
    pub fn command_attack(&mut self, npc: EntityId, target: Combatant) -> NpcResult<()> {
        if let Combatant::Npc(id) = target {
            if !self.npcs.contains(id) {
                return Err(NpcError::NotFound(id));
            }
        }
        let attacker = self.npcs.get_mut(npc).ok_or(NpcError::NotFound(npc))?;
        self.ai.start_combat(attacker, target);
        Ok(())
    }

    /// Starts a battle against `enemy` on `battlefield`.
    ///
    /// Overworld positions are remembered for [`Simulation::teardown_encounter`].
    pub fn enter_combat(&mut self, enemy: EntityId, battlefield: Battlefield) -> NpcResult<()> {
        let npc = self.npcs.get_mut(enemy).ok_or(NpcError::NotFound(enemy))?;
        let session = CombatSession::new(
            enemy,
            self.player.position(),
            npc.position(),
            battlefield.seed,
        );

        npc.character.position = battlefield.enemy_spawn;
        npc.home = battlefield.enemy_spawn;
        self.ai.start_combat(npc, Combatant::Player);
        self.player.character.position = battlefield.player_spawn;
        self.player.destination = None;
        self.queued_player_attack = None;

        info!("Battle started against {}", npc.name());
        self.scene = SceneMode::Battle(session);
        self.battlefield = Some(battlefield);
        Ok(())
    }

    /// Ends the current battle and returns to the overworld.
    ///
    /// A defeated enemy is removed; a surviving one goes back to its overworld
    /// position. Outstanding dialogue with the enemy is cancelled.
    pub fn teardown_encounter(&mut self) -> Option<CombatOutcome> {
        let SceneMode::Battle(session) = std::mem::replace(&mut self.scene, SceneMode::Overworld) else {
            return None;
        };
        self.battlefield = None;
        self.queued_player_attack = None;
        self.player.character.position = session.player_return;
        self.dialogue.cancel(session.enemy);

        let enemy_alive = self.npcs.get(session.enemy).is_some_and(Npc::is_alive);
        if enemy_alive {
            if let Some(npc) = self.npcs.get_mut(session.enemy) {
                npc.character.position = session.enemy_return;
                npc.home = session.enemy_return;
                self.ai.stand_down(npc);
            }
        } else if self.npcs.remove(session.enemy).is_ok() {
            debug!("Removed defeated NPC {}", session.enemy);
        }

        info!("Returned to overworld after battle ({:?})", session.outcome);
        session.outcome
    }

    /// Applies the player's choice in a neutral encounter.
    pub fn resolve_neutral_choice(
        &mut self,
        npc: EntityId,
        choice: NeutralChoice,
        message: &str,
    ) -> NpcResult<ChoiceOutcome> {
        let target = self.npcs.get_mut(npc).ok_or(NpcError::NotFound(npc))?;
        match choice {
            NeutralChoice::Talk => {
                let ticket = self.dialogue.request(target, message, self.time)?;
                target.add_conversation(self.player.character.name.clone(), message);
                Ok(ChoiceOutcome::DialogueRequested(ticket))
            },
            NeutralChoice::Trade => {
                info!("Trading with {}", target.name());
                Ok(ChoiceOutcome::TradeOffered)
            },
            NeutralChoice::Attack => {
                info!("{} is now hostile", target.name());
                target.character.faction = Some(Faction::Hostile);
                Ok(ChoiceOutcome::TurnedHostile)
            },
        }
    }

    /// Cancels outstanding dialogue with an NPC.
    pub fn cancel_dialogue(&mut self, npc: EntityId) -> bool {
        self.dialogue.cancel(npc)
    }

    /// Cancels dialogue requests older than `max_wait` seconds.
    pub fn abandon_stale_dialogue(&mut self, max_wait: f64) -> Vec<EntityId> {
        self.dialogue.abandon_stale(self.time, max_wait)
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advances the simulation by `delta_time` seconds.
    ///
    /// Negative or non-finite steps are treated as zero. Errors are registry
    /// invariant violations and leave the tick incomplete.
    pub fn tick(&mut self, delta_time: f32) -> WayfarerResult<TickReport> {
        let dt = sanitize_delta(delta_time);
        let mut report = TickReport {
            delta_time: dt,
            dialogue: self.deliver_dialogue(),
            ..TickReport::default()
        };

        self.npcs.validate()?;
        if !self.player.position().is_finite() {
            let pos = self.player.position();
            return Err(RegistryError::InvalidPosition {
                id: self.player.character.id,
                x: pos.x,
                y: pos.y,
            }
            .into());
        }

        self.time += f64::from(dt);
        report.time = self.time;
        let bounds = self.active_bounds();

        if self.player.is_alive() {
            self.player
                .travel(dt, self.config.ai.snap_threshold, Some(bounds));
        }

        let intents = self.run_ai(dt, bounds, &mut report);
        self.resolve_npc_attacks(&intents, &mut report);
        self.resolve_player_attack(&mut report)?;
        self.check_combat_end(&mut report);

        if !self.in_battle() && self.player.is_alive() {
            self.detect_encounters(&mut report);
        }
        Ok(report)
    }

    fn deliver_dialogue(&mut self) -> Vec<DialogueReply> {
        let replies = self.dialogue.drain();
        for reply in &replies {
            match self.npcs.get_mut(reply.npc) {
                Some(npc) => {
                    let speaker = npc.name().to_string();
                    npc.add_conversation(speaker, reply.text.clone());
                    self.events.publish(SimEvent::DialogueDelivered {
                        npc: reply.npc,
                        text: reply.text.clone(),
                    });
                },
                None => debug!("Dropping dialogue for missing NPC {}", reply.npc),
            }
        }
        replies
    }

    fn snapshot(&self) -> PositionSnapshot {
        let mut snapshot = PositionSnapshot::new();
        snapshot.set_player(self.player.position(), self.player.is_alive());
        for npc in self.npcs.iter() {
            snapshot.set_npc(npc.id(), npc.position(), npc.is_alive());
        }
        snapshot
    }

    fn run_ai(
        &mut self,
        dt: f32,
        bounds: WorldBounds,
        report: &mut TickReport,
    ) -> Vec<(EntityId, Combatant)> {
        let snapshot = self.snapshot();
        let (active, engage_range) = match &self.scene {
            SceneMode::Battle(session) => (Some(session.enemy), None),
            // Overworld armies close to contact before fighting the player.
            SceneMode::Overworld => (None, Some(self.encounters.trigger_radius())),
        };
        let ctx = AiContext {
            now: self.time,
            delta_time: dt,
            bounds: Some(bounds),
            engage_range,
        };

        let mut intents = Vec::new();
        for npc in self.npcs.iter_mut() {
            if active.is_some_and(|id| id != npc.id()) {
                continue;
            }
            let outcome = self.ai.update(npc, &ctx, &snapshot);
            if outcome.changed() {
                report.state_changes += 1;
                self.events.publish(SimEvent::AiStateChanged {
                    npc: npc.id(),
                    from: outcome.previous,
                    to: outcome.current,
                });
            }
            if let Some(target) = outcome.attack {
                intents.push((npc.id(), target));
            }
        }
        intents
    }

    fn resolve_npc_attacks(&mut self, intents: &[(EntityId, Combatant)], report: &mut TickReport) {
        for &(attacker_id, target) in intents {
            let result = match target {
                Combatant::Player => {
                    let Some(attacker) = self.npcs.get_mut(attacker_id) else {
                        continue;
                    };
                    let defender = &mut self.player.character;
                    if !attacker.is_alive()
                        || !defender.is_alive()
                        || !self.combat.in_range(
                            &attacker.character,
                            defender,
                            attacker.character.equipped_weapon.as_ref(),
                        )
                    {
                        continue;
                    }
                    self.combat
                        .resolve_equipped_attack(&mut attacker.character, defender, self.time)
                },
                Combatant::Npc(defender_id) => {
                    let Some((attacker, defender)) = self.npcs.pair_mut(attacker_id, defender_id)
                    else {
                        continue;
                    };
                    if !attacker.is_alive()
                        || !defender.is_alive()
                        || !self.combat.in_range(
                            &attacker.character,
                            &defender.character,
                            attacker.character.equipped_weapon.as_ref(),
                        )
                    {
                        continue;
                    }
                    let result = self.combat.resolve_equipped_attack(
                        &mut attacker.character,
                        &mut defender.character,
                        self.time,
                    );
                    if result.hit && !defender.is_alive() {
                        info!("{} was slain by {}", defender.name(), attacker.name());
                    }
                    result
                },
            };
            self.record_attack(Combatant::Npc(attacker_id), target, result, report);
        }
    }

    fn resolve_player_attack(&mut self, report: &mut TickReport) -> WayfarerResult<()> {
        let Some(target) = self.queued_player_attack.take() else {
            return Ok(());
        };
        let npc = self
            .npcs
            .get_mut(target)
            .ok_or(RegistryError::MissingEntity(target))?;
        let player = &mut self.player.character;
        if !player.is_alive() || !npc.is_alive() {
            return Ok(());
        }
        if !self
            .combat
            .in_range(player, &npc.character, player.equipped_weapon.as_ref())
        {
            debug!("{} is out of the player's reach", npc.name());
            return Ok(());
        }

        let result = self
            .combat
            .resolve_equipped_attack(player, &mut npc.character, self.time);
        let engaged = matches!(npc.ai_state, AiState::Attacking | AiState::Fleeing)
            || npc.combat_target.is_some();
        if result.attack_succeeded && npc.is_alive() && !engaged {
            debug!("{} fights back", npc.name());
            self.ai.start_combat(npc, Combatant::Player);
        }
        self.record_attack(Combatant::Player, Combatant::Npc(target), result, report);
        Ok(())
    }

    fn record_attack(
        &mut self,
        attacker: Combatant,
        defender: Combatant,
        result: CombatResult,
        report: &mut TickReport,
    ) {
        if !result.attack_succeeded {
            return;
        }
        self.events
            .publish(SimEvent::attack(attacker, defender, &result));
        report.attacks.push(AttackRecord {
            attacker,
            defender,
            result,
        });
    }

    fn check_combat_end(&mut self, report: &mut TickReport) {
        report.slain = report
            .attacks
            .iter()
            .filter(|a| a.result.hit)
            .filter_map(|a| match a.defender {
                Combatant::Npc(id) => Some(id),
                Combatant::Player => None,
            })
            .filter(|id| self.npcs.get(*id).is_some_and(|n| !n.is_alive()))
            .fold(Vec::new(), |mut slain, id| {
                if !slain.contains(&id) {
                    slain.push(id);
                }
                slain
            });

        let player_alive = self.player.is_alive();
        match &mut self.scene {
            SceneMode::Battle(session) => {
                let enemy_alive = self.npcs.get(session.enemy).is_some_and(Npc::is_alive);
                if let Some(outcome) = session.check_end(player_alive, enemy_alive, self.time) {
                    report.combat_ended = Some((session.enemy, outcome));
                    self.events.publish(SimEvent::CombatEnded {
                        npc: session.enemy,
                        outcome,
                    });
                }
            },
            SceneMode::Overworld => {
                for &npc in &report.slain {
                    report
                        .combat_ended
                        .get_or_insert((npc, CombatOutcome::EnemyDefeated));
                    self.events.publish(SimEvent::CombatEnded {
                        npc,
                        outcome: CombatOutcome::EnemyDefeated,
                    });
                }

                if player_alive {
                    self.player_defeat_reported = false;
                    return;
                }
                if self.player_defeat_reported {
                    return;
                }
                self.player_defeat_reported = true;
                let killer = report
                    .attacks
                    .iter()
                    .rev()
                    .find(|a| a.defender == Combatant::Player && a.result.hit)
                    .and_then(|a| match a.attacker {
                        Combatant::Npc(id) => Some(id),
                        Combatant::Player => None,
                    });
                match killer {
                    Some(npc) => {
                        // Player defeat outranks any NPC death in the same tick.
                        report.combat_ended = Some((npc, CombatOutcome::PlayerDefeated));
                        self.events.publish(SimEvent::CombatEnded {
                            npc,
                            outcome: CombatOutcome::PlayerDefeated,
                        });
                    },
                    None => warn!("Player died outside of combat"),
                }
            },
        }
    }

    fn detect_encounters(&mut self, report: &mut TickReport) {
        let position = self.player.position();
        report.encounter = self.encounters.detect(position, &mut self.npcs);
        if let Some(npc) = report.encounter.other {
            self.events.publish(SimEvent::EncounterRaised {
                kind: report.encounter.kind,
                npc,
            });
        }

        report.settlement = self.encounters.check_location(position, &self.settlements);
        if let Some(settlement) = report.settlement {
            self.events
                .publish(SimEvent::SettlementReached { settlement });
        }
    }

    /// True once a finished battle has been shown for the end-of-combat delay.
    #[must_use]
    pub fn teardown_ready(&self) -> bool {
        match &self.scene {
            SceneMode::Battle(session) => {
                session.ready_for_teardown(self.time, self.config.encounter.combat_end_delay)
            },
            SceneMode::Overworld => false,
        }
    }

    /// Position of a combatant.
    #[must_use]
    pub fn position_of(&self, combatant: Combatant) -> Option<Position> {
        match combatant {
            Combatant::Player => Some(self.player.position()),
            Combatant::Npc(id) => self.npcs.get(id).map(Npc::position),
        }
    }
}
