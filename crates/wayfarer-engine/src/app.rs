//! Headless host loop.
//!
//! Builds an overworld populated with NPC armies, then drives the
//! simulation tick by tick. A [`Director`] stands in for the player: it
//! travels between settlements, talks to neutral parties and fights
//! whoever attacks it.

use anyhow::Result;
use std::time::Instant;
use tracing::{debug, info, warn};
use wayfarer_common::{EntityId, Position};
use wayfarer_gameplay::prelude::*;
use wayfarer_world::Battlefield;

use crate::config::EngineConfig;
use crate::timing::TickClock;

/// Lines the player opens conversations with.
const GREETINGS: [&str; 4] = ["Hello there", "Any work for me?", "I could use some help", "Fine weather"];

/// Tallies of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Ticks executed
    pub ticks: u64,
    /// Simulated seconds
    pub simulated_seconds: f64,
    /// Battles started
    pub battles: u32,
    /// Battles the player won
    pub battles_won: u32,
    /// Battles the player lost
    pub battles_lost: u32,
    /// Neutral encounters
    pub neutral_meetings: u32,
    /// Dialogue replies received
    pub dialogue_lines: u32,
    /// Settlement arrivals
    pub settlements_visited: u32,
    /// Attacks that passed the cooldown gate
    pub attacks: u64,
}

/// Run the simulation to completion.
pub fn run(config: EngineConfig) -> Result<RunSummary> {
    let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
    let mut clock = TickClock::new(config.tick_rate);
    info!("Configuration loaded:");
    info!("  Tick rate: {} Hz", clock.tick_rate());
    info!("  Run length: {:.0}s ({} ticks)", config.run_seconds, config.total_ticks());
    info!("  Seed: {seed}");

    let mut sim = build_simulation(&config, seed)?;
    let mut director = Director::new(&sim, seed, config.dialogue_max_wait);
    let step = clock.step();
    let total = config.total_ticks();
    let report_every = u64::from(config.tick_rate) * 30;

    clock.reset();
    let mut ticks = 0u64;
    while ticks < total {
        let steps = if config.realtime {
            let dt = clock.delta_time();
            match clock.accumulate(dt) {
                0 => {
                    std::thread::sleep(clock.until_next_step());
                    continue;
                },
                n => u64::from(n),
            }
        } else {
            1
        };

        for _ in 0..steps.min(total - ticks) {
            let started = Instant::now();
            director.before_tick(&mut sim)?;
            let report = sim.tick(step)?;
            director.after_tick(&mut sim, &report)?;
            clock.record_tick(started.elapsed());
            ticks += 1;

            if ticks % report_every == 0 {
                info!(
                    "t={:.0}s: {} NPCs, {} battles, avg tick {:.3} ms",
                    sim.time(),
                    sim.npcs().len(),
                    director.summary().battles,
                    clock.average_tick_ms()
                );
            }
        }
    }

    let mut summary = director.summary;
    summary.simulated_seconds = sim.time();
    info!(
        "Run complete: {} ticks, {} battles ({} won, {} lost), {} attacks",
        summary.ticks,
        summary.battles,
        summary.battles_won,
        summary.battles_lost,
        summary.attacks
    );
    info!(
        "  {} neutral meetings, {} dialogue lines, {} settlements visited",
        summary.neutral_meetings,
        summary.dialogue_lines,
        summary.settlements_visited
    );
    Ok(summary)
}

/// Generate the overworld and populate it.
pub fn build_simulation(config: &EngineConfig, seed: u64) -> Result<Simulation> {
    let sim_config = config.sim.clone().with_seed(seed);
    let mut hero = Character::new("Wanderer", Position::new(0.0, 0.0)).with_faction(Faction::Allied);
    hero.equipped_weapon = WeaponCatalog::with_defaults().get("iron_sword");

    let mut sim = Simulation::new(sim_config, hero);
    let center = sim.terrain().bounds().center();
    let spot = sim.terrain().nearest_passable(center, 16).unwrap_or(center);
    sim.player_mut().character.position = spot;

    populate(&mut sim, config, seed)?;
    Ok(sim)
}

// ============================================================================
// Scenario
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Army {
    Bandit,
    Merchant,
    Patrol,
}

fn populate(sim: &mut Simulation, config: &EngineConfig, seed: u64) -> Result<()> {
    let mut rng = fastrand::Rng::with_seed(seed ^ 0x5CE7_A210);
    let catalog = WeaponCatalog::with_defaults();
    let armies = std::iter::repeat(Army::Bandit)
        .take(config.bandit_count)
        .chain(std::iter::repeat(Army::Merchant).take(config.merchant_count))
        .chain(std::iter::repeat(Army::Patrol).take(config.patrol_count));

    for (index, army) in armies.enumerate() {
        let position = spawn_point(sim, &mut rng);
        let npc = match army {
            Army::Bandit => {
                let weapon = if rng.bool() { "axe" } else { "dagger" };
                let mut character = Character::new(format!("Bandit Chief {index}"), position)
                    .with_faction(Faction::Bandit)
                    .with_attributes(12.0, 10.0, 9.0);
                character.equipped_weapon = catalog.get(weapon);
                Npc::new(character)
                    .with_speed(45.0)
                    .with_aggro_radius(180.0)
                    .with_wander_radius(120.0)
                    .with_personality(Personality {
                        traits: vec!["ruthless".to_string()],
                        kindness: 10,
                        aggression: 85,
                        profession: "raider".to_string(),
                    })
            },
            Army::Merchant => Npc::new(
                Character::new(format!("Merchant {index}"), position).with_faction(Faction::Neutral),
            )
            .with_speed(35.0)
            .with_needs(NpcNeeds::new())
            .with_wander_radius(250.0)
            .with_personality(Personality {
                traits: vec!["shrewd".to_string()],
                kindness: 80,
                aggression: 15,
                profession: "merchant".to_string(),
            }),
            Army::Patrol => {
                let mut character = Character::new(format!("Patrol {index}"), position)
                    .with_faction(Faction::Allied)
                    .with_attributes(11.0, 11.0, 11.0);
                character.equipped_weapon = catalog.get("spear");
                Npc::new(character)
                    .with_speed(50.0)
                    .with_needs(NpcNeeds::new())
                    .with_wander_radius(150.0)
                    .with_personality(Personality {
                        traits: vec!["dutiful".to_string()],
                        kindness: 60,
                        aggression: 40,
                        profession: "soldier".to_string(),
                    })
            },
        };
        sim.spawn_npc(npc)?;
    }

    info!(
        "Spawned {} bandits, {} merchants, {} patrols",
        config.bandit_count, config.merchant_count, config.patrol_count
    );
    Ok(())
}

/// Random passable point away from the player.
fn spawn_point(sim: &Simulation, rng: &mut fastrand::Rng) -> Position {
    let bounds = sim.terrain().bounds();
    let keep_clear = sim.config().encounter.trigger_radius * 10.0;
    let mut candidate = bounds.center();
    for _ in 0..8 {
        candidate = Position::new(rng.f32() * bounds.width, rng.f32() * bounds.height);
        if candidate.distance(sim.player().position()) >= keep_clear {
            break;
        }
    }
    sim.terrain()
        .nearest_passable(candidate, 8)
        .unwrap_or(candidate)
}

// ============================================================================
// Director
// ============================================================================

/// Plays the player's side of the simulation.
#[derive(Debug)]
pub struct Director {
    rng: fastrand::Rng,
    route: Vec<Position>,
    next_stop: usize,
    dialogue_max_wait: f64,
    summary: RunSummary,
}

impl Director {
    /// Plans a route through every settlement.
    #[must_use]
    pub fn new(sim: &Simulation, seed: u64, dialogue_max_wait: f64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed.rotate_left(17)),
            route: sim.settlements().iter().map(|s| s.position).collect(),
            next_stop: 0,
            dialogue_max_wait,
            summary: RunSummary::default(),
        }
    }

    /// Tallies so far.
    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Issue player commands for the coming tick.
    pub fn before_tick(&mut self, sim: &mut Simulation) -> Result<()> {
        if !sim.player().is_alive() {
            return Ok(());
        }

        let enemy = match sim.scene() {
            SceneMode::Battle(session) if session.outcome.is_none() => Some(session.enemy),
            SceneMode::Battle(_) => return Ok(()),
            SceneMode::Overworld => None,
        };

        match enemy {
            Some(enemy) => Self::press_attack(sim, enemy),
            None => {
                if sim.player().destination.is_none() {
                    let stop = self.next_destination(sim);
                    sim.player_mut().travel_to(stop);
                }
                Ok(())
            },
        }
    }

    fn press_attack(sim: &mut Simulation, enemy: EntityId) -> Result<()> {
        let Some(enemy_pos) = sim.position_of(Combatant::Npc(enemy)) else {
            return Ok(());
        };
        let reach = attack_range(
            sim.player().character.equipped_weapon.as_ref(),
            &sim.config().combat,
        );
        let player = sim.player_mut();
        if player.position().distance(enemy_pos) > reach * 0.8 {
            player.travel_to(enemy_pos);
        } else {
            player.destination = None;
        }
        sim.queue_player_attack(enemy)?;
        Ok(())
    }

    fn next_destination(&mut self, sim: &Simulation) -> Position {
        if self.route.is_empty() {
            let bounds = sim.active_bounds();
            return Position::new(self.rng.f32() * bounds.width, self.rng.f32() * bounds.height);
        }
        let stop = self.route[self.next_stop % self.route.len()];
        self.next_stop += 1;
        stop
    }

    /// React to what happened during a tick.
    pub fn after_tick(&mut self, sim: &mut Simulation, report: &TickReport) -> Result<()> {
        self.summary.ticks += 1;
        self.summary.attacks += report.attacks.len() as u64;
        self.summary.dialogue_lines += report.dialogue.len() as u32;

        for reply in &report.dialogue {
            let name = sim.npcs().get(reply.npc).map_or("someone", Npc::name);
            info!("{name} says: {}", reply.text);
        }

        if let Some(id) = report.settlement {
            self.summary.settlements_visited += 1;
            if let Some(settlement) = sim.settlements().get(id) {
                info!("Arrived at {}", settlement.name);
            }
        }

        if let Some((npc, outcome)) = report.combat_ended {
            if sim.in_battle() {
                match outcome {
                    CombatOutcome::EnemyDefeated => self.summary.battles_won += 1,
                    CombatOutcome::PlayerDefeated => self.summary.battles_lost += 1,
                }
            }
            info!("Fight with {npc} ended: {outcome:?}");
        }
        if !sim.in_battle() {
            for &npc in &report.slain {
                if sim.npcs_mut().remove(npc).is_ok() {
                    debug!("Cleared fallen NPC {npc} from the overworld");
                }
            }
        }

        self.handle_encounter(sim, &report.encounter)?;

        if sim.teardown_ready() {
            sim.teardown_encounter();
        }
        if !sim.in_battle() && !sim.player().is_alive() {
            sim.player_mut().revive();
            info!("The Wanderer recovers from their wounds");
        }

        for npc in sim.abandon_stale_dialogue(self.dialogue_max_wait) {
            warn!("Gave up waiting for {npc} to answer");
        }
        for event in sim.drain_events() {
            debug!(?event, "sim event");
        }
        Ok(())
    }

    fn handle_encounter(&mut self, sim: &mut Simulation, encounter: &Encounter) -> Result<()> {
        let Some(npc) = encounter.other else {
            return Ok(());
        };
        match encounter.kind {
            EncounterKind::Hostile => {
                let field = encounter.battlefield.clone().unwrap_or_default();
                sim.enter_combat(npc, Battlefield::generate(&field))?;
                self.summary.battles += 1;
            },
            EncounterKind::Neutral => {
                self.summary.neutral_meetings += 1;
                let greeting = GREETINGS[self.rng.usize(..GREETINGS.len())];
                match sim.resolve_neutral_choice(npc, NeutralChoice::Talk, greeting) {
                    Ok(_) => debug!("Said \"{greeting}\" to {npc}"),
                    Err(NpcError::Dialogue(DialogueError::AlreadyPending(_))) => {
                        debug!("Still waiting on {npc}");
                    },
                    Err(e) => return Err(e.into()),
                }
            },
            EncounterKind::None => {},
        }
        Ok(())
    }
}
