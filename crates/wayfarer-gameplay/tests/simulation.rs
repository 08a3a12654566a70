//! End-to-end tests driving full simulation ticks.

use std::time::{Duration, Instant};

use wayfarer_common::{EntityId, Position};
use wayfarer_gameplay::prelude::*;
use wayfarer_world::{Battlefield, SettlementKind, SettlementMap, TerrainConfig};

const DT: f32 = 0.1;

fn simulation(config: SimConfig) -> Simulation {
    let mut config = config.with_seed(77);
    config.world.terrain = TerrainConfig::new(1600, 1600, 77);
    config.world.settlement_count = 0;
    Simulation::new(config, Character::new("Hero", Position::new(800.0, 800.0)))
}

fn spawn(sim: &mut Simulation, name: &str, faction: Faction, x: f32, y: f32) -> EntityId {
    let character = Character::new(name, Position::new(x, y)).with_faction(faction);
    sim.spawn_npc(Npc::new(character)).expect("spawn")
}

fn place_player(sim: &mut Simulation, x: f32, y: f32) {
    sim.player_mut().character.position = Position::new(x, y);
}

mod encounter_tests {
    use super::*;

    #[test]
    fn e2e_neutral_encounter_is_one_shot_per_approach() {
        let mut sim = simulation(SimConfig::default());
        let merchant = spawn(&mut sim, "Merchant", Faction::Neutral, 810.0, 800.0);

        let first = sim.tick(DT).expect("tick");
        assert_eq!(first.encounter.kind, EncounterKind::Neutral);
        assert_eq!(first.encounter.other, Some(merchant));

        for _ in 0..10 {
            let report = sim.tick(DT).expect("tick");
            assert!(report.encounter.is_none(), "Neutral encounter must not repeat while in range");
        }

        place_player(&mut sim, 900.0, 800.0);
        assert!(sim.tick(DT).expect("tick").encounter.is_none());
        assert!(
            !sim.npcs().get(merchant).expect("npc").encounter_triggered,
            "Latch should clear once the pair separates"
        );

        place_player(&mut sim, 805.0, 800.0);
        let again = sim.tick(DT).expect("tick");
        assert_eq!(again.encounter.kind, EncounterKind::Neutral, "Re-approach should retrigger");
    }

    #[test]
    fn e2e_hostile_encounter_every_in_range_tick() {
        let mut sim = simulation(SimConfig::default());
        let raider = spawn(&mut sim, "Raider", Faction::Hostile, 815.0, 800.0);
        for _ in 0..5 {
            let report = sim.tick(DT).expect("tick");
            assert_eq!(report.encounter.kind, EncounterKind::Hostile);
            assert_eq!(report.encounter.other, Some(raider));
            assert!(report.encounter.battlefield.is_some());
        }
    }

    #[test]
    fn e2e_aggressive_army_closes_to_contact() {
        let mut sim = simulation(SimConfig::default());
        let bandit = sim
            .spawn_npc(
                Npc::new(Character::new("Bandit", Position::new(950.0, 800.0)).with_faction(Faction::Bandit))
                    .with_speed(80.0)
                    .with_aggro_radius(200.0),
            )
            .expect("spawn");

        let mut raised = false;
        for _ in 0..100 {
            let report = sim.tick(DT).expect("tick");
            if report.encounter.kind == EncounterKind::Hostile {
                assert_eq!(report.encounter.other, Some(bandit));
                raised = true;
                break;
            }
        }
        assert!(raised, "Chasing bandit should reach encounter range");
    }

    #[test]
    fn e2e_settlement_reached_once() {
        let mut map = SettlementMap::new();
        let town = map.add("Ashford", Position::new(1000.0, 800.0), SettlementKind::Town, "crown");
        let mut sim = simulation(SimConfig::default()).with_settlements(map);
        sim.player_mut().travel_to(Position::new(1000.0, 800.0));

        let mut arrivals = 0;
        for _ in 0..60 {
            let report = sim.tick(DT).expect("tick");
            if report.settlement == Some(town) {
                arrivals += 1;
            }
        }
        assert_eq!(arrivals, 1, "Arrival is reported once per approach");
        assert_eq!(sim.player().position(), Position::new(1000.0, 800.0));
        assert!(sim
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimEvent::SettlementReached { settlement } if *settlement == town)));
    }
}

mod combat_tests {
    use super::*;

    #[test]
    fn e2e_battle_runs_to_completion() {
        let mut config = SimConfig::default();
        config.ai.flee_health_ratio = 0.0;
        let mut sim = simulation(config);
        let sword = WeaponCatalog::with_defaults().get("iron_sword").expect("sword");
        sim.player_mut().character.equipped_weapon = Some(sword.clone());
        let enemy = sim
            .spawn_npc(
                Npc::new(
                    Character::new("Raider", Position::new(812.0, 800.0))
                        .with_faction(Faction::Bandit)
                        .with_weapon(sword),
                )
                .with_speed(250.0),
            )
            .expect("spawn");

        let report = sim.tick(DT).expect("tick");
        let field = report.encounter.battlefield.expect("hostile encounter carries a battlefield");
        sim.enter_combat(enemy, Battlefield::generate(&field)).expect("enter combat");
        let start = sim.time();

        let mut enemy_attacks = 0usize;
        let mut outcome = None;
        for _ in 0..3000 {
            sim.queue_player_attack(enemy).expect("queue");
            let report = sim.tick(DT).expect("tick");
            enemy_attacks += report
                .attacks
                .iter()
                .filter(|a| a.attacker == Combatant::Npc(enemy))
                .count();
            if let Some((npc, ended)) = report.combat_ended {
                assert_eq!(npc, enemy);
                outcome = Some(ended);
                break;
            }
        }
        let outcome = outcome.expect("battle should end");

        // 1.2 attacks per second at most.
        let elapsed = sim.time() - start;
        assert!(enemy_attacks as f64 <= elapsed * 1.2 + 1.0, "Enemy attacked too often");

        while !sim.teardown_ready() {
            sim.tick(DT).expect("tick");
        }
        assert_eq!(sim.teardown_encounter(), Some(outcome));
        assert_eq!(sim.player().position(), Position::new(800.0, 800.0));
        match outcome {
            CombatOutcome::EnemyDefeated => assert!(!sim.npcs().contains(enemy)),
            CombatOutcome::PlayerDefeated => {
                assert!(!sim.player().is_alive());
                assert_eq!(sim.npcs().get(enemy).map(Npc::position), Some(Position::new(812.0, 800.0)));
            },
        }
    }

    #[test]
    fn e2e_player_cooldown_counts_down() {
        let mut sim = simulation(SimConfig::default());
        let target = spawn(&mut sim, "Dummy", Faction::Neutral, 830.0, 800.0);
        sim.tick(1.0).expect("tick");
        assert!(sim.player_cooldown().abs() < 1e-9);

        sim.queue_player_attack(target).expect("queue");
        let report = sim.tick(DT).expect("tick");
        assert_eq!(report.attacks.len(), 1);
        let after_attack = sim.player_cooldown();
        assert!(after_attack > 0.0);

        sim.tick(DT).expect("tick");
        assert!(sim.player_cooldown() < after_attack);

        // Attacks during cooldown are gated and not reported.
        sim.queue_player_attack(target).expect("queue");
        let gated = sim.tick(DT).expect("tick");
        assert!(gated
            .attacks
            .iter()
            .all(|a| a.attacker != Combatant::Player));
    }

    #[test]
    fn e2e_npcs_fight_each_other() {
        let mut sim = simulation(SimConfig::default());
        let guard = spawn(&mut sim, "Guard", Faction::Allied, 200.0, 200.0);
        let thief = spawn(&mut sim, "Thief", Faction::Bandit, 230.0, 200.0);
        sim.command_attack(guard, Combatant::Npc(thief)).expect("command");

        let mut hits = 0;
        for _ in 0..50 {
            let report = sim.tick(DT).expect("tick");
            hits += report
                .attacks
                .iter()
                .filter(|a| a.attacker == Combatant::Npc(guard) && a.defender == Combatant::Npc(thief))
                .count();
        }
        assert!(hits >= 3, "Guard should attack repeatedly, got {hits}");
        assert!(sim.command_attack(guard, Combatant::Npc(EntityId::new())).is_err());
    }
}

mod dialogue_tests {
    use super::*;

    #[test]
    fn e2e_talk_reply_delivered_at_tick_start() {
        let mut sim = simulation(SimConfig::default());
        let merchant = spawn(&mut sim, "Mira", Faction::Neutral, 810.0, 800.0);
        assert_eq!(sim.tick(DT).expect("tick").encounter.kind, EncounterKind::Neutral);

        let outcome = sim
            .resolve_neutral_choice(merchant, NeutralChoice::Talk, "hello")
            .expect("talk");
        assert!(matches!(outcome, ChoiceOutcome::DialogueRequested(_)));
        assert!(matches!(
            sim.resolve_neutral_choice(merchant, NeutralChoice::Talk, "hello?"),
            Err(NpcError::Dialogue(DialogueError::AlreadyPending(_)))
        ));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut delivered = Vec::new();
        while delivered.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            delivered = sim.tick(DT).expect("tick").dialogue;
        }
        assert_eq!(delivered.len(), 1, "Reply should arrive through the mailbox");
        assert_eq!(delivered[0].text, "Hello, I'm Mira.");

        let npc = sim.npcs().get(merchant).expect("npc");
        let lines: Vec<&str> = npc.conversation.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(lines, vec!["hello", "Hello, I'm Mira."]);
        assert!(sim
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimEvent::DialogueDelivered { npc, .. } if *npc == merchant)));
    }

    #[test]
    fn e2e_cancelled_dialogue_is_discarded() {
        let mut sim = simulation(SimConfig::default());
        let merchant = spawn(&mut sim, "Mira", Faction::Neutral, 810.0, 800.0);
        sim.resolve_neutral_choice(merchant, NeutralChoice::Talk, "hello")
            .expect("talk");
        assert!(sim.cancel_dialogue(merchant));

        for _ in 0..20 {
            std::thread::sleep(Duration::from_millis(5));
            assert!(sim.tick(DT).expect("tick").dialogue.is_empty());
        }
        let npc = sim.npcs().get(merchant).expect("npc");
        assert_eq!(npc.conversation.len(), 1, "Only the player's line remains");
    }
}
