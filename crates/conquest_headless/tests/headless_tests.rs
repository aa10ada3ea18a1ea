//! Headless runner tests.
//!
//! Strategies against hand-built worlds, scenario files on disk and small
//! batches end to end.

use std::path::Path;

use conquest_core::config::{Color, FactionConfig};
use conquest_core::factions::FactionId;
use conquest_core::planet::PlanetId;
use conquest_core::simulation::Simulation;
use conquest_headless::batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
use conquest_headless::scenario::Scenario;
use conquest_headless::strategies::{strategy_by_name, Aggressor, Defender, Expander};
use conquest_test_utils::fixtures::{duel_config, run_until, sim_with, PlanetSpec};

const A: FactionId = FactionId(0);
const B: FactionId = FactionId(1);

const SHORT_DUEL: &str = r#"
Scenario(
    name: "Short duel",
    description: "Fifteen seconds, two bots",
    config: (
        match_duration_secs: 15.0,
        neutral_count: Some(6),
        factions: [
            (name: "Red", color: (235, 64, 52), controller: Bot(strategy: "aggressor")),
            (name: "Green", color: (76, 175, 80), controller: Bot(strategy: "expander")),
        ],
    ),
)
"#;

fn write_scenario(dir: &Path) -> String {
    let path = dir.join("short_duel.ron");
    std::fs::write(&path, SHORT_DUEL).unwrap();
    path.display().to_string()
}

fn bot_duel(planets: &[PlanetSpec]) -> Simulation {
    let config = duel_config(120.0).with_factions(vec![
        FactionConfig::bot("A", Color(1, 1, 1), "test"),
        FactionConfig::bot("B", Color(2, 2, 2), "test"),
    ]);
    sim_with(config, planets)
}

// ============================================================================
// Strategies
// ============================================================================

mod strategies {
    use super::*;

    #[test]
    fn expander_takes_the_cheap_neutral() {
        let mut sim = bot_duel(&[
            PlanetSpec::at(100, 100, 60).owned_by(0),
            PlanetSpec::at(220, 100, 5),
            PlanetSpec::at(400, 600, 200),
            PlanetSpec::at(1100, 700, 30).owned_by(1),
        ]);
        sim.bind_controller(A, Box::new(Expander::default())).unwrap();

        run_until(&mut sim, 300, |s| s.planets()[1].owner() == Some(A));

        assert_eq!(sim.planets()[1].owner(), Some(A));
        assert!(sim.planets()[2].is_neutral());
    }

    #[test]
    fn expander_does_not_overpay() {
        let mut sim = bot_duel(&[
            PlanetSpec::at(100, 100, 60).owned_by(0),
            PlanetSpec::at(220, 100, 5),
            PlanetSpec::at(1100, 700, 30).owned_by(1),
        ]);
        sim.bind_controller(A, Box::new(Expander::default())).unwrap();

        sim.step();

        // Five defenders, one to win, two spare.
        assert_eq!(sim.movements().len(), 1);
        assert_eq!(sim.movements()[0].amount(), 8);
        assert_eq!(sim.movements()[0].destination(), PlanetId(1));
    }

    #[test]
    fn aggressor_prefers_enemy_planets() {
        let mut sim = bot_duel(&[
            PlanetSpec::at(100, 100, 80).owned_by(0),
            PlanetSpec::at(200, 300, 2),
            PlanetSpec::at(300, 100, 20).owned_by(1),
            PlanetSpec::at(1100, 700, 30).owned_by(1),
        ]);
        sim.bind_controller(A, Box::new(Aggressor::default())).unwrap();

        sim.step();

        let movement = &sim.movements()[0];
        assert_eq!(movement.destination(), PlanetId(2));
        // Three quarters of 80 beats the 24 strictly needed.
        assert_eq!(movement.amount(), 60);
    }

    #[test]
    fn aggressor_expands_when_enemies_are_out_of_reach() {
        let mut sim = bot_duel(&[
            PlanetSpec::at(100, 100, 20).owned_by(0),
            PlanetSpec::at(200, 300, 2),
            PlanetSpec::at(1100, 700, 300).owned_by(1),
        ]);
        sim.bind_controller(A, Box::new(Aggressor::default())).unwrap();

        sim.step();

        assert_eq!(sim.movements()[0].destination(), PlanetId(1));
    }

    #[test]
    fn defender_reinforces_planet_under_attack() {
        let mut sim = bot_duel(&[
            PlanetSpec::at(100, 100, 10).owned_by(0),
            PlanetSpec::at(100, 200, 60).owned_by(0),
            PlanetSpec::at(700, 100, 80).owned_by(1),
        ]);
        sim.bind_controller(A, Box::new(Defender::default())).unwrap();
        sim.send_troops(PlanetId(2), PlanetId(0), 40).unwrap();

        sim.step();

        let help = sim
            .movements()
            .iter()
            .find(|m| m.owner() == A)
            .expect("defender should send help");
        assert_eq!(help.origin(), PlanetId(1));
        assert_eq!(help.destination(), PlanetId(0));

        run_until(&mut sim, 600, |s| s.movements().is_empty());
        assert_eq!(sim.planets()[0].owner(), Some(A));
    }

    #[test]
    fn strategies_never_trip_the_ownership_check() {
        for name in ["expander", "aggressor", "defender"] {
            let mut sim = Simulation::new(
                duel_config(60.0).with_factions(vec![
                    FactionConfig::bot("A", Color(1, 1, 1), name),
                    FactionConfig::bot("B", Color(2, 2, 2), name),
                ]),
            )
            .unwrap();
            sim.bind_controller(A, strategy_by_name(name).unwrap()).unwrap();
            sim.bind_controller(B, strategy_by_name(name).unwrap()).unwrap();

            run_until(&mut sim, 4_000, Simulation::is_over);

            assert!(sim.is_over(), "{name} match should end");
            assert!(sim.state().stats().total_sent() > 0, "{name} never moved");
        }
    }
}

// ============================================================================
// Scenarios and batches
// ============================================================================

mod batches {
    use super::*;

    #[test]
    fn scenario_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scenario(dir.path());

        let scenario = Scenario::resolve(&path).unwrap();

        assert_eq!(scenario.name, "Short duel");
        assert_eq!(scenario.config.match_duration_secs, 15.0);
        assert_eq!(scenario.config.neutral_count, Some(6));
    }

    #[test]
    fn malformed_scenario_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "Scenario(name: ").unwrap();

        let err = Scenario::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse scenario"));
    }

    #[test]
    fn small_batch_runs_every_seed() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = write_scenario(dir.path());

        let results = run_batch(BatchConfig::new(&scenario, 4).with_seed(10)).unwrap();

        assert_eq!(results.games.len(), 4);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 4);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
        for game in &results.games {
            assert!(game.duration_secs <= 15.0 + 1e-6);
            assert_eq!(game.factions.len(), 2);
        }
    }

    #[test]
    fn batch_results_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = write_scenario(dir.path());
        let results = run_batch(BatchConfig::new(&scenario, 2).with_parallelism(2)).unwrap();

        let path = dir.path().join("out").join("batch_results.json");
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();

        assert_eq!(loaded.config, results.config);
        assert_eq!(loaded.games.len(), 2);
        assert_eq!(loaded.summary.total_games, 2);
    }

    #[test]
    fn same_seed_replays_identically() {
        let scenario = Scenario::from_ron_str(SHORT_DUEL).unwrap();
        let outcome = verify_determinism(&scenario, 42, 3).unwrap();

        assert!(outcome.deterministic);
        assert_eq!(outcome.hashes.len(), 3);
    }
}
