//! Simulation loop tests.
//!
//! Time handling, troop conservation, bot isolation and property tests over
//! generated worlds.

use std::time::Duration;

use conquest_core::config::{Color, FactionConfig, MatchConfig};
use conquest_core::decision::{DecisionApi, DecisionMaker, MoveIntent};
use conquest_core::error::GameError;
use conquest_core::factions::FactionId;
use conquest_core::math::Fixed;
use conquest_core::planet::PlanetId;
use conquest_core::simulation::Simulation;
use conquest_core::world_gen::generate_world;
use conquest_test_utils::determinism::{strategies, verify_simulation_determinism};
use conquest_test_utils::fixtures::{
    bot_config, duel_config, fixed, sim_with, GreedyBot, PlanetSpec, ScriptedBot,
};
use proptest::prelude::*;

const A: FactionId = FactionId(0);
const B: FactionId = FactionId(1);

fn human_vs_bot() -> MatchConfig {
    duel_config(120.0).with_factions(vec![
        FactionConfig::human("A", Color(1, 1, 1)),
        FactionConfig::bot("B", Color(2, 2, 2), "scripted"),
    ])
}

fn human_vs_bot_world() -> Vec<PlanetSpec> {
    vec![
        PlanetSpec::at(100, 100, 40).owned_by(0),
        PlanetSpec::at(400, 300, 15),
        PlanetSpec::at(1000, 700, 60).owned_by(1),
    ]
}

/// Mutates every snapshot it can get hold of, then does nothing.
struct SnapshotVandal;

impl DecisionMaker for SnapshotVandal {
    fn name(&self) -> &str {
        "vandal"
    }

    fn decide(&mut self, api: &DecisionApi<'_>) -> Option<MoveIntent> {
        for view in api.planets() {
            let mut snapshot = view.snapshot();
            snapshot.owner = Some(api.me());
            snapshot.troops = Fixed::ZERO;
        }
        for view in api.movements() {
            let mut snapshot = view.snapshot();
            snapshot.amount = 0;
        }
        None
    }
}

/// Never issues an order.
struct Idle;

impl DecisionMaker for Idle {
    fn name(&self) -> &str {
        "idle"
    }

    fn decide(&mut self, _api: &DecisionApi<'_>) -> Option<MoveIntent> {
        None
    }
}

// ============================================================================
// Time
// ============================================================================

mod time {
    use super::*;

    #[test]
    fn one_second_of_wall_time_is_one_tick_rate_of_steps() {
        let mut sim = Simulation::new(duel_config(60.0)).unwrap();
        let frame = sim.advance_frame(Duration::from_secs(1));
        assert_eq!(frame.steps, 60);
        assert_eq!(sim.tick(), 60);
        assert_eq!(frame.discarded, Fixed::ZERO);
    }

    #[test]
    fn speed_multiplier_scales_simulated_time() {
        let mut sim = Simulation::new(duel_config(60.0).with_speed(4.0)).unwrap();
        let frame = sim.advance_frame(Duration::from_millis(250));
        assert_eq!(frame.steps, 60);
    }

    #[test]
    fn zero_speed_freezes_the_match() {
        let mut sim = Simulation::new(duel_config(60.0).with_speed(0.0)).unwrap();
        assert_eq!(sim.advance_frame(Duration::from_secs(5)).steps, 0);
        assert_eq!(sim.elapsed(), Fixed::ZERO);
    }

    #[test]
    fn unrepresentable_times_are_config_errors() {
        for config in [
            duel_config(60.0).with_speed(5.0e9),
            duel_config(60.0).with_speed(f64::INFINITY),
            duel_config(1.0e10),
        ] {
            assert!(matches!(
                Simulation::new(config),
                Err(GameError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn runtime_speed_change_is_clamped() {
        let mut sim = Simulation::new(duel_config(60.0)).unwrap();
        sim.clock_mut().set_speed(5.0e9);

        let frame = sim.advance_frame(Duration::from_secs(1));

        // The sub-step cap drains what it can and drops the rest.
        assert_eq!(frame.steps, sim.config().max_substeps_per_frame);
        assert!(frame.discarded > Fixed::ZERO);
        assert!(!sim.is_over());

        sim.clock_mut().set_speed(f64::INFINITY);
        assert_eq!(
            sim.advance_frame(Duration::from_secs(u64::MAX)).steps,
            sim.config().max_substeps_per_frame
        );
    }

    #[test]
    fn hidden_host_pauses_while_humans_play() {
        let mut sim = Simulation::new(duel_config(60.0)).unwrap();
        sim.clock_mut().set_visible(false);
        assert_eq!(sim.advance_frame(Duration::from_secs(1)).steps, 0);

        sim.clock_mut().set_visible(true);
        assert_eq!(sim.advance_frame(Duration::from_secs(1)).steps, 60);
    }

    #[test]
    fn bot_only_match_ignores_visibility() {
        let mut sim = Simulation::new(bot_config(2, "idle", 5)).unwrap();
        sim.clock_mut().set_visible(false);
        assert_eq!(sim.advance_frame(Duration::from_secs(1)).steps, 0);

        // The first step notices no human is left and stops pausing.
        sim.step();
        assert!(!sim.clock().pauses_when_hidden());
        assert_eq!(sim.advance_frame(Duration::from_secs(1)).steps, 60);
    }

    #[test]
    fn remaining_time_counts_down_to_zero() {
        let mut sim = Simulation::new(duel_config(2.0)).unwrap();
        for _ in 0..500 {
            sim.step();
        }
        assert_eq!(sim.clock().remaining(), Fixed::ZERO);
        assert!(sim.is_over());
    }
}

// ============================================================================
// Conservation
// ============================================================================

mod conservation {
    use super::*;

    #[test]
    fn owned_mass_grows_only_by_production_without_combat() {
        let mut sim = sim_with(
            duel_config(120.0),
            &[
                PlanetSpec::at(100, 100, 40).owned_by(0).producing(2),
                PlanetSpec::at(500, 100, 10).owned_by(0),
                PlanetSpec::at(900, 100, 30).owned_by(1).producing(3),
                PlanetSpec::at(300, 400, 15),
            ],
        );
        let initial = sim.world().owned_troop_mass();
        sim.send_troops(PlanetId(0), PlanetId(1), 20).unwrap();

        for _ in 0..120 {
            sim.step();
        }

        let expected = initial + fixed(5) * sim.elapsed();
        let drift = (sim.world().owned_troop_mass() - expected).abs();
        assert!(drift < Fixed::from_num(0.000_01), "drift {drift}");
        assert_eq!(sim.planets()[3].troops(), fixed(15));
        assert_eq!(sim.world().total_troops(A) + sim.world().total_troops(B), sim.world().owned_troop_mass());
    }

    #[test]
    fn production_stops_at_cap() {
        let mut sim = sim_with(
            duel_config(120.0),
            &[
                PlanetSpec::at(100, 100, 495).owned_by(0).producing(10),
                PlanetSpec::at(900, 100, 30).owned_by(1),
            ],
        );
        for _ in 0..120 {
            sim.step();
        }
        assert_eq!(sim.planets()[0].troops(), fixed(500));
    }
}

// ============================================================================
// Bots
// ============================================================================

mod bots {
    use super::*;

    #[test]
    fn snapshots_cannot_touch_the_world() {
        let mut vandalised = sim_with(human_vs_bot(), &human_vs_bot_world());
        vandalised.bind_controller(B, Box::new(SnapshotVandal)).unwrap();
        let mut control = sim_with(human_vs_bot(), &human_vs_bot_world());
        control.bind_controller(B, Box::new(Idle)).unwrap();

        for sim in [&mut vandalised, &mut control] {
            sim.send_troops(PlanetId(0), PlanetId(1), 20).unwrap();
            for _ in 0..240 {
                sim.step();
            }
        }

        assert_eq!(vandalised.state_hash(), control.state_hash());
        assert_eq!(vandalised.planets()[2].owner(), Some(B));
    }

    #[test]
    fn order_from_foreign_planet_is_dropped() {
        let mut sim = sim_with(human_vs_bot(), &human_vs_bot_world());
        sim.bind_controller(B, Box::new(ScriptedBot::once(0, 1, 10)))
            .unwrap();

        let events = sim.step();

        assert!(events.launched.is_empty());
        assert!(sim.movements().is_empty());
        assert_eq!(sim.planets()[0].troops(), fixed(40));
    }

    #[test]
    fn bot_order_is_clamped_like_a_human_one() {
        let mut sim = sim_with(human_vs_bot(), &human_vs_bot_world());
        sim.bind_controller(B, Box::new(ScriptedBot::once(2, 1, 1_000)))
            .unwrap();

        let events = sim.step();

        assert_eq!(events.launched.len(), 1);
        assert_eq!(sim.movements()[0].amount(), 60);
        assert_eq!(sim.movements()[0].owner(), B);
    }

    #[test]
    fn bots_decide_once_per_poll_interval() {
        let intents = (0..5).map(|_| MoveIntent::new(PlanetId(2), PlanetId(1), 1));
        let mut sim = sim_with(human_vs_bot(), &human_vs_bot_world());
        sim.bind_controller(B, Box::new(ScriptedBot::new(intents)))
            .unwrap();

        sim.step();
        assert_eq!(sim.movements().len(), 1);
        for _ in 0..10 {
            sim.step();
        }
        assert_eq!(sim.movements().len(), 1);
        for _ in 0..50 {
            sim.step();
        }
        assert_eq!(sim.movements().len(), 2);
    }

    #[test]
    fn unbound_bot_faction_sits_still() {
        let mut sim = sim_with(human_vs_bot(), &human_vs_bot_world());
        for _ in 0..120 {
            sim.step();
        }
        assert!(sim.movements().is_empty());
    }

    #[test]
    fn greedy_bots_eventually_fight() {
        let mut sim = Simulation::new(bot_config(2, "greedy", 9)).unwrap();
        for index in 0..2 {
            sim.bind_controller(FactionId(index), Box::new(GreedyBot::default()))
                .unwrap();
        }
        for _ in 0..1_800 {
            sim.step();
        }
        assert!(sim.state().stats().total_sent() > 0);
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_generation_terminates_in_bounds(config in strategies::arb_match_config()) {
        let world = generate_world(&config);
        let factions = config.factions.len();

        prop_assert!(world.planets().len() >= factions + 3);
        if let Some(n) = config.neutral_count {
            prop_assert_eq!(world.planets().len(), factions + n.max(3) as usize);
        }
        for (index, planet) in world.planets().iter().enumerate() {
            prop_assert_eq!(planet.id().index(), index);
            let x: f64 = planet.position().x.to_num();
            let y: f64 = planet.position().y.to_num();
            prop_assert!((0.0..=config.map_width).contains(&x));
            prop_assert!((0.0..=config.map_height).contains(&y));
            prop_assert!(planet.troops() >= Fixed::ZERO);
        }
        for id in 0..factions {
            prop_assert_eq!(world.planet_count(FactionId(id as u8)), 1);
        }
    }

    #[test]
    fn prop_same_seed_same_match(seed in strategies::arb_seed()) {
        let setup = || {
            let mut sim = Simulation::new(bot_config(3, "greedy", seed)).unwrap();
            for index in 0..3 {
                sim.bind_controller(FactionId(index), Box::new(GreedyBot::default()))
                    .unwrap();
            }
            sim
        };
        prop_assert!(verify_simulation_determinism(setup, 240));
    }

    #[test]
    fn prop_arbitrary_orders_keep_troops_sane(
        seed in strategies::arb_seed(),
        intents in strategies::arb_intent_sequence(12, 40),
    ) {
        let config = duel_config(60.0).with_seed(seed).with_neutral_count(10);
        let mut sim = Simulation::new(config).unwrap();

        for intent in intents {
            sim.send_troops(intent.from, intent.to, intent.troops);
            for _ in 0..5 {
                sim.step();
            }
            for planet in sim.planets() {
                prop_assert!(planet.troops() >= Fixed::ZERO);
            }
            for movement in sim.movements() {
                prop_assert!(movement.amount() > 0);
                prop_assert_ne!(movement.origin(), movement.destination());
            }
        }
    }
}
