//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical results
//! given identical config and inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the core guards against:
//!
//! - **Floating-point math**: troops, positions and time use
//!   [`conquest_core::math::Fixed`]; floats only appear during world
//!   generation sampling, which is seeded.
//!
//! - **Iteration order**: planets are stored by id and movements in launch
//!   order; no hash map is ever iterated.
//!
//! - **Wall-clock reads**: only the clock converts wall time, and the
//!   harness drives whole sub-steps directly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use conquest_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a match twice from the same setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.step();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run `num_sims` matches on scoped threads and collect their final hashes.
///
/// Each match is built and run entirely on its own thread.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.step();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick and report the first tick where they
/// differ, or `None` if they never do.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.step();
        sim2.step();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
pub mod strategies {
    use conquest_core::config::{Color, FactionConfig, MatchConfig};
    use conquest_core::decision::MoveIntent;
    use conquest_core::planet::PlanetId;
    use proptest::prelude::*;

    /// Any world seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Map dimensions from cramped to roomy.
    pub fn arb_map_size() -> impl Strategy<Value = (f64, f64)> {
        (100u32..2000, 100u32..1500).prop_map(|(w, h)| (f64::from(w), f64::from(h)))
    }

    /// Between 2 and 6 human factions.
    pub fn arb_factions() -> impl Strategy<Value = Vec<FactionConfig>> {
        (2usize..=6).prop_map(|n| {
            (0..n)
                .map(|i| FactionConfig::human(format!("F{i}"), Color(i as u8, 0, 0)))
                .collect()
        })
    }

    /// A valid match config with random seed, size, factions and neutral
    /// count.
    pub fn arb_match_config() -> impl Strategy<Value = MatchConfig> {
        (
            arb_seed(),
            arb_map_size(),
            arb_factions(),
            proptest::option::of(0u32..60),
        )
            .prop_map(|(seed, (w, h), factions, neutrals)| MatchConfig {
                neutral_count: neutrals,
                ..MatchConfig::default()
                    .with_seed(seed)
                    .with_map_size(w, h)
                    .with_factions(factions)
            })
    }

    /// A move intent between planets `0..planets`, including malformed
    /// amounts.
    pub fn arb_move_intent(planets: u32) -> impl Strategy<Value = MoveIntent> {
        (0..planets, 0..planets, -50i64..500).prop_map(|(from, to, troops)| {
            MoveIntent::new(PlanetId(from), PlanetId(to), troops)
        })
    }

    /// A sequence of move intents.
    pub fn arb_intent_sequence(
        planets: u32,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<MoveIntent>> {
        proptest::collection::vec(arb_move_intent(planets), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{bot_config, GreedyBot};
    use conquest_core::config::MatchConfig;
    use conquest_core::factions::FactionId;

    fn greedy_match(seed: u64) -> Simulation {
        let mut sim = Simulation::new(bot_config(3, "greedy", seed)).unwrap();
        for index in 0..3 {
            sim.bind_controller(FactionId(index), Box::new(GreedyBot::default()))
                .unwrap();
        }
        sim
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_default_match_determinism() {
        assert!(verify_simulation_determinism(
            || Simulation::new(MatchConfig::default()).unwrap(),
            300
        ));
    }

    #[test]
    fn test_bot_match_never_diverges() {
        assert_eq!(find_first_divergence(|| greedy_match(11), 600), None);
    }

    #[test]
    fn test_parallel_bot_matches_agree() {
        run_parallel_simulations(|| greedy_match(21), 4, 600).assert_deterministic();
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u8, "x")), compute_hash(&(1u8, "x")));
    }
}
