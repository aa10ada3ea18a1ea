//! Test fixtures and helpers.
//!
//! Hand-built worlds, configs and decision makers for consistent testing.

use std::collections::VecDeque;

use conquest_core::config::{Color, FactionConfig, MatchConfig};
use conquest_core::decision::{DecisionApi, DecisionMaker, MoveIntent};
use conquest_core::factions::FactionId;
use conquest_core::math::Vec2Fixed;
use conquest_core::planet::{Planet, PlanetId, PlanetKind};
use conquest_core::simulation::Simulation;
use conquest_core::world::World;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Two human factions, "A" and "B", on a default-sized map.
#[must_use]
pub fn duel_config(duration_secs: f64) -> MatchConfig {
    MatchConfig::default()
        .with_factions(vec![
            FactionConfig::human("A", Color(66, 135, 245)),
            FactionConfig::human("B", Color(235, 64, 52)),
        ])
        .with_duration_secs(duration_secs)
}

/// `count` bot factions using `strategy`, on a default-sized map.
#[must_use]
pub fn bot_config(count: usize, strategy: &str, seed: u64) -> MatchConfig {
    let factions = (0..count)
        .map(|i| {
            let shade = (i * 40) as u8;
            FactionConfig::bot(format!("Bot {i}"), Color(shade, 200, 255 - shade), strategy)
        })
        .collect();
    MatchConfig::default()
        .with_factions(factions)
        .with_seed(seed)
}

/// Planet builder for hand-made worlds.
#[derive(Debug, Clone, Copy)]
pub struct PlanetSpec {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Owner index, `None` for neutral.
    pub owner: Option<u8>,
    /// Starting troops.
    pub troops: i32,
    /// Troops per second while owned.
    pub production: i32,
}

impl PlanetSpec {
    /// A planet at `(x, y)` with `troops` and no production.
    #[must_use]
    pub const fn at(x: i32, y: i32, troops: i32) -> Self {
        Self {
            x,
            y,
            owner: None,
            troops,
            production: 0,
        }
    }

    /// Owned by faction `owner`.
    #[must_use]
    pub const fn owned_by(mut self, owner: u8) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Producing `rate` troops per second.
    #[must_use]
    pub const fn producing(mut self, rate: i32) -> Self {
        self.production = rate;
        self
    }

    /// Build the planet.
    #[must_use]
    pub fn build(self) -> Planet {
        Planet::new(
            if self.owner.is_some() {
                PlanetKind::Home
            } else {
                PlanetKind::Scattered
            },
            Vec2Fixed::new(fixed(self.x), fixed(self.y)),
            fixed(20),
            self.owner.map(FactionId),
            fixed(self.troops),
            fixed(500),
            fixed(self.production),
        )
    }
}

/// A simulation over a hand-made world.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn sim_with(config: MatchConfig, planets: &[PlanetSpec]) -> Simulation {
    let world = World::from_planets(planets.iter().map(|p| p.build()).collect());
    Simulation::with_world(config, world).expect("fixture config must be valid")
}

/// Run whole sub-steps until `done` holds or `max_steps` ran.
///
/// Returns the number of steps executed.
pub fn run_until(sim: &mut Simulation, max_steps: u32, done: impl Fn(&Simulation) -> bool) -> u32 {
    for step in 0..max_steps {
        if done(sim) {
            return step;
        }
        sim.step();
    }
    max_steps
}

/// Plays a fixed list of intents, one per decision cycle, then idles.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBot {
    script: VecDeque<MoveIntent>,
}

impl ScriptedBot {
    /// A bot that will issue `intents` in order.
    #[must_use]
    pub fn new(intents: impl IntoIterator<Item = MoveIntent>) -> Self {
        Self {
            script: intents.into_iter().collect(),
        }
    }

    /// Convenience for a single order.
    #[must_use]
    pub fn once(from: u32, to: u32, troops: i64) -> Self {
        Self::new([MoveIntent::new(PlanetId(from), PlanetId(to), troops)])
    }
}

impl DecisionMaker for ScriptedBot {
    fn name(&self) -> &str {
        "scripted"
    }

    fn decide(&mut self, _api: &DecisionApi<'_>) -> Option<MoveIntent> {
        self.script.pop_front()
    }
}

/// Sends half the troops of its strongest planet at the nearest planet it
/// does not own, whenever that planet has at least `threshold` troops.
#[derive(Debug, Clone, Copy)]
pub struct GreedyBot {
    /// Minimum garrison before attacking.
    pub threshold: i64,
}

impl Default for GreedyBot {
    fn default() -> Self {
        Self { threshold: 20 }
    }
}

impl DecisionMaker for GreedyBot {
    fn name(&self) -> &str {
        "greedy"
    }

    fn decide(&mut self, api: &DecisionApi<'_>) -> Option<MoveIntent> {
        let me = api.me();
        let source = api
            .my_planets()
            .into_iter()
            .max_by_key(|p| (p.available_troops(), std::cmp::Reverse(p.id())))?;
        if source.available_troops() < self.threshold {
            return None;
        }
        let target = api.nearest_planet_where(source.id(), |p| p.owner() != Some(me))?;
        Some(MoveIntent::new(
            source.id(),
            target.id(),
            source.available_troops() / 2,
        ))
    }
}
