//! Sample bot strategies for headless play.
//!
//! Each strategy implements [`DecisionMaker`] against the read-only
//! [`DecisionApi`] and is selected by the name a faction's
//! [`Controller::Bot`](conquest_core::config::Controller::Bot) carries.
//!
//! - `expander`: grabs the cheapest valuable planets, neutrals first.
//! - `aggressor`: goes after enemy planets, falling back to neutrals.
//! - `defender`: reinforces threatened planets and expands cautiously.

use conquest_core::decision::{DecisionApi, DecisionMaker, GamePhase, MoveIntent, PlanetView};
use conquest_core::planet::PlanetId;
use thiserror::Error;

/// Names accepted by [`strategy_by_name`].
pub const STRATEGY_NAMES: [&str; 3] = ["expander", "aggressor", "defender"];

/// Error type for strategy lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// No strategy with that name.
    #[error("Unknown strategy '{0}' (expected one of: expander, aggressor, defender)")]
    UnknownStrategy(String),
}

/// Build a fresh decision maker for `name`.
pub fn strategy_by_name(name: &str) -> Result<Box<dyn DecisionMaker>, StrategyError> {
    match name.to_ascii_lowercase().as_str() {
        "expander" => Ok(Box::new(Expander::default())),
        "aggressor" => Ok(Box::new(Aggressor::default())),
        "defender" => Ok(Box::new(Defender::default())),
        _ => Err(StrategyError::UnknownStrategy(name.to_string())),
    }
}

/// Troops that must land on `target` from `source` to take it, or `None` if
/// it will already be ours by then.
fn troops_to_capture(
    api: &DecisionApi<'_>,
    source: PlanetId,
    target: PlanetId,
    margin: i64,
) -> Option<i64> {
    let eta = api.travel_time(source, target)?;
    let prediction = api.predict(target, eta)?;
    if prediction.owner == Some(api.me()) {
        return None;
    }
    Some(prediction.troops.floor().to_num::<i64>() + 1 + margin)
}

fn travel_secs(api: &DecisionApi<'_>, source: PlanetId, target: PlanetId) -> f64 {
    api.travel_time(source, target)
        .map_or(f64::INFINITY, |t| t.to_num())
}

/// Best-scoring capture over every (own planet, foreign planet) pair.
///
/// `score` gets the target, the troops needed and the travel time, and
/// returns `None` to skip the pair. Ties keep the first pair in id order.
fn best_capture(
    api: &DecisionApi<'_>,
    reserve: impl Fn(&PlanetView<'_>) -> i64,
    margin: i64,
    score: impl Fn(&PlanetView<'_>, i64, f64) -> Option<f64>,
) -> Option<(f64, PlanetId, PlanetId, i64)> {
    let me = api.me();
    let mut best: Option<(f64, PlanetId, PlanetId, i64)> = None;

    for source in api.my_planets() {
        let spare = source.available_troops() - reserve(&source);
        if spare <= 0 {
            continue;
        }
        for target in api.planets() {
            if target.owner() == Some(me) {
                continue;
            }
            let Some(needed) = troops_to_capture(api, source.id(), target.id(), margin) else {
                continue;
            };
            if needed > spare {
                continue;
            }
            let eta = travel_secs(api, source.id(), target.id());
            let Some(value) = score(&target, needed, eta) else {
                continue;
            };
            if best.map_or(true, |(top, ..)| value > top) {
                best = Some((value, source.id(), target.id(), needed));
            }
        }
    }
    best
}

/// Expands towards the planets that give the most value per troop spent.
#[derive(Debug, Clone, Copy)]
pub struct Expander {
    /// Troops left behind on every source planet.
    pub reserve: i64,
    /// Extra troops sent on top of the bare minimum.
    pub margin: i64,
    /// Score multiplier for neutral targets.
    pub neutral_bias: f64,
}

impl Default for Expander {
    fn default() -> Self {
        Self {
            reserve: 5,
            margin: 2,
            neutral_bias: 1.5,
        }
    }
}

impl DecisionMaker for Expander {
    fn name(&self) -> &str {
        "expander"
    }

    fn decide(&mut self, api: &DecisionApi<'_>) -> Option<MoveIntent> {
        let (_, from, to, needed) = best_capture(
            api,
            |_| self.reserve,
            self.margin,
            |target, needed, eta| {
                let bias = if target.is_neutral() {
                    self.neutral_bias
                } else {
                    1.0
                };
                Some(api.planet_value(target.id()) * bias / (needed as f64 + 1.0) / (1.0 + eta))
            },
        )?;
        Some(MoveIntent::new(from, to, needed))
    }
}

/// Hunts enemy planets; expands only while no enemy is affordable.
#[derive(Debug, Clone, Copy)]
pub struct Aggressor {
    /// Share of the spare garrison committed to an attack, at least the
    /// troops needed.
    pub commitment: f64,
    /// Extra troops sent on top of the bare minimum.
    pub margin: i64,
}

impl Default for Aggressor {
    fn default() -> Self {
        Self {
            commitment: 0.75,
            margin: 3,
        }
    }
}

impl DecisionMaker for Aggressor {
    fn name(&self) -> &str {
        "aggressor"
    }

    fn decide(&mut self, api: &DecisionApi<'_>) -> Option<MoveIntent> {
        let attack = best_capture(
            api,
            |_| 0,
            self.margin,
            |target, needed, eta| {
                target
                    .owner()
                    .is_some()
                    .then(|| 1.0 / (needed as f64 + 1.0) / (1.0 + eta))
            },
        );
        if let Some((_, from, to, needed)) = attack {
            let spare = api.planet(from)?.available_troops();
            let committed = ((spare as f64) * self.commitment) as i64;
            return Some(MoveIntent::new(from, to, needed.max(committed)));
        }

        let (_, from, to, needed) = best_capture(
            api,
            |_| 0,
            self.margin,
            |target, needed, eta| {
                target
                    .is_neutral()
                    .then(|| api.planet_value(target.id()) / (needed as f64 + 1.0) / (1.0 + eta))
            },
        )?;
        Some(MoveIntent::new(from, to, needed))
    }
}

/// Keeps what it has: reinforces planets predicted to fall, and otherwise
/// expands to neutrals while holding a reserve sized to local threat.
#[derive(Debug, Clone, Copy)]
pub struct Defender {
    /// Minimum troops kept on every planet.
    pub base_reserve: i64,
    /// Extra troops sent on top of the bare minimum.
    pub margin: i64,
}

impl Default for Defender {
    fn default() -> Self {
        Self {
            base_reserve: 10,
            margin: 3,
        }
    }
}

impl Defender {
    fn reserve(&self, api: &DecisionApi<'_>, planet: &PlanetView<'_>) -> i64 {
        let threat = api.threat(planet.id()).ceil() as i64;
        self.base_reserve.max(threat / 2)
    }

    /// Most urgent planet predicted to change hands, with the troops it is
    /// short by and the time left before the last attack lands.
    fn most_endangered(&self, api: &DecisionApi<'_>) -> Option<(PlanetId, i64, f64)> {
        let me = api.me();
        let mut worst: Option<(PlanetId, i64, f64)> = None;

        for planet in api.my_planets() {
            let attacks = api.incoming_attacks(planet.id());
            let Some(horizon) = attacks.iter().map(|m| m.remaining_time()).max() else {
                continue;
            };
            let Some(prediction) = api.predict(planet.id(), horizon) else {
                continue;
            };
            if prediction.owner == Some(me) {
                continue;
            }
            let deficit = prediction.troops.floor().to_num::<i64>() + 1 + self.margin;
            let deadline: f64 = horizon.to_num();
            if worst.map_or(true, |(_, _, soonest)| deadline < soonest) {
                worst = Some((planet.id(), deficit, deadline));
            }
        }
        worst
    }
}

impl DecisionMaker for Defender {
    fn name(&self) -> &str {
        "defender"
    }

    fn decide(&mut self, api: &DecisionApi<'_>) -> Option<MoveIntent> {
        if let Some((planet, deficit, deadline)) = self.most_endangered(api) {
            let helper = api
                .my_planets()
                .into_iter()
                .filter(|p| p.id() != planet)
                .filter(|p| travel_secs(api, p.id(), planet) <= deadline)
                .map(|p| (p.available_troops() - self.reserve(api, &p), p.id()))
                .filter(|&(spare, _)| spare > 0)
                .max_by_key(|&(spare, id)| (spare, std::cmp::Reverse(id)));
            if let Some((spare, from)) = helper {
                return Some(MoveIntent::new(from, planet, spare.min(deficit)));
            }
        }

        // Expansion only once the opening rush is over or with a safe stock.
        let cautious = api.phase() == GamePhase::Early;
        let (_, from, to, needed) = best_capture(
            api,
            |p| {
                let reserve = self.reserve(api, p);
                if cautious {
                    reserve * 2
                } else {
                    reserve
                }
            },
            self.margin,
            |target, needed, eta| {
                target
                    .is_neutral()
                    .then(|| api.planet_value(target.id()) / (needed as f64 + 1.0) / (1.0 + eta))
            },
        )?;
        Some(MoveIntent::new(from, to, needed))
    }
}
