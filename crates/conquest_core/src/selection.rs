//! UI selection bookkeeping.
//!
//! Selection is input-layer state, not simulation state: it never changes a
//! planet. Dispatching from a selection goes through
//! [`Simulation::send_troops`] like any other order.

use std::collections::BTreeSet;

use crate::factions::FactionId;
use crate::movement::MovementId;
use crate::planet::PlanetId;
use crate::simulation::Simulation;

/// Planets currently selected by a player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    planets: BTreeSet<PlanetId>,
}

impl Selection {
    /// Empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a planet.
    pub fn select(&mut self, planet: PlanetId) {
        self.planets.insert(planet);
    }

    /// Add the planet if absent, remove it otherwise.
    pub fn toggle(&mut self, planet: PlanetId) {
        if !self.planets.remove(&planet) {
            self.planets.insert(planet);
        }
    }

    /// Remove a planet.
    pub fn deselect(&mut self, planet: PlanetId) {
        self.planets.remove(&planet);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.planets.clear();
    }

    /// Whether `planet` is selected.
    #[must_use]
    pub fn contains(&self, planet: PlanetId) -> bool {
        self.planets.contains(&planet)
    }

    /// Selected planets in id order.
    pub fn iter(&self) -> impl Iterator<Item = PlanetId> + '_ {
        self.planets.iter().copied()
    }

    /// Number of selected planets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.planets.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }

    /// Forget planets `faction` no longer owns.
    pub fn retain_owned(&mut self, sim: &Simulation, faction: FactionId) {
        self.planets.retain(|&id| {
            sim.world()
                .planet(id)
                .is_some_and(|p| p.owner() == Some(faction))
        });
    }

    /// Send `fraction` of the troops on every selected planet `faction` owns
    /// to `target`. The target itself is skipped.
    pub fn dispatch(
        &self,
        sim: &mut Simulation,
        faction: FactionId,
        target: PlanetId,
        fraction: f64,
    ) -> Vec<MovementId> {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut launched = Vec::new();
        for id in self.iter().filter(|&id| id != target) {
            let Some(planet) = sim.world().planet(id) else {
                continue;
            };
            if planet.owner() != Some(faction) {
                continue;
            }
            let amount = (planet.available_troops() as f64 * fraction).floor() as i64;
            if let Some(movement) = sim.send_troops(id, target, amount) {
                launched.push(movement);
            }
        }
        launched
    }
}
