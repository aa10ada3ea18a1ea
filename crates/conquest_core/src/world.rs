//! The planet set and the in-flight movement set.
//!
//! Planets are stored by id and movements in launch order, so every
//! iteration over the world is deterministic.

use serde::{Deserialize, Serialize};

use crate::factions::FactionId;
use crate::math::Fixed;
use crate::movement::{Launch, MovementId, TroopMovement};
use crate::planet::{Planet, PlanetId};

/// All mutable match state that bots observe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    planets: Vec<Planet>,
    movements: Vec<TroopMovement>,
    next_movement_id: u64,
}

impl World {
    /// Build a world from a fully assembled planet list.
    ///
    /// Ids are assigned here, once, from list order.
    #[must_use]
    pub fn from_planets(mut planets: Vec<Planet>) -> Self {
        for (index, planet) in planets.iter_mut().enumerate() {
            planet.id = PlanetId(index as u32);
        }
        Self {
            planets,
            movements: Vec::new(),
            next_movement_id: 0,
        }
    }

    /// All planets, ordered by id.
    #[must_use]
    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    /// Look up a planet.
    #[must_use]
    pub fn planet(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(id.index())
    }

    pub(crate) fn planet_mut(&mut self, id: PlanetId) -> Option<&mut Planet> {
        self.planets.get_mut(id.index())
    }

    /// In-flight movements, in launch order.
    #[must_use]
    pub fn movements(&self) -> &[TroopMovement] {
        &self.movements
    }

    /// Look up a movement.
    #[must_use]
    pub fn movement(&self, id: MovementId) -> Option<&TroopMovement> {
        self.movements.iter().find(|m| m.id() == id)
    }

    /// Enqueue a new movement and return its id.
    pub(crate) fn launch(&mut self, launch: Launch) -> MovementId {
        let id = MovementId(self.next_movement_id);
        self.next_movement_id += 1;
        self.movements.push(TroopMovement::new(id, launch));
        id
    }

    /// Refresh glow aggregates and accrue production on every planet.
    pub(crate) fn update_planets(&mut self, dt: Fixed) {
        let movements = &self.movements;
        for planet in &mut self.planets {
            planet.update(dt, movements);
        }
    }

    /// Advance every movement and remove the ones that arrived.
    ///
    /// Arrivals come back in launch order.
    pub(crate) fn advance_movements(&mut self, dt: Fixed) -> Vec<TroopMovement> {
        let mut arrived = Vec::new();
        let mut in_flight = Vec::with_capacity(self.movements.len());
        for mut movement in self.movements.drain(..) {
            if movement.update(dt) {
                arrived.push(movement);
            } else {
                in_flight.push(movement);
            }
        }
        self.movements = in_flight;
        arrived
    }

    /// Troops stationed on a faction's planets plus troops it has in flight.
    #[must_use]
    pub fn total_troops(&self, faction: FactionId) -> Fixed {
        let stationed: Fixed = self
            .planets
            .iter()
            .filter(|p| p.owner() == Some(faction))
            .map(Planet::troops)
            .sum();
        let in_flight: Fixed = self
            .movements
            .iter()
            .filter(|m| m.owner() == faction)
            .map(TroopMovement::troops)
            .sum();
        stationed + in_flight
    }

    /// Sum of production rates over a faction's planets.
    #[must_use]
    pub fn total_production(&self, faction: FactionId) -> Fixed {
        self.planets
            .iter()
            .filter(|p| p.owner() == Some(faction))
            .map(Planet::production_rate)
            .sum()
    }

    /// Number of planets a faction holds.
    #[must_use]
    pub fn planet_count(&self, faction: FactionId) -> usize {
        self.planets
            .iter()
            .filter(|p| p.owner() == Some(faction))
            .count()
    }

    /// Number of movements a faction has in flight.
    #[must_use]
    pub fn movement_count(&self, faction: FactionId) -> usize {
        self.movements
            .iter()
            .filter(|m| m.owner() == faction)
            .count()
    }

    /// Troops held by any faction, stationed or in flight. Neutral
    /// garrisons are excluded.
    #[must_use]
    pub fn owned_troop_mass(&self) -> Fixed {
        let stationed: Fixed = self
            .planets
            .iter()
            .filter(|p| p.owner().is_some())
            .map(Planet::troops)
            .sum();
        let in_flight: Fixed = self.movements.iter().map(TroopMovement::troops).sum();
        stationed + in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;
    use crate::planet::PlanetKind;

    fn planet(x: i32, owner: Option<FactionId>, troops: i32) -> Planet {
        Planet::new(
            PlanetKind::Scattered,
            Vec2Fixed::new(Fixed::from_num(x), Fixed::ZERO),
            Fixed::from_num(20),
            owner,
            Fixed::from_num(troops),
            Fixed::from_num(500),
            Fixed::from_num(1),
        )
    }

    #[test]
    fn test_ids_follow_list_order() {
        let world = World::from_planets(vec![planet(0, None, 1), planet(100, None, 2)]);
        assert_eq!(world.planets()[1].id(), PlanetId(1));
        assert_eq!(world.planet(PlanetId(1)).map(Planet::troops), Some(Fixed::from_num(2)));
        assert!(world.planet(PlanetId(7)).is_none());
    }

    #[test]
    fn test_aggregates_include_in_flight() {
        let a = FactionId(0);
        let mut world = World::from_planets(vec![planet(0, Some(a), 30), planet(100, None, 5)]);
        world.launch(Launch {
            origin: PlanetId(0),
            destination: PlanetId(1),
            owner: a,
            amount: 10,
            launched_at: Fixed::ZERO,
            from: world.planets()[0].position(),
            to: world.planets()[1].position(),
            speed: Fixed::from_num(50),
        });
        assert_eq!(world.total_troops(a), Fixed::from_num(40));
        assert_eq!(world.planet_count(a), 1);
        assert_eq!(world.movement_count(a), 1);
        assert_eq!(world.owned_troop_mass(), Fixed::from_num(40));
    }

    #[test]
    fn test_advance_movements_removes_arrivals() {
        let a = FactionId(0);
        let mut world = World::from_planets(vec![planet(0, Some(a), 30), planet(100, None, 5)]);
        let launch = Launch {
            origin: PlanetId(0),
            destination: PlanetId(1),
            owner: a,
            amount: 1,
            launched_at: Fixed::ZERO,
            from: world.planets()[0].position(),
            to: world.planets()[1].position(),
            speed: Fixed::from_num(100),
        };
        let first = world.launch(launch);
        world.advance_movements(Fixed::from_num(0.5));
        let second = world.launch(launch);
        let arrived = world.advance_movements(Fixed::from_num(0.5));
        assert_eq!(arrived.len(), 1);
        assert_eq!(arrived[0].id(), first);
        assert_eq!(world.movements()[0].id(), second);
    }
}
