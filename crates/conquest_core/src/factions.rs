//! Faction identifiers and the faction registry.
//!
//! The registry is the canonical, ordered list of participants. Order is
//! registration order and doubles as the deterministic tie-break: when two
//! factions are otherwise equal, the lower [`FactionId`] wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{Color, FactionConfig};
use crate::decision::DecisionMaker;
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, option_fixed_serde, Fixed};
use crate::world::World;

/// Unique identifier for a faction. Equal to its registration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u8);

impl FactionId {
    /// Registry index of this faction.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "faction#{}", self.0)
    }
}

/// A participant in the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faction {
    /// Identifier (registration index).
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: Color,
    /// Whether orders come from a bot rather than the input layer.
    pub is_bot: bool,
    /// Strategy name requested by the config, for bots.
    pub strategy: Option<String>,
    /// Simulated time of elimination, recorded once.
    #[serde(with = "option_fixed_serde")]
    pub eliminated_at: Option<Fixed>,
    /// Simulated time at which this bot may decide next.
    #[serde(with = "fixed_serde")]
    pub next_decision_at: Fixed,
}

impl Faction {
    /// Whether the faction has been eliminated.
    #[must_use]
    pub const fn is_eliminated(&self) -> bool {
        self.eliminated_at.is_some()
    }
}

/// Ordered faction list plus the bot controllers bound to them.
pub struct FactionRegistry {
    factions: Vec<Faction>,
    controllers: Vec<Option<Box<dyn DecisionMaker>>>,
}

impl fmt::Debug for FactionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactionRegistry")
            .field("factions", &self.factions)
            .field(
                "bound_controllers",
                &self.controllers.iter().filter(|c| c.is_some()).count(),
            )
            .finish()
    }
}

impl FactionRegistry {
    /// Build a registry from config, in order. No controllers are bound yet.
    #[must_use]
    pub fn from_config(configs: &[FactionConfig]) -> Self {
        let factions: Vec<Faction> = configs
            .iter()
            .enumerate()
            .map(|(index, config)| Faction {
                id: FactionId(index as u8),
                name: config.name.clone(),
                color: config.color,
                is_bot: config.controller.is_bot(),
                strategy: match &config.controller {
                    crate::config::Controller::Bot { strategy } => Some(strategy.clone()),
                    crate::config::Controller::Human => None,
                },
                eliminated_at: None,
                next_decision_at: Fixed::ZERO,
            })
            .collect();
        let controllers = factions.iter().map(|_| None).collect();

        Self {
            factions,
            controllers,
        }
    }

    /// Bind a decision maker to a bot faction, replacing any previous one.
    pub fn bind_controller(
        &mut self,
        faction: FactionId,
        controller: Box<dyn DecisionMaker>,
    ) -> Result<()> {
        let entry = self
            .factions
            .get(faction.index())
            .ok_or(GameError::UnknownFaction(faction.0))?;
        if !entry.is_bot {
            return Err(GameError::HumanFaction(faction.0));
        }
        self.controllers[faction.index()] = Some(controller);
        Ok(())
    }

    /// All factions in registration order.
    #[must_use]
    pub fn factions(&self) -> &[Faction] {
        &self.factions
    }

    /// Look up one faction.
    #[must_use]
    pub fn get(&self, id: FactionId) -> Option<&Faction> {
        self.factions.get(id.index())
    }

    /// Number of registered factions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Whether a controller is bound to this faction.
    #[must_use]
    pub fn has_controller(&self, id: FactionId) -> bool {
        self.controllers
            .get(id.index())
            .is_some_and(|c| c.is_some())
    }

    pub(crate) fn factions_mut(&mut self) -> &mut [Faction] {
        &mut self.factions
    }

    /// Split into the read-only faction list and the mutable controllers,
    /// so a controller can decide while looking at every faction.
    pub(crate) fn split_controllers(
        &mut self,
    ) -> (&mut [Faction], &mut [Option<Box<dyn DecisionMaker>>]) {
        (&mut self.factions, &mut self.controllers)
    }

    /// Total troops of a faction: stationed plus in flight.
    #[must_use]
    pub fn total_troops(&self, world: &World, id: FactionId) -> Fixed {
        world.total_troops(id)
    }

    /// Total production rate of a faction's planets.
    #[must_use]
    pub fn total_production(&self, world: &World, id: FactionId) -> Fixed {
        world.total_production(id)
    }

    /// Number of planets a faction holds.
    #[must_use]
    pub fn planet_count(&self, world: &World, id: FactionId) -> usize {
        world.planet_count(id)
    }

    /// A faction is active while it holds a planet or has troops in flight.
    #[must_use]
    pub fn is_active(&self, world: &World, id: FactionId) -> bool {
        world.planet_count(id) > 0 || world.movement_count(id) > 0
    }

    /// Ids of factions that are currently active, in registration order.
    #[must_use]
    pub fn active_factions(&self, world: &World) -> Vec<FactionId> {
        self.factions
            .iter()
            .map(|f| f.id)
            .filter(|&id| self.is_active(world, id))
            .collect()
    }

    /// Whether any human-controlled faction is still active.
    #[must_use]
    pub fn any_human_active(&self, world: &World) -> bool {
        self.factions
            .iter()
            .any(|f| !f.is_bot && self.is_active(world, f.id))
    }

    /// The faction currently ahead.
    ///
    /// The sole active faction if there is one, otherwise the active
    /// faction with the most total troops; ties go to the lowest id.
    #[must_use]
    pub fn winning_faction(&self, world: &World) -> Option<FactionId> {
        let active = self.active_factions(world);
        if active.len() == 1 {
            return active.first().copied();
        }
        leader_by_troops(world, active.into_iter())
    }
}

/// Faction with the most total troops; ties go to the lowest id.
pub(crate) fn leader_by_troops(
    world: &World,
    candidates: impl Iterator<Item = FactionId>,
) -> Option<FactionId> {
    let mut best: Option<(FactionId, Fixed)> = None;
    for id in candidates {
        let troops = world.total_troops(id);
        best = match best {
            Some((best_id, best_troops))
                if best_troops > troops || (best_troops == troops && best_id < id) =>
            {
                Some((best_id, best_troops))
            }
            _ => Some((id, troops)),
        };
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Color, FactionConfig};
    use crate::decision::{DecisionApi, MoveIntent};

    struct Idle;

    impl DecisionMaker for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn decide(&mut self, _api: &DecisionApi<'_>) -> Option<MoveIntent> {
            None
        }
    }

    fn configs() -> Vec<FactionConfig> {
        vec![
            FactionConfig::human("Blue", Color(0, 0, 255)),
            FactionConfig::bot("Red", Color(255, 0, 0), "idle"),
        ]
    }

    #[test]
    fn test_registration_order_defines_ids() {
        let registry = FactionRegistry::from_config(&configs());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.factions()[0].id, FactionId(0));
        assert_eq!(registry.factions()[1].id, FactionId(1));
        assert!(registry.factions()[1].is_bot);
        assert_eq!(registry.factions()[1].strategy.as_deref(), Some("idle"));
    }

    #[test]
    fn test_bind_controller_rejects_human() {
        let mut registry = FactionRegistry::from_config(&configs());
        assert!(matches!(
            registry.bind_controller(FactionId(0), Box::new(Idle)),
            Err(GameError::HumanFaction(0))
        ));
        assert!(registry.bind_controller(FactionId(1), Box::new(Idle)).is_ok());
        assert!(registry.has_controller(FactionId(1)));
        assert!(matches!(
            registry.bind_controller(FactionId(9), Box::new(Idle)),
            Err(GameError::UnknownFaction(9))
        ));
    }
}
