//! Planets and the arrival (combat/reinforcement) rule.
//!
//! Planets are created once by the world generator and never removed; a
//! defeated planet only changes hands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::factions::FactionId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::movement::TroopMovement;

/// Stable planet identifier, equal to the planet's index in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanetId(pub u32);

impl PlanetId {
    /// Index of this planet in the world's planet list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "planet#{}", self.0)
    }
}

/// How a planet was placed by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlanetKind {
    /// A faction's starting planet.
    Home,
    /// Independently scattered neutral.
    #[default]
    Scattered,
    /// Neutral placed inside a cluster.
    Clustered,
}

/// A stationary production node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    pub(crate) id: PlanetId,
    pub(crate) kind: PlanetKind,
    pub(crate) position: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) radius: Fixed,
    pub(crate) owner: Option<FactionId>,
    #[serde(with = "fixed_serde")]
    pub(crate) troops: Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) max_troops: Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) production_rate: Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) incoming_attack: Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) incoming_reinforcement: Fixed,
}

impl Planet {
    /// Create a planet. The id is reassigned when the planet joins a world.
    #[must_use]
    pub fn new(
        kind: PlanetKind,
        position: Vec2Fixed,
        radius: Fixed,
        owner: Option<FactionId>,
        troops: Fixed,
        max_troops: Fixed,
        production_rate: Fixed,
    ) -> Self {
        Self {
            id: PlanetId(0),
            kind,
            position,
            radius,
            owner,
            troops: troops.max(Fixed::ZERO),
            max_troops,
            production_rate,
            incoming_attack: Fixed::ZERO,
            incoming_reinforcement: Fixed::ZERO,
        }
    }

    /// Stable id.
    #[must_use]
    pub const fn id(&self) -> PlanetId {
        self.id
    }

    /// Placement kind.
    #[must_use]
    pub const fn kind(&self) -> PlanetKind {
        self.kind
    }

    /// Center position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Radius ("size").
    #[must_use]
    pub const fn radius(&self) -> Fixed {
        self.radius
    }

    /// Owning faction, `None` for neutral.
    #[must_use]
    pub const fn owner(&self) -> Option<FactionId> {
        self.owner
    }

    /// Whether no faction owns this planet.
    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }

    /// Current troop count.
    #[must_use]
    pub const fn troops(&self) -> Fixed {
        self.troops
    }

    /// Whole troops available for dispatch.
    #[must_use]
    pub fn available_troops(&self) -> i64 {
        self.troops.floor().to_num::<i64>()
    }

    /// Production cap.
    #[must_use]
    pub const fn max_troops(&self) -> Fixed {
        self.max_troops
    }

    /// Troops produced per second while owned.
    #[must_use]
    pub const fn production_rate(&self) -> Fixed {
        self.production_rate
    }

    /// Troops currently inbound from other factions.
    #[must_use]
    pub const fn incoming_attack(&self) -> Fixed {
        self.incoming_attack
    }

    /// Troops currently inbound from the owner.
    #[must_use]
    pub const fn incoming_reinforcement(&self) -> Fixed {
        self.incoming_reinforcement
    }

    /// Advance this planet by `dt` simulated seconds.
    ///
    /// Recomputes the incoming glow aggregates from `movements` and accrues
    /// production when owned.
    pub fn update(&mut self, dt: Fixed, movements: &[TroopMovement]) {
        let mut attack = Fixed::ZERO;
        let mut reinforcement = Fixed::ZERO;
        for movement in movements.iter().filter(|m| m.destination() == self.id) {
            if Some(movement.owner()) == self.owner {
                reinforcement += movement.troops();
            } else {
                attack += movement.troops();
            }
        }
        self.incoming_attack = attack;
        self.incoming_reinforcement = reinforcement;

        if self.owner.is_some() {
            self.troops = accrue(self.troops, self.production_rate, self.max_troops, dt);
        }
    }
}

/// Production accrual: grows toward `cap`, never past it.
///
/// A stock already above the cap (from reinforcements) is left untouched.
#[must_use]
pub fn accrue(troops: Fixed, rate: Fixed, cap: Fixed, dt: Fixed) -> Fixed {
    if troops >= cap {
        return troops;
    }
    (troops + rate * dt).min(cap)
}

/// Result of one movement arriving at a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalOutcome {
    /// Same owner: troops were added.
    Reinforced,
    /// The defender held.
    Repelled,
    /// Ownership transferred to the attacker.
    Captured {
        /// Owner before the capture.
        previous_owner: Option<FactionId>,
    },
}

/// Planet state and losses after applying an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalResult {
    /// Owner afterwards.
    pub owner: Option<FactionId>,
    /// Troops afterwards.
    pub troops: Fixed,
    /// Troops destroyed on the attacking side.
    pub attacker_loss: Fixed,
    /// Troops destroyed on the defending side.
    pub defender_loss: Fixed,
    /// What happened.
    pub outcome: ArrivalOutcome,
}

/// Apply `amount` troops of `arriving` to a planet held by `owner` with
/// `troops` stationed.
///
/// Reinforcement adds without loss. An attack subtracts; at zero or above
/// the defender holds and both sides lose `amount`, below zero the attacker
/// captures with the surplus and both sides lose the defender's prior
/// troops.
#[must_use]
pub fn resolve_arrival(
    owner: Option<FactionId>,
    troops: Fixed,
    arriving: FactionId,
    amount: Fixed,
) -> ArrivalResult {
    if owner == Some(arriving) {
        return ArrivalResult {
            owner,
            troops: troops + amount,
            attacker_loss: Fixed::ZERO,
            defender_loss: Fixed::ZERO,
            outcome: ArrivalOutcome::Reinforced,
        };
    }

    let remaining = troops - amount;
    if remaining >= Fixed::ZERO {
        ArrivalResult {
            owner,
            troops: remaining,
            attacker_loss: amount,
            defender_loss: amount,
            outcome: ArrivalOutcome::Repelled,
        }
    } else {
        ArrivalResult {
            owner: Some(arriving),
            troops: remaining.abs(),
            attacker_loss: troops,
            defender_loss: troops,
            outcome: ArrivalOutcome::Captured {
                previous_owner: owner,
            },
        }
    }
}
