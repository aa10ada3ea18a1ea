//! Troops in flight between two planets.

use serde::{Deserialize, Serialize};

use crate::factions::FactionId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::planet::PlanetId;

/// Identifier of a troop movement, unique for the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MovementId(pub u64);

/// An in-flight transfer of troops, resolved on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopMovement {
    id: MovementId,
    origin: PlanetId,
    destination: PlanetId,
    owner: FactionId,
    amount: u32,
    #[serde(with = "fixed_serde")]
    launched_at: Fixed,
    from: Vec2Fixed,
    to: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    distance: Fixed,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    #[serde(with = "fixed_serde")]
    duration: Fixed,
    #[serde(with = "fixed_serde")]
    progress: Fixed,
}

/// Everything needed to launch a movement.
#[derive(Debug, Clone, Copy)]
pub struct Launch {
    /// Source planet.
    pub origin: PlanetId,
    /// Target planet.
    pub destination: PlanetId,
    /// Dispatching faction.
    pub owner: FactionId,
    /// Whole troops sent (already clamped).
    pub amount: u32,
    /// Simulated launch time.
    pub launched_at: Fixed,
    /// Source position.
    pub from: Vec2Fixed,
    /// Target position.
    pub to: Vec2Fixed,
    /// Travel speed in units per second.
    pub speed: Fixed,
}

impl TroopMovement {
    /// Create a movement; distance and duration are derived from the launch.
    #[must_use]
    pub fn new(id: MovementId, launch: Launch) -> Self {
        let distance = launch.from.distance(launch.to);
        let duration = if launch.speed > Fixed::ZERO {
            distance / launch.speed
        } else {
            Fixed::ZERO
        };
        Self {
            id,
            origin: launch.origin,
            destination: launch.destination,
            owner: launch.owner,
            amount: launch.amount,
            launched_at: launch.launched_at,
            from: launch.from,
            to: launch.to,
            distance,
            speed: launch.speed,
            duration,
            progress: Fixed::ZERO,
        }
    }

    /// Movement id.
    #[must_use]
    pub const fn id(&self) -> MovementId {
        self.id
    }

    /// Source planet.
    #[must_use]
    pub const fn origin(&self) -> PlanetId {
        self.origin
    }

    /// Target planet.
    #[must_use]
    pub const fn destination(&self) -> PlanetId {
        self.destination
    }

    /// Dispatching faction.
    #[must_use]
    pub const fn owner(&self) -> FactionId {
        self.owner
    }

    /// Whole troops carried.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// Troops carried, as a fixed-point value.
    #[must_use]
    pub fn troops(&self) -> Fixed {
        Fixed::from_num(self.amount)
    }

    /// Simulated launch time.
    #[must_use]
    pub const fn launched_at(&self) -> Fixed {
        self.launched_at
    }

    /// Straight-line travel distance.
    #[must_use]
    pub const fn distance(&self) -> Fixed {
        self.distance
    }

    /// Total travel time.
    #[must_use]
    pub const fn duration(&self) -> Fixed {
        self.duration
    }

    /// Progress fraction in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        self.progress.min(Fixed::from_num(1))
    }

    /// Simulated seconds until arrival.
    #[must_use]
    pub fn remaining_time(&self) -> Fixed {
        let left = Fixed::from_num(1) - self.progress();
        (left * self.duration).max(Fixed::ZERO)
    }

    /// Current position along the path.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        self.from.lerp(self.to, self.progress())
    }

    /// Position `ahead` simulated seconds from now, for smoothing between
    /// fixed sub-steps.
    #[must_use]
    pub fn interpolated_position(&self, ahead: Fixed) -> Vec2Fixed {
        if self.duration <= Fixed::ZERO {
            return self.to;
        }
        let t = (self.progress + ahead / self.duration).min(Fixed::from_num(1));
        self.from.lerp(self.to, t)
    }

    /// Advance by `dt`; returns `true` once the movement has arrived.
    pub fn update(&mut self, dt: Fixed) -> bool {
        if self.duration <= Fixed::ZERO {
            self.progress = Fixed::from_num(1);
        } else {
            self.progress += dt / self.duration;
        }
        self.progress >= Fixed::from_num(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(distance: i32) -> Launch {
        Launch {
            origin: PlanetId(0),
            destination: PlanetId(1),
            owner: FactionId(0),
            amount: 10,
            launched_at: Fixed::ZERO,
            from: Vec2Fixed::ZERO,
            to: Vec2Fixed::new(Fixed::from_num(distance), Fixed::ZERO),
            speed: Fixed::from_num(100),
        }
    }

    #[test]
    fn test_duration_from_distance_and_speed() {
        let m = TroopMovement::new(MovementId(1), launch(200));
        assert_eq!(m.duration(), Fixed::from_num(2));
        assert_eq!(m.remaining_time(), Fixed::from_num(2));
    }

    #[test]
    fn test_update_reports_arrival() {
        let mut m = TroopMovement::new(MovementId(1), launch(100));
        assert!(!m.update(Fixed::from_num(0.5)));
        assert_eq!(m.position().x, Fixed::from_num(50));
        assert!(m.update(Fixed::from_num(0.5)));
        assert_eq!(m.progress(), Fixed::from_num(1));
    }

    #[test]
    fn test_zero_length_arrives_immediately() {
        let mut m = TroopMovement::new(MovementId(1), launch(0));
        assert!(m.update(Fixed::ZERO));
    }
}
