//! Read-only decision interface for bots.
//!
//! Bots never touch [`World`] directly. Each decision cycle a bot receives a
//! [`DecisionApi`] borrowed from the simulation; everything it hands out is a
//! view ([`PlanetView`], [`MovementView`], [`FactionView`]) that exposes
//! accessors only. The borrow checker rules out writes through a view, and
//! [`PlanetView::snapshot`] / [`MovementView::snapshot`] detach owned copies
//! that a bot may scribble on freely without reaching the world.
//!
//! A bot answers with at most one [`MoveIntent`]. The simulation executes it
//! through the same sanitizing dispatch path human input uses, so a bot has
//! no privileged way to change state.

use serde::{Deserialize, Serialize};

use crate::config::Color;
use crate::factions::{Faction, FactionId};
use crate::math::{Fixed, Vec2Fixed};
use crate::movement::{MovementId, TroopMovement};
use crate::planet::{accrue, resolve_arrival, Planet, PlanetId, PlanetKind};
use crate::world::World;

/// Enemy planets farther than this do not contribute to a threat score.
pub const THREAT_RADIUS: f64 = 300.0;

/// Weight of incoming attack mass in the threat score.
const INCOMING_WEIGHT: f64 = 1.5;

/// Weights of size, production and centrality in the value score.
const VALUE_WEIGHTS: (f64, f64, f64) = (1.0, 20.0, 30.0);

/// Decision-making capability bound to a bot faction.
pub trait DecisionMaker {
    /// Name used to tag diagnostics.
    fn name(&self) -> &str;

    /// Look at the world and optionally request one troop movement.
    fn decide(&mut self, api: &DecisionApi<'_>) -> Option<MoveIntent>;
}

/// A request to move troops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveIntent {
    /// Source planet; must belong to the requesting faction.
    pub from: PlanetId,
    /// Target planet.
    pub to: PlanetId,
    /// Requested troops; clamped or dropped when out of range.
    pub troops: i64,
}

impl MoveIntent {
    /// Build an intent.
    #[must_use]
    pub const fn new(from: PlanetId, to: PlanetId, troops: i64) -> Self {
        Self { from, to, troops }
    }
}

/// Coarse match progress, by elapsed fraction of the match duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// First third.
    Early,
    /// Second third.
    Mid,
    /// Final third.
    Late,
}

/// Estimated planet state at a future instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    /// Owner after all counted arrivals.
    pub owner: Option<FactionId>,
    /// Troops at the horizon.
    pub troops: Fixed,
}

/// Read-only view of a planet.
#[derive(Debug, Clone, Copy)]
pub struct PlanetView<'a> {
    planet: &'a Planet,
}

impl<'a> PlanetView<'a> {
    /// Id.
    #[must_use]
    pub fn id(&self) -> PlanetId {
        self.planet.id()
    }

    /// Placement kind.
    #[must_use]
    pub fn kind(&self) -> PlanetKind {
        self.planet.kind()
    }

    /// Position.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        self.planet.position()
    }

    /// Radius.
    #[must_use]
    pub fn radius(&self) -> Fixed {
        self.planet.radius()
    }

    /// Owner.
    #[must_use]
    pub fn owner(&self) -> Option<FactionId> {
        self.planet.owner()
    }

    /// Whether the planet is neutral.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.planet.is_neutral()
    }

    /// Troops stationed.
    #[must_use]
    pub fn troops(&self) -> Fixed {
        self.planet.troops()
    }

    /// Whole troops that could be dispatched right now.
    #[must_use]
    pub fn available_troops(&self) -> i64 {
        self.planet.available_troops()
    }

    /// Troop cap.
    #[must_use]
    pub fn max_troops(&self) -> Fixed {
        self.planet.max_troops()
    }

    /// Production rate.
    #[must_use]
    pub fn production_rate(&self) -> Fixed {
        self.planet.production_rate()
    }

    /// Detach an owned copy.
    #[must_use]
    pub fn snapshot(&self) -> PlanetSnapshot {
        PlanetSnapshot {
            id: self.id(),
            kind: self.kind(),
            position: self.position(),
            radius: self.radius(),
            owner: self.owner(),
            troops: self.troops(),
            max_troops: self.max_troops(),
            production_rate: self.production_rate(),
        }
    }

    fn inner(&self) -> &'a Planet {
        self.planet
    }
}

/// Owned copy of a planet's state. Changing it has no effect on the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanetSnapshot {
    /// Id.
    pub id: PlanetId,
    /// Placement kind.
    pub kind: PlanetKind,
    /// Position.
    pub position: Vec2Fixed,
    /// Radius.
    pub radius: Fixed,
    /// Owner.
    pub owner: Option<FactionId>,
    /// Troops.
    pub troops: Fixed,
    /// Troop cap.
    pub max_troops: Fixed,
    /// Production rate.
    pub production_rate: Fixed,
}

/// Read-only view of a troop movement.
#[derive(Debug, Clone, Copy)]
pub struct MovementView<'a> {
    movement: &'a TroopMovement,
}

impl MovementView<'_> {
    /// Id.
    #[must_use]
    pub fn id(&self) -> MovementId {
        self.movement.id()
    }

    /// Source planet.
    #[must_use]
    pub fn origin(&self) -> PlanetId {
        self.movement.origin()
    }

    /// Target planet.
    #[must_use]
    pub fn destination(&self) -> PlanetId {
        self.movement.destination()
    }

    /// Owning faction.
    #[must_use]
    pub fn owner(&self) -> FactionId {
        self.movement.owner()
    }

    /// Troops carried.
    #[must_use]
    pub fn amount(&self) -> u32 {
        self.movement.amount()
    }

    /// Progress fraction.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        self.movement.progress()
    }

    /// Seconds to arrival.
    #[must_use]
    pub fn remaining_time(&self) -> Fixed {
        self.movement.remaining_time()
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        self.movement.position()
    }

    /// Detach an owned copy.
    #[must_use]
    pub fn snapshot(&self) -> MovementSnapshot {
        MovementSnapshot {
            id: self.id(),
            origin: self.origin(),
            destination: self.destination(),
            owner: self.owner(),
            amount: self.amount(),
            progress: self.progress(),
            remaining_time: self.remaining_time(),
        }
    }
}

/// Owned copy of a movement's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementSnapshot {
    /// Id.
    pub id: MovementId,
    /// Source planet.
    pub origin: PlanetId,
    /// Target planet.
    pub destination: PlanetId,
    /// Owner.
    pub owner: FactionId,
    /// Troops carried.
    pub amount: u32,
    /// Progress fraction.
    pub progress: Fixed,
    /// Seconds to arrival.
    pub remaining_time: Fixed,
}

/// Read-only view of a faction.
#[derive(Debug, Clone, Copy)]
pub struct FactionView<'a> {
    faction: &'a Faction,
}

impl FactionView<'_> {
    /// Id.
    #[must_use]
    pub fn id(&self) -> FactionId {
        self.faction.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.faction.name
    }

    /// Display color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.faction.color
    }

    /// Whether a bot drives this faction.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.faction.is_bot
    }

    /// Elimination time, if eliminated.
    #[must_use]
    pub fn eliminated_at(&self) -> Option<Fixed> {
        self.faction.eliminated_at
    }
}

/// Query surface handed to a bot for one decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionApi<'a> {
    world: &'a World,
    factions: &'a [Faction],
    me: FactionId,
    elapsed: Fixed,
    duration: Fixed,
    speed: Fixed,
    map_size: (f64, f64),
}

impl<'a> DecisionApi<'a> {
    /// Build the view for faction `me`.
    #[must_use]
    pub fn new(
        world: &'a World,
        factions: &'a [Faction],
        me: FactionId,
        elapsed: Fixed,
        duration: Fixed,
        speed: Fixed,
        map_size: (f64, f64),
    ) -> Self {
        Self {
            world,
            factions,
            me,
            elapsed,
            duration,
            speed,
            map_size,
        }
    }

    /// The faction this view belongs to.
    #[must_use]
    pub const fn me(&self) -> FactionId {
        self.me
    }

    /// Simulated seconds since the start.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Simulated seconds left.
    #[must_use]
    pub fn remaining(&self) -> Fixed {
        (self.duration - self.elapsed).max(Fixed::ZERO)
    }

    /// Early / mid / late, by thirds of the match duration.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        if self.duration <= Fixed::ZERO {
            return GamePhase::Late;
        }
        let three = Fixed::from_num(3);
        let scaled = self.elapsed * three;
        if scaled < self.duration {
            GamePhase::Early
        } else if scaled < self.duration * Fixed::from_num(2) {
            GamePhase::Mid
        } else {
            GamePhase::Late
        }
    }

    /// Every faction in registration order.
    pub fn factions(&self) -> impl Iterator<Item = FactionView<'a>> + 'a {
        self.factions.iter().map(|faction| FactionView { faction })
    }

    /// One faction.
    #[must_use]
    pub fn faction(&self, id: FactionId) -> Option<FactionView<'a>> {
        self.factions.get(id.index()).map(|faction| FactionView { faction })
    }

    /// Every planet.
    #[must_use]
    pub fn planets(&self) -> Vec<PlanetView<'a>> {
        self.world
            .planets()
            .iter()
            .map(|planet| PlanetView { planet })
            .collect()
    }

    /// One planet.
    #[must_use]
    pub fn planet(&self, id: PlanetId) -> Option<PlanetView<'a>> {
        self.world.planet(id).map(|planet| PlanetView { planet })
    }

    fn planets_where(&self, keep: impl Fn(&Planet) -> bool) -> Vec<PlanetView<'a>> {
        self.world
            .planets()
            .iter()
            .filter(|p| keep(p))
            .map(|planet| PlanetView { planet })
            .collect()
    }

    /// Planets this faction owns.
    #[must_use]
    pub fn my_planets(&self) -> Vec<PlanetView<'a>> {
        let me = self.me;
        self.planets_where(|p| p.owner() == Some(me))
    }

    /// Planets owned by other factions.
    #[must_use]
    pub fn enemy_planets(&self) -> Vec<PlanetView<'a>> {
        let me = self.me;
        self.planets_where(|p| p.owner().is_some_and(|o| o != me))
    }

    /// Unowned planets.
    #[must_use]
    pub fn neutral_planets(&self) -> Vec<PlanetView<'a>> {
        self.planets_where(Planet::is_neutral)
    }

    /// Planets owned by `faction`.
    #[must_use]
    pub fn planets_of(&self, faction: FactionId) -> Vec<PlanetView<'a>> {
        self.planets_where(|p| p.owner() == Some(faction))
    }

    /// Every in-flight movement.
    #[must_use]
    pub fn movements(&self) -> Vec<MovementView<'a>> {
        self.world
            .movements()
            .iter()
            .map(|movement| MovementView { movement })
            .collect()
    }

    /// Movements dispatched by `faction`.
    #[must_use]
    pub fn movements_of(&self, faction: FactionId) -> Vec<MovementView<'a>> {
        self.world
            .movements()
            .iter()
            .filter(|m| m.owner() == faction)
            .map(|movement| MovementView { movement })
            .collect()
    }

    /// This faction's movements.
    #[must_use]
    pub fn my_movements(&self) -> Vec<MovementView<'a>> {
        self.movements_of(self.me)
    }

    /// Movements heading to `planet` from factions other than its owner.
    #[must_use]
    pub fn incoming_attacks(&self, planet: PlanetId) -> Vec<MovementView<'a>> {
        let owner = self.world.planet(planet).and_then(Planet::owner);
        self.world
            .movements()
            .iter()
            .filter(|m| m.destination() == planet && Some(m.owner()) != owner)
            .map(|movement| MovementView { movement })
            .collect()
    }

    /// Movements heading to `planet` from its owner.
    #[must_use]
    pub fn incoming_reinforcements(&self, planet: PlanetId) -> Vec<MovementView<'a>> {
        let Some(owner) = self.world.planet(planet).and_then(Planet::owner) else {
            return Vec::new();
        };
        self.world
            .movements()
            .iter()
            .filter(|m| m.destination() == planet && m.owner() == owner)
            .map(|movement| MovementView { movement })
            .collect()
    }

    /// Center-to-center distance; `None` for unknown ids.
    #[must_use]
    pub fn distance(&self, a: PlanetId, b: PlanetId) -> Option<Fixed> {
        let a = self.world.planet(a)?;
        let b = self.world.planet(b)?;
        Some(a.position().distance(b.position()))
    }

    /// Seconds a movement from `a` to `b` would take.
    #[must_use]
    pub fn travel_time(&self, a: PlanetId, b: PlanetId) -> Option<Fixed> {
        let distance = self.distance(a, b)?;
        if self.speed <= Fixed::ZERO {
            return None;
        }
        Some(distance / self.speed)
    }

    /// Closest other planet to `from` that satisfies `matches`.
    ///
    /// Ties go to the lower planet id.
    pub fn nearest_planet_where(
        &self,
        from: PlanetId,
        matches: impl Fn(&PlanetView<'a>) -> bool,
    ) -> Option<PlanetView<'a>> {
        let origin = self.world.planet(from)?.position();
        self.world
            .planets()
            .iter()
            .filter(|p| p.id() != from)
            .map(|planet| PlanetView { planet })
            .filter(|view| matches(view))
            .min_by_key(|view| (view.position().distance_squared(origin), view.id()))
    }

    /// Closest other planet to `from`.
    #[must_use]
    pub fn nearest_planet(&self, from: PlanetId) -> Option<PlanetView<'a>> {
        self.nearest_planet_where(from, |_| true)
    }

    /// Closest planet owned by another faction.
    #[must_use]
    pub fn nearest_enemy(&self, from: PlanetId) -> Option<PlanetView<'a>> {
        let me = self.me;
        self.nearest_planet_where(from, |p| p.owner().is_some_and(|o| o != me))
    }

    /// Closest neutral planet.
    #[must_use]
    pub fn nearest_neutral(&self, from: PlanetId) -> Option<PlanetView<'a>> {
        self.nearest_planet_where(from, PlanetView::is_neutral)
    }

    /// Default strategic value: size, production and closeness to the map
    /// center, weighted.
    #[must_use]
    pub fn planet_value(&self, planet: PlanetId) -> f64 {
        let Some(p) = self.world.planet(planet) else {
            return 0.0;
        };
        let (w, h) = self.map_size;
        let (cx, cy) = (w / 2.0, h / 2.0);
        let pos = p.position();
        let (x, y): (f64, f64) = (pos.x.to_num(), pos.y.to_num());
        let max_reach = cx.hypot(cy).max(f64::EPSILON);
        let centrality = 1.0 - ((x - cx).hypot(y - cy) / max_reach).min(1.0);

        let (size_w, production_w, center_w) = VALUE_WEIGHTS;
        p.radius().to_num::<f64>() * size_w
            + p.production_rate().to_num::<f64>() * production_w
            + centrality * center_w
    }

    /// Default threat to one of this faction's planets: nearby enemy
    /// garrisons weighted by proximity, plus troops already inbound against
    /// it. Returns 0 for planets this faction does not own.
    #[must_use]
    pub fn threat(&self, planet: PlanetId) -> f64 {
        let Some(p) = self.world.planet(planet) else {
            return 0.0;
        };
        if p.owner() != Some(self.me) {
            return 0.0;
        }

        let nearby: f64 = self
            .world
            .planets()
            .iter()
            .filter(|other| other.owner().is_some_and(|o| o != self.me))
            .filter_map(|enemy| {
                let d: f64 = enemy.position().distance(p.position()).to_num();
                (d < THREAT_RADIUS)
                    .then(|| enemy.troops().to_num::<f64>() * (1.0 - d / THREAT_RADIUS))
            })
            .sum();

        let incoming: f64 = self
            .world
            .movements()
            .iter()
            .filter(|m| m.destination() == planet && m.owner() != self.me)
            .map(|m| f64::from(m.amount()))
            .sum();

        nearby + incoming * INCOMING_WEIGHT
    }

    /// Estimate owner and troops of `planet` after `horizon` seconds.
    ///
    /// Applies production and every pending arrival due within the horizon
    /// in chronological order (ties by movement id). Movements not yet
    /// launched are unknown and ignored.
    #[must_use]
    pub fn predict(&self, planet: PlanetId, horizon: Fixed) -> Option<Prediction> {
        let p = self.world.planet(planet)?;
        let mut arrivals: Vec<(Fixed, MovementId, FactionId, Fixed)> = self
            .world
            .movements()
            .iter()
            .filter(|m| m.destination() == planet)
            .map(|m| (m.remaining_time(), m.id(), m.owner(), m.troops()))
            .filter(|(eta, ..)| *eta <= horizon)
            .collect();
        arrivals.sort_by_key(|&(eta, id, ..)| (eta, id));

        let mut owner = p.owner();
        let mut troops = p.troops();
        let mut now = Fixed::ZERO;
        for (eta, _, faction, amount) in arrivals {
            if owner.is_some() {
                troops = accrue(troops, p.production_rate(), p.max_troops(), eta - now);
            }
            let result = resolve_arrival(owner, troops, faction, amount);
            owner = result.owner;
            troops = result.troops;
            now = eta;
        }
        if owner.is_some() && horizon > now {
            troops = accrue(troops, p.production_rate(), p.max_troops(), horizon - now);
        }
        Some(Prediction { owner, troops })
    }

    /// Total troops of a faction, stationed and in flight.
    #[must_use]
    pub fn faction_troops(&self, faction: FactionId) -> Fixed {
        self.world.total_troops(faction)
    }

    /// Total production of a faction.
    #[must_use]
    pub fn faction_production(&self, faction: FactionId) -> Fixed {
        self.world.total_production(faction)
    }

    /// This faction's total troops.
    #[must_use]
    pub fn my_troops(&self) -> Fixed {
        self.faction_troops(self.me)
    }

    /// This faction's total production.
    #[must_use]
    pub fn my_production(&self) -> Fixed {
        self.faction_production(self.me)
    }

    /// Whether `view` currently belongs to this faction.
    #[must_use]
    pub fn owns(&self, view: &PlanetView<'_>) -> bool {
        view.inner().owner() == Some(self.me)
    }
}
