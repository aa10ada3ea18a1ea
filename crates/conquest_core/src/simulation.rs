//! Core simulation loop.
//!
//! Variable frame times go in through [`Simulation::advance_frame`], which
//! converts them into simulated time via the [`MatchClock`] and drains the
//! result in fixed sub-steps. Each sub-step ([`Simulation::step`]) runs, in
//! strict order:
//!
//! 1. **Planets** - glow aggregates and production
//! 2. **Movements** - transit and arrival resolution
//! 3. **Bots** - decision polling and dispatch
//! 4. **Win check** - eliminations and victory conditions
//!
//! All state lives in one place and is only written from these steps, so
//! a match is fully reproducible from its config and inputs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::MatchClock;
use crate::config::MatchConfig;
use crate::decision::{DecisionApi, DecisionMaker, MoveIntent};
use crate::error::Result;
use crate::factions::{leader_by_troops, FactionId, FactionRegistry};
use crate::game_state::{GameState, MatchPhase, MatchReport, VictoryKind};
use crate::math::Fixed;
use crate::movement::{Launch, MovementId, TroopMovement};
use crate::planet::{resolve_arrival, ArrivalOutcome, Planet, PlanetId};
use crate::world::World;
use crate::world_gen::generate_world;

/// One resolved arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalEvent {
    /// The movement that landed.
    pub movement: MovementId,
    /// Target planet.
    pub planet: PlanetId,
    /// Arriving faction.
    pub faction: FactionId,
    /// Troops that landed.
    pub amount: u32,
    /// Result.
    pub outcome: ArrivalOutcome,
}

/// Events generated during one or more sub-steps.
///
/// Presentation layers use these for effects and sounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Resolved arrivals, in resolution order.
    pub arrivals: Vec<ArrivalEvent>,
    /// Movements launched (by bots or input).
    pub launched: Vec<MovementId>,
    /// Factions eliminated.
    pub eliminations: Vec<FactionId>,
    /// Set on the step that ended the match.
    pub game_over: Option<VictoryKind>,
}

impl TickEvents {
    /// Append another batch of events.
    pub fn merge(&mut self, mut other: Self) {
        self.arrivals.append(&mut other.arrivals);
        self.launched.append(&mut other.launched);
        self.eliminations.append(&mut other.eliminations);
        if other.game_over.is_some() {
            self.game_over = other.game_over;
        }
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
            && self.launched.is_empty()
            && self.eliminations.is_empty()
            && self.game_over.is_none()
    }
}

/// Outcome of feeding one wall-clock frame to the simulation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Fixed sub-steps run.
    pub steps: u32,
    /// Fraction of a sub-step left in the accumulator, for interpolation.
    pub alpha: Fixed,
    /// Simulated seconds dropped because the sub-step cap was hit.
    pub discarded: Fixed,
    /// Everything that happened during this frame.
    pub events: TickEvents,
}

/// The match simulation.
///
/// Owns the world, the faction registry, the clock and the win tracker.
#[derive(Debug)]
pub struct Simulation {
    config: MatchConfig,
    world: World,
    registry: FactionRegistry,
    clock: MatchClock,
    state: GameState,
    step_size: Fixed,
    poll_interval: Fixed,
    accumulator: Fixed,
    tick: u64,
    pending: TickEvents,
}

impl Simulation {
    /// Validate `config`, generate a world and set up the match.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let world = generate_world(&config);
        Self::with_world(config, world)
    }

    /// Set up a match on a prepared world.
    ///
    /// Planet owners in `world` must refer to factions in `config`.
    pub fn with_world(config: MatchConfig, world: World) -> Result<Self> {
        config.validate()?;
        let registry = FactionRegistry::from_config(&config.factions);
        let clock = MatchClock::new(
            Fixed::from_num(config.match_duration_secs),
            config.speed_multiplier,
            config.pause_when_hidden,
        );
        let state = GameState::new(registry.len());

        info!(
            seed = config.seed,
            planets = world.planets().len(),
            factions = registry.len(),
            "Match created"
        );

        Ok(Self {
            step_size: config.fixed_step(),
            poll_interval: Fixed::from_num(config.ai_poll_interval_secs),
            config,
            world,
            registry,
            clock,
            state,
            accumulator: Fixed::ZERO,
            tick: 0,
            pending: TickEvents::default(),
        })
    }

    /// Bind a bot controller to a bot faction.
    pub fn bind_controller(
        &mut self,
        faction: FactionId,
        controller: Box<dyn DecisionMaker>,
    ) -> Result<()> {
        self.registry.bind_controller(faction, controller)
    }

    /// Match configuration.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Planets and movements.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// All planets, ordered by id.
    #[must_use]
    pub fn planets(&self) -> &[Planet] {
        self.world.planets()
    }

    /// In-flight movements.
    #[must_use]
    pub fn movements(&self) -> &[TroopMovement] {
        self.world.movements()
    }

    /// Faction registry.
    #[must_use]
    pub const fn registry(&self) -> &FactionRegistry {
        &self.registry
    }

    /// Match clock.
    #[must_use]
    pub const fn clock(&self) -> &MatchClock {
        &self.clock
    }

    /// Mutable clock access for pause, visibility and speed controls.
    pub fn clock_mut(&mut self) -> &mut MatchClock {
        &mut self.clock
    }

    /// Win tracker and statistics.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Fixed steps executed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Length of one sub-step in simulated seconds.
    #[must_use]
    pub const fn step_size(&self) -> Fixed {
        self.step_size
    }

    /// Simulated seconds since the start.
    #[must_use]
    pub fn elapsed(&self) -> Fixed {
        self.clock.elapsed()
    }

    /// Whether the match has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.state.phase() == MatchPhase::Over
    }

    /// Final report, once the match is over.
    #[must_use]
    pub const fn report(&self) -> Option<&MatchReport> {
        self.state.report()
    }

    /// Feed one wall-clock frame.
    ///
    /// Scales the delta through the clock, then drains whole sub-steps up to
    /// `max_substeps_per_frame`. Backlog beyond the cap is discarded.
    pub fn advance_frame(&mut self, wall: Duration) -> FrameReport {
        let mut report = FrameReport::default();
        if self.is_over() {
            return report;
        }

        self.accumulator = self.accumulator.saturating_add(self.clock.scale(wall));
        let cap = self.config.max_substeps_per_frame;
        while self.accumulator >= self.step_size && report.steps < cap {
            self.accumulator -= self.step_size;
            report.events.merge(self.step());
            report.steps += 1;
            if self.is_over() {
                self.accumulator = Fixed::ZERO;
                break;
            }
        }

        if self.accumulator >= self.step_size {
            let keep = self.accumulator % self.step_size;
            report.discarded = self.accumulator - keep;
            self.accumulator = keep;
            debug!(
                tick = self.tick,
                discarded = %report.discarded,
                "Sub-step cap reached, dropping backlog"
            );
        }

        report.alpha = self.accumulator / self.step_size;
        report
    }

    /// Run one fixed sub-step. No-op once the match is over.
    pub fn step(&mut self) -> TickEvents {
        let mut events = std::mem::take(&mut self.pending);
        if self.is_over() {
            return events;
        }

        let dt = self.step_size;
        self.tick += 1;
        self.clock.advance(dt);

        // 1. Planets
        self.world.update_planets(dt);

        // 2. Movements
        for movement in self.world.advance_movements(dt) {
            events.arrivals.push(self.resolve(&movement));
        }

        // 3. Bots
        self.poll_ai();
        events.launched.append(&mut self.pending.launched);

        // 4. Win check
        self.check_win_conditions_into(&mut events);

        if self.clock.pauses_when_hidden() && !self.registry.any_human_active(&self.world) {
            self.clock.disable_visibility_pause();
        }

        debug!(tick = self.tick, state_hash = self.state_hash(), "Simulation state hash");

        events
    }

    fn resolve(&mut self, movement: &TroopMovement) -> ArrivalEvent {
        let event = ArrivalEvent {
            movement: movement.id(),
            planet: movement.destination(),
            faction: movement.owner(),
            amount: movement.amount(),
            outcome: ArrivalOutcome::Reinforced,
        };
        let Some(planet) = self.world.planet_mut(movement.destination()) else {
            return event;
        };

        let defender = planet.owner;
        let result = resolve_arrival(defender, planet.troops, movement.owner(), movement.troops());
        planet.owner = result.owner;
        planet.troops = result.troops;

        let stats = self.state.stats_mut();
        if result.outcome != ArrivalOutcome::Reinforced {
            stats.record_loss(Some(movement.owner()), result.attacker_loss);
            stats.record_loss(defender, result.defender_loss);
        }
        if let ArrivalOutcome::Captured { previous_owner } = result.outcome {
            stats.record_conquest(movement.owner());
            info!(
                tick = self.tick,
                planet = %movement.destination(),
                attacker = %movement.owner(),
                previous_owner = ?previous_owner,
                "Planet captured"
            );
        }

        ArrivalEvent {
            outcome: result.outcome,
            ..event
        }
    }

    /// Dispatch troops from `from` to `to` on behalf of the source's owner.
    ///
    /// Non-positive amounts, neutral or unknown planets and self-targets are
    /// dropped. The amount is clamped to the whole troops on the source.
    /// Returns the new movement, if one was launched.
    pub fn send_troops(&mut self, from: PlanetId, to: PlanetId, amount: i64) -> Option<MovementId> {
        if self.is_over() || amount <= 0 || from == to {
            return None;
        }
        let target = self.world.planet(to)?.position();
        let source = self.world.planet_mut(from)?;
        let owner = source.owner?;

        let amount = amount.min(source.available_troops());
        let Ok(amount) = u32::try_from(amount) else {
            return None;
        };
        if amount == 0 {
            return None;
        }

        source.troops -= Fixed::from_num(amount);
        let origin = source.position;

        let id = self.world.launch(Launch {
            origin: from,
            destination: to,
            owner,
            amount,
            launched_at: self.clock.elapsed(),
            from: origin,
            to: target,
            speed: Fixed::from_num(self.config.movement_speed),
        });
        self.state.stats_mut().record_sent(owner, amount);
        self.pending.launched.push(id);
        Some(id)
    }

    fn poll_ai(&mut self) {
        let now = self.clock.elapsed();
        let duration = self.clock.duration();
        let speed = Fixed::from_num(self.config.movement_speed);
        let map_size = (self.config.map_width, self.config.map_height);

        for index in 0..self.registry.len() {
            let decision = {
                let (factions, controllers) = self.registry.split_controllers();
                let faction = &factions[index];
                if !faction.is_bot || faction.is_eliminated() || now < faction.next_decision_at {
                    continue;
                }
                let Some(controller) = controllers[index].as_mut() else {
                    continue;
                };
                let me = faction.id;
                let api = DecisionApi::new(
                    &self.world,
                    factions,
                    me,
                    now,
                    duration,
                    speed,
                    map_size,
                );
                let intent = controller.decide(&api);
                (me, controller.name().to_string(), intent)
            };

            let (me, bot_name, intent) = decision;
            self.registry.factions_mut()[index].next_decision_at = now + self.poll_interval;
            if let Some(intent) = intent {
                self.execute_intent(me, &bot_name, intent);
            }
        }
    }

    fn execute_intent(
        &mut self,
        faction: FactionId,
        bot_name: &str,
        intent: MoveIntent,
    ) -> Option<MovementId> {
        let owner = self.world.planet(intent.from).and_then(Planet::owner);
        if owner != Some(faction) {
            warn!(
                bot = bot_name,
                faction = %faction,
                from = %intent.from,
                "Dropping move order from a planet the bot does not own"
            );
            return None;
        }
        self.send_troops(intent.from, intent.to, intent.troops)
    }

    /// Record eliminations and end the match if a victory condition holds.
    ///
    /// Safe to call at any time; once the match is over it only returns the
    /// existing report.
    pub fn check_win_conditions(&mut self) -> Option<&MatchReport> {
        let mut events = TickEvents::default();
        self.check_win_conditions_into(&mut events);
        self.pending.merge(events);
        self.state.report()
    }

    fn check_win_conditions_into(&mut self, events: &mut TickEvents) {
        if self.is_over() {
            return;
        }
        let now = self.clock.elapsed();

        let newly_out: Vec<FactionId> = self
            .registry
            .factions()
            .iter()
            .filter(|f| !f.is_eliminated() && !self.registry.is_active(&self.world, f.id))
            .map(|f| f.id)
            .collect();
        for id in newly_out {
            self.registry.factions_mut()[id.index()].eliminated_at = Some(now);
            events.eliminations.push(id);
            info!(tick = self.tick, faction = %id, elapsed = %now, "Faction eliminated");
        }

        let outcome = if self.clock.expired() {
            let ids = self.registry.factions().iter().map(|f| f.id);
            Some((leader_by_troops(&self.world, ids), VictoryKind::Time))
        } else {
            let active = self.registry.active_factions(&self.world);
            match active.as_slice() {
                [sole] => Some((Some(*sole), VictoryKind::Domination)),
                [] => Some((None, VictoryKind::Domination)),
                _ => None,
            }
        };

        if let Some((winner, victory)) = outcome {
            self.state
                .finish(winner, victory, now, self.tick, &self.registry, &self.world);
            events.game_over = Some(victory);
        }
    }

    /// Compute a hash of the match state.
    ///
    /// Two simulations fed the same config and inputs produce the same
    /// hash at every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.clock.remaining().to_bits().hash(&mut hasher);

        for planet in self.world.planets() {
            planet.id().hash(&mut hasher);
            planet.owner().hash(&mut hasher);
            planet.troops().to_bits().hash(&mut hasher);
        }

        self.world.movements().len().hash(&mut hasher);
        for movement in self.world.movements() {
            movement.id().hash(&mut hasher);
            movement.owner().hash(&mut hasher);
            movement.amount().hash(&mut hasher);
            movement.progress().to_bits().hash(&mut hasher);
        }

        for faction in self.registry.factions() {
            faction.eliminated_at.map(Fixed::to_bits).hash(&mut hasher);
        }

        hasher.finish()
    }
}
