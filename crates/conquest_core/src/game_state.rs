//! Match phase, statistics and the end-of-match report.
//!
//! The match moves from [`MatchPhase::Active`] to [`MatchPhase::Over`]
//! exactly once. [`GameState::finish`] is idempotent: the first call builds
//! the [`MatchReport`], later calls return that same report.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::factions::{FactionId, FactionRegistry};
use crate::math::Fixed;
use crate::world::World;

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MatchPhase {
    /// Ticks are running.
    #[default]
    Active,
    /// Terminal.
    Over,
}

/// How the match was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VictoryKind {
    /// The timer ran out; most total troops won.
    Time,
    /// Only one faction remained active.
    Domination,
}

/// Running per-faction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactionStats {
    /// Whole troops dispatched.
    pub troops_sent: u64,
    /// Troops destroyed in combat, attacking or defending.
    pub troops_lost: Fixed,
    /// Planets captured.
    pub planets_conquered: u32,
}

/// Counters accumulated over the match.
#[derive(Debug, Clone, Default)]
pub struct MatchStats {
    factions: Vec<FactionStats>,
    neutral_losses: Fixed,
}

impl MatchStats {
    /// Zeroed counters for `faction_count` factions.
    #[must_use]
    pub fn new(faction_count: usize) -> Self {
        Self {
            factions: vec![FactionStats::default(); faction_count],
            neutral_losses: Fixed::ZERO,
        }
    }

    /// Counters of one faction.
    #[must_use]
    pub fn faction(&self, id: FactionId) -> FactionStats {
        self.factions.get(id.index()).copied().unwrap_or_default()
    }

    /// Troops neutral garrisons lost to attacks.
    #[must_use]
    pub const fn neutral_losses(&self) -> Fixed {
        self.neutral_losses
    }

    pub(crate) fn record_sent(&mut self, id: FactionId, amount: u32) {
        if let Some(stats) = self.factions.get_mut(id.index()) {
            stats.troops_sent += u64::from(amount);
        }
    }

    /// Record combat losses; `None` is the neutral side.
    pub(crate) fn record_loss(&mut self, side: Option<FactionId>, amount: Fixed) {
        match side.and_then(|id| self.factions.get_mut(id.index())) {
            Some(stats) => stats.troops_lost += amount,
            None => self.neutral_losses += amount,
        }
    }

    pub(crate) fn record_conquest(&mut self, id: FactionId) {
        if let Some(stats) = self.factions.get_mut(id.index()) {
            stats.planets_conquered += 1;
        }
    }

    /// Total whole troops dispatched by all factions.
    #[must_use]
    pub fn total_sent(&self) -> u64 {
        self.factions.iter().map(|s| s.troops_sent).sum()
    }

    /// Total troops lost by all factions.
    #[must_use]
    pub fn total_lost(&self) -> Fixed {
        self.factions.iter().map(|s| s.troops_lost).sum()
    }

    /// Total planets captured by all factions.
    #[must_use]
    pub fn total_conquered(&self) -> u32 {
        self.factions.iter().map(|s| s.planets_conquered).sum()
    }
}

/// One faction's line in the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionSummary {
    /// Faction id.
    pub faction: FactionId,
    /// Display name.
    pub name: String,
    /// Whether a bot drove this faction.
    pub is_bot: bool,
    /// Planets held at the end.
    pub planets: usize,
    /// Total troops at the end (stationed and in flight).
    pub troops: f64,
    /// Whole troops dispatched.
    pub troops_sent: u64,
    /// Troops lost in combat.
    pub troops_lost: f64,
    /// Planets captured.
    pub planets_conquered: u32,
    /// Simulated time of elimination, if eliminated.
    pub eliminated_at: Option<f64>,
    /// Simulated seconds survived.
    pub survival_time: f64,
}

/// Final snapshot handed to reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Winning faction.
    pub winner: Option<FactionId>,
    /// Winner display name.
    pub winner_name: Option<String>,
    /// Victory condition that ended the match.
    pub victory: VictoryKind,
    /// Simulated seconds played.
    pub elapsed: f64,
    /// Fixed steps executed.
    pub ticks: u64,
    /// Whole troops dispatched by everyone.
    pub troops_sent: u64,
    /// Troops lost by every faction.
    pub troops_lost: f64,
    /// Planets captured by everyone.
    pub planets_conquered: u32,
    /// Per-faction lines in registration order.
    pub factions: Vec<FactionSummary>,
    /// Ranking: planets, then troops, then survival time, then faction id.
    pub standings: Vec<FactionId>,
}

impl MatchReport {
    /// Summary line of one faction.
    #[must_use]
    pub fn faction(&self, id: FactionId) -> Option<&FactionSummary> {
        self.factions.iter().find(|f| f.faction == id)
    }
}

/// Win tracker and statistics for a running match.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    phase: MatchPhase,
    stats: MatchStats,
    report: Option<MatchReport>,
}

impl GameState {
    /// Fresh active state.
    #[must_use]
    pub fn new(faction_count: usize) -> Self {
        Self {
            phase: MatchPhase::Active,
            stats: MatchStats::new(faction_count),
            report: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Whether the match has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.phase == MatchPhase::Over
    }

    /// Running statistics.
    #[must_use]
    pub const fn stats(&self) -> &MatchStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut MatchStats {
        &mut self.stats
    }

    /// Final report, once the match is over.
    #[must_use]
    pub const fn report(&self) -> Option<&MatchReport> {
        self.report.as_ref()
    }

    /// End the match. Only the first call has any effect.
    pub fn finish(
        &mut self,
        winner: Option<FactionId>,
        victory: VictoryKind,
        elapsed: Fixed,
        ticks: u64,
        registry: &FactionRegistry,
        world: &World,
    ) -> &MatchReport {
        self.phase = MatchPhase::Over;
        let stats = &self.stats;
        self.report.get_or_insert_with(|| {
            let report = build_report(stats, winner, victory, elapsed, ticks, registry, world);
            info!(
                winner = ?report.winner_name,
                victory = ?report.victory,
                elapsed = report.elapsed,
                "Match over"
            );
            report
        })
    }
}

struct Ranked {
    id: FactionId,
    planets: usize,
    troops: Fixed,
    survival: Fixed,
}

fn build_report(
    stats: &MatchStats,
    winner: Option<FactionId>,
    victory: VictoryKind,
    elapsed: Fixed,
    ticks: u64,
    registry: &FactionRegistry,
    world: &World,
) -> MatchReport {
    let mut ranked = Vec::with_capacity(registry.len());
    let mut factions = Vec::with_capacity(registry.len());

    for faction in registry.factions() {
        let planets = world.planet_count(faction.id);
        let troops = world.total_troops(faction.id);
        let survival = faction.eliminated_at.unwrap_or(elapsed);
        let faction_stats = stats.faction(faction.id);

        ranked.push(Ranked {
            id: faction.id,
            planets,
            troops,
            survival,
        });
        factions.push(FactionSummary {
            faction: faction.id,
            name: faction.name.clone(),
            is_bot: faction.is_bot,
            planets,
            troops: troops.to_num(),
            troops_sent: faction_stats.troops_sent,
            troops_lost: faction_stats.troops_lost.to_num(),
            planets_conquered: faction_stats.planets_conquered,
            eliminated_at: faction.eliminated_at.map(|t| t.to_num()),
            survival_time: survival.to_num(),
        });
    }

    ranked.sort_by(|a, b| {
        b.planets
            .cmp(&a.planets)
            .then_with(|| b.troops.cmp(&a.troops))
            .then_with(|| b.survival.cmp(&a.survival))
            .then_with(|| a.id.cmp(&b.id))
    });

    MatchReport {
        winner,
        winner_name: winner.and_then(|id| registry.get(id)).map(|f| f.name.clone()),
        victory,
        elapsed: elapsed.to_num(),
        ticks,
        troops_sent: stats.total_sent(),
        troops_lost: stats.total_lost().to_num(),
        planets_conquered: stats.total_conquered(),
        factions,
        standings: ranked.into_iter().map(|r| r.id).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Color, FactionConfig};
    use crate::math::Vec2Fixed;
    use crate::planet::{Planet, PlanetKind};

    fn setup() -> (FactionRegistry, World) {
        let registry = FactionRegistry::from_config(&[
            FactionConfig::human("A", Color(1, 1, 1)),
            FactionConfig::human("B", Color(2, 2, 2)),
        ]);
        let planet = |owner: u8, troops: i32| {
            Planet::new(
                PlanetKind::Home,
                Vec2Fixed::ZERO,
                Fixed::from_num(30),
                Some(FactionId(owner)),
                Fixed::from_num(troops),
                Fixed::from_num(500),
                Fixed::from_num(1),
            )
        };
        let world = World::from_planets(vec![planet(0, 10), planet(1, 40), planet(1, 5)]);
        (registry, world)
    }

    #[test]
    fn test_finish_is_idempotent() {
        let (registry, world) = setup();
        let mut state = GameState::new(2);
        state.stats_mut().record_sent(FactionId(0), 7);

        let first = state
            .finish(
                Some(FactionId(1)),
                VictoryKind::Time,
                Fixed::from_num(60),
                3600,
                &registry,
                &world,
            )
            .clone();
        let second = state
            .finish(
                Some(FactionId(0)),
                VictoryKind::Domination,
                Fixed::from_num(99),
                9999,
                &registry,
                &world,
            )
            .clone();

        assert_eq!(first, second);
        assert_eq!(second.troops_sent, 7);
        assert!(state.is_over());
    }

    #[test]
    fn test_standings_rank_planets_first() {
        let (registry, world) = setup();
        let mut state = GameState::new(2);
        let report = state.finish(
            Some(FactionId(1)),
            VictoryKind::Time,
            Fixed::from_num(60),
            0,
            &registry,
            &world,
        );
        assert_eq!(report.standings, vec![FactionId(1), FactionId(0)]);
        assert_eq!(report.winner_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_neutral_losses_tracked_separately() {
        let mut stats = MatchStats::new(1);
        stats.record_loss(None, Fixed::from_num(12));
        stats.record_loss(Some(FactionId(0)), Fixed::from_num(12));
        assert_eq!(stats.neutral_losses(), Fixed::from_num(12));
        assert_eq!(stats.total_lost(), Fixed::from_num(12));
    }
}
