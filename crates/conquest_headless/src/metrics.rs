//! Match metrics for batch analysis.
//!
//! [`GameMetrics`] flattens one [`MatchReport`] into a serializable record;
//! [`BatchSummary`] aggregates many of them into win counts, win rates and
//! average match length.

use std::collections::BTreeMap;

use conquest_core::config::{Controller, MatchConfig};
use conquest_core::game_state::{MatchReport, VictoryKind};
use serde::{Deserialize, Serialize};

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// World seed.
    pub seed: u64,
    /// Sub-steps simulated.
    pub duration_ticks: u64,
    /// Simulated seconds played.
    pub duration_secs: f64,
    /// Winning faction name (None = no winner).
    pub winner: Option<String>,
    /// How the game ended.
    pub win_condition: String,
    /// Per-faction metrics, in registration order.
    pub factions: Vec<FactionMetrics>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Flatten a finished match.
    #[must_use]
    pub fn from_report(
        game_id: impl Into<String>,
        scenario: impl Into<String>,
        config: &MatchConfig,
        report: &MatchReport,
        final_state_hash: u64,
    ) -> Self {
        let factions = report
            .factions
            .iter()
            .map(|summary| {
                let strategy = config
                    .factions
                    .get(summary.faction.index())
                    .and_then(|f| match &f.controller {
                        Controller::Bot { strategy } => Some(strategy.clone()),
                        Controller::Human => None,
                    });
                FactionMetrics {
                    name: summary.name.clone(),
                    strategy,
                    final_planets: summary.planets as u32,
                    final_troops: summary.troops,
                    troops_sent: summary.troops_sent,
                    troops_lost: summary.troops_lost,
                    planets_conquered: summary.planets_conquered,
                    eliminated_at: summary.eliminated_at,
                    survival_time: summary.survival_time,
                }
            })
            .collect();

        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed: config.seed,
            duration_ticks: report.ticks,
            duration_secs: report.elapsed,
            winner: report.winner_name.clone(),
            win_condition: victory_label(report.victory).to_string(),
            factions,
            final_state_hash,
        }
    }
}

fn victory_label(kind: VictoryKind) -> &'static str {
    match kind {
        VictoryKind::Time => "time",
        VictoryKind::Domination => "domination",
    }
}

/// Metrics for a single faction in a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactionMetrics {
    /// Faction display name.
    pub name: String,
    /// Bot strategy, if any.
    pub strategy: Option<String>,
    /// Planets held at the end.
    pub final_planets: u32,
    /// Troops held at the end, stationed and in flight.
    pub final_troops: f64,
    /// Troops dispatched over the match.
    pub troops_sent: u64,
    /// Troops lost in combat.
    pub troops_lost: f64,
    /// Planets captured.
    pub planets_conquered: u32,
    /// Simulated time of elimination.
    pub eliminated_at: Option<f64>,
    /// Seconds survived.
    pub survival_time: f64,
}

/// Aggregate over a batch of games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total games played.
    pub total_games: u32,
    /// Games won by each faction.
    pub wins_by_faction: BTreeMap<String, u32>,
    /// Win rates by faction.
    pub win_rates: BTreeMap<String, f64>,
    /// Games won by each strategy.
    pub wins_by_strategy: BTreeMap<String, u32>,
    /// Games without a winner.
    pub draws: u32,
    /// Games decided by the clock.
    pub time_victories: u32,
    /// Games decided by elimination.
    pub domination_victories: u32,
    /// Average match length in simulated seconds.
    pub avg_duration_secs: f64,
    /// Average match length in sub-steps.
    pub avg_duration_ticks: f64,
    /// Shortest game.
    pub min_duration_ticks: u64,
    /// Longest game.
    pub max_duration_ticks: u64,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_games: games.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut secs_sum = 0.0;
        let mut ticks_sum = 0u64;

        for game in games {
            secs_sum += game.duration_secs;
            ticks_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);

            match game.win_condition.as_str() {
                "time" => summary.time_victories += 1,
                "domination" => summary.domination_victories += 1,
                _ => {}
            }

            let Some(winner) = &game.winner else {
                summary.draws += 1;
                continue;
            };
            *summary.wins_by_faction.entry(winner.clone()).or_default() += 1;

            let strategy = game
                .factions
                .iter()
                .find(|f| &f.name == winner)
                .and_then(|f| f.strategy.clone());
            if let Some(strategy) = strategy {
                *summary.wins_by_strategy.entry(strategy).or_default() += 1;
            }
        }

        let total = f64::from(summary.total_games);
        summary.avg_duration_secs = secs_sum / total;
        summary.avg_duration_ticks = ticks_sum as f64 / total;
        summary.win_rates = summary
            .wins_by_faction
            .iter()
            .map(|(name, wins)| (name.clone(), f64::from(*wins) / total))
            .collect();

        summary
    }
}
