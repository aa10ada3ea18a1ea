//! Match configuration.
//!
//! A [`MatchConfig`] is handed to [`Simulation::new`](crate::simulation::Simulation::new)
//! and to the world generator; nothing in the core reads ambient global
//! state. Configs are plain serde structs and can be written in RON.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Fixed;

/// Hard ceiling on the number of factions in one match.
pub const MAX_FACTIONS: usize = 16;

/// Largest accepted map width or height, in world units.
pub const MAX_MAP_EXTENT: f64 = 20_000.0;

/// Largest accepted simulated-seconds-per-wall-second multiplier.
pub const MAX_SPEED_MULTIPLIER: f64 = 10_000.0;

/// Largest accepted match length, poll interval or movement speed.
pub const MAX_TIME_SECS: f64 = 1_000_000.0;

/// Largest accepted explicit neutral count.
pub const MAX_NEUTRALS: u32 = 10_000;

/// RGB display color for a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Format as `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Who drives a faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Controller {
    /// Orders come from the input layer.
    #[default]
    Human,
    /// Orders come from a bound decision maker, resolved by strategy name.
    Bot {
        /// Strategy name understood by the host (e.g. the headless runner).
        strategy: String,
    },
}

impl Controller {
    /// Shorthand for a bot controller.
    #[must_use]
    pub fn bot(strategy: impl Into<String>) -> Self {
        Self::Bot {
            strategy: strategy.into(),
        }
    }

    /// Whether this controller is a bot.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        matches!(self, Self::Bot { .. })
    }
}

/// Per-faction setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionConfig {
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: Color,
    /// Controller assignment.
    pub controller: Controller,
}

impl FactionConfig {
    /// A human-controlled faction.
    #[must_use]
    pub fn human(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            controller: Controller::Human,
        }
    }

    /// A bot-controlled faction.
    #[must_use]
    pub fn bot(name: impl Into<String>, color: Color, strategy: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color,
            controller: Controller::bot(strategy),
        }
    }
}

/// Every tunable of a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Play area width in world units.
    pub map_width: f64,
    /// Play area height in world units.
    pub map_height: f64,
    /// Seed for world generation.
    pub seed: u64,
    /// Match length in simulated seconds.
    pub match_duration_secs: f64,
    /// Troop cap per planet.
    pub max_troops: f64,
    /// Troops per second produced per unit of planet radius.
    pub production_factor: f64,
    /// Troop movement speed in world units per second.
    pub movement_speed: f64,
    /// Neutral density multiplier for the generated neutral count.
    pub neutral_density: f64,
    /// Explicit neutral count, overriding the density formula.
    pub neutral_count: Option<u32>,
    /// Smallest neutral planet radius.
    pub neutral_radius_min: f64,
    /// Largest neutral planet radius.
    pub neutral_radius_max: f64,
    /// Radius of every faction's starting planet.
    pub player_radius: f64,
    /// Starting troops per unit radius on faction start planets.
    pub player_troops_per_radius: f64,
    /// Starting troops per unit radius on scattered neutrals.
    pub neutral_troops_per_radius: f64,
    /// Starting troops per unit radius on clustered neutrals.
    pub cluster_troops_per_radius: f64,
    /// Minimum center distance between a start planet and any neutral.
    pub min_player_neutral_distance: f64,
    /// Minimum surface gap between two neutrals.
    pub min_neutral_spacing: f64,
    /// Minimum gap between a planet's edge and the map border.
    pub edge_buffer: f64,
    /// Seconds between two decisions of the same bot.
    pub ai_poll_interval_secs: f64,
    /// Fixed sub-steps per simulated second.
    pub tick_rate: u32,
    /// Upper bound on sub-steps drained in one frame.
    pub max_substeps_per_frame: u32,
    /// Simulated seconds per wall-clock second.
    pub speed_multiplier: f64,
    /// Freeze the clock while the host is hidden.
    pub pause_when_hidden: bool,
    /// Participating factions, in registration order.
    pub factions: Vec<FactionConfig>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            map_width: 1200.0,
            map_height: 800.0,
            seed: 12345,
            match_duration_secs: 300.0,
            max_troops: 500.0,
            production_factor: 0.05,
            movement_speed: 120.0,
            neutral_density: 1.0,
            neutral_count: None,
            neutral_radius_min: 15.0,
            neutral_radius_max: 35.0,
            player_radius: 35.0,
            player_troops_per_radius: 1.0,
            neutral_troops_per_radius: 0.3,
            cluster_troops_per_radius: 0.5,
            min_player_neutral_distance: 120.0,
            min_neutral_spacing: 20.0,
            edge_buffer: 20.0,
            ai_poll_interval_secs: 0.5,
            tick_rate: 60,
            max_substeps_per_frame: 240,
            speed_multiplier: 1.0,
            pause_when_hidden: true,
            factions: vec![
                FactionConfig::human("Blue", Color(66, 135, 245)),
                FactionConfig::bot("Red", Color(235, 64, 52), "aggressor"),
            ],
        }
    }
}

impl MatchConfig {
    /// Parse a config from RON text.
    pub fn from_ron_str(source_name: &str, ron_text: &str) -> Result<Self> {
        ron::from_str(ron_text).map_err(|e| GameError::ConfigParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Set the world generation seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the factions.
    #[must_use]
    pub fn with_factions(mut self, factions: Vec<FactionConfig>) -> Self {
        self.factions = factions;
        self
    }

    /// Set the match duration.
    #[must_use]
    pub fn with_duration_secs(mut self, secs: f64) -> Self {
        self.match_duration_secs = secs;
        self
    }

    /// Set the map size.
    #[must_use]
    pub fn with_map_size(mut self, width: f64, height: f64) -> Self {
        self.map_width = width;
        self.map_height = height;
        self
    }

    /// Set the speed multiplier.
    #[must_use]
    pub fn with_speed(mut self, multiplier: f64) -> Self {
        self.speed_multiplier = multiplier.max(0.0);
        self
    }

    /// Set an explicit neutral planet count.
    #[must_use]
    pub const fn with_neutral_count(mut self, count: u32) -> Self {
        self.neutral_count = Some(count);
        self
    }

    /// Duration of one fixed sub-step.
    #[must_use]
    pub fn fixed_step(&self) -> Fixed {
        Fixed::from_num(1) / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Check that the config describes a playable match.
    ///
    /// Every float must be finite and small enough to convert into
    /// [`Fixed`] without overflow.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GameError::InvalidConfig(msg.to_string()));
        let within = |v: f64, lo: f64, hi: f64| v.is_finite() && v >= lo && v <= hi;
        let positive = |v: f64, hi: f64| v.is_finite() && v > 0.0 && v <= hi;

        if self.factions.is_empty() {
            return invalid("at least one faction is required");
        }
        if self.factions.len() > MAX_FACTIONS {
            return Err(GameError::InvalidConfig(format!(
                "at most {MAX_FACTIONS} factions are supported, got {}",
                self.factions.len()
            )));
        }
        // Fixed-point coordinates and squared distances must stay in range.
        if !positive(self.map_width, MAX_MAP_EXTENT) || !positive(self.map_height, MAX_MAP_EXTENT) {
            return invalid("map dimensions must be in (0, 20000]");
        }
        if !positive(self.match_duration_secs, MAX_TIME_SECS) {
            return invalid("match duration must be in (0, 1000000] seconds");
        }
        if !positive(self.max_troops, 1_000_000.0) {
            return invalid("max troops must be in (0, 1000000]");
        }
        if !positive(self.movement_speed, MAX_TIME_SECS) {
            return invalid("movement speed must be in (0, 1000000]");
        }
        if !within(self.production_factor, 0.0, 1_000.0) {
            return invalid("production factor must be in [0, 1000]");
        }
        if !within(self.neutral_density, 0.0, 100.0) {
            return invalid("neutral density must be in [0, 100]");
        }
        if self.neutral_count.is_some_and(|n| n > MAX_NEUTRALS) {
            return Err(GameError::InvalidConfig(format!(
                "at most {MAX_NEUTRALS} neutral planets are supported"
            )));
        }
        if !positive(self.neutral_radius_min, MAX_MAP_EXTENT)
            || !positive(self.neutral_radius_max, MAX_MAP_EXTENT)
            || self.neutral_radius_min > self.neutral_radius_max
        {
            return invalid("neutral radius range must be positive and ordered");
        }
        if !positive(self.player_radius, MAX_MAP_EXTENT) {
            return invalid("player radius must be positive");
        }
        let troop_factors = [
            self.player_troops_per_radius,
            self.neutral_troops_per_radius,
            self.cluster_troops_per_radius,
        ];
        if !troop_factors.iter().all(|&f| within(f, 0.0, 1_000_000.0)) {
            return invalid("starting troops per radius must be in [0, 1000000]");
        }
        let spacings = [
            self.min_player_neutral_distance,
            self.min_neutral_spacing,
            self.edge_buffer,
        ];
        if !spacings.iter().all(|&d| within(d, 0.0, MAX_MAP_EXTENT)) {
            return invalid("spacing constants must be in [0, 20000]");
        }
        if self.tick_rate == 0 {
            return invalid("tick rate must be positive");
        }
        if self.max_substeps_per_frame == 0 {
            return invalid("max sub-steps per frame must be positive");
        }
        if !within(self.ai_poll_interval_secs, 0.0, MAX_TIME_SECS) {
            return invalid("AI poll interval must be in [0, 1000000] seconds");
        }
        if !within(self.speed_multiplier, 0.0, MAX_SPEED_MULTIPLIER) {
            return invalid("speed multiplier must be in [0, 10000]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_factions() {
        let config = MatchConfig::default().with_factions(Vec::new());
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_radius_range() {
        let config = MatchConfig {
            neutral_radius_min: 40.0,
            neutral_radius_max: 10.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_values_outside_fixed_range() {
        let configs = [
            MatchConfig::default().with_speed(5.0e9),
            MatchConfig::default().with_speed(f64::INFINITY),
            MatchConfig::default().with_duration_secs(1.0e10),
            MatchConfig::default().with_duration_secs(f64::NAN),
            MatchConfig {
                ai_poll_interval_secs: f64::INFINITY,
                ..Default::default()
            },
            MatchConfig {
                movement_speed: 1.0e12,
                ..Default::default()
            },
            MatchConfig {
                neutral_density: f64::INFINITY,
                ..Default::default()
            },
            MatchConfig {
                player_troops_per_radius: f64::NAN,
                ..Default::default()
            },
            MatchConfig::default().with_neutral_count(u32::MAX),
        ];
        for config in configs {
            assert!(
                matches!(config.validate(), Err(GameError::InvalidConfig(_))),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn test_accepts_limits() {
        let config = MatchConfig::default()
            .with_speed(MAX_SPEED_MULTIPLIER)
            .with_duration_secs(MAX_TIME_SECS)
            .with_map_size(MAX_MAP_EXTENT, MAX_MAP_EXTENT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_infinite_speed_in_ron_is_rejected() {
        let config = MatchConfig::from_ron_str("fast.ron", "(speed_multiplier: inf)").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ron_partial_config_uses_defaults() {
        let text = r#"(
            seed: 7,
            match_duration_secs: 90.0,
            factions: [
                (name: "A", color: (1, 2, 3), controller: Human),
                (name: "B", color: (4, 5, 6), controller: Bot(strategy: "expander")),
            ],
        )"#;
        let config = MatchConfig::from_ron_str("inline", text).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.factions.len(), 2);
        assert_eq!(config.factions[1].controller, Controller::bot("expander"));
    }

    #[test]
    fn test_bad_ron_reports_source() {
        let err = MatchConfig::from_ron_str("broken.ron", "(seed: )").unwrap_err();
        assert!(err.to_string().contains("broken.ron"));
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color(255, 0, 16).to_hex(), "#ff0010");
    }
}
