//! Scenario loading.
//!
//! A scenario names a [`MatchConfig`] and is written in RON. Two scenarios
//! ship with the crate (`skirmish_1v1`, `free_for_all`); anything else is
//! treated as a path.

use std::path::Path;

use conquest_core::config::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SKIRMISH_1V1: &str = include_str!("../scenarios/skirmish_1v1.ron");
const FREE_FOR_ALL: &str = include_str!("../scenarios/free_for_all.ron");

/// Names of the built-in scenarios.
pub const BUILTIN_SCENARIOS: [&str; 2] = ["skirmish_1v1", "free_for_all"];

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// A named match setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Match configuration; missing fields take their defaults.
    #[serde(default)]
    pub config: MatchConfig,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A built-in scenario by name, or a RON file at `name_or_path`.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "skirmish_1v1" => Self::from_ron_str(SKIRMISH_1V1),
            "free_for_all" => Self::from_ron_str(FREE_FOR_ALL),
            path => Self::load(path),
        }
    }

    /// The scenario's config with the world seed replaced.
    #[must_use]
    pub fn match_config(&self, seed: u64) -> MatchConfig {
        self.config.clone().with_seed(seed)
    }
}
