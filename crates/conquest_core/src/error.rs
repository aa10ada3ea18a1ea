//! Error types for the simulation core.
//!
//! Only match setup can fail. Everything that happens inside a running
//! match (bad move orders, crowded maps, late win checks) is recovered
//! locally and never surfaces as an error.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for simulation setup.
#[derive(Debug, Error)]
pub enum GameError {
    /// Match configuration is unusable.
    #[error("Invalid match configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("Failed to parse config '{source_name}': {message}")]
    ConfigParse {
        /// Where the config came from (path or label).
        source_name: String,
        /// Parser error message.
        message: String,
    },

    /// A faction id outside the registry was referenced.
    #[error("Unknown faction: {0}")]
    UnknownFaction(u8),

    /// A controller was bound to a faction flagged as human.
    #[error("Faction {0} is human-controlled and cannot take a bot controller")]
    HumanFaction(u8),
}
