//! # Conquest Core
//!
//! Deterministic simulation core for a real-time planet-conquest game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No input capture
//! - No ambient global state (everything flows from [`config::MatchConfig`])
//! - Fixed-point math for troops, positions and time
//!
//! This separation enables:
//! - Headless and accelerated matches
//! - Bots running in-process against a read-only view
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`planet`], [`movement`] - Entity model
//! - [`world`] - Planet and movement storage with aggregate queries
//! - [`world_gen`] - Seeded procedural layout
//! - [`clock`] - Simulated time, pause and speed
//! - [`simulation`] - Fixed-step loop, combat, dispatch
//! - [`game_state`] - Eliminations, victory, statistics
//! - [`factions`] - Faction registry and controller binding
//! - [`decision`] - Read-only bot interface
//! - [`selection`] - Input-layer planet selection
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod factions;
pub mod game_state;
pub mod math;
pub mod movement;
pub mod planet;
pub mod selection;
pub mod simulation;
pub mod world;
pub mod world_gen;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::MatchClock;
    pub use crate::config::{Color, Controller, FactionConfig, MatchConfig};
    pub use crate::decision::{
        DecisionApi, DecisionMaker, FactionView, GamePhase, MoveIntent, MovementView, PlanetView,
        Prediction,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{Faction, FactionId, FactionRegistry};
    pub use crate::game_state::{MatchPhase, MatchReport, VictoryKind};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::{MovementId, TroopMovement};
    pub use crate::planet::{ArrivalOutcome, Planet, PlanetId, PlanetKind};
    pub use crate::selection::Selection;
    pub use crate::simulation::{FrameReport, Simulation, TickEvents};
    pub use crate::world::World;
}
