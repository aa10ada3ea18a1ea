//! Headless match runner for bot testing and CI verification.
//!
//! Runs planet-conquest matches without a renderer. This enables:
//!
//! - **Bot testing**: sample strategies play each other at full speed
//! - **Balance runs**: many seeds in parallel, summarized as JSON
//! - **CI verification**: repeated runs of one seed must hash identically
//!
//! # Example
//!
//! ```bash
//! # Watch one match in real time (logs on stderr, report on stdout)
//! cargo run -p conquest_headless -- run --scenario skirmish_1v1 --real-time
//!
//! # Run 200 seeds of a four-way match
//! cargo run -p conquest_headless -- batch --scenario free_for_all --count 200
//!
//! # Verify determinism
//! cargo run -p conquest_headless -- verify --seed 7 --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod strategies;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, FactionMetrics, GameMetrics};
pub use runner::{MatchRunner, Pacing, RunError, RunOutcome, RunnerConfig};
pub use scenario::{Scenario, ScenarioError};
pub use strategies::{strategy_by_name, Aggressor, Defender, Expander, StrategyError};
