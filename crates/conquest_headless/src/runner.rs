//! Cooperative match loop.
//!
//! The runner owns one [`Simulation`], binds a strategy to every bot faction
//! and feeds it frames until the match is over. Frames are either paced
//! against the wall clock or fed back-to-back with a fixed delta. Once the
//! match ends the loop stops scheduling further frames.
//!
//! Human factions receive no input here and simply hold their planets.

use std::thread;
use std::time::{Duration, Instant};

use conquest_core::config::{Controller, MatchConfig};
use conquest_core::error::GameError;
use conquest_core::factions::FactionId;
use conquest_core::game_state::MatchReport;
use conquest_core::simulation::{FrameReport, Simulation};
use thiserror::Error;
use tracing::{debug, info};

use crate::strategies::{strategy_by_name, StrategyError};

/// Error type for running a match.
#[derive(Error, Debug)]
pub enum RunError {
    /// The match config was rejected.
    #[error("Invalid match config: {0}")]
    Config(#[from] GameError),
    /// A bot faction named an unknown strategy.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    /// The clock can never advance, so the match would never end.
    #[error("Match clock is frozen (speed multiplier is 0)")]
    Frozen,
    /// Safety cap on frames was reached.
    #[error("Match did not finish within {0} frames")]
    FrameLimit(u64),
}

/// How frames are paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep between frames and feed the measured wall-clock delta.
    RealTime,
    /// Feed the nominal frame delta without sleeping.
    FastForward,
}

/// Runner configuration.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// Frame pacing.
    pub pacing: Pacing,
    /// Nominal wall-clock time per frame.
    pub frame: Duration,
    /// Give up after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::fast_forward()
    }
}

impl RunnerConfig {
    /// Paced at roughly 60 frames per wall-clock second.
    #[must_use]
    pub fn real_time() -> Self {
        Self {
            pacing: Pacing::RealTime,
            frame: Duration::from_micros(16_667),
            max_frames: None,
        }
    }

    /// Quarter-second frames fed as fast as possible.
    #[must_use]
    pub fn fast_forward() -> Self {
        Self {
            pacing: Pacing::FastForward,
            frame: Duration::from_millis(250),
            max_frames: Some(1_000_000),
        }
    }

    /// Set the frame cap.
    #[must_use]
    pub fn with_max_frames(mut self, max: u64) -> Self {
        self.max_frames = Some(max);
        self
    }
}

/// Result of a finished match.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// End-of-match report.
    pub report: MatchReport,
    /// Final state hash.
    pub state_hash: u64,
    /// Frames fed.
    pub frames: u64,
}

/// Drives one match to completion.
#[derive(Debug)]
pub struct MatchRunner {
    sim: Simulation,
    config: RunnerConfig,
    frames: u64,
}

impl MatchRunner {
    /// Build the simulation and bind a strategy to every bot faction.
    pub fn new(match_config: MatchConfig, config: RunnerConfig) -> Result<Self, RunError> {
        let strategies: Vec<(FactionId, Controller)> = match_config
            .factions
            .iter()
            .enumerate()
            .map(|(i, f)| (FactionId(i as u8), f.controller.clone()))
            .collect();
        let frozen = match_config.speed_multiplier <= 0.0;

        let mut sim = Simulation::new(match_config)?;
        for (faction, controller) in strategies {
            match controller {
                Controller::Bot { strategy } => {
                    sim.bind_controller(faction, strategy_by_name(&strategy)?)?;
                }
                Controller::Human => {
                    info!(faction = %faction, "Human faction has no input in headless mode");
                }
            }
        }
        if frozen {
            return Err(RunError::Frozen);
        }

        Ok(Self {
            sim,
            config,
            frames: 0,
        })
    }

    /// The running simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Frames fed so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Feed a single frame of `wall` time.
    pub fn frame(&mut self, wall: Duration) -> FrameReport {
        self.frames += 1;
        let report = self.sim.advance_frame(wall);
        if !report.events.eliminations.is_empty() {
            debug!(
                frame = self.frames,
                eliminated = ?report.events.eliminations,
                "Eliminations this frame"
            );
        }
        report
    }

    /// Run until the match is over.
    pub fn run(mut self) -> Result<RunOutcome, RunError> {
        let mut last = Instant::now();

        while !self.sim.is_over() {
            if let Some(max) = self.config.max_frames {
                if self.frames >= max {
                    return Err(RunError::FrameLimit(max));
                }
            }

            let wall = match self.config.pacing {
                Pacing::FastForward => self.config.frame,
                Pacing::RealTime => {
                    thread::sleep(self.config.frame.saturating_sub(last.elapsed()));
                    let now = Instant::now();
                    let wall = now - last;
                    last = now;
                    wall
                }
            };
            self.frame(wall);
        }

        let state_hash = self.sim.state_hash();
        let report = self
            .sim
            .report()
            .cloned()
            .ok_or(RunError::FrameLimit(self.frames))?;

        info!(
            winner = report.winner_name.as_deref().unwrap_or("none"),
            victory = ?report.victory,
            elapsed = report.elapsed,
            frames = self.frames,
            "Match finished"
        );

        Ok(RunOutcome {
            report,
            state_hash,
            frames: self.frames,
        })
    }
}
