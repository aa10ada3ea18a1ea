//! Headless planet-conquest runner.
//!
//! Runs matches without graphics. Logs go to stderr; match reports are
//! written to stdout as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Fast-forward one match of the default scenario
//! cargo run -p conquest_headless
//!
//! # Run a single match paced against the wall clock at 4x speed
//! cargo run -p conquest_headless -- run --scenario skirmish_1v1 --real-time --speed 4
//!
//! # Run batch balance test
//! cargo run -p conquest_headless -- batch --scenario free_for_all --count 1000 --output results/
//!
//! # Check that a seed replays identically
//! cargo run -p conquest_headless -- verify --seed 12345 --runs 5
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use conquest_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{MatchRunner, RunnerConfig},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "conquest_headless")]
#[command(about = "Headless planet-conquest runner for bot testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match and print its report
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// World seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Pace frames against the wall clock instead of fast-forwarding
        #[arg(long)]
        real_time: bool,

        /// Simulation speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Also write the report to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run many seeds of one scenario in parallel
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs to stderr; stdout carries reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            real_time,
            speed,
            output,
        }) => cmd_run(&scenario, seed, real_time, speed, output),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        }) => cmd_batch(scenario, count, parallel, output, seed),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(&scenario, seed, runs),
        None => cmd_run("skirmish_1v1", None, false, None, None),
    }
}

fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!(error = %e, scenario = name, "Failed to load scenario");
            std::process::exit(1);
        }
    }
}

/// Run a single match
fn cmd_run(
    scenario: &str,
    seed: Option<u64>,
    real_time: bool,
    speed: Option<f64>,
    output: Option<PathBuf>,
) {
    let scenario = load_scenario(scenario);
    let mut config = scenario.match_config(seed.unwrap_or(scenario.config.seed));
    if let Some(speed) = speed {
        config = config.with_speed(speed);
    }

    tracing::info!(
        scenario = %scenario.name,
        seed = config.seed,
        real_time,
        speed = config.speed_multiplier,
        "Starting match"
    );

    let pacing = if real_time {
        RunnerConfig::real_time()
    } else {
        RunnerConfig::fast_forward()
    };
    let outcome = match MatchRunner::new(config, pacing).and_then(MatchRunner::run) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Match failed");
            std::process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&outcome.report) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize report");
            std::process::exit(1);
        }
    };
    println!("{json}");

    if let Some(path) = output {
        if let Err(e) = std::fs::write(&path, &json) {
            tracing::error!(error = %e, path = %path.display(), "Failed to write report");
            std::process::exit(1);
        }
    }

    eprintln!("State hash: {:016x}", outcome.state_hash);
}

/// Run batch of games
fn cmd_batch(scenario: String, count: u32, parallel: u32, output: PathBuf, seed: u64) {
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    tracing::info!(
        scenario = %scenario,
        count,
        parallel,
        seed,
        output = %output.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        std::process::exit(1);
    }

    let config = BatchConfig::new(&scenario, count)
        .with_output(output.clone())
        .with_seed(seed)
        .with_parallelism(parallel);

    let results = match run_batch(config) {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(error = %e, "Batch failed");
            std::process::exit(1);
        }
    };

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Average match length: {:.1}s", summary.avg_duration_secs);
    eprintln!(
        "Endings: {} by time, {} by domination, {} without winner",
        summary.time_victories, summary.domination_victories, summary.draws
    );
    eprintln!("\nWin Rates:");
    for (faction, rate) in &summary.win_rates {
        eprintln!(
            "  {}: {:.1}% ({} wins)",
            faction,
            rate * 100.0,
            summary.wins_by_faction.get(faction).copied().unwrap_or(0)
        );
    }
    if !summary.wins_by_strategy.is_empty() {
        eprintln!("\nWins by strategy:");
        for (strategy, wins) in &summary.wins_by_strategy {
            eprintln!("  {strategy}: {wins}");
        }
    }

    for error in results.errors.iter().take(10) {
        eprintln!(
            "  Game {} (seed {}): {}",
            error.game_index, error.seed, error.message
        );
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        scenario = %scenario.name,
        seed,
        runs,
        "Verifying determinism"
    );

    match verify_determinism(&scenario, seed, runs) {
        Ok(outcome) if outcome.deterministic => {
            eprintln!("PASS: All {runs} runs produced identical results");
            if let Some(hash) = outcome.hashes.first() {
                eprintln!("  State hash: {hash:016x}");
            }
        }
        Ok(outcome) => {
            eprintln!("FAIL: Non-determinism detected!");
            for (run, hash) in outcome.hashes.iter().enumerate() {
                eprintln!("  Run {run}: {hash:016x}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "Verification run failed");
            std::process::exit(1);
        }
    }
}
