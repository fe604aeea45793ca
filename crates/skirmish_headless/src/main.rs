//! Headless skirmish runner.
//!
//! # Usage
//!
//! ```bash
//! # Play one match and print the JSON report to stdout
//! cargo run -p skirmish_headless -- run --seed 42 --strategy push
//!
//! # Save the report and use custom tuning
//! cargo run -p skirmish_headless -- run --config tuning.ron --output report.json
//!
//! # Verify determinism
//! cargo run -p skirmish_headless -- verify --seed 42 --runs 5
//! ```
//!
//! Reports go to stdout or a file; logs go to stderr. `RUST_LOG` overrides
//! the level chosen by `--verbose`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_headless::{
    runner::{verify_determinism, MatchRunner, RunConfig},
    MapKind, Result, StrategyKind,
};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish runner for playtests and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match and report the result
    Run {
        /// Random seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Maximum match length in simulated minutes
        #[arg(short, long, default_value = "10")]
        minutes: u32,

        /// Player script
        #[arg(short, long, value_enum, default_value_t = StrategyKind::Push)]
        strategy: StrategyKind,

        /// Map to play on
        #[arg(long, value_enum, default_value_t = MapKind::River)]
        map: MapKind,

        /// Tuning file (RON) replacing the built-in values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Maximum match length in simulated minutes
        #[arg(short, long, default_value = "3")]
        minutes: u32,

        /// Player script
        #[arg(short, long, value_enum, default_value_t = StrategyKind::Push)]
        strategy: StrategyKind,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for the report
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            seed,
            minutes,
            strategy,
            map,
            config,
            output,
        } => cmd_run(seed, minutes, strategy, map, config, output),
        Commands::Verify {
            seed,
            runs,
            minutes,
            strategy,
        } => cmd_verify(seed, runs, minutes, strategy),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Headless run failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

/// Play a single match
fn cmd_run(
    seed: u64,
    minutes: u32,
    strategy: StrategyKind,
    map: MapKind,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut run_config = RunConfig {
        seed,
        minutes,
        strategy,
        map,
        ..RunConfig::default()
    };
    if let Some(path) = config {
        tracing::info!("Loading tuning from: {}", path.display());
        run_config = run_config.with_sim_config_file(&path)?;
    }

    let report = MatchRunner::new(run_config)?.run();

    match report.winner {
        Some(winner) => eprintln!(
            "{} wins after {:.1}s ({:?})",
            winner.display_name(),
            report.elapsed_seconds,
            report.reason
        ),
        None => eprintln!("No result after {:.1}s", report.elapsed_seconds),
    }
    eprintln!(
        "Kills: {}  Losses: {}  Produced: {}",
        report.stats.kills, report.stats.losses, report.stats.units_produced
    );
    eprintln!("Final hash: {:016x}", report.final_state_hash);

    if let Some(path) = output {
        report.save(&path)?;
        eprintln!("Report saved to: {}", path.display());
    } else {
        println!("{}", report.to_json()?);
    }
    Ok(())
}

/// Verify determinism
fn cmd_verify(seed: u64, runs: u32, minutes: u32, strategy: StrategyKind) -> Result<()> {
    tracing::info!(
        "Verifying determinism: seed {} ({} runs, {} min, {})",
        seed,
        runs,
        minutes,
        strategy.name()
    );

    let config = RunConfig {
        seed,
        minutes,
        strategy,
        ..RunConfig::default()
    };
    let result = verify_determinism(&config, runs)?;

    if result.is_deterministic() {
        eprintln!("PASS: All {runs} runs produced identical results");
        if let Some(hash) = result.hashes.first() {
            eprintln!("  Hash: {hash:016x}");
        }
        Ok(())
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (i, (hash, ticks)) in result.hashes.iter().zip(&result.ticks).enumerate() {
            eprintln!("  Run {i}: {hash:016x} after {ticks} ticks");
        }
        std::process::exit(1);
    }
}
