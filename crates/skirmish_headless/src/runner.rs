//! Drives one world to completion under a scripted player.
//!
//! The runner owns the fixed tick rate, the time limit and the metrics. It
//! calls the strategy before each tick, so every order a match sees is a
//! function of the seed and the strategy alone.

use std::path::Path;

use tracing::{debug, info, warn};

use skirmish_core::config::SimConfig;
use skirmish_core::math::{ratio, Fixed};
use skirmish_core::rng::SeededRandom;
use skirmish_core::scenario::MatchSetup;
use skirmish_core::simulation::World;

use crate::error::Result;
use crate::maps::MapKind;
use crate::metrics::{MatchReport, MetricsCollector};
use crate::strategies::{ScriptedPlayer, StrategyKind};

/// Ticks per simulated second.
pub const TICK_RATE: i32 = 30;

/// Ticks in one simulated minute.
pub const TICKS_PER_MINUTE: u64 = 60 * 30;

/// Ticks between strategy decisions (one second).
pub const DECISION_INTERVAL: u64 = 30;

/// Configuration for a single headless match.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Random seed.
    pub seed: u64,
    /// Simulated minutes before the run is cut off.
    pub minutes: u32,
    /// Player script.
    pub strategy: StrategyKind,
    /// Map to play on.
    pub map: MapKind,
    /// Simulation tuning.
    pub sim: SimConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            minutes: 10,
            strategy: StrategyKind::default(),
            map: MapKind::default(),
            sim: SimConfig::default(),
        }
    }
}

impl RunConfig {
    /// Replace the tuning with one loaded from a RON file.
    pub fn with_sim_config_file(mut self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        self.sim = SimConfig::from_ron(&text)?;
        Ok(self)
    }

    /// Tick budget for the time limit.
    #[must_use]
    pub fn max_ticks(&self) -> u64 {
        u64::from(self.minutes) * TICKS_PER_MINUTE
    }
}

/// One match in progress.
#[derive(Debug)]
pub struct MatchRunner {
    config: RunConfig,
    world: World,
    player: ScriptedPlayer,
    metrics: MetricsCollector,
    dt: Fixed,
}

impl MatchRunner {
    /// Build the map and start the stock skirmish on it.
    pub fn new(config: RunConfig) -> Result<Self> {
        let terrain = config.map.build()?;
        let world = World::new(
            MatchSetup::standard(terrain),
            config.sim.clone(),
            Box::new(SeededRandom::new(config.seed)),
        );
        Ok(Self {
            player: ScriptedPlayer::new(config.strategy, DECISION_INTERVAL),
            config,
            world,
            metrics: MetricsCollector::new(),
            dt: ratio(1, TICK_RATE),
        })
    }

    /// The world being played.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Whether the match ended or the time limit was reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.world.is_ended() || self.world.tick_count() >= self.config.max_ticks()
    }

    /// Let the script act, then advance one tick.
    ///
    /// Returns `false` once the run is finished.
    pub fn step(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let decision = self.player.act(&mut self.world);
        self.metrics.record_decision(decision);

        let events = self.world.tick(self.dt);
        let tick = self.world.tick_count();
        self.metrics.record_tick(tick, &events, &self.world);

        if let Some(outcome) = events.outcome {
            info!(
                tick,
                winner = ?outcome.winner,
                reason = ?outcome.reason,
                "Match decided"
            );
        } else if tick % TICKS_PER_MINUTE == 0 {
            debug!(
                tick,
                credits = self.world.credits(),
                units = self.world.units().len(),
                hash = %format!("{:016x}", self.world.state_hash()),
                "Minute mark"
            );
        }
        !self.is_finished()
    }

    /// Play to the end and report.
    #[must_use]
    pub fn run(mut self) -> MatchReport {
        info!(
            seed = self.config.seed,
            strategy = self.config.strategy.name(),
            map = self.config.map.name(),
            max_ticks = self.config.max_ticks(),
            "Starting headless match"
        );
        while self.step() {}
        if !self.world.is_ended() {
            warn!(ticks = self.world.tick_count(), "Time limit reached before a result");
        }
        self.metrics.finish(
            &self.world,
            self.config.seed,
            self.config.strategy,
            self.config.map,
        )
    }
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    /// Final hash of each run.
    pub hashes: Vec<u64>,
    /// Ticks of each run.
    pub ticks: Vec<u64>,
}

impl VerifyResult {
    /// Whether every run ended in the same state on the same tick.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1]) && self.ticks.windows(2).all(|w| w[0] == w[1])
    }
}

/// Play the same match `runs` times and collect the final hashes.
pub fn verify_determinism(config: &RunConfig, runs: u32) -> Result<VerifyResult> {
    let mut result = VerifyResult {
        hashes: Vec::with_capacity(runs as usize),
        ticks: Vec::with_capacity(runs as usize),
    };
    for run in 0..runs {
        let report = MatchRunner::new(config.clone())?.run();
        debug!(run, hash = %format!("{:016x}", report.final_state_hash), "Run finished");
        result.hashes.push(report.final_state_hash);
        result.ticks.push(report.ticks);
    }
    Ok(result)
}
