//! Headless match runner for scripted playtests and CI verification.
//!
//! Plays the stock skirmish without any presentation layer. The player side
//! is driven by a scripted [`strategies::StrategyKind`]; the enemy side is
//! the simulation's own director. This enables:
//!
//! - **Playtesting**: run a full match and read the JSON report
//! - **CI verification**: check that a seed always produces the same match
//!
//! # Example
//!
//! ```bash
//! # Play ten minutes with the push script and print the report
//! cargo run -p skirmish_headless -- run --seed 7 --strategy push
//!
//! # Verify determinism
//! cargo run -p skirmish_headless -- verify --seed 7 --runs 5
//! ```

pub mod error;
pub mod maps;
pub mod metrics;
pub mod runner;
pub mod strategies;

pub use error::{HeadlessError, Result};
pub use maps::MapKind;
pub use metrics::{MatchReport, MetricsCollector};
pub use runner::{verify_determinism, MatchRunner, RunConfig, VerifyResult};
pub use strategies::{ScriptedPlayer, StrategyKind};
