//! Error type for the headless runner.

use skirmish_core::error::SimError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Everything that can stop a headless run.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// The simulation rejected its inputs.
    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    /// Reading a config or writing a report failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
