//! Error types for the skirmish simulation.
//!
//! Gameplay commands never fail loudly; they are ignored when invalid. The
//! variants here cover the few surfaces that genuinely can fail: loading
//! tuning data, building terrain, and encoding snapshots.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    /// Tuning configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Terrain data is inconsistent.
    #[error("Invalid terrain: {0}")]
    InvalidTerrain(String),

    /// Unknown terrain classification code.
    #[error("Unknown terrain code {code} at cell ({col}, {row})")]
    UnknownTerrainCode {
        /// The offending code.
        code: u8,
        /// Column of the cell.
        col: usize,
        /// Row of the cell.
        row: usize,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Snapshot serialization failed: {0}")]
    Snapshot(String),
}

impl From<bincode::Error> for SimError {
    fn from(err: bincode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

impl From<ron::error::SpannedError> for SimError {
    fn from(err: ron::error::SpannedError) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
