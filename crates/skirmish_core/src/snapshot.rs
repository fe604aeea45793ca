//! Settled post-tick views of the world for renderers, UI and tooling.

use serde::{Deserialize, Serialize};

use crate::components::{Explosion, Projectile, Structure, Unit};
use crate::error::Result;
use crate::fog::FogMask;
use crate::math::{fixed_serde, Fixed};
use crate::victory::{MatchOutcome, MatchStats};

/// A copy of everything a consumer may read after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Ticks processed so far.
    pub tick: u64,
    /// Simulated seconds so far.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Player credits.
    pub credits: i32,
    /// Enemy director credits.
    pub enemy_credits: i32,
    /// Living units in spawn order.
    pub units: Vec<Unit>,
    /// All structures, including destroyed ones.
    pub structures: Vec<Structure>,
    /// Shots in flight.
    pub projectiles: Vec<Projectile>,
    /// Fading blasts.
    pub explosions: Vec<Explosion>,
    /// Revealed area.
    pub fog: FogMask,
    /// Counters so far.
    pub stats: MatchStats,
    /// Set once the match has ended.
    pub outcome: Option<MatchOutcome>,
}

impl WorldSnapshot {
    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SimError::Snapshot`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a snapshot produced by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SimError::Snapshot`] if the bytes are not a
    /// valid snapshot.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
