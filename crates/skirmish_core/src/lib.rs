//! # Skirmish Core
//!
//! Deterministic simulation core for a two-faction real-time skirmish.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No ambient randomness (every draw goes through [`rng::RandomSource`])
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless match runners
//! - Seeded, reproducible matches
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`terrain`] - Terrain grid, trees and line-of-sight queries
//! - [`steering`] - Unit locomotion and collision
//! - [`combat`] - Firing, damage and retaliation
//! - [`projectiles`] - Rays and lobbed shells in flight
//! - [`production`] - Build queues
//! - [`ai`] - Enemy director and squads
//! - [`formation`] - Group move layout
//! - [`fog`] - Revealed-area mask
//! - [`victory`] - Match statistics and end conditions
//! - [`simulation`] - The [`simulation::World`] and its tick loop

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod battlefield;
pub mod combat;
pub mod components;
pub mod config;
pub mod economy;
pub mod error;
pub mod factions;
pub mod fog;
pub mod formation;
pub mod math;
pub mod production;
pub mod projectiles;
pub mod rng;
pub mod scenario;
pub mod simulation;
pub mod snapshot;
pub mod steering;
pub mod terrain;
pub mod unit_kind;
pub mod victory;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{EnemyDirector, Squad, SquadRole};
    pub use crate::components::*;
    pub use crate::config::{SimConfig, TargetPolicy};
    pub use crate::economy::Treasury;
    pub use crate::error::{Result, SimError};
    pub use crate::factions::FactionId;
    pub use crate::fog::FogMask;
    pub use crate::math::{ratio, Fixed, Vec2Fixed};
    pub use crate::production::ProductionError;
    pub use crate::rng::{RandomSource, SeededRandom, SequenceRandom};
    pub use crate::scenario::MatchSetup;
    pub use crate::simulation::{TickEvents, World};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::terrain::{Terrain, TerrainGrid, TerrainKind, Tree};
    pub use crate::unit_kind::{StructureKind, UnitKind, WeaponKind};
    pub use crate::victory::{MatchOutcome, MatchStats, VictoryReason};
}
