//! Unit production at barracks.
//!
//! A producing structure holds a FIFO queue of [`BuildOrder`]s and builds one
//! at a time. Orders are paid for when queued; nothing is refunded if the
//! structure is destroyed.

use thiserror::Error;
use tracing::debug;

use crate::components::{BuildOrder, Structure, StructureId};
use crate::economy::Treasury;
use crate::factions::FactionId;
use crate::math::{ratio, Fixed, Vec2Fixed};
use crate::rng::RandomSource;
use crate::unit_kind::UnitKind;

/// Total horizontal spread of spawn positions.
const SPAWN_JITTER: i32 = 20;
/// Player units appear this far above the footprint.
const SPAWN_FRONT_OFFSET: i32 = 10;
/// Enemy units appear this far below the footprint.
const SPAWN_REAR_OFFSET: i32 = 12;

/// Reasons a production order is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProductionError {
    /// No structure with the requested ID.
    #[error("unknown structure {0}")]
    UnknownStructure(u32),
    /// The structure has been destroyed.
    #[error("structure is destroyed")]
    Destroyed,
    /// The structure cannot produce units.
    #[error("structure does not produce units")]
    NotAProducer,
    /// The structure belongs to the other faction.
    #[error("structure belongs to {0:?}")]
    NotOwned(FactionId),
    /// Not enough credits.
    #[error("insufficient credits: need {needed}, have {available}")]
    InsufficientCredits {
        /// Cost of the order.
        needed: i32,
        /// Credits on hand.
        available: i32,
    },
    /// The queue already holds the maximum number of orders.
    #[error("production queue is full ({limit} orders)")]
    QueueFull {
        /// Maximum queued orders.
        limit: usize,
    },
}

/// A unit that finished building this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedUnit {
    /// Structure that built it.
    pub structure: StructureId,
    /// Owning faction.
    pub faction: FactionId,
    /// Unit kind.
    pub kind: UnitKind,
    /// Where the unit appears.
    pub position: Vec2Fixed,
}

/// Check that a structure can take orders at all.
pub fn ensure_can_produce(structure: &Structure) -> Result<(), ProductionError> {
    if !structure.is_alive() {
        return Err(ProductionError::Destroyed);
    }
    if !structure.kind.produces_units() {
        return Err(ProductionError::NotAProducer);
    }
    Ok(())
}

/// Check that the waiting queue holds fewer than `limit` orders.
pub fn ensure_capacity(structure: &Structure, limit: usize) -> Result<(), ProductionError> {
    if structure.queue.len() >= limit {
        return Err(ProductionError::QueueFull { limit });
    }
    Ok(())
}

/// Pay for and enqueue an order, starting it at once if the structure is idle.
///
/// On error nothing is debited or queued.
pub fn queue_build(
    structure: &mut Structure,
    kind: UnitKind,
    build_time: Fixed,
    treasury: &mut Treasury,
) -> Result<(), ProductionError> {
    ensure_can_produce(structure)?;
    let cost = kind.stats().cost;
    if !treasury.spend(cost) {
        return Err(ProductionError::InsufficientCredits {
            needed: cost,
            available: treasury.credits,
        });
    }

    structure.queue.push_back(BuildOrder {
        kind,
        remaining: build_time,
    });
    if structure.current.is_none() {
        start_next(structure);
    }
    Ok(())
}

fn start_next(structure: &mut Structure) {
    structure.current = structure.queue.pop_front();
}

/// Advance the active order by `dt`.
///
/// An idle structure first pulls the next queued order. When the active order
/// completes, the next one starts immediately and the finished unit's spawn
/// point is returned: in front of player structures, behind enemy ones, with
/// a little horizontal jitter.
pub fn process_production(
    structure: &mut Structure,
    dt: Fixed,
    rng: &mut dyn RandomSource,
) -> Option<CompletedUnit> {
    if !structure.is_alive() {
        return None;
    }
    if structure.current.is_none() {
        start_next(structure);
    }

    let order = structure.current.as_mut()?;
    order.remaining -= dt;
    if order.remaining > Fixed::ZERO {
        return None;
    }
    let kind = order.kind;

    let x = structure.origin.x + structure.size.x * ratio(1, 2) + rng.centered(Fixed::from_num(SPAWN_JITTER));
    let y = match structure.faction {
        FactionId::Player => structure.origin.y - Fixed::from_num(SPAWN_FRONT_OFFSET),
        FactionId::Enemy => structure.origin.y + structure.size.y + Fixed::from_num(SPAWN_REAR_OFFSET),
    };

    structure.current = None;
    start_next(structure);
    debug!(structure = structure.id.0, kind = kind.name(), "unit produced");

    Some(CompletedUnit {
        structure: structure.id,
        faction: structure.faction,
        kind,
        position: Vec2Fixed::new(x, y),
    })
}
