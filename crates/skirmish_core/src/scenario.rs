//! Initial match placements.
//!
//! A [`MatchSetup`] bundles the static terrain with the structures and units
//! each faction starts with. [`MatchSetup::standard`] reproduces the stock
//! skirmish: the player in the south-west corner with a barracks and a small
//! strike group, the enemy in the north-east with a barracks, a stronghold
//! and three garrisons.

use serde::{Deserialize, Serialize};

use crate::factions::FactionId;
use crate::math::Vec2Fixed;
use crate::terrain::Terrain;
use crate::unit_kind::{StructureKind, UnitKind};

/// A structure present at match start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructurePlacement {
    /// Owner.
    pub faction: FactionId,
    /// Kind.
    pub kind: StructureKind,
    /// Top-left corner of the footprint.
    pub origin: Vec2Fixed,
}

/// A unit present at match start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Owner.
    pub faction: FactionId,
    /// Kind.
    pub kind: UnitKind,
    /// Spawn position.
    pub position: Vec2Fixed,
    /// Start selected (player units only).
    pub selected: bool,
}

/// Everything needed to start a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    /// Static terrain.
    pub terrain: Terrain,
    /// Initial structures, in ID order.
    pub structures: Vec<StructurePlacement>,
    /// Initial units, in spawn order.
    pub units: Vec<UnitPlacement>,
}

impl MatchSetup {
    /// An empty setup on the given terrain.
    #[must_use]
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            structures: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Add a structure with its top-left corner at `(x, y)`.
    #[must_use]
    pub fn with_structure(mut self, faction: FactionId, kind: StructureKind, x: i32, y: i32) -> Self {
        self.structures.push(StructurePlacement {
            faction,
            kind,
            origin: Vec2Fixed::from_num(x, y),
        });
        self
    }

    /// Add an unselected unit at `(x, y)`.
    #[must_use]
    pub fn with_unit(mut self, faction: FactionId, kind: UnitKind, x: i32, y: i32) -> Self {
        self.units.push(UnitPlacement {
            faction,
            kind,
            position: Vec2Fixed::from_num(x, y),
            selected: false,
        });
        self
    }

    /// The stock skirmish layout on `terrain`.
    ///
    /// Player placements are anchored to the bottom edge of the map; enemy
    /// placements use fixed coordinates in the north-east.
    #[must_use]
    pub fn standard(terrain: Terrain) -> Self {
        let height = terrain.extent().y.to_num::<i32>();
        let mut setup = Self::new(terrain)
            .with_structure(FactionId::Player, StructureKind::Barracks, 120, height - 130)
            .with_structure(FactionId::Enemy, StructureKind::Barracks, 2020, 280)
            .with_structure(FactionId::Enemy, StructureKind::Stronghold, 1980, 140);

        for i in 0..6 {
            setup = setup.with_selected(
                UnitKind::Rifleman,
                220 + (i % 3) * 22,
                height - 120 + (i / 3) * 26,
            );
        }
        for i in 0..2 {
            setup = setup.with_selected(UnitKind::Grenadier, 300 + i * 22, height - 120);
        }

        for i in 0..8 {
            setup = setup.with_unit(FactionId::Enemy, UnitKind::Rifleman, 1800 + (i % 4) * 26, 320 + (i / 4) * 26);
        }
        for i in 0..3 {
            setup = setup.with_unit(FactionId::Enemy, UnitKind::Grenadier, 1950 + i * 26, 420);
        }
        for i in 0..6 {
            setup = setup.with_unit(FactionId::Enemy, UnitKind::Rifleman, 2100 + (i % 3) * 26, 900 + (i / 3) * 26);
        }
        setup
    }

    fn with_selected(mut self, kind: UnitKind, x: i32, y: i32) -> Self {
        self.units.push(UnitPlacement {
            faction: FactionId::Player,
            kind,
            position: Vec2Fixed::from_num(x, y),
            selected: true,
        });
        self
    }
}
