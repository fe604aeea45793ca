//! Entity storage for units and structures.
//!
//! Units are keyed by [`UnitId`] in an ordered map so iteration always follows
//! spawn order; that order is the tie-break for every nearest-target scan.
//! Structures are never removed, so a [`StructureId`] is a plain index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Structure, StructureId, Target, Unit, UnitId};
use crate::factions::FactionId;
use crate::math::{Fixed, Vec2Fixed};

/// Ordered unit storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStore {
    /// Map of unit ID to unit data.
    units: BTreeMap<UnitId, Unit>,
    /// Next unit ID to assign.
    next_id: u32,
}

impl UnitStore {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserve the next identifier.
    pub fn allocate_id(&mut self) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a unit under its own ID, replacing any previous entry.
    pub fn insert(&mut self, unit: Unit) {
        self.units.insert(unit.id, unit);
    }

    /// Remove a unit by ID.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by ID.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of stored units, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit IDs in spawn order.
    #[must_use]
    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Iterate over units in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Iterate mutably over units in spawn order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    /// Living units of a faction, in spawn order.
    pub fn alive_of(&self, faction: FactionId) -> impl Iterator<Item = &Unit> {
        self.units
            .values()
            .filter(move |u| u.faction == faction && u.is_alive())
    }

    /// Remove every dead unit, returning them in spawn order.
    pub fn drain_dead(&mut self) -> Vec<Unit> {
        let dead: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| !u.is_alive())
            .map(|u| u.id)
            .collect();
        dead.into_iter().filter_map(|id| self.units.remove(&id)).collect()
    }
}

/// All dynamic entities on the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battlefield {
    /// Units.
    pub units: UnitStore,
    /// Structures, indexed by [`StructureId`].
    pub structures: Vec<Structure>,
}

impl Battlefield {
    /// Create an empty battlefield.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: UnitStore::new(),
            structures: Vec::new(),
        }
    }

    /// Get a structure by ID.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id.0 as usize)
    }

    /// Get a mutable structure by ID.
    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(id.0 as usize)
    }

    /// Whether a target still refers to something worth pursuing.
    ///
    /// Move points are always live; units and structures must exist and
    /// have health left.
    #[must_use]
    pub fn is_live(&self, target: Target) -> bool {
        match target {
            Target::Unit(id) => self.units.get(id).is_some_and(Unit::is_alive),
            Target::Structure(id) => self.structure(id).is_some_and(Structure::is_alive),
            Target::MovePoint(_) => true,
        }
    }

    /// Reference point of a target: unit position, structure center, or the
    /// move point itself. `None` if the referent no longer exists.
    #[must_use]
    pub fn aim_point(&self, target: Target) -> Option<Vec2Fixed> {
        match target {
            Target::Unit(id) => self.units.get(id).map(|u| u.position),
            Target::Structure(id) => self.structure(id).map(Structure::center),
            Target::MovePoint(point) => Some(point),
        }
    }

    /// Engagement radius of a target: a structure's hit radius, else zero.
    #[must_use]
    pub fn engagement_radius(&self, target: Target) -> Fixed {
        match target {
            Target::Structure(id) => self.structure(id).map_or(Fixed::ZERO, Structure::hit_radius),
            Target::Unit(_) | Target::MovePoint(_) => Fixed::ZERO,
        }
    }

    /// Nearest living unit of `faction` to `point`, strictly within `max_distance`
    /// and accepted by `accept`. Ties go to the earliest-spawned unit.
    #[must_use]
    pub fn nearest_unit(
        &self,
        faction: FactionId,
        point: Vec2Fixed,
        max_distance: Option<Fixed>,
        mut accept: impl FnMut(&Unit) -> bool,
    ) -> Option<UnitId> {
        let limit_sq = max_distance.map(|d| d * d);
        let mut best: Option<(Fixed, UnitId)> = None;
        for unit in self.units.alive_of(faction) {
            let d2 = unit.position.distance_squared(point);
            if limit_sq.is_some_and(|limit| d2 >= limit) {
                continue;
            }
            if best.is_some_and(|(best_d2, _)| d2 >= best_d2) {
                continue;
            }
            if accept(unit) {
                best = Some((d2, unit.id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Centroid of a set of living units; `None` if none are alive.
    #[must_use]
    pub fn centroid(&self, ids: &[UnitId]) -> Option<Vec2Fixed> {
        let mut sum = Vec2Fixed::ZERO;
        let mut count = 0i32;
        for unit in ids.iter().filter_map(|&id| self.units.get(id)) {
            if unit.is_alive() {
                sum += unit.position;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        let n = Fixed::from_num(count);
        Some(Vec2Fixed::new(sum.x / n, sum.y / n))
    }

    /// Centroid of all living units of a faction.
    #[must_use]
    pub fn faction_centroid(&self, faction: FactionId) -> Option<Vec2Fixed> {
        let ids: Vec<UnitId> = self.units.alive_of(faction).map(|u| u.id).collect();
        self.centroid(&ids)
    }

    /// Living structures of a faction.
    pub fn structures_of(&self, faction: FactionId) -> impl Iterator<Item = &Structure> {
        self.structures
            .iter()
            .filter(move |s| s.faction == faction && s.is_alive())
    }

    /// The faction's designated base structure, if it has one (alive or not).
    #[must_use]
    pub fn base_of(&self, faction: FactionId) -> Option<&Structure> {
        self.structures
            .iter()
            .find(|s| s.faction == faction && s.kind.is_base())
    }

    /// The faction's first producing structure that is still standing.
    #[must_use]
    pub fn producer_of(&self, faction: FactionId) -> Option<StructureId> {
        self.structures_of(faction)
            .find(|s| s.kind.produces_units())
            .map(|s| s.id)
    }
}
