//! Unit and structure kinds with their fixed stat tables.
//!
//! # Example
//!
//! ```
//! use skirmish_core::unit_kind::{UnitKind, WeaponKind};
//!
//! let stats = UnitKind::Grenadier.stats();
//! assert_eq!(stats.cost, 100);
//! assert_eq!(stats.weapon, WeaponKind::Lobbed);
//! ```

use serde::{Deserialize, Serialize};

use crate::math::{ratio, Fixed, Vec2Fixed};

/// How a unit's weapon delivers damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Straight-line projectile that needs clear sight.
    Ray,
    /// Arcing shot with area damage; ignores sight.
    Lobbed,
}

/// The kinds of unit a barracks can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Cheap, short-range ray infantry.
    Rifleman,
    /// Long-range lobbed area damage.
    Grenadier,
}

/// Base statistics of a unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    /// Starting and maximum health.
    pub max_health: Fixed,
    /// Weapon range.
    pub range: Fixed,
    /// Damage per shot (at the center of the blast for lobbed weapons).
    pub damage: Fixed,
    /// Movement speed per 1/60 s.
    pub speed: Fixed,
    /// Credit cost.
    pub cost: i32,
    /// Seconds to build.
    pub build_time: Fixed,
    /// Weapon delivery.
    pub weapon: WeaponKind,
}

impl UnitKind {
    /// All unit kinds in a stable order.
    pub const ALL: [Self; 2] = [Self::Rifleman, Self::Grenadier];

    /// Stat table for this kind.
    #[must_use]
    pub fn stats(self) -> UnitStats {
        match self {
            Self::Rifleman => UnitStats {
                max_health: Fixed::from_num(48),
                range: Fixed::from_num(115),
                damage: Fixed::from_num(9),
                speed: ratio(17, 10),
                cost: 50,
                build_time: Fixed::from_num(3),
                weapon: WeaponKind::Ray,
            },
            Self::Grenadier => UnitStats {
                max_health: Fixed::from_num(60),
                range: Fixed::from_num(220),
                damage: Fixed::from_num(25),
                speed: ratio(14, 10),
                cost: 100,
                build_time: Fixed::from_num(4),
                weapon: WeaponKind::Lobbed,
            },
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rifleman => "Rifleman",
            Self::Grenadier => "Grenadier",
        }
    }
}

/// The kinds of structure on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Produces units.
    Barracks,
    /// A faction's base; losing it loses the match.
    Stronghold,
}

impl StructureKind {
    /// Footprint width and height.
    #[must_use]
    pub fn size(self) -> Vec2Fixed {
        match self {
            Self::Barracks => Vec2Fixed::from_num(70, 46),
            Self::Stronghold => Vec2Fixed::from_num(120, 96),
        }
    }

    /// Starting and maximum health.
    #[must_use]
    pub fn max_health(self) -> Fixed {
        match self {
            Self::Barracks => Fixed::from_num(260),
            Self::Stronghold => Fixed::from_num(360),
        }
    }

    /// Whether this structure produces units.
    #[must_use]
    pub const fn produces_units(self) -> bool {
        matches!(self, Self::Barracks)
    }

    /// Whether this structure is its faction's designated base.
    #[must_use]
    pub const fn is_base(self) -> bool {
        matches!(self, Self::Stronghold)
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Barracks => "Barracks",
            Self::Stronghold => "Stronghold",
        }
    }
}
