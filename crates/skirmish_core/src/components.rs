//! Simulation entity definitions.
//!
//! Entities are plain data with small accessors. Behavior lives in the
//! system modules (`steering`, `combat`, `projectiles`, `production`, `ai`).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::factions::FactionId;
use crate::math::{fixed_serde, ratio, Fixed, Vec2Fixed};
use crate::unit_kind::{StructureKind, UnitKind, WeaponKind};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a unit. Assigned in spawn order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Identifier of a structure; the index into the world's structure list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructureId(pub u32);

/// Identifier of an AI squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SquadId(pub u32);

// ============================================================================
// Shared components
// ============================================================================

/// Health points, kept within `0..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    #[serde(with = "fixed_serde")]
    pub current: Fixed,
    /// Maximum health points.
    #[serde(with = "fixed_serde")]
    pub max: Fixed,
}

impl Health {
    /// Create new health at full.
    #[must_use]
    pub const fn new(max: Fixed) -> Self {
        Self { current: max, max }
    }

    /// Check if health has reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// Apply damage, returning the amount actually removed.
    /// Health never drops below zero.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        let actual = amount.max(Fixed::ZERO).min(self.current);
        self.current -= actual;
        actual
    }

    /// Remaining health as a fraction of maximum.
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        if self.max <= Fixed::ZERO {
            Fixed::ZERO
        } else {
            self.current / self.max
        }
    }
}

/// What a unit is currently pursuing.
///
/// Unit and structure targets are attack orders; a move point is a synthetic
/// order that clears itself on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Attack a unit.
    Unit(UnitId),
    /// Attack a structure.
    Structure(StructureId),
    /// Walk to a point.
    MovePoint(Vec2Fixed),
}

impl Target {
    /// Whether this is a synthetic move order rather than an attack.
    #[must_use]
    pub const fn is_move_point(&self) -> bool {
        matches!(self, Self::MovePoint(_))
    }
}

// ============================================================================
// Units
// ============================================================================

/// A mobile combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identifier.
    pub id: UnitId,
    /// Owning faction.
    pub faction: FactionId,
    /// Unit kind.
    pub kind: UnitKind,
    /// World position.
    pub position: Vec2Fixed,
    /// Velocity per 1/60 s.
    pub velocity: Vec2Fixed,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Health.
    pub health: Health,
    /// Weapon range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Damage per shot.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Movement speed per 1/60 s.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Seconds until the weapon may fire again; may go negative.
    #[serde(with = "fixed_serde")]
    pub cooldown: Fixed,
    /// Current order.
    pub target: Option<Target>,
    /// Facing angle in radians.
    #[serde(with = "fixed_serde")]
    pub facing: Fixed,
    /// Walk animation phase.
    #[serde(with = "fixed_serde")]
    pub walk_phase: Fixed,
    /// Heading used while wandering without a target.
    #[serde(with = "fixed_serde")]
    pub wander_heading: Fixed,
    /// Whether the player has this unit selected.
    pub selected: bool,
    /// Remaining highlight time after being produced.
    #[serde(with = "fixed_serde")]
    pub spawn_glow: Fixed,
    /// AI squad membership (enemy units only).
    pub squad: Option<SquadId>,
}

impl Unit {
    /// Create a unit at full health with its kind's stats.
    #[must_use]
    pub fn new(id: UnitId, faction: FactionId, kind: UnitKind, position: Vec2Fixed, radius: Fixed) -> Self {
        let stats = kind.stats();
        Self {
            id,
            faction,
            kind,
            position,
            velocity: Vec2Fixed::ZERO,
            radius,
            health: Health::new(stats.max_health),
            range: stats.range,
            damage: stats.damage,
            speed: stats.speed,
            cooldown: Fixed::ZERO,
            target: None,
            facing: Fixed::ZERO,
            walk_phase: Fixed::ZERO,
            wander_heading: Fixed::ZERO,
            selected: false,
            spawn_glow: Fixed::ZERO,
            squad: None,
        }
    }

    /// Whether the unit still has health.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// How this unit's weapon delivers damage.
    #[must_use]
    pub fn weapon(&self) -> WeaponKind {
        self.kind.stats().weapon
    }
}

// ============================================================================
// Structures
// ============================================================================

/// One entry in a production queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOrder {
    /// Unit kind being built.
    pub kind: UnitKind,
    /// Seconds of build time remaining.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
}

/// A static building with a footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Identifier.
    pub id: StructureId,
    /// Owning faction.
    pub faction: FactionId,
    /// Structure kind.
    pub kind: StructureKind,
    /// Top-left corner of the footprint.
    pub origin: Vec2Fixed,
    /// Footprint width and height.
    pub size: Vec2Fixed,
    /// Health.
    pub health: Health,
    /// Pending orders, oldest first.
    pub queue: VecDeque<BuildOrder>,
    /// Order currently being built.
    pub current: Option<BuildOrder>,
    /// Remaining hit flash time.
    #[serde(with = "fixed_serde")]
    pub damage_flash: Fixed,
    /// Set once when health first reaches zero.
    pub destroyed: bool,
}

impl Structure {
    /// Create a structure at full health with its top-left corner at `origin`.
    #[must_use]
    pub fn new(id: StructureId, faction: FactionId, kind: StructureKind, origin: Vec2Fixed) -> Self {
        Self {
            id,
            faction,
            kind,
            origin,
            size: kind.size(),
            health: Health::new(kind.max_health()),
            queue: VecDeque::new(),
            current: None,
            damage_flash: Fixed::ZERO,
            destroyed: false,
        }
    }

    /// Whether the structure is still standing.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.destroyed && !self.health.is_dead()
    }

    /// Center of the footprint; the aim point for attacks.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        self.origin + self.size.scale(ratio(1, 2))
    }

    /// Engagement radius around the center.
    #[must_use]
    pub fn hit_radius(&self) -> Fixed {
        self.size.x.max(self.size.y) * Fixed::from_num(11) / Fixed::from_num(20)
    }

    /// Whether a point lies inside the footprint grown by `pad` on every side.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed, pad: Fixed) -> bool {
        point.x >= self.origin.x - pad
            && point.x <= self.origin.x + self.size.x + pad
            && point.y >= self.origin.y - pad
            && point.y <= self.origin.y + self.size.y + pad
    }

    /// Number of orders queued or in progress.
    #[must_use]
    pub fn pending_orders(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }
}

// ============================================================================
// Projectiles & effects
// ============================================================================

/// Kind-specific projectile state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Straight shot that stops at obstructions.
    Ray {
        /// Distance travelled per 1/60 s.
        #[serde(with = "fixed_serde")]
        speed: Fixed,
        /// Seconds until the shot expires.
        #[serde(with = "fixed_serde")]
        remaining: Fixed,
    },
    /// Arcing shot that explodes at its aim point.
    Lobbed {
        /// Seconds in flight so far.
        #[serde(with = "fixed_serde")]
        elapsed: Fixed,
        /// Total flight duration.
        #[serde(with = "fixed_serde")]
        flight_time: Fixed,
        /// Area damage radius.
        #[serde(with = "fixed_serde")]
        blast_radius: Fixed,
        /// Peak height of the visual arc.
        #[serde(with = "fixed_serde")]
        apex: Fixed,
    },
}

/// A shot in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Firing position.
    pub origin: Vec2Fixed,
    /// Current ground position.
    pub position: Vec2Fixed,
    /// Point the shot flies toward.
    pub aim: Vec2Fixed,
    /// Visual height above the ground (lobbed shots only).
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
    /// Entity the shot was fired at.
    pub target: Target,
    /// Damage on impact.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Faction of the shooter.
    pub faction: FactionId,
    /// Unit that fired, cleared if it dies while the shot is in flight.
    pub shooter: Option<UnitId>,
    /// Kind-specific state.
    pub kind: ProjectileKind,
}

/// A transient blast for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explosion {
    /// Blast center.
    pub position: Vec2Fixed,
    /// Blast radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Seconds until the effect fades.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_floors_at_zero() {
        let mut health = Health::new(Fixed::from_num(48));
        assert_eq!(health.apply_damage(Fixed::from_num(9)), Fixed::from_num(9));
        assert_eq!(health.current, Fixed::from_num(39));
        assert_eq!(health.apply_damage(Fixed::from_num(100)), Fixed::from_num(39));
        assert_eq!(health.current, Fixed::ZERO);
        assert!(health.is_dead());
        assert_eq!(health.apply_damage(Fixed::from_num(5)), Fixed::ZERO);
    }

    #[test]
    fn test_health_ignores_negative_damage() {
        let mut health = Health::new(Fixed::from_num(10));
        assert_eq!(health.apply_damage(Fixed::from_num(-5)), Fixed::ZERO);
        assert_eq!(health.current, Fixed::from_num(10));
        assert_eq!(health.fraction(), Fixed::ONE);
    }

    #[test]
    fn test_structure_geometry() {
        let barracks = Structure::new(
            StructureId(0),
            FactionId::Player,
            StructureKind::Barracks,
            Vec2Fixed::from_num(100, 200),
        );
        assert_eq!(barracks.center(), Vec2Fixed::from_num(135, 223));
        // max(70, 46) * 0.55 = 38.5
        assert_eq!(barracks.hit_radius(), Fixed::from_num(38.5));
        assert!(barracks.contains(Vec2Fixed::from_num(96, 200), Fixed::from_num(6)));
        assert!(!barracks.contains(Vec2Fixed::from_num(93, 200), Fixed::from_num(6)));
    }

    #[test]
    fn test_unit_takes_kind_stats() {
        let unit = Unit::new(
            UnitId(1),
            FactionId::Enemy,
            UnitKind::Rifleman,
            Vec2Fixed::ZERO,
            Fixed::from_num(8),
        );
        assert_eq!(unit.health.max, Fixed::from_num(48));
        assert_eq!(unit.range, Fixed::from_num(115));
        assert!(unit.is_alive());
        assert_eq!(unit.weapon(), WeaponKind::Ray);
    }
}
