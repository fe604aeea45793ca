//! Damage application, reactive targeting, firing and area damage.
//!
//! Damage flows through one path, [`apply_damage`], whether it comes from a
//! ray hit or a blast. That path floors health at zero, makes struck units
//! and their allies turn on the attacker, and handles the one-time
//! destruction of structures.

use tracing::debug;

use crate::battlefield::Battlefield;
use crate::components::{
    Explosion, Projectile, ProjectileKind, StructureId, Target, Unit, UnitId,
};
use crate::config::CombatConfig;
use crate::factions::FactionId;
use crate::math::{Fixed, Vec2Fixed};
use crate::terrain::Terrain;
use crate::unit_kind::WeaponKind;

/// Static inputs shared by the combat functions.
#[derive(Debug, Clone, Copy)]
pub struct CombatContext<'a> {
    /// Terrain for sight checks.
    pub terrain: &'a Terrain,
    /// Combat tuning.
    pub config: &'a CombatConfig,
}

/// Subtract `amount` from a target's health.
///
/// Targets that are missing or already at zero are ignored. Struck units
/// react against `attacker`; struck structures flash and alert nearby
/// defenders. Returns the structure's ID if this hit destroyed it.
pub fn apply_damage(
    ctx: &CombatContext<'_>,
    field: &mut Battlefield,
    target: Target,
    amount: Fixed,
    attacker: Option<UnitId>,
) -> Option<StructureId> {
    match target {
        Target::Unit(victim) => {
            let unit = field.units.get_mut(victim)?;
            if !unit.is_alive() {
                return None;
            }
            unit.health.apply_damage(amount);
            if let Some(attacker) = attacker {
                react_to_attack(ctx, field, victim, attacker);
            }
            None
        }
        Target::Structure(id) => {
            let structure = field.structure_mut(id)?;
            if !structure.is_alive() {
                return None;
            }
            structure.health.apply_damage(amount);
            structure.damage_flash = ctx.config.damage_flash;

            let destroyed = structure.health.is_dead();
            if destroyed {
                structure.destroyed = true;
                structure.queue.clear();
                structure.current = None;
                debug!(structure = id.0, kind = structure.kind.name(), "structure destroyed");
            }

            if let Some(attacker) = attacker {
                alert_defenders(ctx, field, id, attacker);
            }
            destroyed.then_some(id)
        }
        Target::MovePoint(_) => None,
    }
}

/// Turn a struck unit, and allies who can see the attacker, against it.
///
/// Allies within the reaction radius only switch if they have no live
/// attack order; an ongoing fight is never interrupted.
pub fn react_to_attack(ctx: &CombatContext<'_>, field: &mut Battlefield, victim: UnitId, attacker: UnitId) {
    let Some((attacker_faction, attacker_pos)) = field
        .units
        .get(attacker)
        .filter(|u| u.is_alive())
        .map(|u| (u.faction, u.position))
    else {
        return;
    };
    let Some((faction, victim_pos)) = field
        .units
        .get(victim)
        .filter(|u| u.is_alive())
        .map(|u| (u.faction, u.position))
    else {
        return;
    };
    if attacker_faction == faction {
        return;
    }

    if let Some(unit) = field.units.get_mut(victim) {
        unit.target = Some(Target::Unit(attacker));
    }

    let radius_sq = ctx.config.reaction_radius * ctx.config.reaction_radius;
    let responders: Vec<UnitId> = field
        .units
        .alive_of(faction)
        .filter(|ally| ally.id != victim)
        .filter(|ally| ally.position.distance_squared(victim_pos) <= radius_sq)
        .filter(|ally| !has_live_attack_order(field, ally))
        .filter(|ally| ctx.terrain.rifle_line_of_sight(ally.position, attacker_pos))
        .map(|ally| ally.id)
        .collect();

    for id in responders {
        if let Some(ally) = field.units.get_mut(id) {
            ally.target = Some(Target::Unit(attacker));
        }
    }
}

/// Send idle defenders near a struck structure after the attacker.
pub fn alert_defenders(ctx: &CombatContext<'_>, field: &mut Battlefield, structure: StructureId, attacker: UnitId) {
    let Some((faction, center)) = field.structure(structure).map(|s| (s.faction, s.center())) else {
        return;
    };
    if !field.units.get(attacker).is_some_and(Unit::is_alive) {
        return;
    }

    let radius_sq = ctx.config.defender_alert_radius * ctx.config.defender_alert_radius;
    let defenders: Vec<UnitId> = field
        .units
        .alive_of(faction)
        .filter(|u| u.position.distance_squared(center) <= radius_sq)
        .filter(|u| !has_live_attack_order(field, u))
        .map(|u| u.id)
        .collect();

    for id in defenders {
        if let Some(unit) = field.units.get_mut(id) {
            unit.target = Some(Target::Unit(attacker));
        }
    }
}

fn has_live_attack_order(field: &Battlefield, unit: &Unit) -> bool {
    unit.target
        .is_some_and(|t| !t.is_move_point() && field.is_live(t))
}

/// Create the projectile `shooter` fires at `target`.
///
/// Returns `None` if the target no longer has an aim point.
#[must_use]
pub fn fire(ctx: &CombatContext<'_>, field: &Battlefield, shooter: &Unit, target: Target) -> Option<Projectile> {
    let cfg = ctx.config;
    let aim = field.aim_point(target)?;
    let kind = match shooter.weapon() {
        WeaponKind::Lobbed => {
            let distance = shooter.position.distance(aim);
            let flight_time = (cfg.lobbed_min_flight + distance / cfg.lobbed_flight_distance)
                .clamp(cfg.lobbed_min_flight, cfg.lobbed_max_flight);
            let apex = (cfg.apex_base + distance * cfg.apex_per_distance).min(cfg.apex_max);
            ProjectileKind::Lobbed {
                elapsed: Fixed::ZERO,
                flight_time,
                blast_radius: cfg.blast_radius,
                apex,
            }
        }
        WeaponKind::Ray => ProjectileKind::Ray {
            speed: cfg.ray_speed,
            remaining: cfg.ray_lifetime,
        },
    };

    Some(Projectile {
        origin: shooter.position,
        position: shooter.position,
        aim,
        height: Fixed::ZERO,
        target,
        damage: shooter.damage,
        faction: shooter.faction,
        shooter: Some(shooter.id),
        kind,
    })
}

/// Area damage centered at `position`, hurting only the opponents of `faction`.
///
/// Units take `max(1, damage * (1 - d / radius))` for `d < radius`.
/// Structures are reached out to `radius` plus their hit radius, with the
/// falloff measured from their hit ring. Returns the blast effect and any
/// structures the blast destroyed.
pub fn explode(
    ctx: &CombatContext<'_>,
    field: &mut Battlefield,
    position: Vec2Fixed,
    radius: Fixed,
    damage: Fixed,
    faction: FactionId,
    attacker: Option<UnitId>,
) -> (Explosion, Vec<StructureId>) {
    let enemy = faction.opponent();
    let mut destroyed = Vec::new();

    let victims: Vec<(UnitId, Fixed)> = field
        .units
        .alive_of(enemy)
        .map(|u| (u.id, u.position.distance(position)))
        .filter(|&(_, d)| d < radius)
        .collect();
    for (id, distance) in victims {
        let amount = falloff(damage, distance, radius);
        apply_damage(ctx, field, Target::Unit(id), amount, attacker);
    }

    let struck: Vec<(StructureId, Fixed)> = field
        .structures_of(enemy)
        .map(|s| {
            let ring = (s.center().distance(position) - s.hit_radius()).max(Fixed::ZERO);
            (s.id, ring)
        })
        .filter(|&(_, ring)| ring < radius)
        .collect();
    for (id, ring) in struck {
        let amount = falloff(damage, ring, radius);
        if let Some(id) = apply_damage(ctx, field, Target::Structure(id), amount, attacker) {
            destroyed.push(id);
        }
    }

    let effect = Explosion {
        position,
        radius,
        remaining: ctx.config.explosion_lifetime,
    };
    (effect, destroyed)
}

fn falloff(damage: Fixed, distance: Fixed, radius: Fixed) -> Fixed {
    if radius <= Fixed::ZERO {
        return damage.max(Fixed::ONE);
    }
    (damage * (Fixed::ONE - distance / radius)).max(Fixed::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Structure;
    use crate::terrain::{TerrainGrid, TerrainKind, Tree};
    use crate::unit_kind::{StructureKind, UnitKind};

    fn open_terrain(trees: Vec<Tree>) -> Terrain {
        let grid = TerrainGrid::filled(40, 40, Fixed::from_num(24), TerrainKind::Open).unwrap();
        Terrain::new(grid, trees).unwrap()
    }

    fn spawn(field: &mut Battlefield, faction: FactionId, kind: UnitKind, x: i32, y: i32) -> UnitId {
        let id = field.units.allocate_id();
        field
            .units
            .insert(Unit::new(id, faction, kind, Vec2Fixed::from_num(x, y), Fixed::from_num(8)));
        id
    }

    fn hp(field: &Battlefield, id: UnitId) -> Fixed {
        field.units.get(id).map_or(Fixed::ZERO, |u| u.health.current)
    }

    #[test]
    fn test_apply_damage_floors_and_reacts() {
        let terrain = open_terrain(Vec::new());
        let config = CombatConfig::default();
        let ctx = CombatContext { terrain: &terrain, config: &config };
        let mut field = Battlefield::new();
        let attacker = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, 300, 100);
        let victim = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, 100, 100);

        apply_damage(&ctx, &mut field, Target::Unit(victim), Fixed::from_num(100), Some(attacker));
        assert_eq!(hp(&field, victim), Fixed::ZERO);

        // Further hits on a dead unit are ignored
        apply_damage(&ctx, &mut field, Target::Unit(victim), Fixed::from_num(5), Some(attacker));
        assert_eq!(hp(&field, victim), Fixed::ZERO);
    }

    #[test]
    fn test_reaction_respects_existing_orders_and_sight() {
        let tree = Tree::new(Vec2Fixed::from_num(230, 150), Fixed::from_num(10));
        let terrain = open_terrain(vec![tree]);
        let config = CombatConfig::default();
        let ctx = CombatContext { terrain: &terrain, config: &config };
        let mut field = Battlefield::new();

        let attacker = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, 300, 100);
        let other_enemy = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, 600, 600);
        let victim = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, 200, 100);
        let idle = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, 200, 60);
        let moving = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, 220, 120);
        let busy = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, 180, 120);
        let far = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, 200, 400);
        // Sight from here to the attacker passes through the tree
        let blocked = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, 160, 200);

        if let Some(u) = field.units.get_mut(moving) {
            u.target = Some(Target::MovePoint(Vec2Fixed::from_num(0, 0)));
        }
        if let Some(u) = field.units.get_mut(busy) {
            u.target = Some(Target::Unit(other_enemy));
        }

        apply_damage(&ctx, &mut field, Target::Unit(victim), Fixed::from_num(9), Some(attacker));

        let target_of = |id| field.units.get(id).and_then(|u| u.target);
        assert_eq!(target_of(victim), Some(Target::Unit(attacker)));
        assert_eq!(target_of(idle), Some(Target::Unit(attacker)));
        assert_eq!(target_of(moving), Some(Target::Unit(attacker)));
        assert_eq!(target_of(busy), Some(Target::Unit(other_enemy)));
        assert_eq!(target_of(far), None);
        assert_eq!(target_of(blocked), None);
    }

    #[test]
    fn test_area_damage_falloff() {
        let terrain = open_terrain(Vec::new());
        let config = CombatConfig::default();
        let ctx = CombatContext { terrain: &terrain, config: &config };
        let mut field = Battlefield::new();

        let near = spawn(&mut field, FactionId::Enemy, UnitKind::Grenadier, 100, 100);
        let half = spawn(&mut field, FactionId::Enemy, UnitKind::Grenadier, 100, 117);
        let edge = spawn(&mut field, FactionId::Enemy, UnitKind::Grenadier, 134, 100);
        let outside = spawn(&mut field, FactionId::Enemy, UnitKind::Grenadier, 136, 100);
        let friendly = spawn(&mut field, FactionId::Player, UnitKind::Grenadier, 100, 100);

        // Center half a unit above `half` so it sits exactly 17.5 away
        let center = Vec2Fixed::new(Fixed::from_num(100), Fixed::from_num(99.5));
        let (effect, destroyed) = explode(
            &ctx,
            &mut field,
            center,
            Fixed::from_num(35),
            Fixed::from_num(25),
            FactionId::Player,
            None,
        );
        assert!(destroyed.is_empty());
        assert_eq!(effect.remaining, config.explosion_lifetime);

        let max = Fixed::from_num(60);
        assert_eq!(hp(&field, half), max - Fixed::from_num(12.5));
        assert!(hp(&field, near) < max - Fixed::from_num(24));
        // Floor of 1 at the rim, nothing beyond it
        assert_eq!(hp(&field, edge), max - Fixed::ONE);
        assert_eq!(hp(&field, outside), max);
        assert_eq!(hp(&field, friendly), max);
    }

    #[test]
    fn test_blast_reaches_structures_through_hit_ring() {
        let terrain = open_terrain(Vec::new());
        let config = CombatConfig::default();
        let ctx = CombatContext { terrain: &terrain, config: &config };
        let mut field = Battlefield::new();
        field.structures.push(Structure::new(
            StructureId(0),
            FactionId::Enemy,
            StructureKind::Stronghold,
            Vec2Fixed::from_num(0, 0),
        ));
        // Center (60, 48), hit radius 66; a blast 83.5 from center is 17.5 from the ring
        let (_, destroyed) = explode(
            &ctx,
            &mut field,
            Vec2Fixed::from_num(143.5, 48.0),
            Fixed::from_num(35),
            Fixed::from_num(30),
            FactionId::Player,
            None,
        );
        assert!(destroyed.is_empty());
        let s = &field.structures[0];
        // 30 * (1 - 17.5/35) = 15
        assert_eq!(s.health.current, Fixed::from_num(360 - 15));
        assert_eq!(s.damage_flash, config.damage_flash);
    }

    #[test]
    fn test_structure_destroyed_once_and_queue_cleared() {
        let terrain = open_terrain(Vec::new());
        let config = CombatConfig::default();
        let ctx = CombatContext { terrain: &terrain, config: &config };
        let mut field = Battlefield::new();
        let mut barracks = Structure::new(
            StructureId(0),
            FactionId::Enemy,
            StructureKind::Barracks,
            Vec2Fixed::from_num(100, 100),
        );
        barracks.queue.push_back(crate::components::BuildOrder {
            kind: UnitKind::Rifleman,
            remaining: Fixed::from_num(3),
        });
        field.structures.push(barracks);

        let first = apply_damage(&ctx, &mut field, Target::Structure(StructureId(0)), Fixed::from_num(500), None);
        let second = apply_damage(&ctx, &mut field, Target::Structure(StructureId(0)), Fixed::from_num(500), None);
        assert_eq!(first, Some(StructureId(0)));
        assert_eq!(second, None);
        let s = &field.structures[0];
        assert!(s.destroyed);
        assert!(s.queue.is_empty());
        assert_eq!(s.health.current, Fixed::ZERO);
    }

    #[test]
    fn test_defenders_respond_to_structure_hits() {
        let terrain = open_terrain(Vec::new());
        let config = CombatConfig::default();
        let ctx = CombatContext { terrain: &terrain, config: &config };
        let mut field = Battlefield::new();
        field.structures.push(Structure::new(
            StructureId(0),
            FactionId::Enemy,
            StructureKind::Stronghold,
            Vec2Fixed::from_num(400, 400),
        ));
        let raider = spawn(&mut field, FactionId::Player, UnitKind::Grenadier, 700, 450);
        let guard = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, 480, 300);
        let distant = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, 900, 900);

        apply_damage(&ctx, &mut field, Target::Structure(StructureId(0)), Fixed::from_num(10), Some(raider));
        assert_eq!(field.units.get(guard).and_then(|u| u.target), Some(Target::Unit(raider)));
        assert_eq!(field.units.get(distant).and_then(|u| u.target), None);
    }

    #[test]
    fn test_fire_lobbed_flight_time() {
        let terrain = open_terrain(Vec::new());
        let config = CombatConfig::default();
        let ctx = CombatContext { terrain: &terrain, config: &config };
        let mut field = Battlefield::new();
        let shooter = spawn(&mut field, FactionId::Player, UnitKind::Grenadier, 0, 100);
        let near = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, 30, 100);
        let far = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, 600, 100);

        let shooter = field.units.get(shooter).cloned().unwrap();
        let shot = fire(&ctx, &field, &shooter, Target::Unit(far)).unwrap();
        match shot.kind {
            ProjectileKind::Lobbed { flight_time, blast_radius, apex, .. } => {
                assert_eq!(flight_time, config.lobbed_max_flight);
                assert_eq!(blast_radius, Fixed::from_num(35));
                assert_eq!(apex, Fixed::from_num(90));
            }
            ProjectileKind::Ray { .. } => panic!("grenadier fired a ray"),
        }

        let shot = fire(&ctx, &field, &shooter, Target::Unit(near)).unwrap();
        match shot.kind {
            ProjectileKind::Lobbed { flight_time, .. } => {
                assert!(flight_time > config.lobbed_min_flight);
                assert!(flight_time < Fixed::from_num(0.61));
            }
            ProjectileKind::Ray { .. } => panic!("grenadier fired a ray"),
        }
        assert_eq!(shot.aim, Vec2Fixed::from_num(30, 100));
    }
}
