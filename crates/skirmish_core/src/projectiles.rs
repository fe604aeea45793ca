//! Projectile flight and impact.
//!
//! Rays fly straight along their launch direction and only ever hurt the
//! entity they were fired at. Lobbed shots ignore obstacles, follow a visual arc, and
//! explode where they were aimed.

use crate::battlefield::Battlefield;
use crate::combat::{apply_damage, explode, CombatContext};
use crate::components::{Explosion, Projectile, ProjectileKind, StructureId, Target};
use crate::math::{Fixed, Vec2Fixed};

/// What happened to the projectiles during one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectileReport {
    /// Blasts created this step.
    pub explosions: Vec<Explosion>,
    /// Structures destroyed by projectile damage this step.
    pub destroyed_structures: Vec<StructureId>,
    /// Rays removed because their path was obstructed.
    pub blocked: usize,
    /// Rays that struck their target.
    pub hits: usize,
}

/// Advance every projectile by `dt`, applying impacts and removing spent shots.
///
/// Projectiles are processed in firing order.
pub fn advance_projectiles(
    ctx: &CombatContext<'_>,
    field: &mut Battlefield,
    projectiles: &mut Vec<Projectile>,
    time_scale: Fixed,
    dt: Fixed,
) -> ProjectileReport {
    let mut report = ProjectileReport::default();
    let mut in_flight = Vec::with_capacity(projectiles.len());

    for mut shot in projectiles.drain(..) {
        let keep = match shot.kind {
            ProjectileKind::Lobbed { .. } => advance_lobbed(ctx, field, &mut shot, dt, &mut report),
            ProjectileKind::Ray { .. } => advance_ray(ctx, field, &mut shot, time_scale, dt, &mut report),
        };
        if keep {
            in_flight.push(shot);
        }
    }

    *projectiles = in_flight;
    report
}

fn advance_lobbed(
    ctx: &CombatContext<'_>,
    field: &mut Battlefield,
    shot: &mut Projectile,
    dt: Fixed,
    report: &mut ProjectileReport,
) -> bool {
    let ProjectileKind::Lobbed {
        ref mut elapsed,
        flight_time,
        blast_radius,
        apex,
    } = shot.kind
    else {
        return false;
    };

    *elapsed += dt;
    let progress = if flight_time > Fixed::ZERO {
        (*elapsed / flight_time).min(Fixed::ONE)
    } else {
        Fixed::ONE
    };
    shot.position = shot.origin.lerp(shot.aim, progress);
    shot.height = Fixed::from_num(4) * apex * progress * (Fixed::ONE - progress);

    if progress < Fixed::ONE {
        return true;
    }

    let (effect, destroyed) = explode(
        ctx,
        field,
        shot.position,
        blast_radius,
        shot.damage,
        shot.faction,
        shot.shooter,
    );
    report.explosions.push(effect);
    report.destroyed_structures.extend(destroyed);
    false
}

fn advance_ray(
    ctx: &CombatContext<'_>,
    field: &mut Battlefield,
    shot: &mut Projectile,
    time_scale: Fixed,
    dt: Fixed,
    report: &mut ProjectileReport,
) -> bool {
    let ProjectileKind::Ray {
        speed,
        ref mut remaining,
    } = shot.kind
    else {
        return false;
    };

    // Launch direction; a ray never turns back once past its aim point
    let heading = (shot.aim - shot.origin).normalize();
    let next = shot.position + heading.scale(speed * time_scale * dt);
    if ray_obstructed(ctx, shot.origin, next) {
        report.blocked += 1;
        return false;
    }

    shot.position = next;
    *remaining -= dt;

    if field.is_live(shot.target) && ray_touches(ctx, field, shot.target, shot.position) {
        if let Some(id) = apply_damage(ctx, field, shot.target, shot.damage, shot.shooter) {
            report.destroyed_structures.push(id);
        }
        report.hits += 1;
        return false;
    }

    *remaining > Fixed::ZERO
}

/// Sight from the muzzle to where the ray lands next. Only interior points
/// count, so a shooter at a forest edge still fires out.
fn ray_obstructed(ctx: &CombatContext<'_>, origin: Vec2Fixed, next: Vec2Fixed) -> bool {
    !ctx.terrain.rifle_line_of_sight(origin, next)
}

fn ray_touches(ctx: &CombatContext<'_>, field: &Battlefield, target: Target, point: Vec2Fixed) -> bool {
    match target {
        Target::Unit(id) => field.units.get(id).is_some_and(|unit| {
            let reach = unit.radius + ctx.config.ray_hit_padding;
            unit.position.distance_squared(point) < reach * reach
        }),
        Target::Structure(id) => field.structure(id).is_some_and(|s| {
            let radius = s.hit_radius();
            s.contains(point, ctx.config.structure_footprint_padding)
                || s.center().distance_squared(point) < radius * radius
        }),
        Target::MovePoint(_) => false,
    }
}
