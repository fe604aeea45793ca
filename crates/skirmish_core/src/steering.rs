//! Local steering: separation, goal seeking with terrain sidesteps, and
//! collision resolution against terrain, trees and the map edge.
//!
//! There is no global pathfinding. Units head straight for their goal and
//! sidestep a quarter turn when the next step would land on impassable
//! terrain or inside a tree.

use crate::battlefield::UnitStore;
use crate::components::Unit;
use crate::config::MotionConfig;
use crate::math::{ratio, Fixed, Vec2Fixed};
use crate::rng::RandomSource;
use crate::terrain::{Terrain, TerrainKind};

/// Shared inputs for one tick of motion.
#[derive(Debug, Clone, Copy)]
pub struct MotionContext<'a> {
    /// Static terrain.
    pub terrain: &'a Terrain,
    /// Motion tuning.
    pub config: &'a MotionConfig,
    /// Tick duration in seconds.
    pub dt: Fixed,
}

impl MotionContext<'_> {
    /// Displacement produced by `velocity` over this tick.
    #[must_use]
    pub fn displacement(&self, velocity: Vec2Fixed) -> Vec2Fixed {
        velocity.scale(self.config.time_scale * self.dt)
    }
}

/// Average push away from living same-faction neighbours within `radius`.
///
/// Each neighbour contributes a unit vector weighted by
/// `(radius - distance) / radius`. Zero if nobody is close.
#[must_use]
pub fn separation_force(units: &UnitStore, unit: &Unit, radius: Fixed) -> Vec2Fixed {
    let mut sum = Vec2Fixed::ZERO;
    let mut count = 0i32;
    for other in units.iter() {
        if other.id == unit.id || other.faction != unit.faction || !other.is_alive() {
            continue;
        }
        let offset = unit.position - other.position;
        let d = offset.length();
        if d > Fixed::ZERO && d < radius {
            let weight = (radius - d) / radius;
            sum += Vec2Fixed::new(offset.x / d, offset.y / d).scale(weight);
            count += 1;
        }
    }
    if count == 0 {
        return Vec2Fixed::ZERO;
    }
    let n = Fixed::from_num(count);
    Vec2Fixed::new(sum.x / n, sum.y / n)
}

/// Steer `unit` toward `goal` and integrate its position.
///
/// With a stop distance, a unit already within it only bleeds off velocity and
/// does not advance. `separation` is blended in when given, capped at a
/// multiple of the unit's speed. The projected next position decides terrain
/// effects: water or rock (and tree trunks) trigger a random quarter-turn
/// sidestep, forest slows.
pub fn move_toward(
    ctx: &MotionContext<'_>,
    unit: &mut Unit,
    goal: Vec2Fixed,
    separation: Option<Vec2Fixed>,
    stop_distance: Option<Fixed>,
    rng: &mut dyn RandomSource,
) {
    let cfg = ctx.config;
    if let Some(stop) = stop_distance {
        if unit.position.distance(goal) <= stop {
            unit.velocity = unit.velocity.scale(cfg.stop_ring_decay);
            return;
        }
    }

    let heading = (goal - unit.position).normalize();
    let speed = unit.speed;
    let mut velocity = heading.scale(speed);
    if let Some(push) = separation {
        velocity += push.scale(cfg.separation_force / cfg.separation_steer_divisor);
        velocity = velocity.clamp_length(speed * cfg.separation_blend_clamp);
    }

    let next = unit.position + ctx.displacement(velocity);
    match ctx.terrain.terrain_at(next) {
        kind if kind.blocks_movement() => velocity = sidestep(heading, speed, cfg, rng),
        TerrainKind::Forest => velocity = velocity.scale(cfg.forest_slow),
        _ => {}
    }

    let next = unit.position + ctx.displacement(velocity);
    if ctx.terrain.tree_overlapping(next, unit.radius).is_some() {
        velocity = sidestep(heading, speed, cfg, rng);
    }

    unit.velocity = velocity;
    unit.position += ctx.displacement(velocity);
}

fn sidestep(heading: Vec2Fixed, speed: Fixed, cfg: &MotionConfig, rng: &mut dyn RandomSource) -> Vec2Fixed {
    let side = if rng.chance(ratio(1, 2)) {
        heading.perpendicular()
    } else {
        -heading.perpendicular()
    };
    side.scale(speed * cfg.sidestep_factor)
}

/// Idle drift for a unit without orders: separation only, damped.
pub fn idle_drift(ctx: &MotionContext<'_>, unit: &mut Unit, separation: Vec2Fixed) {
    let cfg = ctx.config;
    let push = separation.scale(cfg.separation_force / cfg.time_scale);
    unit.velocity = (unit.velocity + push).scale(cfg.idle_damping);
    unit.position += ctx.displacement(unit.velocity);
}

/// Aimless walk for enemy units with nothing to fight.
pub fn wander(ctx: &MotionContext<'_>, unit: &mut Unit, rng: &mut dyn RandomSource) {
    let cfg = ctx.config;
    unit.wander_heading += rng.centered(cfg.wander_jitter);
    let step = Vec2Fixed::from_angle(unit.wander_heading).scale(cfg.wander_speed);
    unit.position += ctx.displacement(step);
}

/// Undo a step onto impassable terrain, push out of tree trunks, and keep the
/// unit inside the map margin.
pub fn resolve_collisions(ctx: &MotionContext<'_>, unit: &mut Unit) {
    let cfg = ctx.config;
    if ctx.terrain.terrain_at(unit.position).blocks_movement() {
        unit.position -= ctx.displacement(unit.velocity);
        unit.velocity = Vec2Fixed::ZERO;
    }

    for tree in ctx.terrain.trees() {
        let offset = unit.position - tree.position;
        let d = offset.length();
        let reach = tree.radius + unit.radius;
        if d < reach {
            let push = reach - d + cfg.tree_push_epsilon;
            let divisor = if d > Fixed::ZERO { d } else { Fixed::ONE };
            let normal = Vec2Fixed::new(offset.x / divisor, offset.y / divisor);
            unit.position += normal.scale(push);
        }
    }

    let extent = ctx.terrain.extent();
    let margin = cfg.map_margin;
    unit.position.x = unit.position.x.max(margin).min(extent.x - margin);
    unit.position.y = unit.position.y.max(margin).min(extent.y - margin);
}

/// Update facing and walk phase from the current velocity.
///
/// Units at rest keep animating slowly.
pub fn advance_gait(unit: &mut Unit, dt: Fixed) {
    let speed = unit.velocity.length();
    if speed > ratio(1, 100) {
        unit.facing = unit.velocity.angle();
        unit.walk_phase += dt * (Fixed::from_num(4) + speed * Fixed::from_num(4));
    } else {
        unit.walk_phase += dt * Fixed::from_num(2);
    }
}
