//! Enemy AI director.
//!
//! The director plays the enemy faction. Once per tick it:
//!
//! 1. collects passive income,
//! 2. queues units at its barracks on a timer,
//! 3. drops dead units from its pool and squads, disbanding undersized squads,
//! 4. groups idle units into a new squad on a timer,
//! 5. steers every squad: engage the nearest player unit in reach, otherwise
//!    travel toward where the player is likely to be.
//!
//! The first squad formed while no guard exists becomes the defensive squad.
//! It patrols a ring around the base and falls back to the base when player
//! units come close to it.
//!
//! Individual enemy units outside of squad orders pick their own fights via
//! [`seek_or_wander`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battlefield::Battlefield;
use crate::components::{SquadId, Target, Unit, UnitId};
use crate::config::{DirectorConfig, TargetPolicy};
use crate::economy::{IncomeTimer, Treasury};
use crate::factions::FactionId;
use crate::formation::assign_formation_move;
use crate::math::{fixed_serde, ratio, Fixed, Vec2Fixed, TAU};
use crate::production::{ensure_capacity, queue_build, ProductionError};
use crate::rng::RandomSource;
use crate::steering::{wander, MotionContext};
use crate::unit_kind::UnitKind;

/// Search and patrol points stay this far inside the map edge.
const SEARCH_EDGE: i32 = 80;

// ============================================================================
// Squads
// ============================================================================

/// What a squad does when it has nothing to shoot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SquadRole {
    /// Searches for the player.
    Assault,
    /// Patrols around the base.
    Defense,
}

/// A group of enemy units sharing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    /// Identifier.
    pub id: SquadId,
    /// Behaviour when not engaged.
    pub role: SquadRole,
    /// Members in the order they joined.
    pub members: Vec<UnitId>,
    /// Current travel destination.
    pub waypoint: Option<Vec2Fixed>,
    /// Player unit the squad is fighting.
    pub target: Option<UnitId>,
    /// Seconds spent on the current waypoint.
    #[serde(with = "fixed_serde")]
    pub replan_timer: Fixed,
}

/// Per-tick inputs to the director.
#[derive(Debug, Clone, Copy)]
pub struct DirectorContext<'a> {
    /// Director tuning.
    pub config: &'a DirectorConfig,
    /// Gap between formation slots.
    pub formation_spacing: Fixed,
    /// Map size in world units.
    pub extent: Vec2Fixed,
    /// Tick duration in seconds.
    pub dt: Fixed,
}

// ============================================================================
// Director
// ============================================================================

/// State of the enemy decision loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyDirector {
    treasury: Treasury,
    income: IncomeTimer,
    #[serde(with = "fixed_serde")]
    production_timer: Fixed,
    #[serde(with = "fixed_serde")]
    group_timer: Fixed,
    unassigned: Vec<UnitId>,
    squads: Vec<Squad>,
    next_squad_id: u32,
    defense_squad: Option<SquadId>,
    patrol_index: usize,
}

impl EnemyDirector {
    /// A director with starting credits and timers from `config`.
    #[must_use]
    pub fn new(config: &DirectorConfig) -> Self {
        Self {
            treasury: Treasury::new(config.starting_credits),
            income: IncomeTimer::new(config.income_interval, config.income_amount),
            production_timer: config.production_timer_start,
            group_timer: config.group_timer_start,
            unassigned: Vec::new(),
            squads: Vec::new(),
            next_squad_id: 0,
            defense_squad: None,
            patrol_index: 0,
        }
    }

    /// Credits available to the director.
    #[must_use]
    pub const fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    /// Units waiting to be grouped, oldest first.
    #[must_use]
    pub fn unassigned(&self) -> &[UnitId] {
        &self.unassigned
    }

    /// Active squads in formation order.
    #[must_use]
    pub fn squads(&self) -> &[Squad] {
        &self.squads
    }

    /// Look up a squad.
    #[must_use]
    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.squads.iter().find(|s| s.id == id)
    }

    /// The squad guarding the base, if one exists.
    #[must_use]
    pub const fn defense_squad(&self) -> Option<SquadId> {
        self.defense_squad
    }

    /// Hand a unit to the director's pool.
    pub fn enlist(&mut self, id: UnitId) {
        if !self.unassigned.contains(&id) {
            self.unassigned.push(id);
        }
    }

    /// Drop references to removed units. Squads left empty are disbanded on
    /// the next update.
    pub fn forget_units(&mut self, ids: &[UnitId]) {
        if ids.is_empty() {
            return;
        }
        self.unassigned.retain(|id| !ids.contains(id));
        for squad in &mut self.squads {
            squad.members.retain(|id| !ids.contains(id));
            if squad.target.is_some_and(|t| ids.contains(&t)) {
                squad.target = None;
            }
        }
    }

    /// Run one decision pass.
    pub fn update(&mut self, ctx: &DirectorContext<'_>, field: &mut Battlefield, rng: &mut dyn RandomSource) {
        self.income.advance(ctx.dt, &mut self.treasury);
        self.run_production(ctx, field, rng);
        self.maintain_squads(ctx.config, field);
        self.form_squads(ctx, field, rng);

        let mut squads = std::mem::take(&mut self.squads);
        for squad in &mut squads {
            self.command_squad(ctx, field, squad, rng);
        }
        self.squads = squads;
    }

    fn run_production(&mut self, ctx: &DirectorContext<'_>, field: &mut Battlefield, rng: &mut dyn RandomSource) {
        let cfg = ctx.config;
        let Some(structure) = field
            .producer_of(FactionId::Enemy)
            .and_then(|id| field.structure_mut(id))
        else {
            self.production_timer = Fixed::ZERO;
            return;
        };

        self.production_timer += ctx.dt;
        if self.production_timer < cfg.production_interval {
            return;
        }

        if ensure_capacity(structure, cfg.queue_limit).is_err() {
            self.production_timer = cfg.production_interval * cfg.full_retry_fraction;
            return;
        }

        let kind = if rng.chance(cfg.rifleman_weight) {
            UnitKind::Rifleman
        } else {
            UnitKind::Grenadier
        };
        let build_time = kind.stats().build_time * cfg.build_time_multiplier;
        match queue_build(structure, kind, build_time, &mut self.treasury) {
            Ok(()) => {
                debug!(kind = kind.name(), credits = self.treasury.credits, "enemy queued unit");
                self.production_timer = Fixed::ZERO;
            }
            Err(ProductionError::InsufficientCredits { .. }) => {
                self.production_timer = cfg.production_interval * cfg.broke_retry_fraction;
            }
            Err(err) => {
                debug!(%err, "enemy production rejected");
                self.production_timer = Fixed::ZERO;
            }
        }
    }

    fn maintain_squads(&mut self, cfg: &DirectorConfig, field: &mut Battlefield) {
        self.unassigned.retain(|&id| unit_alive(field, id));

        let min_size = cfg.min_squad_size.max(1);
        let mut kept = Vec::with_capacity(self.squads.len());
        for mut squad in std::mem::take(&mut self.squads) {
            squad.members.retain(|&id| unit_alive(field, id));
            if squad.members.len() >= min_size {
                kept.push(squad);
                continue;
            }

            debug!(squad = squad.id.0, survivors = squad.members.len(), "squad disbanded");
            if self.defense_squad == Some(squad.id) {
                self.defense_squad = None;
            }
            for id in squad.members {
                if let Some(unit) = field.units.get_mut(id) {
                    unit.squad = None;
                }
                self.unassigned.push(id);
            }
        }
        self.squads = kept;
    }

    fn form_squads(&mut self, ctx: &DirectorContext<'_>, field: &mut Battlefield, rng: &mut dyn RandomSource) {
        let cfg = ctx.config;
        self.group_timer += ctx.dt;

        let min_size = cfg.min_squad_size.max(1);
        let pool = self.unassigned.len();
        if pool < min_size || self.group_timer < cfg.group_interval {
            return;
        }

        // Uniform over min..=min(max, pool)
        let upper = cfg.max_squad_size.min(pool).max(min_size);
        let choices = Fixed::from_num((upper - min_size + 1) as i64);
        let extra = (rng.next_unit() * choices).to_num::<i64>().max(0) as usize;
        let size = (min_size + extra).min(upper);

        let members: Vec<UnitId> = self.unassigned.drain(..size).collect();
        let role = if self.defense_squad.is_none() && home_point(field).is_some() {
            SquadRole::Defense
        } else {
            SquadRole::Assault
        };
        self.form_squad(field, members, role);
        self.group_timer = Fixed::ZERO;
    }

    fn form_squad(&mut self, field: &mut Battlefield, members: Vec<UnitId>, role: SquadRole) -> SquadId {
        let id = SquadId(self.next_squad_id);
        self.next_squad_id += 1;

        for &member in &members {
            if let Some(unit) = field.units.get_mut(member) {
                unit.squad = Some(id);
            }
        }
        if role == SquadRole::Defense {
            self.defense_squad = Some(id);
        }
        debug!(squad = id.0, size = members.len(), ?role, "squad formed");

        self.squads.push(Squad {
            id,
            role,
            members,
            waypoint: None,
            target: None,
            replan_timer: Fixed::ZERO,
        });
        id
    }

    fn command_squad(
        &mut self,
        ctx: &DirectorContext<'_>,
        field: &mut Battlefield,
        squad: &mut Squad,
        rng: &mut dyn RandomSource,
    ) {
        let Some(center) = field.centroid(&squad.members) else {
            return;
        };

        if let Some(target) = select_target(ctx.config, field, squad, center) {
            squad.target = Some(target);
            squad.waypoint = None;
            squad.replan_timer = Fixed::ZERO;
            for &id in &squad.members {
                if let Some(unit) = field.units.get_mut(id) {
                    unit.target = Some(Target::Unit(target));
                }
            }
            return;
        }

        squad.target = None;
        squad.replan_timer += ctx.dt;

        match (squad.role, home_point(field)) {
            (SquadRole::Defense, Some(home)) => self.guard(ctx, field, squad, center, home),
            _ => search(ctx, field, squad, center, rng),
        }
    }

    /// Patrol the ring around the base, or fall back to the base while player
    /// units are near it.
    fn guard(&mut self, ctx: &DirectorContext<'_>, field: &mut Battlefield, squad: &mut Squad, center: Vec2Fixed, home: Vec2Fixed) {
        let cfg = ctx.config;
        let threatened = field
            .nearest_unit(FactionId::Player, home, Some(cfg.base_alert_radius), |_| true)
            .is_some();
        if threatened {
            if squad.waypoint != Some(home) {
                debug!(squad = squad.id.0, "defense squad converging on base");
                order_move(ctx, field, squad, home);
            }
            return;
        }

        let due = squad
            .waypoint
            .map_or(true, |w| center.distance(w) < cfg.waypoint_arrival)
            || squad.replan_timer > cfg.replan_interval;
        if due {
            let point = self.next_patrol_point(ctx, home);
            order_move(ctx, field, squad, point);
        }
    }

    fn next_patrol_point(&mut self, ctx: &DirectorContext<'_>, home: Vec2Fixed) -> Vec2Fixed {
        let points = ctx.config.patrol_points.max(1);
        let slot = self.patrol_index % points;
        self.patrol_index = (slot + 1) % points;

        let angle = TAU * Fixed::from_num(slot as i64) / Fixed::from_num(points as i64);
        let point = home + Vec2Fixed::from_angle(angle).scale(ctx.config.patrol_radius);
        let edge = Fixed::from_num(SEARCH_EDGE);
        Vec2Fixed::new(
            clamp_between(point.x, edge, ctx.extent.x - edge),
            clamp_between(point.y, edge, ctx.extent.y - edge),
        )
    }
}

fn unit_alive(field: &Battlefield, id: UnitId) -> bool {
    field.units.get(id).is_some_and(Unit::is_alive)
}

/// Where the defensive squad guards: the base, else any standing structure.
fn home_point(field: &Battlefield) -> Option<Vec2Fixed> {
    field
        .base_of(FactionId::Enemy)
        .filter(|s| s.is_alive())
        .or_else(|| field.structures_of(FactionId::Enemy).next())
        .map(|s| s.center())
}

fn select_target(cfg: &DirectorConfig, field: &Battlefield, squad: &Squad, center: Vec2Fixed) -> Option<UnitId> {
    if cfg.target_policy == TargetPolicy::Sticky {
        let leash = cfg.engage_radius * cfg.target_leash;
        let held = squad.target.filter(|&id| {
            field
                .units
                .get(id)
                .is_some_and(|u| u.is_alive() && u.position.distance(center) <= leash)
        });
        if held.is_some() {
            return held;
        }
    }

    let nearest = field.nearest_unit(FactionId::Player, center, None, |_| true)?;
    let distance = field.units.get(nearest)?.position.distance(center);
    (distance <= cfg.engage_radius).then_some(nearest)
}

fn search(
    ctx: &DirectorContext<'_>,
    field: &mut Battlefield,
    squad: &mut Squad,
    center: Vec2Fixed,
    rng: &mut dyn RandomSource,
) {
    let cfg = ctx.config;
    if let Some(waypoint) = squad.waypoint {
        if center.distance(waypoint) < cfg.waypoint_arrival || squad.replan_timer > cfg.replan_interval {
            squad.waypoint = None;
        }
    }
    if squad.waypoint.is_none() {
        let destination = search_point(ctx, field, center, rng);
        order_move(ctx, field, squad, destination);
    }
}

fn order_move(ctx: &DirectorContext<'_>, field: &mut Battlefield, squad: &mut Squad, destination: Vec2Fixed) {
    assign_formation_move(field, &squad.members, destination, ctx.formation_spacing);
    squad.waypoint = Some(destination);
    squad.replan_timer = Fixed::ZERO;
}

/// Pick a destination for a squad with nothing to fight.
///
/// Usually a jittered point around the player's centroid, kept in the
/// southern part of the map; sometimes a point near the squad itself.
pub fn search_point(
    ctx: &DirectorContext<'_>,
    field: &Battlefield,
    origin: Vec2Fixed,
    rng: &mut dyn RandomSource,
) -> Vec2Fixed {
    let cfg = ctx.config;
    let (width, height) = (ctx.extent.x, ctx.extent.y);
    let edge = Fixed::from_num(SEARCH_EDGE);

    let estimate = field
        .faction_centroid(FactionId::Player)
        .unwrap_or_else(|| Vec2Fixed::new(width * ratio(35, 100), height * ratio(75, 100)));
    let base_y = estimate.y.max(height * ratio(55, 100));
    let offset_x = rng.centered(cfg.search_spread_x);
    let offset_y = (rng.next_unit() - ratio(4, 10)) * cfg.search_spread_y;

    let mut destination = Vec2Fixed::new(
        clamp_between(estimate.x + offset_x, edge, width - edge),
        clamp_between(base_y + offset_y, height * ratio(35, 100), height - edge),
    );
    if rng.chance(cfg.local_search_chance) {
        destination = Vec2Fixed::new(
            clamp_between(origin.x + rng.centered(cfg.local_search_spread), edge, width - edge),
            clamp_between(origin.y + rng.centered(cfg.local_search_spread), height * ratio(3, 10), height - edge),
        );
    }
    destination
}

fn clamp_between(value: Fixed, lo: Fixed, hi: Fixed) -> Fixed {
    value.max(lo).min(hi)
}

// ============================================================================
// Individual behaviour
// ============================================================================

/// Give enemy units without a live order a target, or let them wander.
///
/// A unit picks the nearest player unit strictly within `radius` that it can
/// see; with none in sight it drifts along its wander heading.
pub fn seek_or_wander(
    motion: &MotionContext<'_>,
    field: &mut Battlefield,
    radius: Fixed,
    rng: &mut dyn RandomSource,
) {
    let terrain = motion.terrain;
    for id in field.units.ids() {
        let Some(unit) = field.units.get(id) else {
            continue;
        };
        if unit.faction != FactionId::Enemy || !unit.is_alive() {
            continue;
        }
        if unit.target.is_some_and(|t| field.is_live(t)) {
            continue;
        }

        let origin = unit.position;
        let found = field.nearest_unit(FactionId::Player, origin, Some(radius), |p| {
            terrain.rifle_line_of_sight(origin, p.position)
        });
        if let Some(unit) = field.units.get_mut(id) {
            match found {
                Some(target) => unit.target = Some(Target::Unit(target)),
                None => wander(motion, unit, rng),
            }
        }
    }
}
