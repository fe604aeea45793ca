//! The match world and its per-tick loop.
//!
//! [`World`] owns all match state: terrain, units, structures, projectiles,
//! the fog mask, both treasuries and the enemy director. Hosts drive it with
//! [`World::tick`] and read it between ticks; nothing else mutates it.
//!
//! # Determinism
//!
//! A world built from the same setup, configuration and random seed, and fed
//! the same `dt` sequence and commands, produces the same match:
//! - all arithmetic is fixed-point
//! - every random draw comes from the world's [`RandomSource`]
//! - units are always visited in spawn order
//!
//! # Example
//!
//! ```
//! use skirmish_core::math::{ratio, Fixed};
//! use skirmish_core::scenario::MatchSetup;
//! use skirmish_core::simulation::World;
//! use skirmish_core::terrain::{Terrain, TerrainGrid, TerrainKind};
//!
//! let grid = TerrainGrid::filled(100, 66, Fixed::from_num(24), TerrainKind::Open).unwrap();
//! let terrain = Terrain::new(grid, Vec::new()).unwrap();
//! let mut world = World::with_seed(MatchSetup::standard(terrain), 7);
//!
//! let events = world.tick(ratio(1, 60));
//! assert!(events.outcome.is_none());
//! assert_eq!(world.tick_count(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, info, trace};

use crate::ai::{seek_or_wander, DirectorContext, EnemyDirector};
use crate::battlefield::{Battlefield, UnitStore};
use crate::combat::{fire, CombatContext};
use crate::components::{Explosion, Projectile, Structure, StructureId, Target, Unit, UnitId};
use crate::config::SimConfig;
use crate::economy::{IncomeTimer, Treasury};
use crate::factions::FactionId;
use crate::fog::FogMask;
use crate::formation::assign_formation_move;
use crate::math::{Fixed, Vec2Fixed, TAU};
use crate::production::{process_production, queue_build, ProductionError};
use crate::projectiles::advance_projectiles;
use crate::rng::{RandomSource, SeededRandom};
use crate::scenario::MatchSetup;
use crate::snapshot::WorldSnapshot;
use crate::steering::{
    advance_gait, idle_drift, move_toward, resolve_collisions, separation_force, MotionContext,
};
use crate::terrain::Terrain;
use crate::unit_kind::{UnitKind, WeaponKind};
use crate::victory::{evaluate, MatchOutcome, MatchStats};

/// Added to a unit's radius when picking it at a point.
const PICK_PADDING: i32 = 3;

// ============================================================================
// Tick events
// ============================================================================

/// A shot leaving a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotFired {
    /// Firing unit.
    pub shooter: UnitId,
    /// Its faction.
    pub faction: FactionId,
    /// Weapon used.
    pub weapon: WeaponKind,
    /// Muzzle position.
    pub origin: Vec2Fixed,
    /// Aim point.
    pub aim: Vec2Fixed,
}

/// A unit removed because its health reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitDeath {
    /// The removed unit.
    pub unit: UnitId,
    /// Its faction.
    pub faction: FactionId,
    /// Its kind.
    pub kind: UnitKind,
    /// Where it fell.
    pub position: Vec2Fixed,
}

/// A unit completed by a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducedUnit {
    /// The new unit.
    pub unit: UnitId,
    /// Structure that built it.
    pub structure: StructureId,
    /// Owning faction.
    pub faction: FactionId,
    /// Unit kind.
    pub kind: UnitKind,
}

/// What happened during one tick, for audio and UI collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Shots fired this tick.
    pub shots: Vec<ShotFired>,
    /// Blasts created this tick.
    pub explosions: Vec<Explosion>,
    /// Units removed this tick.
    pub deaths: Vec<UnitDeath>,
    /// Units completed this tick.
    pub produced: Vec<ProducedUnit>,
    /// Structures destroyed this tick.
    pub structures_destroyed: Vec<StructureId>,
    /// Credits granted to the player this tick.
    pub income: i32,
    /// Set on the tick the match ends.
    pub outcome: Option<MatchOutcome>,
}

// ============================================================================
// World
// ============================================================================

/// One live match.
///
/// # Tick order
///
/// 1. Clamp `dt`; do nothing once the match has ended
/// 2. Elapsed time and player income
/// 3. Enemy director
/// 4. Cooldowns, gait, spawn glow and fog reveal
/// 5. Enemy auto-acquire and wandering
/// 6. Unit motion and firing
/// 7. Projectiles, then explosion fade
/// 8. Production and structure flash decay
/// 9. Dead unit removal
/// 10. Victory check
#[derive(Debug)]
pub struct World {
    config: SimConfig,
    terrain: Terrain,
    field: Battlefield,
    projectiles: Vec<Projectile>,
    explosions: Vec<Explosion>,
    fog: FogMask,
    treasury: Treasury,
    income: IncomeTimer,
    director: EnemyDirector,
    rng: Box<dyn RandomSource>,
    tick: u64,
    elapsed: Fixed,
    stats: MatchStats,
    outcome: Option<MatchOutcome>,
}

impl World {
    /// Start a match.
    ///
    /// Structures take IDs in placement order. Enemy units join the
    /// director's pool; player units reveal the fog around them.
    #[must_use]
    pub fn new(setup: MatchSetup, config: SimConfig, rng: Box<dyn RandomSource>) -> Self {
        let MatchSetup {
            terrain,
            structures,
            units,
        } = setup;

        let mut field = Battlefield::new();
        for (index, placement) in structures.iter().enumerate() {
            field.structures.push(Structure::new(
                StructureId(index as u32),
                placement.faction,
                placement.kind,
                placement.origin,
            ));
        }

        let fog = FogMask::new(terrain.extent(), config.fog.cell_size);
        let mut world = Self {
            treasury: Treasury::new(config.economy.starting_credits),
            income: IncomeTimer::new(config.economy.income_interval, config.economy.income_amount),
            director: EnemyDirector::new(&config.director),
            config,
            terrain,
            field,
            projectiles: Vec::new(),
            explosions: Vec::new(),
            fog,
            rng,
            tick: 0,
            elapsed: Fixed::ZERO,
            stats: MatchStats::default(),
            outcome: None,
        };

        for placement in units {
            let id = world.spawn_unit(placement.faction, placement.kind, placement.position);
            if placement.selected && placement.faction == FactionId::Player {
                if let Some(unit) = world.field.units.get_mut(id) {
                    unit.selected = true;
                }
            }
        }
        world.reveal_fog();
        world
    }

    /// Start a match with default tuning and a seeded random stream.
    #[must_use]
    pub fn with_seed(setup: MatchSetup, seed: u64) -> Self {
        Self::new(setup, SimConfig::default(), Box::new(SeededRandom::new(seed)))
    }

    /// End the match's lifetime, returning its outcome if it finished.
    #[must_use]
    pub fn dispose(self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Add a unit at full health. Enemy units join the director's pool.
    pub fn spawn_unit(&mut self, faction: FactionId, kind: UnitKind, position: Vec2Fixed) -> UnitId {
        let id = self.field.units.allocate_id();
        let mut unit = Unit::new(id, faction, kind, position, self.config.motion.unit_radius);
        unit.wander_heading = self.rng.next_unit() * TAU;
        self.field.units.insert(unit);
        if faction == FactionId::Enemy {
            self.director.enlist(id);
        }
        id
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Active tuning.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Static terrain.
    #[must_use]
    pub const fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Living units.
    #[must_use]
    pub const fn units(&self) -> &UnitStore {
        &self.field.units
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.field.units.get(id)
    }

    /// All structures, destroyed ones included.
    #[must_use]
    pub fn structures(&self) -> &[Structure] {
        &self.field.structures
    }

    /// Look up a structure.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.field.structure(id)
    }

    /// Shots in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Fading blasts.
    #[must_use]
    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    /// Revealed area.
    #[must_use]
    pub const fn fog(&self) -> &FogMask {
        &self.fog
    }

    /// Player credits.
    #[must_use]
    pub const fn credits(&self) -> i32 {
        self.treasury.credits
    }

    /// The enemy director.
    #[must_use]
    pub const fn director(&self) -> &EnemyDirector {
        &self.director
    }

    /// Ticks processed.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// The result, once the match has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    /// Whether the match has ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.outcome.is_some()
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advance the match by `dt` seconds, clamped to `[0, max_dt]`.
    ///
    /// Once the match has ended this does nothing and returns no events.
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        let mut events = TickEvents::default();
        if self.is_ended() {
            return events;
        }
        let dt = dt.max(Fixed::ZERO).min(self.config.motion.max_dt);

        self.tick += 1;
        self.elapsed += dt;
        events.income = self.income.advance(dt, &mut self.treasury);

        let motion = MotionContext {
            terrain: &self.terrain,
            config: &self.config.motion,
            dt,
        };
        let combat = CombatContext {
            terrain: &self.terrain,
            config: &self.config.combat,
        };

        let director = DirectorContext {
            config: &self.config.director,
            formation_spacing: self.config.motion.formation_spacing,
            extent: self.terrain.extent(),
            dt,
        };
        self.director.update(&director, &mut self.field, self.rng.as_mut());

        let reveal = self.config.fog.reveal_radius;
        for unit in self.field.units.iter_mut() {
            if unit.cooldown > Fixed::ZERO {
                unit.cooldown -= dt;
            }
            if unit.faction == FactionId::Player && unit.is_alive() {
                self.fog.reveal_around(unit.position, reveal);
            }
            advance_gait(unit, dt);
            unit.spawn_glow = (unit.spawn_glow - dt).max(Fixed::ZERO);
        }

        seek_or_wander(
            &motion,
            &mut self.field,
            self.config.combat.auto_acquire_radius,
            self.rng.as_mut(),
        );

        advance_units(
            &motion,
            &combat,
            &mut self.field,
            &mut self.projectiles,
            self.rng.as_mut(),
            &mut events.shots,
        );

        let report = advance_projectiles(
            &combat,
            &mut self.field,
            &mut self.projectiles,
            self.config.motion.time_scale,
            dt,
        );
        for &id in &report.destroyed_structures {
            if let Some(structure) = self.field.structure(id) {
                self.stats.record_structure_destroyed(structure.faction);
            }
        }
        events.structures_destroyed = report.destroyed_structures;
        events.explosions.clone_from(&report.explosions);
        self.explosions.extend(report.explosions);
        for effect in &mut self.explosions {
            effect.remaining -= dt;
        }
        self.explosions.retain(|e| e.remaining > Fixed::ZERO);

        self.run_production(dt, &mut events);
        self.remove_dead(&mut events);

        #[cfg(feature = "debug-validation")]
        self.validate();

        if let Some((winner, reason)) = evaluate(&self.field) {
            let outcome = MatchOutcome {
                winner,
                reason,
                elapsed: self.elapsed,
                stats: self.stats,
            };
            info!(
                winner = winner.display_name(),
                ?reason,
                elapsed = %self.elapsed,
                kills = self.stats.kills,
                losses = self.stats.losses,
                "match ended"
            );
            self.outcome = Some(outcome);
            events.outcome = Some(outcome);
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(tick = self.tick, hash = self.state_hash(), "tick complete");
        }
        events
    }

    fn run_production(&mut self, dt: Fixed, events: &mut TickEvents) {
        for index in 0..self.field.structures.len() {
            let completed = process_production(&mut self.field.structures[index], dt, self.rng.as_mut());
            if let Some(done) = completed {
                let unit = self.spawn_unit(done.faction, done.kind, done.position);
                if done.faction == FactionId::Player {
                    if let Some(spawned) = self.field.units.get_mut(unit) {
                        spawned.spawn_glow = self.config.combat.spawn_glow;
                    }
                    self.stats.units_produced += 1;
                }
                events.produced.push(ProducedUnit {
                    unit,
                    structure: done.structure,
                    faction: done.faction,
                    kind: done.kind,
                });
            }

            let structure = &mut self.field.structures[index];
            structure.damage_flash = (structure.damage_flash - dt).max(Fixed::ZERO);
        }
    }

    fn remove_dead(&mut self, events: &mut TickEvents) {
        let dead = self.field.units.drain_dead();
        if dead.is_empty() {
            return;
        }

        let ids: Vec<UnitId> = dead.iter().map(|u| u.id).collect();
        for unit in &dead {
            self.stats.record_unit_death(unit.faction);
            events.deaths.push(UnitDeath {
                unit: unit.id,
                faction: unit.faction,
                kind: unit.kind,
                position: unit.position,
            });
        }

        for unit in self.field.units.iter_mut() {
            if let Some(Target::Unit(target)) = unit.target {
                if ids.contains(&target) {
                    unit.target = None;
                }
            }
        }
        for shot in &mut self.projectiles {
            if shot.shooter.is_some_and(|s| ids.contains(&s)) {
                shot.shooter = None;
            }
        }
        self.director.forget_units(&ids);
        debug!(count = ids.len(), "units removed");
    }

    fn reveal_fog(&mut self) {
        let radius = self.config.fog.reveal_radius;
        for unit in self.field.units.alive_of(FactionId::Player) {
            self.fog.reveal_around(unit.position, radius);
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) {
        for unit in self.field.units.iter() {
            debug_assert!(unit.is_alive(), "unit {:?} survived cleanup", unit.id);
            debug_assert!(unit.health.current <= unit.health.max);
            if let Some(Target::Unit(target)) = unit.target {
                debug_assert!(self.field.units.contains(target), "dangling target {target:?}");
            }
        }
        for structure in &self.field.structures {
            debug_assert!(structure.is_alive() || structure.pending_orders() == 0);
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Order player units to attack an enemy unit or structure.
    ///
    /// Returns whether any unit took the order. Move points, friendly or dead
    /// targets, and non-player units are ignored.
    pub fn command_attack(&mut self, units: &[UnitId], target: Target) -> bool {
        let valid = match target {
            Target::Unit(id) => self
                .field
                .units
                .get(id)
                .is_some_and(|u| u.is_alive() && u.faction == FactionId::Enemy),
            Target::Structure(id) => self
                .field
                .structure(id)
                .is_some_and(|s| s.is_alive() && s.faction == FactionId::Enemy),
            Target::MovePoint(_) => false,
        };
        if !valid || self.is_ended() {
            debug!(?target, "attack order ignored");
            return false;
        }

        let mut accepted = false;
        for &id in units {
            if let Some(unit) = self
                .field
                .units
                .get_mut(id)
                .filter(|u| u.faction == FactionId::Player && u.is_alive())
            {
                unit.target = Some(target);
                accepted = true;
            }
        }
        accepted
    }

    /// Move player units to `destination` in formation.
    ///
    /// Returns whether any unit took the order.
    pub fn command_move(&mut self, units: &[UnitId], destination: Vec2Fixed) -> bool {
        if self.is_ended() {
            return false;
        }
        let mut movers: Vec<UnitId> = Vec::with_capacity(units.len());
        for &id in units {
            let eligible = self
                .field
                .units
                .get(id)
                .is_some_and(|u| u.faction == FactionId::Player && u.is_alive());
            if eligible && !movers.contains(&id) {
                movers.push(id);
            }
        }
        if movers.is_empty() {
            return false;
        }
        assign_formation_move(
            &mut self.field,
            &movers,
            destination,
            self.config.motion.formation_spacing,
        );
        true
    }

    /// Queue a unit at a player structure, paying for it up front.
    ///
    /// Returns whether the order was accepted; rejections cost nothing.
    pub fn enqueue_production(&mut self, structure: StructureId, kind: UnitKind) -> bool {
        if self.is_ended() {
            return false;
        }
        match self.try_enqueue(structure, kind) {
            Ok(()) => true,
            Err(err) => {
                debug!(structure = structure.0, kind = kind.name(), %err, "production order rejected");
                false
            }
        }
    }

    fn try_enqueue(&mut self, id: StructureId, kind: UnitKind) -> Result<(), ProductionError> {
        let structure = self
            .field
            .structure_mut(id)
            .ok_or(ProductionError::UnknownStructure(id.0))?;
        if structure.faction != FactionId::Player {
            return Err(ProductionError::NotOwned(structure.faction));
        }
        queue_build(structure, kind, kind.stats().build_time, &mut self.treasury)
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Select exactly the listed player units.
    pub fn select(&mut self, ids: &[UnitId]) {
        for unit in self.field.units.iter_mut() {
            unit.selected = unit.faction == FactionId::Player && ids.contains(&unit.id);
        }
    }

    /// Select every player unit.
    pub fn select_all(&mut self) {
        for unit in self.field.units.iter_mut() {
            unit.selected = unit.faction == FactionId::Player;
        }
    }

    /// Select the player units whose bodies touch the box spanned by two
    /// corners.
    pub fn box_select(&mut self, corner_a: Vec2Fixed, corner_b: Vec2Fixed) {
        let min = Vec2Fixed::new(corner_a.x.min(corner_b.x), corner_a.y.min(corner_b.y));
        let max = Vec2Fixed::new(corner_a.x.max(corner_b.x), corner_a.y.max(corner_b.y));
        for unit in self.field.units.iter_mut() {
            let closest = Vec2Fixed::new(
                unit.position.x.max(min.x).min(max.x),
                unit.position.y.max(min.y).min(max.y),
            );
            let touches = closest.distance_squared(unit.position) <= unit.radius * unit.radius;
            unit.selected = unit.faction == FactionId::Player && touches;
        }
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        for unit in self.field.units.iter_mut() {
            unit.selected = false;
        }
    }

    /// Selected units in spawn order.
    #[must_use]
    pub fn selected_units(&self) -> Vec<UnitId> {
        self.field
            .units
            .iter()
            .filter(|u| u.selected)
            .map(|u| u.id)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Picking
    // ------------------------------------------------------------------------

    /// First living unit, optionally of one faction, whose body covers `point`.
    #[must_use]
    pub fn unit_at(&self, point: Vec2Fixed, faction: Option<FactionId>) -> Option<UnitId> {
        let padding = Fixed::from_num(PICK_PADDING);
        self.field
            .units
            .iter()
            .filter(|u| u.is_alive() && faction.map_or(true, |f| u.faction == f))
            .find(|u| {
                let reach = u.radius + padding;
                u.position.distance_squared(point) <= reach * reach
            })
            .map(|u| u.id)
    }

    /// First standing structure, optionally of one faction, whose padded
    /// footprint covers `point`.
    #[must_use]
    pub fn structure_at(&self, point: Vec2Fixed, faction: Option<FactionId>) -> Option<StructureId> {
        let pad = self.config.combat.structure_footprint_padding;
        self.field
            .structures
            .iter()
            .filter(|s| s.is_alive() && faction.map_or(true, |f| s.faction == f))
            .find(|s| s.contains(point, pad))
            .map(|s| s.id)
    }

    /// What an attack click at `point` would target: an enemy unit first,
    /// else an enemy structure.
    #[must_use]
    pub fn enemy_target_at(&self, point: Vec2Fixed) -> Option<Target> {
        self.unit_at(point, Some(FactionId::Enemy))
            .map(Target::Unit)
            .or_else(|| self.structure_at(point, Some(FactionId::Enemy)).map(Target::Structure))
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Hash of the match state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed.hash(&mut hasher);
        self.treasury.credits.hash(&mut hasher);
        self.director.treasury().credits.hash(&mut hasher);

        self.field.units.len().hash(&mut hasher);
        for unit in self.field.units.iter() {
            unit.id.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.velocity.hash(&mut hasher);
            unit.health.current.hash(&mut hasher);
            unit.cooldown.hash(&mut hasher);
            unit.target.hash(&mut hasher);
            unit.squad.hash(&mut hasher);
        }

        for structure in &self.field.structures {
            structure.health.current.hash(&mut hasher);
            structure.destroyed.hash(&mut hasher);
            structure.queue.len().hash(&mut hasher);
            structure.current.map(|o| o.remaining).hash(&mut hasher);
        }

        self.projectiles.len().hash(&mut hasher);
        for shot in &self.projectiles {
            shot.position.hash(&mut hasher);
            shot.target.hash(&mut hasher);
        }

        self.director.squads().len().hash(&mut hasher);
        self.fog.revealed_count().hash(&mut hasher);
        self.outcome.map(|o| o.winner).hash(&mut hasher);

        hasher.finish()
    }

    /// Copy the settled state for a consumer.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            elapsed: self.elapsed,
            credits: self.treasury.credits,
            enemy_credits: self.director.treasury().credits,
            units: self.field.units.iter().cloned().collect(),
            structures: self.field.structures.clone(),
            projectiles: self.projectiles.clone(),
            explosions: self.explosions.clone(),
            fog: self.fog.clone(),
            stats: self.stats,
            outcome: self.outcome,
        }
    }
}

// ============================================================================
// Unit pass
// ============================================================================

/// Move and fire every living unit, in spawn order.
///
/// Each unit is updated on a copy and written back, so later units see the
/// positions earlier units moved to this tick.
fn advance_units(
    motion: &MotionContext<'_>,
    combat: &CombatContext<'_>,
    field: &mut Battlefield,
    projectiles: &mut Vec<Projectile>,
    rng: &mut dyn RandomSource,
    shots: &mut Vec<ShotFired>,
) {
    let separation_radius = motion.config.separation_radius;
    for id in field.units.ids() {
        let Some(mut unit) = field.units.get(id).filter(|u| u.is_alive()).cloned() else {
            continue;
        };
        if unit.target.is_some_and(|t| !field.is_live(t)) {
            unit.target = None;
        }

        match unit.target {
            Some(Target::MovePoint(point)) => {
                let arrived = unit.position.distance(point) < motion.config.move_arrival_radius;
                let push = separation_force(&field.units, &unit, separation_radius);
                move_toward(motion, &mut unit, point, Some(push), None, rng);
                if arrived {
                    unit.target = None;
                }
            }
            Some(target) => {
                if let Some(shot) = engage(motion, combat, field, &mut unit, target, rng) {
                    shots.push(ShotFired {
                        shooter: unit.id,
                        faction: unit.faction,
                        weapon: unit.weapon(),
                        origin: shot.origin,
                        aim: shot.aim,
                    });
                    projectiles.push(shot);
                }
            }
            None => {
                let push = separation_force(&field.units, &unit, separation_radius);
                idle_drift(motion, &mut unit, push);
            }
        }

        resolve_collisions(motion, &mut unit);
        field.units.insert(unit);
    }
}

/// Fire at `target` when it is in range and (for rays) in sight, otherwise
/// close in. Structures are approached only up to a ring outside their hit
/// radius.
fn engage(
    motion: &MotionContext<'_>,
    combat: &CombatContext<'_>,
    field: &Battlefield,
    unit: &mut Unit,
    target: Target,
    rng: &mut dyn RandomSource,
) -> Option<Projectile> {
    let Some(aim) = field.aim_point(target) else {
        unit.target = None;
        return None;
    };
    let reach = field.engagement_radius(target);
    let in_range = (unit.position.distance(aim) - reach).max(Fixed::ZERO) <= unit.range;
    let clear = match unit.weapon() {
        WeaponKind::Lobbed => true,
        WeaponKind::Ray => motion.terrain.rifle_line_of_sight(unit.position, aim),
    };

    if in_range && clear {
        if unit.cooldown > Fixed::ZERO {
            return None;
        }
        let shot = fire(combat, field, unit, target);
        unit.cooldown = combat.config.cooldown_base + rng.next_unit() * combat.config.cooldown_jitter;
        return shot;
    }

    let stop = matches!(target, Target::Structure(_))
        .then(|| reach + unit.radius + motion.config.structure_stop_padding);
    let push = separation_force(&field.units, unit, motion.config.separation_radius);
    move_toward(motion, unit, aim, Some(push), stop, rng);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;
    use crate::rng::SequenceRandom;
    use crate::terrain::{TerrainGrid, TerrainKind};
    use crate::unit_kind::StructureKind;

    fn open_terrain() -> Terrain {
        let grid = TerrainGrid::filled(100, 66, Fixed::from_num(24), TerrainKind::Open).unwrap();
        Terrain::new(grid, Vec::new()).unwrap()
    }

    fn scripted(setup: MatchSetup) -> World {
        World::new(
            setup,
            SimConfig::default(),
            Box::new(SequenceRandom::constant(Fixed::from_num(0.5))),
        )
    }

    fn dt() -> Fixed {
        ratio(1, 32)
    }

    /// Player barracks far from an enemy stronghold, no units.
    fn bases() -> MatchSetup {
        MatchSetup::new(open_terrain())
            .with_structure(FactionId::Player, StructureKind::Barracks, 120, 1454)
            .with_structure(FactionId::Enemy, StructureKind::Stronghold, 1980, 140)
    }

    #[test]
    fn test_new_world_from_standard_setup() {
        let world = World::with_seed(MatchSetup::standard(open_terrain()), 1);
        assert_eq!(world.units().len(), 25);
        assert_eq!(world.structures().len(), 3);
        assert_eq!(world.credits(), 500);
        assert_eq!(world.director().treasury().credits, 300);
        assert_eq!(world.director().unassigned().len(), 17);
        assert_eq!(world.selected_units().len(), 8);
        assert!(world.fog().revealed_count() > 0);
        assert!(!world.is_ended());
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut world = scripted(bases().with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400));
        world.tick(Fixed::from_num(5));
        assert_eq!(world.elapsed(), world.config().motion.max_dt);
        world.tick(Fixed::from_num(-1));
        assert_eq!(world.elapsed(), world.config().motion.max_dt);
        assert_eq!(world.tick_count(), 2);
    }

    #[test]
    fn test_player_income() {
        let mut world = scripted(bases().with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400));
        let mut granted = 0;
        for _ in 0..64 {
            granted += world.tick(dt()).income;
        }
        // Exactly two seconds
        assert_eq!(granted, 10);
        assert_eq!(world.credits(), 510);
    }

    #[test]
    fn test_enqueue_production_rules() {
        let mut world = scripted(bases().with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400));
        assert!(world.enqueue_production(StructureId(0), UnitKind::Rifleman));
        assert_eq!(world.credits(), 450);
        assert!(!world.enqueue_production(StructureId(1), UnitKind::Rifleman));
        assert!(!world.enqueue_production(StructureId(9), UnitKind::Rifleman));
        assert_eq!(world.credits(), 450);
        for _ in 0..4 {
            world.enqueue_production(StructureId(0), UnitKind::Grenadier);
        }
        assert_eq!(world.credits(), 50);
        assert!(!world.enqueue_production(StructureId(0), UnitKind::Grenadier));
        assert_eq!(world.structure(StructureId(0)).unwrap().pending_orders(), 5);
    }

    #[test]
    fn test_production_spawns_with_glow() {
        let mut world = scripted(bases().with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400));
        assert!(world.enqueue_production(StructureId(0), UnitKind::Rifleman));

        let mut produced = Vec::new();
        for _ in 0..96 {
            produced.extend(world.tick(dt()).produced);
        }
        assert_eq!(produced.len(), 1);
        let unit = world.unit(produced[0].unit).unwrap();
        assert_eq!(unit.kind, UnitKind::Rifleman);
        assert!(unit.spawn_glow > Fixed::ZERO);
        assert_eq!(world.stats().units_produced, 1);
        assert_eq!(world.credits(), 460);
    }

    #[test]
    fn test_attack_command_validation() {
        let mut world = scripted(
            bases()
                .with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400)
                .with_unit(FactionId::Enemy, UnitKind::Rifleman, 1900, 500),
        );
        let player = UnitId(1);
        let enemy = UnitId(2);

        assert!(world.command_attack(&[player], Target::Unit(enemy)));
        assert_eq!(world.unit(player).unwrap().target, Some(Target::Unit(enemy)));
        assert!(world.command_attack(&[player, enemy], Target::Structure(StructureId(1))));
        assert_eq!(world.unit(enemy).unwrap().target, None);

        assert!(!world.command_attack(&[player], Target::Unit(player)));
        assert!(!world.command_attack(&[player], Target::Structure(StructureId(0))));
        assert!(!world.command_attack(&[player], Target::MovePoint(Vec2Fixed::ZERO)));
        assert!(!world.command_attack(&[enemy], Target::Unit(enemy)));
    }

    #[test]
    fn test_move_command_uses_formation() {
        let mut world = scripted(
            bases()
                .with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1390)
                .with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1410),
        );
        assert!(world.command_move(&[UnitId(1), UnitId(2), UnitId(1)], Vec2Fixed::from_num(500, 1400)));
        assert_eq!(
            world.unit(UnitId(1)).unwrap().target,
            Some(Target::MovePoint(Vec2Fixed::from_num(488, 1400)))
        );
        assert_eq!(
            world.unit(UnitId(2)).unwrap().target,
            Some(Target::MovePoint(Vec2Fixed::from_num(512, 1400)))
        );
        assert!(!world.command_move(&[UnitId(40)], Vec2Fixed::from_num(500, 1400)));
    }

    #[test]
    fn test_move_order_clears_on_arrival() {
        let mut world = scripted(bases().with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400));
        assert!(world.command_move(&[UnitId(1)], Vec2Fixed::from_num(260, 1400)));
        for _ in 0..96 {
            world.tick(dt());
        }
        let unit = world.unit(UnitId(1)).unwrap();
        assert_eq!(unit.target, None);
        // Leftover velocity bleeds off through idle damping
        assert!(unit.position.distance(Vec2Fixed::from_num(260, 1400)) < Fixed::from_num(40));
        assert!(unit.velocity.length() < Fixed::ONE);
    }

    #[test]
    fn test_selection_commands() {
        let mut world = scripted(
            bases()
                .with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400)
                .with_unit(FactionId::Player, UnitKind::Rifleman, 400, 1400)
                .with_unit(FactionId::Enemy, UnitKind::Rifleman, 210, 1400),
        );
        world.select_all();
        assert_eq!(world.selected_units(), vec![UnitId(1), UnitId(2)]);
        world.clear_selection();
        assert!(world.selected_units().is_empty());
        world.box_select(Vec2Fixed::from_num(250, 1450), Vec2Fixed::from_num(150, 1350));
        assert_eq!(world.selected_units(), vec![UnitId(1)]);
        world.select(&[UnitId(2), UnitId(3)]);
        assert_eq!(world.selected_units(), vec![UnitId(2)]);
    }

    #[test]
    fn test_picking() {
        let world = scripted(
            bases()
                .with_unit(FactionId::Player, UnitKind::Rifleman, 200, 1400)
                .with_unit(FactionId::Enemy, UnitKind::Rifleman, 1000, 600),
        );
        assert_eq!(world.unit_at(Vec2Fixed::from_num(210, 1400), None), Some(UnitId(1)));
        assert_eq!(world.unit_at(Vec2Fixed::from_num(212, 1400), None), None);
        assert_eq!(world.structure_at(Vec2Fixed::from_num(116, 1450), None), Some(StructureId(0)));
        assert_eq!(
            world.enemy_target_at(Vec2Fixed::from_num(1000, 605)),
            Some(Target::Unit(UnitId(2)))
        );
        assert_eq!(
            world.enemy_target_at(Vec2Fixed::from_num(2000, 150)),
            Some(Target::Structure(StructureId(1)))
        );
        assert_eq!(world.enemy_target_at(Vec2Fixed::from_num(200, 1400)), None);
    }

    #[test]
    fn test_elimination_ends_match_once() {
        let mut world = scripted(
            MatchSetup::new(open_terrain())
                .with_unit(FactionId::Player, UnitKind::Rifleman, 200, 200)
                .with_unit(FactionId::Enemy, UnitKind::Rifleman, 2000, 1400),
        );
        if let Some(enemy) = world.field.units.get_mut(UnitId(2)) {
            enemy.health.apply_damage(Fixed::from_num(1000));
        }

        let events = world.tick(dt());
        let outcome = events.outcome.expect("match over");
        assert!(outcome.player_won());
        assert_eq!(outcome.stats.kills, 1);
        assert_eq!(events.deaths.len(), 1);

        let after = world.tick(dt());
        assert_eq!(after, TickEvents::default());
        assert_eq!(world.tick_count(), 1);
        assert_eq!(world.dispose().map(|o| o.winner), Some(FactionId::Player));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut world = World::with_seed(MatchSetup::standard(open_terrain()), 3);
        for _ in 0..10 {
            world.tick(dt());
        }
        let snapshot = world.snapshot();
        let bytes = snapshot.encode().unwrap();
        assert_eq!(WorldSnapshot::decode(&bytes).unwrap(), snapshot);
        assert!(WorldSnapshot::decode(&bytes[..bytes.len() / 2]).is_err());
    }
}
