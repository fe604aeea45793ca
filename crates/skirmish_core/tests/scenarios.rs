//! End-to-end match scenarios.
//!
//! Every scenario steps at 1/32 s so elapsed time stays exact.

use skirmish_core::ai::DirectorContext;
use skirmish_core::battlefield::Battlefield;
use skirmish_core::combat::{explode, fire, CombatContext};
use skirmish_core::components::{BuildOrder, StructureId, Target, Unit, UnitId};
use skirmish_core::config::{CombatConfig, DirectorConfig, MotionConfig, SimConfig};
use skirmish_core::factions::FactionId;
use skirmish_core::math::{ratio, Fixed, Vec2Fixed};
use skirmish_core::projectiles::advance_projectiles;
use skirmish_core::prelude::EnemyDirector;
use skirmish_core::rng::SequenceRandom;
use skirmish_core::scenario::MatchSetup;
use skirmish_core::simulation::World;
use skirmish_core::steering::{move_toward, MotionContext};
use skirmish_core::terrain::{Terrain, TerrainGrid, TerrainKind};
use skirmish_core::unit_kind::{StructureKind, UnitKind};
use skirmish_core::victory::VictoryReason;
use skirmish_test_utils::fixtures::{duel_setup, fixed, open_map, open_terrain, point};

fn dt() -> Fixed {
    ratio(1, 32)
}

fn scripted(setup: MatchSetup, config: SimConfig) -> World {
    World::new(setup, config, Box::new(SequenceRandom::constant(ratio(1, 2))))
}

fn spawn(field: &mut Battlefield, faction: FactionId, kind: UnitKind, at: Vec2Fixed) -> UnitId {
    let id = field.units.allocate_id();
    field.units.insert(Unit::new(id, faction, kind, at, fixed(8)));
    id
}

// ============================================================================
// Combat
// ============================================================================

#[test]
fn test_rifleman_kills_in_six_hits() {
    let mut config = SimConfig::default();
    // Keep the target passive until it is shot
    config.combat.auto_acquire_radius = Fixed::ZERO;
    let mut world = scripted(duel_setup(UnitKind::Rifleman, UnitKind::Rifleman, 80), config);
    let shooter = UnitId(1);
    let target = UnitId(2);
    assert!(world.command_attack(&[shooter], Target::Unit(target)));

    let mut health = Vec::new();
    let mut shots = 0;
    let mut died = false;
    for _ in 0..400 {
        let events = world.tick(dt());
        shots += events.shots.iter().filter(|s| s.shooter == shooter).count();
        if events.deaths.iter().any(|d| d.unit == target) {
            died = true;
            break;
        }
        let hp = world.unit(target).map(|u| u.health.current).unwrap();
        if health.last() != Some(&hp) && hp != fixed(48) {
            health.push(hp);
        }
    }

    assert!(died, "target never died");
    assert_eq!(health, vec![fixed(39), fixed(30), fixed(21), fixed(12), fixed(3)]);
    assert_eq!(shots, 6);
    assert!(world.unit(target).is_none());
    assert_eq!(world.stats().kills, 1);
}

#[test]
fn test_area_damage_falloff() {
    let terrain = open_terrain(40, 40);
    let config = CombatConfig::default();
    let ctx = CombatContext {
        terrain: &terrain,
        config: &config,
    };
    let mut field = Battlefield::new();
    let half = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, point(100, 300));
    let rim = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, point(100, 335));
    let center = Vec2Fixed::new(fixed(100), Fixed::from_num(282.5));

    explode(&ctx, &mut field, center, fixed(35), fixed(25), FactionId::Player, None);

    let hp = |id| field.units.get(id).map(|u: &Unit| u.health.current).unwrap();
    assert_eq!(hp(half), Fixed::from_num(35.5));
    // 52.5 away: outside the blast
    assert_eq!(hp(rim), fixed(48));

    let edge = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, point(135, 500));
    explode(&ctx, &mut field, point(100, 500), fixed(35), fixed(25), FactionId::Player, None);
    assert_eq!(field.units.get(edge).unwrap().health.current, fixed(48));
}

#[test]
fn test_blocked_ray_never_damages() {
    let mut grid = TerrainGrid::filled(40, 40, fixed(24), TerrainKind::Open).unwrap();
    // Rock column at x 144..168
    for row in 0..40 {
        grid.set_cell(6, row, TerrainKind::Rock);
    }
    let terrain = Terrain::new(grid, Vec::new()).unwrap();
    let config = CombatConfig::default();
    let ctx = CombatContext {
        terrain: &terrain,
        config: &config,
    };
    let mut field = Battlefield::new();
    let shooter = spawn(&mut field, FactionId::Player, UnitKind::Rifleman, point(100, 100));
    let target = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, point(200, 100));

    let shooter_unit = field.units.get(shooter).cloned().unwrap();
    let mut shots = vec![fire(&ctx, &field, &shooter_unit, Target::Unit(target)).unwrap()];

    let (mut blocked, mut hits) = (0, 0);
    for _ in 0..40 {
        let report = advance_projectiles(&ctx, &mut field, &mut shots, fixed(60), dt());
        blocked += report.blocked;
        hits += report.hits;
        if shots.is_empty() {
            break;
        }
    }
    assert_eq!(blocked, 1);
    assert_eq!(hits, 0);
    assert!(shots.is_empty());
    assert_eq!(field.units.get(target).unwrap().health.current, fixed(48));
}

#[test]
fn test_rifleman_at_forest_edge_lands_hits() {
    let mut grid = TerrainGrid::filled(40, 40, fixed(24), TerrainKind::Open).unwrap();
    // Forest cell at x 96..120, y 96..120 around the shooter
    grid.set_cell(4, 4, TerrainKind::Forest);
    let setup = MatchSetup::new(Terrain::new(grid, Vec::new()).unwrap())
        .with_unit(FactionId::Player, UnitKind::Rifleman, 114, 100)
        .with_unit(FactionId::Enemy, UnitKind::Rifleman, 200, 100);
    let mut world = scripted(setup, SimConfig::default());
    let shooter = UnitId(1);
    let target = UnitId(2);
    assert!(world.command_attack(&[shooter], Target::Unit(target)));

    let mut shots = 0;
    let mut damaged = false;
    for _ in 0..200 {
        let events = world.tick(dt());
        shots += events.shots.iter().filter(|s| s.shooter == shooter).count();
        damaged = world.unit(target).map_or(true, |u| u.health.current < fixed(48));
        if damaged {
            break;
        }
    }
    assert!(shots >= 1);
    assert!(damaged, "no shot from the forest edge connected");
}

// ============================================================================
// Motion
// ============================================================================

#[test]
fn test_stop_distance_only_decays_velocity() {
    let terrain = open_terrain(40, 40);
    let config = MotionConfig::default();
    let ctx = MotionContext {
        terrain: &terrain,
        config: &config,
        dt: dt(),
    };
    let mut unit = Unit::new(UnitId(1), FactionId::Player, UnitKind::Rifleman, point(100, 100), fixed(8));
    unit.velocity = Vec2Fixed::new(Fixed::ONE, Fixed::ZERO);
    let mut rng = SequenceRandom::constant(Fixed::ZERO);

    move_toward(&ctx, &mut unit, point(130, 100), None, Some(fixed(30)), &mut rng);
    assert_eq!(unit.position, point(100, 100));
    assert_eq!(unit.velocity, Vec2Fixed::new(config.stop_ring_decay, Fixed::ZERO));

    move_toward(&ctx, &mut unit, point(130, 100), None, Some(fixed(29)), &mut rng);
    assert!(unit.position.x > fixed(100));
}

// ============================================================================
// Production
// ============================================================================

#[test]
fn test_production_queue_builds_after_three_seconds() {
    let mut config = SimConfig::default();
    config.economy.income_amount = 0;
    let setup = MatchSetup::new(open_map())
        .with_structure(FactionId::Player, StructureKind::Barracks, 120, 1454)
        .with_structure(FactionId::Enemy, StructureKind::Stronghold, 1980, 140);
    let mut world = scripted(setup, config);
    let barracks = StructureId(0);

    assert_eq!(world.credits(), 500);
    assert!(world.enqueue_production(barracks, UnitKind::Rifleman));
    assert_eq!(world.credits(), 450);
    assert_eq!(
        world.structure(barracks).unwrap().current,
        Some(BuildOrder {
            kind: UnitKind::Rifleman,
            remaining: fixed(3),
        })
    );

    for _ in 0..95 {
        assert!(world.tick(dt()).produced.is_empty());
    }
    let events = world.tick(dt());
    assert_eq!(events.produced.len(), 1);
    let unit = world.unit(events.produced[0].unit).unwrap();
    assert_eq!(unit.kind, UnitKind::Rifleman);
    assert_eq!(unit.faction, FactionId::Player);
    // Centered in front of the footprint (jitter is zero at 0.5)
    assert_eq!(unit.position, point(155, 1444));
    assert_eq!(world.credits(), 450);
    assert!(world.structure(barracks).unwrap().current.is_none());
}

#[test]
fn test_production_rejected_when_broke_or_not_a_producer() {
    let mut config = SimConfig::default();
    config.economy.starting_credits = 40;
    let setup = MatchSetup::new(open_map())
        .with_structure(FactionId::Player, StructureKind::Barracks, 120, 1454)
        .with_structure(FactionId::Player, StructureKind::Stronghold, 400, 1400)
        .with_structure(FactionId::Enemy, StructureKind::Stronghold, 1980, 140);
    let mut world = scripted(setup, config);

    assert!(!world.enqueue_production(StructureId(0), UnitKind::Rifleman));
    assert!(!world.enqueue_production(StructureId(1), UnitKind::Rifleman));
    assert_eq!(world.credits(), 40);
    assert_eq!(world.structure(StructureId(0)).unwrap().pending_orders(), 0);
}

// ============================================================================
// Director
// ============================================================================

#[test]
fn test_wiped_squad_disbands_next_pass() {
    let config = DirectorConfig::default();
    let combat = CombatConfig::default();
    let terrain = open_map();
    let mut field = Battlefield::new();
    field.structures.push(skirmish_core::components::Structure::new(
        StructureId(0),
        FactionId::Enemy,
        StructureKind::Stronghold,
        point(1980, 140),
    ));
    let mut director = EnemyDirector::new(&config);
    let a = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, point(1000, 700));
    let b = spawn(&mut field, FactionId::Enemy, UnitKind::Rifleman, point(1010, 700));
    director.enlist(a);
    director.enlist(b);

    let mut rng = SequenceRandom::constant(Fixed::ZERO);
    let ctx = DirectorContext {
        config: &config,
        formation_spacing: fixed(24),
        extent: terrain.extent(),
        dt: config.group_timer_start,
    };
    director.update(&ctx, &mut field, &mut rng);
    assert_eq!(director.squads().len(), 1);
    assert_eq!(director.squads()[0].members, vec![a, b]);

    // One blast finishes both members
    for id in [a, b] {
        field.units.get_mut(id).unwrap().health.current = fixed(5);
    }
    let combat_ctx = CombatContext {
        terrain: &terrain,
        config: &combat,
    };
    explode(&combat_ctx, &mut field, point(1005, 700), fixed(35), fixed(25), FactionId::Player, None);
    let dead: Vec<UnitId> = field.units.drain_dead().iter().map(|u| u.id).collect();
    assert_eq!(dead, vec![a, b]);
    director.forget_units(&dead);

    let next = DirectorContext { dt: dt(), ..ctx };
    director.update(&next, &mut field, &mut rng);
    assert!(director.squads().is_empty());
    assert!(director.unassigned().is_empty());
    assert_eq!(director.defense_squad(), None);
}

// ============================================================================
// Match lifecycle
// ============================================================================

#[test]
fn test_base_destroyed_wins_same_tick() {
    let mut setup = MatchSetup::new(open_map())
        .with_structure(FactionId::Player, StructureKind::Barracks, 120, 1454)
        .with_structure(FactionId::Enemy, StructureKind::Stronghold, 1980, 140)
        .with_unit(FactionId::Enemy, UnitKind::Rifleman, 200, 200);
    for i in 0..4 {
        setup = setup.with_unit(FactionId::Player, UnitKind::Grenadier, 1880 + i * 20, 320);
    }
    let mut world = scripted(setup, SimConfig::default());
    let grenadiers = [UnitId(2), UnitId(3), UnitId(4), UnitId(5)];
    assert!(world.command_attack(&grenadiers, Target::Structure(StructureId(1))));

    let mut ended = None;
    for _ in 0..2000 {
        let events = world.tick(dt());
        if let Some(outcome) = events.outcome {
            assert_eq!(events.structures_destroyed, vec![StructureId(1)]);
            ended = Some(outcome);
            break;
        }
    }

    let outcome = ended.expect("stronghold never fell");
    assert_eq!(outcome.winner, FactionId::Player);
    assert_eq!(outcome.reason, VictoryReason::BaseDestroyed);
    assert_eq!(outcome.stats.structures_destroyed, 1);
    assert!(world.unit(UnitId(1)).is_some_and(|u| u.is_alive()));

    let ticks = world.tick_count();
    assert!(world.tick(dt()).outcome.is_none());
    assert_eq!(world.tick_count(), ticks);
    assert_eq!(world.outcome(), Some(&outcome));
}

#[test]
fn test_enemy_eliminates_player() {
    let setup = MatchSetup::new(open_map())
        .with_unit(FactionId::Player, UnitKind::Rifleman, 600, 800)
        .with_unit(FactionId::Enemy, UnitKind::Grenadier, 700, 780)
        .with_unit(FactionId::Enemy, UnitKind::Grenadier, 700, 800)
        .with_unit(FactionId::Enemy, UnitKind::Grenadier, 700, 820);
    let mut world = scripted(setup, SimConfig::default());

    let mut outcome = None;
    for _ in 0..2000 {
        if let Some(done) = world.tick(dt()).outcome {
            outcome = Some(done);
            break;
        }
    }
    // Nearby enemies acquire the lone rifleman on their own
    let outcome = outcome.expect("match never ended");
    assert!(!outcome.player_won());
    assert_eq!(outcome.reason, VictoryReason::Elimination);
    assert_eq!(outcome.stats.losses, 1);
    assert!(world.units().alive_of(FactionId::Enemy).count() >= 1);
}
