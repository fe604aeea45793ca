//! Test fixtures and helpers.
//!
//! Pre-built terrain, match setups and worlds for consistent testing.

use fixed::types::I32F32;
use skirmish_core::config::SimConfig;
use skirmish_core::factions::FactionId;
use skirmish_core::math::Vec2Fixed;
use skirmish_core::rng::SequenceRandom;
use skirmish_core::scenario::MatchSetup;
use skirmish_core::simulation::World;
use skirmish_core::terrain::{Terrain, TerrainGrid, TerrainKind, Tree};
use skirmish_core::unit_kind::UnitKind;

/// Cell size of fixture maps, in world units.
pub const CELL_SIZE: i32 = 24;

/// Columns of the full-size fixture maps.
pub const MAP_COLS: usize = 100;

/// Rows of the full-size fixture maps.
pub const MAP_ROWS: usize = 66;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a point from integer coordinates.
#[must_use]
pub fn point(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_num(x, y)
}

/// An all-open map with no trees.
///
/// # Panics
///
/// Panics if `cols` or `rows` is zero.
#[must_use]
pub fn open_terrain(cols: usize, rows: usize) -> Terrain {
    let grid = TerrainGrid::filled(cols, rows, fixed(CELL_SIZE), TerrainKind::Open)
        .expect("fixture grid dimensions are valid");
    Terrain::new(grid, Vec::new()).expect("fixture has no trees")
}

/// A full-size open map (2400 x 1584).
#[must_use]
pub fn open_map() -> Terrain {
    open_terrain(MAP_COLS, MAP_ROWS)
}

/// A full-size map with every terrain feature, laid out by hand.
///
/// - a north-south river at x 1200..1224, fordable at y 720..864
/// - a forest block at x 480..672, y 480..672
/// - a rock outcrop at x 1680..1776, y 1080..1176
/// - four trees in the middle of the map
///
/// Both stock base areas stay open.
///
/// # Panics
///
/// Never for the built-in layout.
#[must_use]
pub fn skirmish_map() -> Terrain {
    let mut grid = TerrainGrid::filled(MAP_COLS, MAP_ROWS, fixed(CELL_SIZE), TerrainKind::Open)
        .expect("fixture grid dimensions are valid");

    for row in 0..MAP_ROWS {
        if !(30..36).contains(&row) {
            grid.set_cell(50, row, TerrainKind::Water);
        }
    }
    for row in 20..28 {
        for col in 20..28 {
            grid.set_cell(col, row, TerrainKind::Forest);
        }
    }
    for row in 45..49 {
        for col in 70..74 {
            grid.set_cell(col, row, TerrainKind::Rock);
        }
    }

    let trees = vec![
        Tree::new(point(600, 1200), fixed(14)),
        Tree::new(point(640, 1230), fixed(12)),
        Tree::new(point(900, 900), fixed(16)),
        Tree::new(point(1500, 400), fixed(14)),
    ];
    Terrain::new(grid, trees).expect("fixture trees have positive radii")
}

/// The stock skirmish on [`skirmish_map`].
#[must_use]
pub fn standard_setup() -> MatchSetup {
    MatchSetup::standard(skirmish_map())
}

/// A seeded world running the stock skirmish.
#[must_use]
pub fn standard_world(seed: u64) -> World {
    World::with_seed(standard_setup(), seed)
}

/// A world whose every random draw returns `value`.
#[must_use]
pub fn scripted_world(setup: MatchSetup, value: f64) -> World {
    World::new(
        setup,
        SimConfig::default(),
        Box::new(SequenceRandom::constant(fixed_f(value))),
    )
}

/// Two units facing each other across open ground, `gap` apart on a
/// horizontal line. The player unit spawns first.
#[must_use]
pub fn duel_setup(player: UnitKind, enemy: UnitKind, gap: i32) -> MatchSetup {
    MatchSetup::new(open_map())
        .with_unit(FactionId::Player, player, 600, 800)
        .with_unit(FactionId::Enemy, enemy, 600 + gap, 800)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_map_layout() {
        let map = skirmish_map();
        assert_eq!(map.extent(), point(2400, 1584));
        assert_eq!(map.terrain_at(point(1210, 100)), TerrainKind::Water);
        assert_eq!(map.terrain_at(point(1210, 800)), TerrainKind::Open);
        assert_eq!(map.terrain_at(point(500, 500)), TerrainKind::Forest);
        assert_eq!(map.terrain_at(point(1700, 1100)), TerrainKind::Rock);
        assert_eq!(map.trees().len(), 4);
    }

    #[test]
    fn test_standard_placements_are_on_open_ground() {
        let setup = standard_setup();
        for unit in &setup.units {
            assert_eq!(setup.terrain.terrain_at(unit.position), TerrainKind::Open);
        }
    }
}
