//! Built-in battle maps.
//!
//! Both maps are 100 x 66 cells of 24 units and keep the stock base areas
//! (bottom-left for the player, top-right for the enemy) on open ground.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use skirmish_core::error::Result;
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::terrain::{Terrain, TerrainGrid, TerrainKind, Tree};

const COLS: usize = 100;
const ROWS: usize = 66;
const CELL: i32 = 24;

/// Which map a headless match is played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    /// Open ground everywhere.
    Open,
    /// A diagonal river with two fords, woods and a few trees.
    #[default]
    River,
}

impl MapKind {
    /// Short name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::River => "river",
        }
    }

    /// Build the terrain.
    pub fn build(self) -> Result<Terrain> {
        match self {
            Self::Open => open(),
            Self::River => river(),
        }
    }
}

fn open() -> Result<Terrain> {
    let grid = TerrainGrid::filled(COLS, ROWS, Fixed::from_num(CELL), TerrainKind::Open)?;
    Terrain::new(grid, Vec::new())
}

fn river() -> Result<Terrain> {
    let mut grid = TerrainGrid::filled(COLS, ROWS, Fixed::from_num(CELL), TerrainKind::Open)?;

    // Two cells wide, drifting one column east every six rows
    for row in 0..ROWS {
        let fordable = (12..17).contains(&row) || (44..50).contains(&row);
        if fordable {
            continue;
        }
        let col = 44 + row / 6;
        grid.set_cell(col, row, TerrainKind::Water);
        grid.set_cell(col + 1, row, TerrainKind::Water);
    }

    for row in 24..31 {
        for col in 26..33 {
            grid.set_cell(col, row, TerrainKind::Forest);
        }
    }
    for row in 52..56 {
        for col in 62..66 {
            grid.set_cell(col, row, TerrainKind::Rock);
        }
    }

    let trees = [(760, 1000, 14), (800, 1030, 12), (1500, 640, 16), (1560, 600, 13)]
        .into_iter()
        .map(|(x, y, r)| Tree::new(Vec2Fixed::from_num(x, y), Fixed::from_num(r)))
        .collect();
    Terrain::new(grid, trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::scenario::MatchSetup;

    #[test]
    fn test_maps_share_extent() {
        for kind in [MapKind::Open, MapKind::River] {
            let terrain = kind.build().unwrap();
            assert_eq!(terrain.extent(), Vec2Fixed::from_num(2400, 1584));
        }
    }

    #[test]
    fn test_river_has_fords() {
        let terrain = MapKind::River.build().unwrap();
        // Row 0 river at cols 44..46, ford rows 12..17 at col 46
        assert_eq!(terrain.terrain_at(Vec2Fixed::from_num(44 * 24 + 5, 5)), TerrainKind::Water);
        assert_eq!(terrain.terrain_at(Vec2Fixed::from_num(46 * 24 + 5, 14 * 24 + 5)), TerrainKind::Open);
        assert_eq!(terrain.trees().len(), 4);
    }

    #[test]
    fn test_stock_placements_on_open_ground() {
        for kind in [MapKind::Open, MapKind::River] {
            let setup = MatchSetup::standard(kind.build().unwrap());
            for unit in &setup.units {
                assert_eq!(setup.terrain.terrain_at(unit.position), TerrainKind::Open);
            }
        }
    }
}
