//! Static terrain: the classification grid, trees, and line-of-sight queries.
//!
//! Terrain never changes during a match. All queries here are pure.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Distance between line-of-sight samples along a segment.
const SIGHT_SAMPLE_SPACING: i32 = 12;

/// Clearance added to tree radii for sight tests.
const TREE_SIGHT_MARGIN: i32 = 3;

/// Terrain classification of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open ground.
    #[default]
    Open,
    /// Forest: walkable but slow, blocks rifle sight.
    Forest,
    /// Water: impassable, transparent.
    Water,
    /// Rock: impassable and opaque.
    Rock,
}

impl TerrainKind {
    /// Decode a classification code (0 open, 1 forest, 2 water, 3 rock).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Forest),
            2 => Some(Self::Water),
            3 => Some(Self::Rock),
            _ => None,
        }
    }

    /// The classification code for this kind.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Forest => 1,
            Self::Water => 2,
            Self::Rock => 3,
        }
    }

    /// Whether units may stand on this terrain.
    #[must_use]
    pub const fn blocks_movement(self) -> bool {
        matches!(self, Self::Water | Self::Rock)
    }

    /// Whether this terrain obstructs rifle sight.
    #[must_use]
    pub const fn blocks_sight(self) -> bool {
        matches!(self, Self::Forest | Self::Rock)
    }
}

/// Row-major grid of terrain cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    #[serde(with = "fixed_serde")]
    cell_size: Fixed,
    cells: Vec<TerrainKind>,
}

impl TerrainGrid {
    /// Build a grid from cells in row-major order.
    pub fn new(width: usize, height: usize, cell_size: Fixed, cells: Vec<TerrainKind>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidTerrain(format!(
                "grid must be non-empty, got {width}x{height}"
            )));
        }
        if cell_size <= Fixed::ZERO {
            return Err(SimError::InvalidTerrain(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }
        if cells.len() != width * height {
            return Err(SimError::InvalidTerrain(format!(
                "expected {} cells for {width}x{height}, got {}",
                width * height,
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cell_size,
            cells,
        })
    }

    /// Build a grid from classification codes in row-major order.
    pub fn from_codes(width: usize, height: usize, cell_size: Fixed, codes: &[u8]) -> Result<Self> {
        let cells = codes
            .iter()
            .enumerate()
            .map(|(i, &code)| {
                TerrainKind::from_code(code).ok_or(SimError::UnknownTerrainCode {
                    code,
                    col: i % width.max(1),
                    row: i / width.max(1),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(width, height, cell_size, cells)
    }

    /// A grid of uniform terrain.
    pub fn filled(width: usize, height: usize, cell_size: Fixed, kind: TerrainKind) -> Result<Self> {
        Self::new(width, height, cell_size, vec![kind; width * height])
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    /// Cell at a column and row, if in bounds.
    #[must_use]
    pub fn cell(&self, col: usize, row: usize) -> Option<TerrainKind> {
        if col < self.width && row < self.height {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Overwrite a cell. Out-of-bounds writes are ignored.
    pub fn set_cell(&mut self, col: usize, row: usize, kind: TerrainKind) {
        if col < self.width && row < self.height {
            self.cells[row * self.width + col] = kind;
        }
    }
}

/// A circular tree obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tree {
    /// Center of the trunk.
    pub position: Vec2Fixed,
    /// Obstacle radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

impl Tree {
    /// Create a tree.
    #[must_use]
    pub const fn new(position: Vec2Fixed, radius: Fixed) -> Self {
        Self { position, radius }
    }
}

/// The static battlefield: terrain grid plus trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    grid: TerrainGrid,
    trees: Vec<Tree>,
}

impl Terrain {
    /// Combine a grid and a tree list.
    ///
    /// Trees must have positive radii.
    pub fn new(grid: TerrainGrid, trees: Vec<Tree>) -> Result<Self> {
        if let Some(tree) = trees.iter().find(|t| t.radius <= Fixed::ZERO) {
            return Err(SimError::InvalidTerrain(format!(
                "tree at ({}, {}) has non-positive radius",
                tree.position.x, tree.position.y
            )));
        }
        Ok(Self { grid, trees })
    }

    /// The classification grid.
    #[must_use]
    pub const fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// All trees.
    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Map size in world units.
    #[must_use]
    pub fn extent(&self) -> Vec2Fixed {
        Vec2Fixed::new(
            self.grid.cell_size * Fixed::from_num(self.grid.width),
            self.grid.cell_size * Fixed::from_num(self.grid.height),
        )
    }

    /// Terrain under a world point. Out of bounds reads as rock.
    #[must_use]
    pub fn terrain_at(&self, point: Vec2Fixed) -> TerrainKind {
        if point.x < Fixed::ZERO || point.y < Fixed::ZERO {
            return TerrainKind::Rock;
        }
        let col = (point.x / self.grid.cell_size).to_num::<i64>();
        let row = (point.y / self.grid.cell_size).to_num::<i64>();
        match (usize::try_from(col), usize::try_from(row)) {
            (Ok(col), Ok(row)) => self.grid.cell(col, row).unwrap_or(TerrainKind::Rock),
            _ => TerrainKind::Rock,
        }
    }

    /// Whether forest or rock lies strictly between `a` and `b`.
    ///
    /// Samples interior points every 12 units; the endpoints themselves are
    /// never tested, so a shooter standing in forest can still fire out.
    #[must_use]
    pub fn segment_blocked_by_terrain(&self, a: Vec2Fixed, b: Vec2Fixed) -> bool {
        let steps = sample_count(a.distance(b));
        (1..steps).any(|i| {
            let t = Fixed::from_num(i) / Fixed::from_num(steps);
            self.terrain_at(a.lerp(b, t)).blocks_sight()
        })
    }

    /// Whether any tree (padded by 3) touches the segment `a`..`b`.
    #[must_use]
    pub fn segment_blocked_by_trees(&self, a: Vec2Fixed, b: Vec2Fixed) -> bool {
        let dir = b - a;
        let mut len_sq = dir.dot(dir);
        if len_sq == Fixed::ZERO {
            len_sq = Fixed::ONE;
        }
        let margin = Fixed::from_num(TREE_SIGHT_MARGIN);

        self.trees.iter().any(|tree| {
            let u = ((tree.position - a).dot(dir) / len_sq).clamp(Fixed::ZERO, Fixed::ONE);
            let closest = a + dir.scale(u);
            let reach = tree.radius + margin;
            closest.distance_squared(tree.position) <= reach * reach
        })
    }

    /// Clear rifle sight: neither terrain nor trees block the segment.
    #[must_use]
    pub fn rifle_line_of_sight(&self, a: Vec2Fixed, b: Vec2Fixed) -> bool {
        !self.segment_blocked_by_terrain(a, b) && !self.segment_blocked_by_trees(a, b)
    }

    /// First tree whose trunk overlaps a circle at `point`.
    #[must_use]
    pub fn tree_overlapping(&self, point: Vec2Fixed, radius: Fixed) -> Option<&Tree> {
        self.trees.iter().find(|tree| {
            let reach = tree.radius + radius;
            point.distance_squared(tree.position) < reach * reach
        })
    }
}

fn sample_count(length: Fixed) -> i64 {
    (length / Fixed::from_num(SIGHT_SAMPLE_SPACING)).ceil().to_num::<i64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_terrain() -> Terrain {
        let grid = TerrainGrid::filled(20, 20, Fixed::from_num(24), TerrainKind::Open).unwrap();
        Terrain::new(grid, Vec::new()).unwrap()
    }

    fn v(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_num(x, y)
    }

    #[test]
    fn test_terrain_at_cells_and_bounds() {
        let mut terrain = open_terrain();
        terrain.grid.set_cell(2, 1, TerrainKind::Water);
        assert_eq!(terrain.terrain_at(v(50, 30)), TerrainKind::Water);
        assert_eq!(terrain.terrain_at(v(10, 10)), TerrainKind::Open);
        assert_eq!(terrain.terrain_at(v(-1, 10)), TerrainKind::Rock);
        assert_eq!(terrain.terrain_at(v(480, 10)), TerrainKind::Rock);
        assert_eq!(terrain.terrain_at(v(10, 480)), TerrainKind::Rock);
        assert_eq!(terrain.extent(), v(480, 480));
    }

    #[test]
    fn test_grid_validation() {
        let err = TerrainGrid::new(2, 2, Fixed::from_num(24), vec![TerrainKind::Open; 3]);
        assert!(matches!(err, Err(SimError::InvalidTerrain(_))));
        assert!(TerrainGrid::new(0, 2, Fixed::from_num(24), Vec::new()).is_err());
        assert!(TerrainGrid::from_codes(2, 1, Fixed::ONE, &[0, 9]).is_err());

        let grid = TerrainGrid::from_codes(2, 2, Fixed::ONE, &[0, 1, 2, 3]).unwrap();
        assert_eq!(grid.cell(1, 1), Some(TerrainKind::Rock));
        assert_eq!(grid.cell(1, 0), Some(TerrainKind::Forest));
        assert_eq!(grid.cell(2, 0), None);
    }

    #[test]
    fn test_tree_radius_validation() {
        let grid = TerrainGrid::filled(2, 2, Fixed::ONE, TerrainKind::Open).unwrap();
        let bad = Tree::new(v(1, 1), Fixed::ZERO);
        assert!(Terrain::new(grid, vec![bad]).is_err());
    }

    #[test]
    fn test_forest_blocks_interior_only() {
        let mut terrain = open_terrain();
        // Forest cell covering [96, 120) x [96, 120)
        terrain.grid.set_cell(4, 4, TerrainKind::Forest);
        assert!(terrain.segment_blocked_by_terrain(v(40, 100), v(200, 100)));
        assert!(!terrain.rifle_line_of_sight(v(40, 100), v(200, 100)));

        // Shooter standing inside the forest can fire out
        assert!(!terrain.segment_blocked_by_terrain(v(100, 100), v(100, 10)));
    }

    #[test]
    fn test_water_does_not_block_sight() {
        let mut terrain = open_terrain();
        for row in 0..20 {
            terrain.grid.set_cell(4, row, TerrainKind::Water);
        }
        assert!(terrain.rifle_line_of_sight(v(40, 100), v(200, 100)));
    }

    #[test]
    fn test_short_segment_never_blocked() {
        let mut terrain = open_terrain();
        terrain.grid.set_cell(0, 0, TerrainKind::Rock);
        // Length 10 -> one step -> no interior samples
        assert!(!terrain.segment_blocked_by_terrain(v(2, 2), v(12, 2)));
        assert!(!terrain.segment_blocked_by_terrain(v(5, 5), v(5, 5)));
    }

    #[test]
    fn test_tree_blocks_with_margin() {
        let grid = TerrainGrid::filled(20, 20, Fixed::from_num(24), TerrainKind::Open).unwrap();
        let tree = Tree::new(v(100, 100), Fixed::from_num(10));
        let terrain = Terrain::new(grid, vec![tree]).unwrap();

        // Passes 12 units from the trunk: within 10 + 3
        assert!(terrain.segment_blocked_by_trees(v(0, 112), v(200, 112)));
        // Passes 14 units away: clear
        assert!(!terrain.segment_blocked_by_trees(v(0, 114), v(200, 114)));
        // Tree beyond the segment end is clamped out
        assert!(!terrain.segment_blocked_by_trees(v(0, 100), v(80, 100)));
        assert!(!terrain.rifle_line_of_sight(v(0, 100), v(200, 100)));
    }

    #[test]
    fn test_tree_overlapping() {
        let grid = TerrainGrid::filled(20, 20, Fixed::from_num(24), TerrainKind::Open).unwrap();
        let terrain = Terrain::new(grid, vec![Tree::new(v(100, 100), Fixed::from_num(10))]).unwrap();
        assert!(terrain.tree_overlapping(v(115, 100), Fixed::from_num(8)).is_some());
        assert!(terrain.tree_overlapping(v(118, 100), Fixed::from_num(8)).is_none());
    }
}
