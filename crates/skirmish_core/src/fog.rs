//! Fog of war as a monotonic reveal mask.
//!
//! The mask is a grid of square cells covering the map. A cell is revealed
//! once its center falls inside any reveal circle and is never hidden again.
//! The simulation only writes the mask; renderers read it.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, ratio, Fixed, Vec2Fixed};

/// Persistent per-cell visibility accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogMask {
    width: usize,
    height: usize,
    #[serde(with = "fixed_serde")]
    cell_size: Fixed,
    revealed: Vec<bool>,
}

impl FogMask {
    /// A fully hidden mask covering `extent` with cells of `cell_size`.
    #[must_use]
    pub fn new(extent: Vec2Fixed, cell_size: Fixed) -> Self {
        let cell_size = if cell_size > Fixed::ZERO { cell_size } else { Fixed::ONE };
        let width = cells_along(extent.x, cell_size);
        let height = cells_along(extent.y, cell_size);
        Self {
            width,
            height,
            cell_size,
            revealed: vec![false; width * height],
        }
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

    /// Cell side length in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    /// Reveal every cell whose center lies within `radius` of `center`.
    pub fn reveal_around(&mut self, center: Vec2Fixed, radius: Fixed) {
        if radius < Fixed::ZERO || self.revealed.is_empty() {
            return;
        }
        let radius_sq = radius * radius;
        let half = self.cell_size * ratio(1, 2);

        let (col_lo, col_hi) = self.span(center.x - radius, center.x + radius, self.width);
        let (row_lo, row_hi) = self.span(center.y - radius, center.y + radius, self.height);

        for row in row_lo..=row_hi {
            let cy = Fixed::from_num(row as i64) * self.cell_size + half;
            for col in col_lo..=col_hi {
                let cx = Fixed::from_num(col as i64) * self.cell_size + half;
                if Vec2Fixed::new(cx, cy).distance_squared(center) <= radius_sq {
                    self.revealed[row * self.width + col] = true;
                }
            }
        }
    }

    fn span(&self, lo: Fixed, hi: Fixed, cells: usize) -> (usize, usize) {
        let max = cells.saturating_sub(1) as i64;
        let to_cell = |v: Fixed| (v / self.cell_size).floor().to_num::<i64>().clamp(0, max) as usize;
        (to_cell(lo), to_cell(hi))
    }

    /// Whether a cell has been revealed. Out-of-range cells read as hidden.
    #[must_use]
    pub fn is_cell_revealed(&self, col: usize, row: usize) -> bool {
        col < self.width && row < self.height && self.revealed[row * self.width + col]
    }

    /// Whether the cell containing a world point has been revealed.
    #[must_use]
    pub fn is_revealed(&self, point: Vec2Fixed) -> bool {
        if point.x < Fixed::ZERO || point.y < Fixed::ZERO {
            return false;
        }
        let col = (point.x / self.cell_size).to_num::<i64>() as usize;
        let row = (point.y / self.cell_size).to_num::<i64>() as usize;
        self.is_cell_revealed(col, row)
    }

    /// Number of revealed cells.
    #[must_use]
    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|&&r| r).count()
    }

    /// Raw row-major cells for renderers.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.revealed
    }
}

fn cells_along(length: Fixed, cell_size: Fixed) -> usize {
    (length / cell_size).ceil().to_num::<i64>().max(0) as usize
}
