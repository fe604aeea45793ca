//! Formation planning for group moves.
//!
//! A group is laid out on a near-square grid centered on the destination and
//! turned so its front faces the direction of travel.

use crate::battlefield::Battlefield;
use crate::components::{Target, UnitId};
use crate::math::{ratio, Fixed, Vec2Fixed};

/// Assign each member a slot around `destination`.
///
/// `members` are `(id, position)` pairs; the returned slots keep their order.
/// The grid has `ceil(sqrt(n))` columns and `ceil(n / cols)` rows, spaced
/// `spacing` apart, rotated so its x axis points from the group centroid to
/// the destination.
#[must_use]
pub fn plan_formation(
    members: &[(UnitId, Vec2Fixed)],
    destination: Vec2Fixed,
    spacing: Fixed,
) -> Vec<(UnitId, Vec2Fixed)> {
    if members.is_empty() {
        return Vec::new();
    }

    let n = members.len();
    let count = Fixed::from_num(n as i64);
    let mut sum = Vec2Fixed::ZERO;
    for &(_, position) in members {
        sum += position;
    }
    let centroid = Vec2Fixed::new(sum.x / count, sum.y / count);

    let mut facing = (destination - centroid).normalize();
    if facing.is_zero() {
        facing = Vec2Fixed::new(Fixed::ONE, Fixed::ZERO);
    }

    let cols = ceil_sqrt(n);
    let rows = n.div_ceil(cols);
    let half_cols = Fixed::from_num((cols - 1) as i64) * ratio(1, 2);
    let half_rows = Fixed::from_num((rows - 1) as i64) * ratio(1, 2);

    members
        .iter()
        .enumerate()
        .map(|(slot, &(id, _))| {
            let col = Fixed::from_num((slot % cols) as i64);
            let row = Fixed::from_num((slot / cols) as i64);
            let offset = Vec2Fixed::new((col - half_cols) * spacing, (row - half_rows) * spacing);
            (id, destination + offset.rotate(facing.x, facing.y))
        })
        .collect()
}

/// Give each listed unit a move order to its formation slot.
///
/// Units that no longer exist are skipped and do not take up a slot.
pub fn assign_formation_move(field: &mut Battlefield, ids: &[UnitId], destination: Vec2Fixed, spacing: Fixed) {
    let members: Vec<(UnitId, Vec2Fixed)> = ids
        .iter()
        .filter_map(|&id| field.units.get(id).filter(|u| u.is_alive()).map(|u| (id, u.position)))
        .collect();
    for (id, slot) in plan_formation(&members, destination, spacing) {
        if let Some(unit) = field.units.get_mut(id) {
            unit.target = Some(Target::MovePoint(slot));
        }
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = 1;
    while root * root < n {
        root += 1;
    }
    root
}
