//! Match statistics and victory evaluation.

use serde::{Deserialize, Serialize};

use crate::battlefield::Battlefield;
use crate::factions::FactionId;
use crate::math::{fixed_serde, Fixed};

/// Aggregate counters reported when a match ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    /// Enemy units killed.
    pub kills: u32,
    /// Player units lost.
    pub losses: u32,
    /// Player structures destroyed.
    pub structures_lost: u32,
    /// Enemy structures destroyed.
    pub structures_destroyed: u32,
    /// Units completed by player structures.
    pub units_produced: u32,
}

impl MatchStats {
    /// Count a structure destruction against its owner.
    pub fn record_structure_destroyed(&mut self, owner: FactionId) {
        match owner {
            FactionId::Player => self.structures_lost += 1,
            FactionId::Enemy => self.structures_destroyed += 1,
        }
    }

    /// Count a unit death against its owner.
    pub fn record_unit_death(&mut self, owner: FactionId) {
        match owner {
            FactionId::Player => self.losses += 1,
            FactionId::Enemy => self.kills += 1,
        }
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VictoryReason {
    /// The loser's base structure was destroyed.
    BaseDestroyed,
    /// The loser had no living units and no standing structures.
    Elimination,
}

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Winning faction.
    pub winner: FactionId,
    /// How the match was decided.
    pub reason: VictoryReason,
    /// Simulated seconds at the end.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Counters at the end.
    pub stats: MatchStats,
}

impl MatchOutcome {
    /// Whether the player won.
    #[must_use]
    pub fn player_won(&self) -> bool {
        self.winner == FactionId::Player
    }
}

/// Decide whether the match is over.
///
/// A destroyed base ends the match at once, checked for the player first.
/// Otherwise a faction with no living units and no standing structures
/// loses; if both are wiped out together the player loses.
#[must_use]
pub fn evaluate(field: &Battlefield) -> Option<(FactionId, VictoryReason)> {
    for faction in [FactionId::Player, FactionId::Enemy] {
        if field.base_of(faction).is_some_and(|base| !base.is_alive()) {
            return Some((faction.opponent(), VictoryReason::BaseDestroyed));
        }
    }
    for faction in [FactionId::Player, FactionId::Enemy] {
        if is_eliminated(field, faction) {
            return Some((faction.opponent(), VictoryReason::Elimination));
        }
    }
    None
}

fn is_eliminated(field: &Battlefield, faction: FactionId) -> bool {
    field.units.alive_of(faction).next().is_none() && field.structures_of(faction).next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Structure, StructureId, Unit};
    use crate::math::Vec2Fixed;
    use crate::unit_kind::{StructureKind, UnitKind};

    fn field_with(structures: &[(FactionId, StructureKind)], units: &[FactionId]) -> Battlefield {
        let mut field = Battlefield::new();
        for (i, &(faction, kind)) in structures.iter().enumerate() {
            field.structures.push(Structure::new(
                StructureId(i as u32),
                faction,
                kind,
                Vec2Fixed::from_num(i as i32 * 200, 0),
            ));
        }
        for &faction in units {
            let id = field.units.allocate_id();
            field.units.insert(Unit::new(id, faction, UnitKind::Rifleman, Vec2Fixed::ZERO, Fixed::from_num(8)));
        }
        field
    }

    #[test]
    fn test_ongoing_match() {
        let field = field_with(
            &[
                (FactionId::Player, StructureKind::Barracks),
                (FactionId::Enemy, StructureKind::Stronghold),
            ],
            &[FactionId::Player, FactionId::Enemy],
        );
        assert_eq!(evaluate(&field), None);
    }

    #[test]
    fn test_base_destroyed_wins_despite_survivors() {
        let mut field = field_with(
            &[
                (FactionId::Player, StructureKind::Barracks),
                (FactionId::Enemy, StructureKind::Stronghold),
                (FactionId::Enemy, StructureKind::Barracks),
            ],
            &[FactionId::Enemy, FactionId::Enemy],
        );
        field.structures[1].destroyed = true;
        assert_eq!(
            evaluate(&field),
            Some((FactionId::Player, VictoryReason::BaseDestroyed))
        );
    }

    #[test]
    fn test_elimination_needs_units_and_structures_gone() {
        let mut field = field_with(&[(FactionId::Player, StructureKind::Barracks)], &[FactionId::Enemy]);
        assert_eq!(evaluate(&field), None);

        field.structures[0].destroyed = true;
        assert_eq!(
            evaluate(&field),
            Some((FactionId::Enemy, VictoryReason::Elimination))
        );
    }

    #[test]
    fn test_mutual_elimination_is_a_defeat() {
        let field = field_with(&[], &[]);
        assert_eq!(
            evaluate(&field),
            Some((FactionId::Enemy, VictoryReason::Elimination))
        );
    }

    #[test]
    fn test_stats_bookkeeping() {
        let mut stats = MatchStats::default();
        stats.record_unit_death(FactionId::Player);
        stats.record_unit_death(FactionId::Enemy);
        stats.record_unit_death(FactionId::Enemy);
        stats.record_structure_destroyed(FactionId::Enemy);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.kills, 2);
        assert_eq!(stats.structures_destroyed, 1);
        assert_eq!(stats.structures_lost, 0);
    }
}
