//! Scripted player strategies for headless playtesting.
//!
//! A strategy plays the player side the way a person would: through the
//! world's command surface only. It never touches simulation state directly.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use skirmish_core::components::{StructureId, Target, UnitId};
use skirmish_core::factions::FactionId;
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::simulation::World;
use skirmish_core::unit_kind::UnitKind;

/// Which script drives the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Never issues an order.
    Hold,
    /// Builds riflemen and marches the army on the enemy base.
    #[default]
    Push,
}

impl StrategyKind {
    /// Short name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Push => "push",
        }
    }
}

/// What a strategy did on one decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    /// Production orders accepted.
    pub queued: u32,
    /// Move or attack orders accepted.
    pub orders: u32,
}

/// A player script with its pacing state.
#[derive(Debug, Clone)]
pub struct ScriptedPlayer {
    kind: StrategyKind,
    /// Ticks between decisions.
    interval: u64,
    next_decision: u64,
    /// Keep at most this many orders pending at the barracks.
    max_pending: usize,
    /// Visible enemies closer than this to the army are attacked.
    engage_distance: Fixed,
    /// Within this distance of the enemy base the army attacks it directly.
    siege_distance: Fixed,
}

impl ScriptedPlayer {
    /// Create a script deciding every `interval` ticks.
    #[must_use]
    pub fn new(kind: StrategyKind, interval: u64) -> Self {
        Self {
            kind,
            interval: interval.max(1),
            next_decision: 0,
            max_pending: 2,
            engage_distance: Fixed::from_num(420),
            siege_distance: Fixed::from_num(260),
        }
    }

    /// The script being played.
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Act on the world if a decision is due.
    pub fn act(&mut self, world: &mut World) -> Decision {
        let tick = world.tick_count();
        if tick < self.next_decision {
            return Decision::default();
        }
        self.next_decision = tick + self.interval;

        match self.kind {
            StrategyKind::Hold => Decision::default(),
            StrategyKind::Push => self.push(world),
        }
    }

    fn push(&self, world: &mut World) -> Decision {
        let mut decision = Decision::default();

        if let Some(barracks) = player_barracks(world) {
            let pending = world.structure(barracks).map_or(0, |s| s.pending_orders());
            if pending < self.max_pending
                && world.credits() >= UnitKind::Rifleman.stats().cost
                && world.enqueue_production(barracks, UnitKind::Rifleman)
            {
                decision.queued += 1;
            }
        }

        let army: Vec<UnitId> = world.units().alive_of(FactionId::Player).map(|u| u.id).collect();
        let Some(center) = centroid(world, &army) else {
            return decision;
        };

        let accepted = if let Some(enemy) = nearest_visible_enemy(world, center, self.engage_distance) {
            world.command_attack(&army, Target::Unit(enemy))
        } else if let Some((base, base_center)) = enemy_objective(world) {
            if center.distance(base_center) < self.siege_distance {
                world.command_attack(&army, Target::Structure(base))
            } else {
                world.command_move(&army, base_center)
            }
        } else {
            false
        };
        if accepted {
            decision.orders += 1;
        }
        decision
    }
}

fn player_barracks(world: &World) -> Option<StructureId> {
    world
        .structures()
        .iter()
        .find(|s| s.faction == FactionId::Player && s.is_alive() && s.kind.produces_units())
        .map(|s| s.id)
}

fn centroid(world: &World, ids: &[UnitId]) -> Option<Vec2Fixed> {
    if ids.is_empty() {
        return None;
    }
    let mut sum = Vec2Fixed::ZERO;
    for unit in ids.iter().filter_map(|&id| world.unit(id)) {
        sum += unit.position;
    }
    let n = Fixed::from_num(ids.len());
    Some(Vec2Fixed::new(sum.x / n, sum.y / n))
}

/// Closest revealed enemy unit; earliest spawn wins ties.
fn nearest_visible_enemy(world: &World, from: Vec2Fixed, max_distance: Fixed) -> Option<UnitId> {
    let limit = max_distance * max_distance;
    let mut best: Option<(Fixed, UnitId)> = None;
    for unit in world.units().alive_of(FactionId::Enemy) {
        if !world.fog().is_revealed(unit.position) {
            continue;
        }
        let d2 = unit.position.distance_squared(from);
        if d2 >= limit || best.is_some_and(|(b, _)| d2 >= b) {
            continue;
        }
        best = Some((d2, unit.id));
    }
    best.map(|(_, id)| id)
}

/// The enemy base if it stands, else any standing enemy structure.
fn enemy_objective(world: &World) -> Option<(StructureId, Vec2Fixed)> {
    let standing = || {
        world
            .structures()
            .iter()
            .filter(|s| s.faction == FactionId::Enemy && s.is_alive())
    };
    standing()
        .find(|s| s.kind.is_base())
        .or_else(|| standing().next())
        .map(|s| (s.id, s.center()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::math::ratio;
    use skirmish_test_utils::fixtures::standard_world;

    #[test]
    fn test_hold_never_orders() {
        let mut world = standard_world(3);
        let mut player = ScriptedPlayer::new(StrategyKind::Hold, 1);
        for _ in 0..30 {
            assert_eq!(player.act(&mut world), Decision::default());
            world.tick(ratio(1, 30));
        }
        assert_eq!(world.structure(StructureId(0)).unwrap().pending_orders(), 0);
    }

    #[test]
    fn test_push_queues_and_marches() {
        let mut world = standard_world(3);
        let mut player = ScriptedPlayer::new(StrategyKind::Push, 30);

        let decision = player.act(&mut world);
        assert_eq!(decision, Decision { queued: 1, orders: 1 });
        assert_eq!(world.credits(), 450);
        assert_eq!(world.structure(StructureId(0)).unwrap().pending_orders(), 1);

        // The army marches on the enemy stronghold
        for unit in world.units().alive_of(FactionId::Player) {
            assert!(matches!(unit.target, Some(Target::MovePoint(_))));
        }
    }

    #[test]
    fn test_push_waits_for_interval() {
        let mut world = standard_world(3);
        let mut player = ScriptedPlayer::new(StrategyKind::Push, 30);
        player.act(&mut world);
        world.tick(ratio(1, 30));
        assert_eq!(player.act(&mut world), Decision::default());
    }

    #[test]
    fn test_push_respects_pending_cap() {
        let mut world = standard_world(3);
        let mut player = ScriptedPlayer::new(StrategyKind::Push, 1);
        for _ in 0..3 {
            player.act(&mut world);
            world.tick(ratio(1, 60));
        }
        assert_eq!(world.structure(StructureId(0)).unwrap().pending_orders(), 2);
        assert_eq!(world.credits(), 400);
    }
}
