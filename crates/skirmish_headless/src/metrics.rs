//! Match metrics collection and the JSON report.

use std::path::Path;

use serde::{Deserialize, Serialize};

use skirmish_core::factions::FactionId;
use skirmish_core::simulation::{TickEvents, World};
use skirmish_core::unit_kind::WeaponKind;
use skirmish_core::victory::{MatchStats, VictoryReason};

use crate::error::Result;
use crate::maps::MapKind;
use crate::strategies::{Decision, StrategyKind};

/// Kind of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A player unit died.
    UnitLost,
    /// An enemy unit died.
    EnemyKilled,
    /// A structure completed a unit.
    UnitProduced,
    /// A structure was destroyed.
    StructureDestroyed,
}

/// An event with the tick it happened on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Tick number.
    pub tick: u64,
    /// What happened.
    pub event_type: EventType,
    /// Faction the event belongs to.
    pub faction: FactionId,
    /// Free-form detail.
    pub details: String,
}

/// Per-faction shot counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireCounters {
    /// Rifle rays fired.
    pub rays: u32,
    /// Grenades lobbed.
    pub grenades: u32,
}

/// Everything reported about one headless match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Random seed used.
    pub seed: u64,
    /// Player script.
    pub strategy: StrategyKind,
    /// Map played.
    pub map: MapKind,
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulated seconds.
    pub elapsed_seconds: f64,
    /// Winning faction; `None` if the time limit hit first.
    pub winner: Option<FactionId>,
    /// How the match was decided.
    pub reason: Option<VictoryReason>,
    /// Whether the time limit ended the run.
    pub timed_out: bool,
    /// Simulation counters.
    pub stats: MatchStats,
    /// Player credits at the end.
    pub final_credits: i32,
    /// Total credits granted by income.
    pub income_collected: i64,
    /// Living player units at the end.
    pub player_units: usize,
    /// Living enemy units at the end.
    pub enemy_units: usize,
    /// Player shots.
    pub player_fire: FireCounters,
    /// Enemy shots.
    pub enemy_fire: FireCounters,
    /// Production orders the script placed.
    pub units_queued: u32,
    /// Move and attack orders the script placed.
    pub orders_issued: u32,
    /// Notable events in order.
    pub events: Vec<TimedEvent>,
    /// Final simulation state hash.
    pub final_state_hash: u64,
}

impl MatchReport {
    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Accumulates tick events into a [`MatchReport`].
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    player_fire: FireCounters,
    enemy_fire: FireCounters,
    income_collected: i64,
    units_queued: u32,
    orders_issued: u32,
    events: Vec<TimedEvent>,
}

impl MetricsCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in what the script did.
    pub fn record_decision(&mut self, decision: Decision) {
        self.units_queued += decision.queued;
        self.orders_issued += decision.orders;
    }

    /// Fold in one tick's events.
    pub fn record_tick(&mut self, tick: u64, events: &TickEvents, world: &World) {
        self.income_collected += i64::from(events.income);

        for shot in &events.shots {
            let counters = match shot.faction {
                FactionId::Player => &mut self.player_fire,
                FactionId::Enemy => &mut self.enemy_fire,
            };
            match shot.weapon {
                WeaponKind::Ray => counters.rays += 1,
                WeaponKind::Lobbed => counters.grenades += 1,
            }
        }

        for death in &events.deaths {
            let event_type = match death.faction {
                FactionId::Player => EventType::UnitLost,
                FactionId::Enemy => EventType::EnemyKilled,
            };
            self.events.push(TimedEvent {
                tick,
                event_type,
                faction: death.faction,
                details: format!("{} #{}", death.kind.name(), death.unit.0),
            });
        }

        for produced in &events.produced {
            self.events.push(TimedEvent {
                tick,
                event_type: EventType::UnitProduced,
                faction: produced.faction,
                details: format!("{} #{}", produced.kind.name(), produced.unit.0),
            });
        }

        for &id in &events.structures_destroyed {
            if let Some(structure) = world.structure(id) {
                self.events.push(TimedEvent {
                    tick,
                    event_type: EventType::StructureDestroyed,
                    faction: structure.faction,
                    details: structure.kind.name().to_string(),
                });
            }
        }
    }

    /// Build the final report from the collected counters and the world.
    #[must_use]
    pub fn finish(self, world: &World, seed: u64, strategy: StrategyKind, map: MapKind) -> MatchReport {
        let outcome = world.outcome();
        MatchReport {
            seed,
            strategy,
            map,
            ticks: world.tick_count(),
            elapsed_seconds: world.elapsed().to_num::<f64>(),
            winner: outcome.map(|o| o.winner),
            reason: outcome.map(|o| o.reason),
            timed_out: outcome.is_none(),
            stats: *world.stats(),
            final_credits: world.credits(),
            income_collected: self.income_collected,
            player_units: world.units().alive_of(FactionId::Player).count(),
            enemy_units: world.units().alive_of(FactionId::Enemy).count(),
            player_fire: self.player_fire,
            enemy_fire: self.enemy_fire,
            units_queued: self.units_queued,
            orders_issued: self.orders_issued,
            events: self.events,
            final_state_hash: world.state_hash(),
        }
    }
}
