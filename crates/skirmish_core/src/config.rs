//! Tuning configuration for the simulation.
//!
//! Every gameplay constant lives here rather than inline in the systems, so a
//! host can load overrides from RON. `Default` is the canonical tuning.
//!
//! Distances are in world units, durations in seconds, and speeds in world
//! units per 1/60 s (see [`MotionConfig::time_scale`]).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::{fixed_decimal, ratio, Fixed};

/// Complete simulation tuning.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Steering and movement.
    pub motion: MotionConfig,
    /// Weapons, projectiles and damage reactions.
    pub combat: CombatConfig,
    /// Player income.
    pub economy: EconomyConfig,
    /// Enemy AI director.
    pub director: DirectorConfig,
    /// Fog of war.
    pub fog: FogConfig,
}

impl SimConfig {
    /// Parse a configuration from RON text.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_ron(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text)?;
        Ok(config)
    }

    /// Serialize the configuration to pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| crate::error::SimError::ConfigParse(e.to_string()))
    }
}

/// Steering and movement constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Frames per second that unit speeds are expressed against.
    #[serde(with = "fixed_decimal")]
    pub time_scale: Fixed,
    /// Largest step accepted by a single tick.
    #[serde(with = "fixed_decimal")]
    pub max_dt: Fixed,
    /// Collision radius of every unit.
    #[serde(with = "fixed_decimal")]
    pub unit_radius: Fixed,
    /// Neighbours closer than this push each other apart.
    #[serde(with = "fixed_decimal")]
    pub separation_radius: Fixed,
    /// Strength of the separation push.
    #[serde(with = "fixed_decimal")]
    pub separation_force: Fixed,
    /// Divisor applied to the separation push while steering to a goal.
    #[serde(with = "fixed_decimal")]
    pub separation_steer_divisor: Fixed,
    /// Blended steering velocity is capped at this multiple of unit speed.
    #[serde(with = "fixed_decimal")]
    pub separation_blend_clamp: Fixed,
    /// Velocity multiplier when the next step lands in forest.
    #[serde(with = "fixed_decimal")]
    pub forest_slow: Fixed,
    /// Sidestep speed as a multiple of unit speed.
    #[serde(with = "fixed_decimal")]
    pub sidestep_factor: Fixed,
    /// Extra gap kept outside a structure's hit ring.
    #[serde(with = "fixed_decimal")]
    pub structure_stop_padding: Fixed,
    /// Velocity decay inside a structure's stop ring.
    #[serde(with = "fixed_decimal")]
    pub stop_ring_decay: Fixed,
    /// Velocity damping for units without a target.
    #[serde(with = "fixed_decimal")]
    pub idle_damping: Fixed,
    /// A move order completes within this distance of its point.
    #[serde(with = "fixed_decimal")]
    pub move_arrival_radius: Fixed,
    /// Units are kept this far inside the map edge.
    #[serde(with = "fixed_decimal")]
    pub map_margin: Fixed,
    /// Extra distance added when pushing a unit out of a tree.
    #[serde(with = "fixed_decimal")]
    pub tree_push_epsilon: Fixed,
    /// Gap between neighbouring slots in a formation.
    #[serde(with = "fixed_decimal")]
    pub formation_spacing: Fixed,
    /// Total spread of the per-tick wander heading change.
    #[serde(with = "fixed_decimal")]
    pub wander_jitter: Fixed,
    /// Wander speed in world units per 1/60 s.
    #[serde(with = "fixed_decimal")]
    pub wander_speed: Fixed,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            time_scale: Fixed::from_num(60),
            max_dt: ratio(33, 1000),
            unit_radius: Fixed::from_num(8),
            separation_radius: Fixed::from_num(18),
            separation_force: Fixed::from_num(65),
            separation_steer_divisor: Fixed::from_num(100),
            separation_blend_clamp: ratio(5, 4),
            forest_slow: ratio(3, 4),
            sidestep_factor: ratio(85, 100),
            structure_stop_padding: Fixed::from_num(4),
            stop_ring_decay: ratio(6, 10),
            idle_damping: ratio(9, 10),
            move_arrival_radius: Fixed::from_num(6),
            map_margin: Fixed::from_num(8),
            tree_push_epsilon: ratio(1, 10),
            formation_spacing: Fixed::from_num(24),
            wander_jitter: ratio(2, 10),
            wander_speed: ratio(6, 10),
        }
    }
}

/// Weapon, projectile and reaction constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Minimum weapon cooldown after a shot.
    #[serde(with = "fixed_decimal")]
    pub cooldown_base: Fixed,
    /// Random extra cooldown, scaled by a unit draw.
    #[serde(with = "fixed_decimal")]
    pub cooldown_jitter: Fixed,
    /// Allies within this distance of a victim respond to the attacker.
    #[serde(with = "fixed_decimal")]
    pub reaction_radius: Fixed,
    /// Defenders within this distance of a struck structure respond.
    #[serde(with = "fixed_decimal")]
    pub defender_alert_radius: Fixed,
    /// Idle enemy units pick targets within this distance.
    #[serde(with = "fixed_decimal")]
    pub auto_acquire_radius: Fixed,
    /// Duration of a structure's hit flash.
    #[serde(with = "fixed_decimal")]
    pub damage_flash: Fixed,
    /// Duration of the glow on newly produced player units.
    #[serde(with = "fixed_decimal")]
    pub spawn_glow: Fixed,
    /// Ray projectile speed per 1/60 s.
    #[serde(with = "fixed_decimal")]
    pub ray_speed: Fixed,
    /// Ray projectile lifetime.
    #[serde(with = "fixed_decimal")]
    pub ray_lifetime: Fixed,
    /// Added to a unit's radius when testing ray hits.
    #[serde(with = "fixed_decimal")]
    pub ray_hit_padding: Fixed,
    /// Padding around a structure footprint when testing ray hits.
    #[serde(with = "fixed_decimal")]
    pub structure_footprint_padding: Fixed,
    /// Shortest lobbed flight time.
    #[serde(with = "fixed_decimal")]
    pub lobbed_min_flight: Fixed,
    /// Longest lobbed flight time.
    #[serde(with = "fixed_decimal")]
    pub lobbed_max_flight: Fixed,
    /// Distance covered per extra second of lobbed flight.
    #[serde(with = "fixed_decimal")]
    pub lobbed_flight_distance: Fixed,
    /// Area damage radius of lobbed shots.
    #[serde(with = "fixed_decimal")]
    pub blast_radius: Fixed,
    /// Apex height at zero distance.
    #[serde(with = "fixed_decimal")]
    pub apex_base: Fixed,
    /// Apex height added per unit of distance.
    #[serde(with = "fixed_decimal")]
    pub apex_per_distance: Fixed,
    /// Apex height cap.
    #[serde(with = "fixed_decimal")]
    pub apex_max: Fixed,
    /// Lifetime of an explosion event.
    #[serde(with = "fixed_decimal")]
    pub explosion_lifetime: Fixed,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            cooldown_base: ratio(1, 2),
            cooldown_jitter: ratio(2, 10),
            reaction_radius: Fixed::from_num(150),
            defender_alert_radius: Fixed::from_num(260),
            auto_acquire_radius: Fixed::from_num(190),
            damage_flash: ratio(18, 100),
            spawn_glow: ratio(16, 10),
            ray_speed: ratio(55, 10),
            ray_lifetime: ratio(6, 10),
            ray_hit_padding: Fixed::from_num(3),
            structure_footprint_padding: Fixed::from_num(6),
            lobbed_min_flight: ratio(55, 100),
            lobbed_max_flight: ratio(12, 10),
            lobbed_flight_distance: Fixed::from_num(600),
            blast_radius: Fixed::from_num(35),
            apex_base: Fixed::from_num(18),
            apex_per_distance: ratio(18, 100),
            apex_max: Fixed::from_num(90),
            explosion_lifetime: ratio(3, 10),
        }
    }
}

/// Player economy constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Credits at match start.
    pub starting_credits: i32,
    /// Credits granted per income interval.
    pub income_amount: i32,
    /// Seconds between income grants.
    #[serde(with = "fixed_decimal")]
    pub income_interval: Fixed,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_credits: 500,
            income_amount: 10,
            income_interval: Fixed::from_num(2),
        }
    }
}

/// How a squad treats its current target while it remains alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetPolicy {
    /// Keep the current target until it dies or leaves the leash radius.
    #[default]
    Sticky,
    /// Switch to the nearest player unit every tick.
    Reevaluate,
}

/// Enemy AI director constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Director credits at match start.
    pub starting_credits: i32,
    /// Credits granted per income interval.
    pub income_amount: i32,
    /// Seconds between income grants.
    #[serde(with = "fixed_decimal")]
    pub income_interval: Fixed,
    /// Seconds between production attempts.
    #[serde(with = "fixed_decimal")]
    pub production_interval: Fixed,
    /// Production timer value at match start.
    #[serde(with = "fixed_decimal")]
    pub production_timer_start: Fixed,
    /// The director never queues past this many orders per barracks.
    pub queue_limit: usize,
    /// Probability of choosing a rifleman over a grenadier.
    #[serde(with = "fixed_decimal")]
    pub rifleman_weight: Fixed,
    /// Multiplier on base build time for enemy orders.
    #[serde(with = "fixed_decimal")]
    pub build_time_multiplier: Fixed,
    /// Fraction of the interval to wait after failing for lack of credits.
    #[serde(with = "fixed_decimal")]
    pub broke_retry_fraction: Fixed,
    /// Fraction of the interval to wait after finding the queue full.
    #[serde(with = "fixed_decimal")]
    pub full_retry_fraction: Fixed,
    /// Seconds between squad formation attempts.
    #[serde(with = "fixed_decimal")]
    pub group_interval: Fixed,
    /// Group timer value at match start.
    #[serde(with = "fixed_decimal")]
    pub group_timer_start: Fixed,
    /// Smallest squad that is formed or kept.
    pub min_squad_size: usize,
    /// Largest squad that is formed.
    pub max_squad_size: usize,
    /// Squads engage player units within this distance of their centroid.
    #[serde(with = "fixed_decimal")]
    pub engage_radius: Fixed,
    /// How a squad treats a target it already has.
    pub target_policy: TargetPolicy,
    /// Sticky targets are dropped beyond this multiple of the engage radius.
    #[serde(with = "fixed_decimal")]
    pub target_leash: Fixed,
    /// A waypoint is reached within this distance of the centroid.
    #[serde(with = "fixed_decimal")]
    pub waypoint_arrival: Fixed,
    /// Seconds a squad may pursue one waypoint before re-planning.
    #[serde(with = "fixed_decimal")]
    pub replan_interval: Fixed,
    /// Chance of searching locally instead of toward the player.
    #[serde(with = "fixed_decimal")]
    pub local_search_chance: Fixed,
    /// Horizontal spread of the player-biased search point.
    #[serde(with = "fixed_decimal")]
    pub search_spread_x: Fixed,
    /// Vertical spread of the player-biased search point.
    #[serde(with = "fixed_decimal")]
    pub search_spread_y: Fixed,
    /// Spread of the local search point on both axes.
    #[serde(with = "fixed_decimal")]
    pub local_search_spread: Fixed,
    /// Radius of the defensive patrol ring around the base.
    #[serde(with = "fixed_decimal")]
    pub patrol_radius: Fixed,
    /// Number of points on the patrol ring.
    pub patrol_points: usize,
    /// The defensive squad converges when a player unit comes this close to the base.
    #[serde(with = "fixed_decimal")]
    pub base_alert_radius: Fixed,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            starting_credits: 300,
            income_amount: 8,
            income_interval: ratio(35, 10),
            production_interval: ratio(56, 10),
            production_timer_start: ratio(25, 10),
            queue_limit: 2,
            rifleman_weight: ratio(68, 100),
            build_time_multiplier: ratio(135, 100),
            broke_retry_fraction: ratio(45, 100),
            full_retry_fraction: ratio(1, 2),
            group_interval: Fixed::from_num(4),
            group_timer_start: Fixed::from_num(5),
            min_squad_size: 2,
            max_squad_size: 5,
            engage_radius: Fixed::from_num(420),
            target_policy: TargetPolicy::Sticky,
            target_leash: ratio(5, 4),
            waypoint_arrival: Fixed::from_num(60),
            replan_interval: Fixed::from_num(12),
            local_search_chance: ratio(3, 10),
            search_spread_x: Fixed::from_num(480),
            search_spread_y: Fixed::from_num(360),
            local_search_spread: Fixed::from_num(520),
            patrol_radius: Fixed::from_num(200),
            patrol_points: 6,
            base_alert_radius: Fixed::from_num(380),
        }
    }
}

/// Fog of war constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Side length of one fog cell in world units.
    #[serde(with = "fixed_decimal")]
    pub cell_size: Fixed,
    /// Radius revealed around each living player unit.
    #[serde(with = "fixed_decimal")]
    pub reveal_radius: Fixed,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            cell_size: Fixed::from_num(8),
            reveal_radius: Fixed::from_num(100),
        }
    }
}
