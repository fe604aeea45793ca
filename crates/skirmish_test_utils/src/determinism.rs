//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A match must be fully reproducible from its setup, configuration and seed.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`skirmish_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units live in a `BTreeMap` and are always visited in spawn order.
//!
//! - **Ambient randomness**: Every draw goes through the world's
//!   [`skirmish_core::rng::RandomSource`].
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual modules (steering, combat, director, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full matches are reproducible
//! 4. **Parallel tests**: Running N worlds on separate threads all match

use std::thread;

use skirmish_core::math::Fixed;
use skirmish_core::simulation::World;
use skirmish_core::snapshot::WorldSnapshot;
use tracing::warn;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run two identical worlds for `ticks` steps of `dt` and compare their final
/// state hashes.
///
/// # Example
///
/// ```
/// use skirmish_core::math::ratio;
/// use skirmish_test_utils::determinism::verify_world_determinism;
/// use skirmish_test_utils::fixtures::standard_world;
///
/// assert!(verify_world_determinism(|| standard_world(11), 120, ratio(1, 60)));
/// ```
pub fn verify_world_determinism<F>(setup_fn: F, ticks: u64, dt: Fixed) -> bool
where
    F: Fn() -> World,
{
    verify_determinism(
        2,
        ticks,
        &setup_fn,
        |world| {
            world.tick(dt);
        },
        World::state_hash,
    )
    .is_deterministic
}

/// Result of parallel world runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each world.
    pub hashes: Vec<u64>,
    /// Number of ticks each world ran.
    pub ticks: u64,
    /// Number of worlds run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all worlds produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all worlds matched.
    ///
    /// # Panics
    ///
    /// Panics if worlds produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N worlds on scoped threads and collect final hashes.
///
/// Each world is built on its own thread, so the setup function only needs
/// to be shareable.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_worlds<F>(setup_fn: F, num_sims: usize, num_ticks: u64, dt: Fixed) -> ParallelSimResult
where
    F: Fn() -> World + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_ticks {
                        world.tick(dt);
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two world runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// worlds start to differ.
///
/// # Returns
///
/// `None` if the worlds stay identical, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> Option<u64>
where
    F: Fn() -> World,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        warn!("worlds differ before the first tick");
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick(dt);
        second.tick(dt);

        if first.state_hash() != second.state_hash() {
            warn!(tick, "worlds diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot survives a bincode round trip unchanged.
pub fn verify_snapshot_roundtrip<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    F: Fn() -> World,
{
    let mut world = setup_fn();
    for _ in 0..num_ticks {
        world.tick(dt);
    }

    let snapshot = world.snapshot();
    let Ok(bytes) = snapshot.encode() else {
        return false;
    };
    WorldSnapshot::decode(&bytes).is_ok_and(|restored| restored == snapshot)
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::components::StructureId;
    use skirmish_core::factions::FactionId;
    use skirmish_core::math::{ratio, Fixed, Vec2Fixed};
    use skirmish_core::simulation::World;
    use skirmish_core::unit_kind::UnitKind;

    /// Generate a seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate a tick length between 1 and 40 ms (above the clamp).
    pub fn arb_dt() -> impl Strategy<Value = Fixed> {
        (1i32..=40i32).prop_map(|ms| ratio(ms, 1000))
    }

    /// Generate a point inside the fixture map margin.
    pub fn arb_map_point() -> impl Strategy<Value = Vec2Fixed> {
        (20i32..2380i32, 20i32..1564i32).prop_map(|(x, y)| Vec2Fixed::from_num(x, y))
    }

    /// Generate a unit kind.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        prop_oneof![Just(UnitKind::Rifleman), Just(UnitKind::Grenadier)]
    }

    /// Generate a faction.
    pub fn arb_faction() -> impl Strategy<Value = FactionId> {
        prop_oneof![Just(FactionId::Player), Just(FactionId::Enemy)]
    }

    /// A unit placement for a generated match.
    #[derive(Debug, Clone, Copy)]
    pub struct TestPlacement {
        /// Owner.
        pub faction: FactionId,
        /// Kind.
        pub kind: UnitKind,
        /// Spawn point.
        pub position: Vec2Fixed,
    }

    /// Generate one placement.
    pub fn arb_placement() -> impl Strategy<Value = TestPlacement> {
        (arb_faction(), arb_unit_kind(), arb_map_point()).prop_map(|(faction, kind, position)| {
            TestPlacement {
                faction,
                kind,
                position,
            }
        })
    }

    /// Generate up to `max` placements.
    pub fn arb_placements(max: usize) -> impl Strategy<Value = Vec<TestPlacement>> {
        proptest::collection::vec(arb_placement(), 1..max)
    }

    /// A host command issued between ticks.
    #[derive(Debug, Clone, Copy)]
    pub enum TestCommand {
        /// Move every selected unit.
        Move(Vec2Fixed),
        /// Attack whatever enemy is under the point.
        AttackAt(Vec2Fixed),
        /// Queue a unit at a structure.
        Produce(u32, UnitKind),
        /// Select every player unit.
        SelectAll,
        /// Box-select between two corners.
        BoxSelect(Vec2Fixed, Vec2Fixed),
    }

    impl TestCommand {
        /// Issue the command to `world`.
        pub fn apply(self, world: &mut World) {
            match self {
                Self::Move(destination) => {
                    let selected = world.selected_units();
                    world.command_move(&selected, destination);
                }
                Self::AttackAt(point) => {
                    if let Some(target) = world.enemy_target_at(point) {
                        let selected = world.selected_units();
                        world.command_attack(&selected, target);
                    }
                }
                Self::Produce(structure, kind) => {
                    world.enqueue_production(StructureId(structure), kind);
                }
                Self::SelectAll => world.select_all(),
                Self::BoxSelect(a, b) => world.box_select(a, b),
            }
        }
    }

    /// Generate any command.
    pub fn arb_command() -> impl Strategy<Value = TestCommand> {
        prop_oneof![
            arb_map_point().prop_map(TestCommand::Move),
            arb_map_point().prop_map(TestCommand::AttackAt),
            (0u32..4u32, arb_unit_kind()).prop_map(|(s, k)| TestCommand::Produce(s, k)),
            Just(TestCommand::SelectAll),
            (arb_map_point(), arb_map_point()).prop_map(|(a, b)| TestCommand::BoxSelect(a, b)),
        ]
    }

    /// Generate a sequence of commands.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<TestCommand>> {
        proptest::collection::vec(arb_command(), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel_setup, scripted_world, standard_world};
    use proptest::prelude::*;
    use skirmish_core::math::ratio;
    use skirmish_core::unit_kind::UnitKind;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_standard_world_determinism() {
        assert!(verify_world_determinism(|| standard_world(5), 300, ratio(1, 60)));
    }

    #[test]
    fn test_duel_has_no_divergence() {
        let divergence = find_first_divergence(
            || scripted_world(duel_setup(UnitKind::Rifleman, UnitKind::Grenadier, 90), 0.25),
            200,
            ratio(1, 32),
        );
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_parallel_worlds_match() {
        let result = run_parallel_worlds(|| standard_world(9), 4, 200, ratio(1, 60));
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_snapshot_roundtrip_mid_match() {
        assert!(verify_snapshot_roundtrip(|| standard_world(2), 240, ratio(1, 30)));
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = standard_world(1);
        let mut b = standard_world(2);
        for _ in 0..120 {
            a.tick(ratio(1, 60));
            b.tick(ratio(1, 60));
        }
        assert_ne!(a.state_hash(), b.state_hash());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_seeded_matches_are_reproducible(seed in strategies::arb_seed()) {
            prop_assert!(verify_world_determinism(|| standard_world(seed), 60, ratio(1, 60)));
        }
    }
}
