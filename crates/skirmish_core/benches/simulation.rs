//! Simulation benchmarks for skirmish_core.
//!
//! Run with: `cargo bench -p skirmish_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use skirmish_core::components::{StructureId, Target};
use skirmish_core::math::ratio;
use skirmish_test_utils::fixtures::standard_world;

/// Ticks of the stock skirmish, idle and with the player army attacking.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("standard_skirmish_300_ticks", |b| {
        b.iter_batched(
            || standard_world(42),
            |mut world| {
                for _ in 0..300 {
                    black_box(world.tick(ratio(1, 60)));
                }
                world.state_hash()
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("standard_skirmish_push_600_ticks", |b| {
        b.iter_batched(
            || {
                let mut world = standard_world(42);
                world.select_all();
                let army = world.selected_units();
                world.command_attack(&army, Target::Structure(StructureId(2)));
                world
            },
            |mut world| {
                for _ in 0..600 {
                    black_box(world.tick(ratio(1, 30)));
                }
                world.state_hash()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
