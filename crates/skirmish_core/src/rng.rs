//! Injectable randomness.
//!
//! Every random decision in the simulation (cooldown jitter, sidestep side,
//! spawn offsets, AI choices) draws from a [`RandomSource`] owned by the world,
//! so a seed fully determines a match and tests can script the draws.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::math::{ratio, Fixed};

/// A source of uniform draws in `[0, 1)`.
pub trait RandomSource: std::fmt::Debug {
    /// Next uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> Fixed;

    /// True with probability `p`.
    fn chance(&mut self, p: Fixed) -> bool {
        self.next_unit() < p
    }

    /// Uniform value in `[-spread/2, spread/2)`.
    fn centered(&mut self, spread: Fixed) -> Fixed {
        (self.next_unit() - ratio(1, 2)) * spread
    }
}

/// Seeded ChaCha stream.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a stream from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> Fixed {
        // 32 random bits fill exactly the fractional part
        Fixed::from_bits(i64::from(self.rng.next_u32()))
    }
}

/// Replays a fixed cycle of values. Used to script decisions in tests.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<Fixed>,
    cursor: usize,
}

impl SequenceRandom {
    /// Cycle through `values`; an empty list always yields zero.
    #[must_use]
    pub fn new(values: Vec<Fixed>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Always return the same value.
    #[must_use]
    pub fn constant(value: Fixed) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> Fixed {
        if self.values.is_empty() {
            return Fixed::ZERO;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value
    }
}
