//! Random shock sources for path generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// A source of independent standard-normal draws.
///
/// Every `rand::Rng` is a source. Each concurrent simulation must own its
/// own source; nothing in the engine shares one across runs.
pub trait NormalSource {
    /// Draw the next value from N(0, 1).
    fn next_standard_normal(&mut self) -> f64;
}

impl<R: Rng + ?Sized> NormalSource for R {
    fn next_standard_normal(&mut self) -> f64 {
        self.sample(StandardNormal)
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// An empty list behaves as a constant zero shock.
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    draws: Vec<f64>,
    cursor: usize,
}

impl SequenceSource {
    /// Replay `draws` in order.
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, cursor: 0 }
    }

    /// A source that always yields zero.
    pub fn zeros() -> Self {
        Self::default()
    }
}

impl NormalSource for SequenceSource {
    fn next_standard_normal(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}

/// Build a generator from an optional seed, falling back to OS entropy.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
