//! Seedable random source shared by initialisation, dropout and shuffling.
//!
//! Wraps `rand::rngs::StdRng` so a network built from the same seed draws the
//! same weights, the same dropout masks and the same shuffles on every run.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Random number source owned by a [`crate::network::Network`].
#[derive(Debug, Clone)]
pub struct NetRng {
    inner: StdRng,
}

impl NetRng {
    /// Create a deterministic RNG from an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Create an RNG seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy-backed otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniform sample in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform sample in [low, high). Returns `low` for an empty range.
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.inner.gen_range(low..high)
    }

    /// Gaussian sample. A non-positive deviation degenerates to the mean.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(normal) if std_dev > 0.0 => normal.sample(&mut self.inner),
            _ => mean,
        }
    }

    /// Bernoulli draw: `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, data: &mut [T]) {
        data.shuffle(&mut self.inner);
    }
}
