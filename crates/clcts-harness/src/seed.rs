//! Deterministic random streams for test bodies.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// How test bodies get their random generators.
///
/// With `reseed_per_test` off, one generator seeded once per run is threaded
/// through every test in registry order, so a test's stream depends on which
/// tests ran before it. With it on, test `i` always starts from `seed + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedPolicy {
    pub seed: u32,
    pub reseed_per_test: bool,
}

impl SeedPolicy {
    pub fn fixed(seed: u32) -> Self {
        Self { seed, reseed_per_test: false }
    }

    /// Seed from the wall clock and reseed every test.
    pub fn randomized() -> Self {
        Self { seed: clock_seed(), reseed_per_test: true }
    }

    pub fn run_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(u64::from(self.seed))
    }

    /// Seed the test at `index` starts from: `seed + index` when reseeding,
    /// the run seed otherwise.
    pub fn test_seed(&self, index: usize) -> u32 {
        if self.reseed_per_test {
            self.seed.wrapping_add(index as u32)
        } else {
            self.seed
        }
    }

    pub fn test_rng(&self, index: usize) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(u64::from(self.seed.wrapping_add(index as u32)))
    }
}

/// Current time in seconds, truncated to 32 bits.
pub fn clock_seed() -> u32 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0)
}
