use rand::prelude::SliceRandom;
use rand::{Rng, SeedableRng};

/// The randomness seam of the engine. The deterministic core (deferred
/// acceptance, the stability verifier, improvement cycles) never touches
/// this; the randomized layers (RPTS traversal orders, tie-break priority
/// draws) are generic over it so tests can script every draw.
pub trait RandomSource {
    /// An index drawn uniformly from `0..bound`. `bound` must be non-zero.
    fn pick(&mut self, bound: usize) -> usize;

    /// Uniformly permute `values` in place.
    fn shuffle<T>(&mut self, values: &mut [T]) {
        for idx in (1..values.len()).rev() {
            let j = self.pick(idx + 1);
            values.swap(idx, j);
        }
    }

    /// Flip a fair coin.
    fn coin(&mut self) -> bool {
        self.pick(2) == 0
    }
}

/// Seeded pseudo-random source backed by [`rand::rngs::StdRng`].
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: rand::rngs::StdRng,
    seed: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// An independent stream for trial `index`, used by the parallel trial
    /// runners: every worker owns its own stream and the aggregate is
    /// reproducible from the base seed alone.
    pub fn fork(&self, index: u64) -> Self {
        Self::new(splitmix64(self.seed ^ (index.wrapping_add(1)).wrapping_mul(0x9e37_79b9_7f4a_7c15)))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRng {
    fn pick(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }

    fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }
}

fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
