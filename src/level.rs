//! Tower height sampling.
//!
//! Heights follow a geometric distribution truncated at the maximum level:
//! starting from 0, each further level is granted with probability
//! `1/step_size`. The expected height is `1/(step_size - 1)`, so a larger
//! step size trades search time for smaller towers.

use rand::Rng;

use crate::config::Config;

/// Draws heights for new nodes from an owned random source.
#[derive(Debug, Clone)]
pub struct LevelGenerator<R> {
    /// Denominator of the promotion probability. Always at least 2.
    step_size: u32,
    max_level: usize,
    rng: R,
}

impl<R: Rng> LevelGenerator<R> {
    /// Build a generator for the shape in `config`, drawing from `rng`.
    pub fn new(config: Config, rng: R) -> Self {
        // Config guarantees step_size >= 2; saturate instead of truncating huge values.
        let step_size = u32::try_from(config.step_size()).unwrap_or(u32::MAX);
        LevelGenerator {
            step_size,
            max_level: config.max_level(),
            rng,
        }
    }

    /// Sample a height in `0..=max_level`.
    pub fn next_level(&mut self) -> usize {
        let mut level = 0;
        while level < self.max_level && self.rng.gen_ratio(1, self.step_size) {
            level += 1;
        }
        level
    }

    /// Highest height [`next_level`](Self::next_level) can return.
    pub fn max_level(&self) -> usize {
        self.max_level
    }
}
