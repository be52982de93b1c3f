//! Randomized pause between cycles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::config::PacingConfig;

pub struct Pacer {
    min_secs: f64,
    max_secs: f64,
    rng: StdRng,
}

impl Pacer {
    pub fn new(cfg: &PacingConfig, rng: StdRng) -> Self {
        Self {
            min_secs: cfg.min_secs,
            max_secs: cfg.max_secs,
            rng,
        }
    }

    pub fn seeded(cfg: &PacingConfig, seed: u64) -> Self {
        Self::new(cfg, StdRng::seed_from_u64(seed))
    }

    /// Next delay, uniform in `[min_secs, max_secs]`.
    pub fn next_delay(&mut self) -> Duration {
        let secs = if self.max_secs > self.min_secs {
            self.rng.gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::from_secs_f64(secs.max(0.0))
    }
}
