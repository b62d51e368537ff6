//! Random task generation.
//!
//! Emits at most one task per tick, with probability proportional to the
//! configured rate. Task load and duration are drawn from independent
//! Gaussian distributions and clamped to their valid ranges ([5, 100] for
//! load, [1, ∞) for duration).

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Standard deviation of the generated task load.
const LOAD_STDDEV: f64 = 10.0;
/// Standard deviation of the generated task duration.
const DURATION_STDDEV: f64 = 2.0;

/// Tunable parameters for the random task source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Expected tasks per second.
    pub rate: f64,
    /// Mean task load (percent of processor capacity).
    pub mean_load: f64,
    /// Mean task duration in ticks at speed 1.0.
    pub mean_duration: f64,
    /// RNG seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            mean_load: 20.0,
            mean_duration: 5.0,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Sets the generation rate (tasks per second).
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the mean task load.
    pub fn with_mean_load(mut self, mean_load: f64) -> Self {
        self.mean_load = mean_load;
        self
    }

    /// Sets the mean task duration.
    pub fn with_mean_duration(mut self, mean_duration: f64) -> Self {
        self.mean_duration = mean_duration;
        self
    }

    /// Fixes the RNG seed so a run is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Probabilistic task source driven once per simulation tick.
#[derive(Debug)]
pub struct TaskGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl TaskGenerator {
    /// Creates a generator from a config, seeding the RNG from the config
    /// seed or the OS.
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    /// Replaces the tunable parameters, keeping the RNG stream.
    pub fn set_config(&mut self, config: GeneratorConfig) {
        self.config = config;
    }

    /// Current parameters.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Draws zero or one `(load, execution_time)` pair for a tick of the
    /// given length.
    ///
    /// The emission probability is `rate * tick_seconds`, capped at 1.
    pub fn generate(&mut self, tick: Duration) -> Option<(f64, f64)> {
        let probability = (self.config.rate * tick.as_secs_f64()).min(1.0);
        if self.rng.random::<f64>() >= probability {
            return None;
        }
        let load_z: f64 = self.rng.sample(StandardNormal);
        let duration_z: f64 = self.rng.sample(StandardNormal);
        let load = (self.config.mean_load + LOAD_STDDEV * load_z).clamp(5.0, 100.0);
        let duration = (self.config.mean_duration + DURATION_STDDEV * duration_z).max(1.0);
        Some((load, duration))
    }
}
