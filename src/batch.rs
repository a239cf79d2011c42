//! Batch runner
//!
//! Runs N independent attempts with identical parameters. Each attempt owns
//! its own generator, so the batch can run on the rayon pool without any
//! shared RNG state.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::SimulationParameters;
use crate::error::{SimError, SimResult};
use crate::simulator::{simulate_attempt, Outcome};

/// How a batch draws its randomness and whether it uses the thread pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRunner {
    /// Base seed; attempt `i` is seeded from `(seed, i)`. `None` seeds every
    /// attempt from OS entropy.
    pub seed: Option<u64>,
    pub parallel: bool,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self {
            seed: None,
            parallel: true,
        }
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn seeded(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Generator for attempt `index`
    fn rng_for(&self, index: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(attempt_seed(seed, index)),
            None => StdRng::from_entropy(),
        }
    }

    /// Validate, then simulate `n` attempts. Outcomes are returned in attempt
    /// order regardless of scheduling.
    pub fn run(&self, params: &SimulationParameters, n: usize) -> SimResult<Vec<Outcome>> {
        params.validate()?;
        if n == 0 {
            return Err(SimError::ZeroSimulations);
        }

        info!(
            simulations = n,
            parallel = self.parallel,
            seeded = self.seed.is_some(),
            "Running evaluation batch"
        );
        let start = Instant::now();

        let attempt = |index: usize| {
            let mut rng = self.rng_for(index);
            simulate_attempt(params, &mut rng)
        };

        let outcomes: Vec<Outcome> = if self.parallel {
            (0..n).into_par_iter().map(attempt).collect()
        } else {
            (0..n).map(attempt).collect()
        };

        let elapsed = start.elapsed().as_secs_f64();
        debug!(
            "Batch of {} attempts finished in {:.3}s ({:.0} attempts/s)",
            n,
            elapsed,
            n as f64 / elapsed.max(f64::EPSILON)
        );

        Ok(outcomes)
    }
}

/// Spread consecutive attempt indices across the seed space
fn attempt_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Run `n` attempts in parallel with entropy-seeded generators
pub fn run_batch(params: &SimulationParameters, n: usize) -> SimResult<Vec<Outcome>> {
    BatchRunner::default().run(params, n)
}
