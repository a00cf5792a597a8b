//! The shared, seeded configuration sampler.
//!
//! All workers draw from one `StdRng` behind a mutex; the generator is
//! never exposed, only the sampling operations. For a fixed seed and a
//! fixed call order the drawn configuration sequence is reproducible.

use std::collections::HashSet;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::discovery::target::TestTarget;
use crate::sampler::knobs::{
    CrashVerbosity, ExecutionConfig, ParallelismLimit, ReclamationMode, ReclamationTrace,
};

/// Upper bound (exclusive) on the shard count under normal operation.
const MAX_SHARDS: u32 = 9;
/// Upper bound (exclusive) on the shard count under the race detector,
/// which multiplies memory cost per shard.
const MAX_SHARDS_SAFETY_CHECKER: u32 = 3;

/// Thread-safe randomized configuration source.
pub struct SamplerService {
    rng: Mutex<StdRng>,
    slow_targets: HashSet<String>,
}

impl SamplerService {
    /// Build a sampler from an explicit seed and the known-slow set.
    #[must_use]
    pub fn new(seed: u64, slow_targets: impl IntoIterator<Item = String>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            slow_targets: slow_targets.into_iter().collect(),
        }
    }

    /// Whether a target is in the known-slow set (never sharded).
    #[must_use]
    pub fn is_slow(&self, target: &TestTarget) -> bool {
        self.slow_targets.contains(&target.import_path)
    }

    /// Draw one complete execution configuration.
    ///
    /// Draw order is fixed: parallelism, reclamation, trace, traceback,
    /// shards, then the modifier coins. Slow targets draw no shard
    /// values at all.
    pub fn sample(&self, target: &TestTarget, safety_checker: bool) -> ExecutionConfig {
        let mut rng = self.rng.lock();

        let parallelism = ParallelismLimit::sample(&mut *rng);
        let reclamation = ReclamationMode::sample(&mut *rng);
        let trace = ReclamationTrace::sample(&mut *rng);
        let traceback = CrashVerbosity::sample(&mut *rng);

        let cpu_shards = if self.is_slow(target) {
            Vec::new()
        } else {
            let max = if safety_checker {
                MAX_SHARDS_SAFETY_CHECKER
            } else {
                MAX_SHARDS
            };
            let count = rng.random_range(0..max);
            (0..count).map(|_| rng.random_range(1..=256)).collect()
        };

        ExecutionConfig {
            parallelism,
            reclamation,
            trace,
            traceback,
            cpu_shards,
            short: rng.random_bool(0.5),
            verbose: rng.random_bool(0.5),
            bench: rng.random_bool(0.5),
            sudo: rng.random_bool(0.5),
            strace: rng.random_bool(0.5),
        }
    }

    /// Shuffle the discovered target list in place.
    ///
    /// Runs on the same seeded generator; the driver calls this once
    /// before any worker exists, so the per-execution sample stream
    /// stays reproducible.
    pub fn shuffle_targets(&self, targets: &mut [TestTarget]) {
        let mut rng = self.rng.lock();
        targets.shuffle(&mut *rng);
    }
}
