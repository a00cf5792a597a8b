//! Run orchestration: worker pool, feeders, cancellation, driver.

pub mod cancel;
pub mod driver;
pub mod feeder;
pub mod pool;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use crate::exec::engine::ExecutionEngine;
use crate::logger::events::EventLoggerHandle;
use crate::sampler::knobs::ModifierFeatures;
use crate::sampler::service::SamplerService;
use crate::work::toolchain::Toolchain;

/// Operator-facing options for one soak run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Seed for the configuration sampler (logged for reproducibility).
    pub seed: u64,
    /// Target selector handed to discovery (e.g. `std`, `./...`).
    pub selector: String,
    /// Worker pool size.
    pub workers: usize,
    /// Build and run with the race detector (safety-checker mode).
    pub race: bool,
    /// Force a rebuild of every test binary.
    pub rebuild: bool,
    /// Repetition budget per target.
    pub reps: u32,
    /// Wall-clock budget per target.
    pub duration: Duration,
    /// Allow the `sudo -E` execution prefix.
    pub sudo: bool,
    /// Allow the `strace` execution prefix.
    pub strace: bool,
    /// Shuffle the discovered target order.
    pub shuffle: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            selector: "std".to_string(),
            workers: 1,
            race: false,
            rebuild: false,
            reps: 1,
            duration: Duration::from_secs(60),
            sudo: false,
            strace: false,
            shuffle: true,
        }
    }
}

impl RunOptions {
    /// The modifier features this run allows.
    #[must_use]
    pub const fn features(&self) -> ModifierFeatures {
        ModifierFeatures {
            sudo: self.sudo,
            strace: self.strace,
        }
    }
}

/// Everything a worker needs to prepare and run a unit, shared across
/// the pool. Only the sampler's RNG is mutated concurrently (behind its
/// own lock); the rest is read-only after construction.
pub struct RunContext {
    /// Shared randomized configuration source.
    pub sampler: SamplerService,
    /// Process-spawning seam.
    pub engine: Arc<dyn ExecutionEngine>,
    /// Build + revision collaborator.
    pub toolchain: Arc<dyn Toolchain>,
    /// Event log handle.
    pub logger: EventLoggerHandle,
    /// Run options.
    pub options: RunOptions,
    /// Total completed executions across all workers.
    pub executions: AtomicU64,
}

impl RunContext {
    /// Bundle the collaborators for one run.
    #[must_use]
    pub fn new(
        sampler: SamplerService,
        engine: Arc<dyn ExecutionEngine>,
        toolchain: Arc<dyn Toolchain>,
        logger: EventLoggerHandle,
        options: RunOptions,
    ) -> Self {
        Self {
            sampler,
            engine,
            toolchain,
            logger,
            options,
            executions: AtomicU64::new(0),
        }
    }
}
