//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use gosoak::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SoakError};

// Discovery
pub use crate::discovery::oracle::{GoListOracle, TargetOracle};
pub use crate::discovery::target::TestTarget;

// Execution
pub use crate::exec::engine::{ExecOutput, ExecutionEngine, ProcessEngine};

// Sampling
pub use crate::sampler::knobs::{ExecutionConfig, ModifierFeatures, ReclamationMode};
pub use crate::sampler::service::SamplerService;

// Work units
pub use crate::work::toolchain::{GoToolchain, Toolchain};
pub use crate::work::unit::WorkUnit;

// Harness
pub use crate::harness::cancel::CancelToken;
pub use crate::harness::driver::{RunSummary, run, run_from_config};
pub use crate::harness::{RunContext, RunOptions};
pub use crate::logger::events::{EventLoggerHandle, HarnessEvent, spawn_logger};
