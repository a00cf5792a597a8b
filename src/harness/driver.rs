//! Driver: startup, run, orderly shutdown.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

use crate::core::config::Config;
use crate::core::errors::{Result, SoakError};
use crate::discovery::oracle::{GoListOracle, TargetOracle};
use crate::discovery::target::TestTarget;
use crate::exec::engine::{ExecutionEngine, ProcessEngine};
use crate::harness::cancel::{CancelToken, install_signal_handlers};
use crate::harness::feeder::feeder_loop;
use crate::harness::pool::{Job, WorkerPool};
use crate::harness::{RunContext, RunOptions};
use crate::logger::events::{HarnessEvent, LoggerConfig, spawn_logger};
use crate::logger::jsonl::JsonlConfig;
use crate::sampler::service::SamplerService;
use crate::work::toolchain::{GoToolchain, Toolchain};
use crate::work::unit::WorkUnit;

/// What a completed (or cancelled) run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Targets the run was seeded with.
    pub targets: usize,
    /// Total completed executions across all workers.
    pub executions: u64,
    /// Wall-clock duration of the run.
    pub uptime: Duration,
    /// Whether the run ended because cancellation was raised.
    pub cancelled: bool,
}

/// Execute a run over already-discovered targets.
///
/// Spawns the worker pool and one feeder per target, waits for every
/// feeder to finish, closes the queue, and drains the workers. Per-
/// execution failures never surface here; only setup failures do.
pub fn run(
    ctx: &Arc<RunContext>,
    targets: Vec<TestTarget>,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    let started = Instant::now();
    let target_count = targets.len();
    let workers = ctx.options.workers.max(1);

    ctx.logger.send(HarnessEvent::RunStarted {
        seed: ctx.options.seed,
        workers,
        targets: target_count,
    });

    let (job_tx, job_rx) = bounded::<Job>(0);
    let pool = WorkerPool::start(workers, &job_rx, cancel, ctx)?;
    drop(job_rx);

    let mut feeders = Vec::with_capacity(target_count);
    for (i, target) in targets.into_iter().enumerate() {
        let unit = WorkUnit::new(target, ctx.options.reps, ctx.options.duration);
        let job_tx = job_tx.clone();
        let cancel = cancel.clone();
        let logger = ctx.logger.clone();
        let handle = thread::Builder::new()
            .name(format!("gosoak-feeder-{i}"))
            .spawn(move || feeder_loop(unit, &job_tx, &cancel, &logger))
            .map_err(|source| SoakError::Runtime {
                details: format!("failed to spawn feeder thread: {source}"),
            })?;
        feeders.push(handle);
    }
    // The feeders hold the only senders now; the queue closes when the
    // last one exits, which is what drains the workers.
    drop(job_tx);

    for handle in feeders {
        let _ = handle.join();
    }
    pool.join();

    let uptime = started.elapsed();
    let executions = ctx.executions.load(Ordering::Relaxed);
    ctx.logger
        .send(HarnessEvent::RunFinished { executions, uptime });

    Ok(RunSummary {
        targets: target_count,
        executions,
        uptime,
        cancelled: cancel.is_raised(),
    })
}

/// Full startup for the `run` subcommand: build the real collaborators
/// from configuration, discover targets, wire signals, run, shut down.
pub fn run_from_config(config: &Config, options: RunOptions) -> Result<RunSummary> {
    config.validate()?;

    let logger_config = LoggerConfig {
        jsonl: config.logging.jsonl_log.clone().map(|path| JsonlConfig {
            path,
            max_size_bytes: config.logging.jsonl_max_size_bytes,
            max_rotated_files: config.logging.jsonl_max_rotated_files,
        }),
        channel_capacity: config.logging.channel_capacity,
    };
    let (logger, logger_join) = spawn_logger(logger_config)?;

    let engine: Arc<dyn ExecutionEngine> = Arc::new(ProcessEngine::new(config.env.base_env()));
    let oracle = GoListOracle::new(Arc::clone(&engine));
    let toolchain: Arc<dyn Toolchain> = Arc::new(GoToolchain::new(
        Arc::clone(&engine),
        config.revision.command.clone(),
    ));
    let sampler = SamplerService::new(options.seed, config.targets.slow.iter().cloned());

    #[cfg(unix)]
    if options.sudo && nix::unistd::Uid::effective().is_root() {
        eprintln!("already running as root; the sudo prefix adds nothing");
    }

    let outcome = (|| {
        let mut targets = oracle.list_targets(&options.selector)?;
        if options.shuffle {
            sampler.shuffle_targets(&mut targets);
        }

        let cancel = CancelToken::new();
        install_signal_handlers(&cancel)?;

        let ctx = Arc::new(RunContext::new(
            sampler,
            engine,
            toolchain,
            logger.clone(),
            options,
        ));
        run(&ctx, targets, &cancel)
    })();

    if let Err(e) = &outcome {
        logger.send(HarnessEvent::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        });
    }

    logger.shutdown();
    let _ = logger_join.join();
    outcome
}
