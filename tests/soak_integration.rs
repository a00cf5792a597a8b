//! End-to-end harness properties: budget accounting, bounded
//! concurrency, single flight, and cancellation — driven through the
//! real pool/feeder/driver machinery with scripted collaborators.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use gosoak::core::errors::{Result, SoakError};
use gosoak::discovery::target::TestTarget;
use gosoak::exec::engine::{ExecOutput, ExecutionEngine};
use gosoak::harness::cancel::CancelToken;
use gosoak::harness::driver::run;
use gosoak::harness::{RunContext, RunOptions};
use gosoak::logger::events::{LoggerConfig, spawn_logger};
use gosoak::sampler::service::SamplerService;
use gosoak::work::toolchain::Toolchain;
use gosoak::work::unit::WorkUnit;

// ──────────────────── scripted collaborators ────────────────────

/// Engine that sleeps briefly and tracks peak concurrency.
struct TrackingEngine {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
    delay: Duration,
}

impl TrackingEngine {
    fn new(delay: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            delay,
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl ExecutionEngine for TrackingEngine {
    fn run(
        &self,
        _dir: &Path,
        _extra_env: &[(String, String)],
        _argv: &[String],
    ) -> Result<ExecOutput> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        Ok(ExecOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            status: Some(0),
        })
    }
}

/// Toolchain that never touches the filesystem.
struct NullToolchain {
    prepare_calls: AtomicUsize,
    fail_builds: bool,
}

impl NullToolchain {
    fn new(fail_builds: bool) -> Self {
        Self {
            prepare_calls: AtomicUsize::new(0),
            fail_builds,
        }
    }
}

impl Toolchain for NullToolchain {
    fn ensure_test_binary(
        &self,
        target: &TestTarget,
        _force_rebuild: bool,
        _race: bool,
    ) -> Result<()> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_builds {
            return Err(SoakError::Build {
                import_path: target.import_path.clone(),
                details: "scripted build failure".to_string(),
            });
        }
        Ok(())
    }

    fn resolve_revision(&self, _target: &TestTarget) -> Result<String> {
        Ok("feedface".to_string())
    }
}

fn targets(n: usize) -> Vec<TestTarget> {
    (0..n)
        .map(|i| TestTarget::new(format!("/go/src/pkg{i}"), format!("pkg{i}")))
        .collect()
}

fn context(
    engine: Arc<TrackingEngine>,
    toolchain: Arc<NullToolchain>,
    options: RunOptions,
) -> Arc<RunContext> {
    let (logger, _join) = spawn_logger(LoggerConfig::default()).expect("logger");
    Arc::new(RunContext::new(
        SamplerService::new(options.seed, Vec::new()),
        engine,
        toolchain,
        logger,
        options,
    ))
}

// ──────────────────── scenarios ────────────────────

#[test]
fn one_rep_each_runs_exactly_once_per_target() {
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(5)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        Arc::clone(&engine),
        toolchain,
        RunOptions {
            seed: 11,
            workers: 4,
            reps: 1,
            duration: Duration::from_secs(3600),
            ..RunOptions::default()
        },
    );

    let cancel = CancelToken::new();
    let summary = run(&ctx, targets(9), &cancel).expect("run");

    assert_eq!(summary.executions, 9);
    assert_eq!(engine.total(), 9);
    assert!(!summary.cancelled);
}

#[test]
fn concurrency_never_exceeds_worker_count() {
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(15)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        Arc::clone(&engine),
        toolchain,
        RunOptions {
            seed: 12,
            workers: 2,
            reps: 1,
            duration: Duration::from_secs(3600),
            ..RunOptions::default()
        },
    );

    let cancel = CancelToken::new();
    run(&ctx, targets(8), &cancel).expect("run");

    assert!(
        engine.peak() <= 2,
        "peak concurrency {} exceeded the pool size",
        engine.peak()
    );
    assert_eq!(engine.total(), 8);
}

#[test]
fn repetition_budget_is_spent_exactly() {
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(1)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        Arc::clone(&engine),
        toolchain,
        RunOptions {
            seed: 13,
            workers: 3,
            reps: 3,
            duration: Duration::from_secs(3600),
            ..RunOptions::default()
        },
    );

    let cancel = CancelToken::new();
    let summary = run(&ctx, targets(4), &cancel).expect("run");

    // 4 targets x 3 repetitions, success or failure alike.
    assert_eq!(summary.executions, 12);
}

#[test]
fn zero_time_budget_never_executes() {
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(1)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        Arc::clone(&engine),
        Arc::clone(&toolchain),
        RunOptions {
            seed: 14,
            workers: 2,
            reps: 1000,
            duration: Duration::ZERO,
            ..RunOptions::default()
        },
    );

    let cancel = CancelToken::new();
    let summary = run(&ctx, targets(5), &cancel).expect("run");

    assert_eq!(summary.executions, 0);
    assert_eq!(engine.total(), 0);
    assert_eq!(toolchain.prepare_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn exhausted_units_are_never_resubmitted() {
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(1)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        Arc::clone(&engine),
        Arc::clone(&toolchain),
        RunOptions {
            seed: 15,
            workers: 1,
            reps: 2,
            duration: Duration::from_secs(3600),
            ..RunOptions::default()
        },
    );

    let cancel = CancelToken::new();
    run(&ctx, targets(3), &cancel).expect("run");

    // One prepare per execution: no extra rounds happened.
    assert_eq!(engine.total(), 6);
    assert_eq!(toolchain.prepare_calls.load(Ordering::SeqCst), 6);
}

#[test]
fn prepare_failure_skips_execution_but_keeps_retrying() {
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(1)));
    let toolchain = Arc::new(NullToolchain::new(true));
    let ctx = context(
        Arc::clone(&engine),
        Arc::clone(&toolchain),
        RunOptions {
            seed: 16,
            workers: 2,
            reps: 5,
            duration: Duration::from_secs(3600),
            ..RunOptions::default()
        },
    );

    // Broken builds never consume budget, so the run only ends via
    // cancellation — raise it from the side after retries accumulate.
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        canceller.raise();
    });

    let summary = run(&ctx, targets(2), &cancel).expect("run");
    stopper.join().expect("join stopper");

    assert_eq!(summary.executions, 0, "no execution after failed prepare");
    assert!(summary.cancelled);
    assert!(
        toolchain.prepare_calls.load(Ordering::SeqCst) > 2,
        "failed targets must be retried round after round"
    );
}

#[test]
fn cancellation_stops_blocked_feeders_promptly() {
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(30)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        Arc::clone(&engine),
        toolchain,
        RunOptions {
            seed: 17,
            workers: 1,
            reps: 1_000_000,
            duration: Duration::from_secs(3600),
            ..RunOptions::default()
        },
    );

    // Many feeders, one worker: most feeders sit blocked on the offer.
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        canceller.raise();
    });

    let started = Instant::now();
    let summary = run(&ctx, targets(16), &cancel).expect("run");
    stopper.join().expect("join stopper");

    assert!(summary.cancelled);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "run must unwind promptly after cancellation, took {:?}",
        started.elapsed()
    );
    // Far fewer executions than the budget allows: no new work was
    // started after the signal.
    assert!(summary.executions < 100);
}

#[test]
fn work_unit_state_survives_the_round_trip() {
    // Single worker, single target, several reps: the same unit instance
    // must come back to its feeder each round with the revision cached.
    let engine = Arc::new(TrackingEngine::new(Duration::from_millis(1)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        engine,
        toolchain,
        RunOptions {
            seed: 18,
            workers: 1,
            reps: 4,
            duration: Duration::from_secs(3600),
            ..RunOptions::default()
        },
    );

    let cancel = CancelToken::new();
    let summary = run(&ctx, targets(1), &cancel).expect("run");
    assert_eq!(summary.executions, 4);
}

#[test]
fn unit_budget_floors_hold_under_repeated_running() {
    let engine: Arc<TrackingEngine> = Arc::new(TrackingEngine::new(Duration::from_millis(1)));
    let toolchain = Arc::new(NullToolchain::new(false));
    let ctx = context(
        engine,
        toolchain,
        RunOptions {
            seed: 19,
            ..RunOptions::default()
        },
    );

    let mut unit = WorkUnit::new(
        TestTarget::new("/go/src/pkg0", "pkg0"),
        2,
        Duration::from_millis(1),
    );
    while !unit.is_exhausted() {
        unit.run_once(&ctx);
    }
    assert!(unit.reps_remaining() <= 2);
    assert_eq!(unit.time_remaining(), Duration::ZERO);
}
