//! The work unit: one target's repetition/time budget and its execution
//! logic.
//!
//! A unit is owned by exactly one feeder and moves by value through the
//! pool (feeder → worker → feeder), so its budget fields never need a
//! lock: whoever holds the unit is the only writer.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::core::errors::Result;
use crate::discovery::target::TestTarget;
use crate::harness::RunContext;
use crate::logger::events::HarnessEvent;

/// One target plus its remaining budgets.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    target: TestTarget,
    reps_remaining: u32,
    time_remaining: Duration,
    resolved_revision: Option<String>,
}

impl WorkUnit {
    /// Wrap a target with fresh budgets.
    #[must_use]
    pub fn new(target: TestTarget, reps: u32, time_budget: Duration) -> Self {
        Self {
            target,
            reps_remaining: reps,
            time_remaining: time_budget,
            resolved_revision: None,
        }
    }

    /// The wrapped target.
    #[must_use]
    pub fn target(&self) -> &TestTarget {
        &self.target
    }

    /// Repetitions left.
    #[must_use]
    pub const fn reps_remaining(&self) -> u32 {
        self.reps_remaining
    }

    /// Wall-clock budget left.
    #[must_use]
    pub const fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    /// Cached revision identifier, once resolved.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.resolved_revision.as_deref()
    }

    /// A unit is exhausted when either budget reaches zero. Exhausted
    /// units must never be resubmitted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.reps_remaining == 0 || self.time_remaining.is_zero()
    }

    /// Resolve the revision (once) and make sure the test binary exists.
    ///
    /// On error the round is abandoned: no execution, no budget change.
    pub fn prepare(&mut self, ctx: &RunContext) -> Result<()> {
        if self.resolved_revision.is_none() {
            let revision = ctx.toolchain.resolve_revision(&self.target)?;
            self.resolved_revision = Some(revision);
        }
        ctx.toolchain
            .ensure_test_binary(&self.target, ctx.options.rebuild, ctx.options.race)
    }

    /// Run one execution under a freshly sampled configuration, then
    /// charge both budgets for it.
    ///
    /// Failures (nonzero exit or spawn error) are logged with both
    /// captured streams and still consume a repetition: the point is to
    /// keep stressing the runtime regardless of individual outcomes.
    pub fn run_once(&mut self, ctx: &RunContext) {
        let started = Instant::now();
        let config = ctx.sampler.sample(&self.target, ctx.options.race);
        let features = ctx.options.features();

        ctx.logger.send(HarnessEvent::ExecutionStarted {
            import_path: self.target.import_path.clone(),
            config: config.summary(&self.target, features),
        });

        let env = config.env_vars();
        let argv = config.args(&self.target, features);

        match ctx.engine.run(&self.target.dir, &env, &argv) {
            Ok(out) if out.success => {}
            Ok(out) => {
                let error = out.status.map_or_else(
                    || "terminated by signal".to_string(),
                    |code| format!("exit status {code}"),
                );
                ctx.logger.send(HarnessEvent::ExecutionFailed {
                    import_path: self.target.import_path.clone(),
                    error,
                    stdout: out.stdout,
                    stderr: out.stderr,
                });
            }
            Err(e) => {
                ctx.logger.send(HarnessEvent::ExecutionFailed {
                    import_path: self.target.import_path.clone(),
                    error: e.to_string(),
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
        }

        self.reps_remaining = self.reps_remaining.saturating_sub(1);
        self.time_remaining = self.time_remaining.saturating_sub(started.elapsed());
        ctx.executions.fetch_add(1, Ordering::Relaxed);

        ctx.logger.send(HarnessEvent::BudgetRemaining {
            import_path: self.target.import_path.clone(),
            reps_remaining: self.reps_remaining,
            time_remaining: self.time_remaining,
        });
    }
}
