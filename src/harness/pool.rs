//! Fixed-size worker pool over a rendezvous job queue.
//!
//! The queue has zero capacity: a successful send means a worker has
//! the unit in hand and will return it on the job's completion channel,
//! also when preparation fails. That guarantee is what lets feeders
//! block on the completion channel without a timeout.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, select};

use crate::core::errors::{Result, SoakError};
use crate::harness::RunContext;
use crate::harness::cancel::CancelToken;
use crate::logger::events::HarnessEvent;
use crate::work::unit::WorkUnit;

/// One handoff: the unit plus the channel it travels home on.
pub struct Job {
    /// The unit to prepare and run once.
    pub unit: WorkUnit,
    /// Completion channel back to the owning feeder (capacity 1, so the
    /// worker's send never blocks).
    pub done_tx: Sender<WorkUnit>,
}

/// Handle to the running workers.
pub struct WorkerPool {
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers draining `job_rx`.
    pub fn start(
        count: usize,
        job_rx: &Receiver<Job>,
        cancel: &CancelToken,
        ctx: &Arc<RunContext>,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            let job_rx = job_rx.clone();
            let cancel = cancel.clone();
            let ctx = Arc::clone(ctx);
            let handle = thread::Builder::new()
                .name(format!("gosoak-worker-{i}"))
                .spawn(move || worker_loop(&job_rx, &cancel, &ctx))
                .map_err(|source| SoakError::Runtime {
                    details: format!("failed to spawn worker thread: {source}"),
                })?;
            handles.push(handle);
        }
        Ok(Self { handles })
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool has no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Worker loop: take a unit, prepare it, run it once, hand it back.
///
/// Exits when the queue disconnects (all feeders done) or the
/// cancellation signal is observed. A unit received after cancellation
/// raced the signal; it is returned unexecuted so its owner can exit.
fn worker_loop(job_rx: &Receiver<Job>, cancel: &CancelToken, ctx: &RunContext) {
    loop {
        if cancel.is_raised() {
            return;
        }
        select! {
            recv(job_rx) -> msg => {
                let Ok(job) = msg else { return };
                let mut unit = job.unit;
                if !cancel.is_raised() {
                    match unit.prepare(ctx) {
                        Ok(()) => unit.run_once(ctx),
                        Err(e) => ctx.logger.send(HarnessEvent::PrepareFailed {
                            import_path: unit.target().import_path.clone(),
                            error: e.to_string(),
                        }),
                    }
                }
                let _ = job.done_tx.send(unit);
            }
            recv(cancel.tripwire()) -> _ => return,
        }
    }
}
