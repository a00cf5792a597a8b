//! The owner loop: one feeder per target.
//!
//! The feeder offers its unit to the pool and blocks until that exact
//! execution completes before deciding whether to resubmit. Single
//! flight per unit falls out of ownership: the unit moves to a worker
//! and the feeder cannot offer it again until it moves back.

use crossbeam_channel::{Sender, bounded, select};

use crate::harness::cancel::CancelToken;
use crate::harness::pool::Job;
use crate::logger::events::{EventLoggerHandle, HarnessEvent};
use crate::work::unit::WorkUnit;

/// Drive one unit until it is exhausted or the run is cancelled.
///
/// Each round: offer the unit on the rendezvous queue, racing the
/// cancellation tripwire (cancellation wins → stop without waiting),
/// then block until the worker returns the unit. A successful handoff
/// guarantees the unit comes back, so the completion wait needs no
/// timeout and no second cancellation race.
pub fn feeder_loop(
    mut unit: WorkUnit,
    job_tx: &Sender<Job>,
    cancel: &CancelToken,
    logger: &EventLoggerHandle,
) {
    while !unit.is_exhausted() {
        if cancel.is_raised() {
            return;
        }

        let (done_tx, done_rx) = bounded::<WorkUnit>(1);
        let job = Job { unit, done_tx };

        select! {
            send(job_tx, job) -> res => {
                if res.is_err() {
                    // Queue torn down while offering; the run is over.
                    return;
                }
            }
            recv(cancel.tripwire()) -> _ => return,
        }

        match done_rx.recv() {
            Ok(returned) => unit = returned,
            // Worker died without returning the unit; abandon the target.
            Err(_) => return,
        }
    }

    logger.send(HarnessEvent::TargetExhausted {
        import_path: unit.target().import_path.clone(),
    });
}
