//! One-shot cancellation broadcast.
//!
//! The token pairs an atomic flag (polled at loop tops) with a
//! "tripwire" channel that is never written: raising the token drops the
//! only sender, so every `recv` blocked on it wakes with a disconnect,
//! and the token can sit in a `select!` next to queue operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

use crate::core::errors::{Result, SoakError};

/// Cloneable one-shot cancellation token.
#[derive(Clone)]
pub struct CancelToken {
    raised: Arc<AtomicBool>,
    tripwire_rx: Receiver<()>,
    tripwire_tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl CancelToken {
    /// Create an unraised token.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            raised: Arc::new(AtomicBool::new(false)),
            tripwire_rx: rx,
            tripwire_tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Raise the signal. Idempotent; wakes everything selecting on the
    /// tripwire.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.tripwire_tx.lock().take();
    }

    /// Whether the signal has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Receiver for use in `select!`: disconnects when raised, never
    /// yields a message before that.
    #[must_use]
    pub fn tripwire(&self) -> &Receiver<()> {
        &self.tripwire_rx
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire SIGINT/SIGTERM to `token.raise()`.
///
/// Spawns a detached listener thread; it exits after the first signal
/// or with the process.
pub fn install_signal_handlers(token: &CancelToken) -> Result<()> {
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])
    .map_err(|e| SoakError::Runtime {
        details: format!("failed to register signal handlers: {e}"),
    })?;

    let token = token.clone();
    thread::Builder::new()
        .name("gosoak-signals".to_string())
        .spawn(move || {
            if signals.forever().next().is_some() {
                eprintln!("shutdown requested, letting in-flight executions finish");
                token.raise();
            }
        })
        .map_err(|e| SoakError::Runtime {
            details: format!("failed to spawn signal thread: {e}"),
        })?;

    Ok(())
}
