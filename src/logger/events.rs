//! Event log coordinator: one logger thread, many senders.
//!
//! A dedicated thread owns the sinks (stderr always, JSONL when
//! configured). All other threads send [`HarnessEvent`] via a bounded
//! crossbeam channel; `try_send` keeps workers and feeders from ever
//! blocking on logging back-pressure. One event per state transition.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{Result, SoakError};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Events emitted by the harness, one per state transition.
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    RunStarted {
        seed: u64,
        workers: usize,
        targets: usize,
    },
    PrepareFailed {
        import_path: String,
        error: String,
    },
    ExecutionStarted {
        import_path: String,
        config: String,
    },
    ExecutionFailed {
        import_path: String,
        error: String,
        stdout: String,
        stderr: String,
    },
    BudgetRemaining {
        import_path: String,
        reps_remaining: u32,
        time_remaining: Duration,
    },
    TargetExhausted {
        import_path: String,
    },
    RunFinished {
        executions: u64,
        uptime: Duration,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel requesting graceful shutdown of the logger thread.
    Shutdown,
}

impl HarnessEvent {
    fn severity(&self) -> Severity {
        match self {
            Self::PrepareFailed { .. } | Self::ExecutionFailed { .. } => Severity::Warning,
            Self::Error { .. } => Severity::Critical,
            _ => Severity::Info,
        }
    }

    fn event_type(&self) -> Option<EventType> {
        match self {
            Self::RunStarted { .. } => Some(EventType::RunStart),
            Self::PrepareFailed { .. } => Some(EventType::PrepareFailed),
            Self::ExecutionStarted { .. } => Some(EventType::ExecStart),
            Self::ExecutionFailed { .. } => Some(EventType::ExecFailed),
            Self::BudgetRemaining { .. } => Some(EventType::BudgetRemaining),
            Self::TargetExhausted { .. } => Some(EventType::TargetExhausted),
            Self::RunFinished { .. } => Some(EventType::RunFinish),
            Self::Error { .. } => Some(EventType::Error),
            Self::Shutdown => None,
        }
    }

    fn to_entry(&self) -> Option<LogEntry> {
        let mut entry = LogEntry::new(self.event_type()?, self.severity());
        match self {
            Self::RunStarted {
                seed,
                workers,
                targets,
            } => {
                entry.seed = Some(*seed);
                entry.workers = Some(*workers);
                entry.targets = Some(*targets);
            }
            Self::PrepareFailed { import_path, error } => {
                entry.import_path = Some(import_path.clone());
                entry.error_message = Some(error.clone());
            }
            Self::ExecutionStarted {
                import_path,
                config,
            } => {
                entry.import_path = Some(import_path.clone());
                entry.config = Some(config.clone());
            }
            Self::ExecutionFailed {
                import_path,
                error,
                stdout,
                stderr,
            } => {
                entry.import_path = Some(import_path.clone());
                entry.error_message = Some(error.clone());
                entry.stdout = Some(stdout.clone());
                entry.stderr = Some(stderr.clone());
            }
            Self::BudgetRemaining {
                import_path,
                reps_remaining,
                time_remaining,
            } => {
                entry.import_path = Some(import_path.clone());
                entry.reps_remaining = Some(*reps_remaining);
                #[allow(clippy::cast_possible_truncation)]
                {
                    entry.time_remaining_ms = Some(time_remaining.as_millis() as u64);
                }
            }
            Self::TargetExhausted { import_path } => {
                entry.import_path = Some(import_path.clone());
            }
            Self::RunFinished { executions, uptime } => {
                entry.executions = Some(*executions);
                entry.uptime_secs = Some(uptime.as_secs());
            }
            Self::Error { code, message } => {
                entry.error_code = Some(code.clone());
                entry.error_message = Some(message.clone());
            }
            Self::Shutdown => return None,
        }
        Some(entry)
    }

    /// Human-readable line for stderr.
    fn render_human(&self) -> Option<String> {
        match self {
            Self::RunStarted {
                seed,
                workers,
                targets,
            } => Some(format!("seed={seed} workers={workers} targets={targets}")),
            Self::PrepareFailed { import_path, error } => {
                Some(format!("{import_path}: prepare failed: {error}"))
            }
            Self::ExecutionStarted {
                import_path,
                config,
            } => Some(format!("{import_path}: {config}")),
            Self::ExecutionFailed {
                import_path,
                error,
                stdout,
                stderr,
            } => {
                let mut line = format!("{import_path}: {error}");
                if !stdout.is_empty() {
                    line.push('\n');
                    line.push_str(stdout);
                }
                if !stderr.is_empty() {
                    line.push('\n');
                    line.push_str(stderr);
                }
                Some(line)
            }
            Self::BudgetRemaining {
                import_path,
                reps_remaining,
                time_remaining,
            } => Some(format!(
                "{import_path}: remaining: {reps_remaining} repetitions, {time_remaining:?}"
            )),
            Self::TargetExhausted { import_path } => Some(format!("{import_path}: exhausted")),
            Self::RunFinished { executions, uptime } => Some(format!(
                "run finished: {executions} executions in {}s",
                uptime.as_secs()
            )),
            Self::Error { code, message } => Some(format!("[{code}] {message}")),
            Self::Shutdown => None,
        }
    }
}

/// Thread-safe, cheaply-cloneable handle for sending events.
///
/// Wraps a bounded crossbeam `Sender`; `send()` uses `try_send()` so
/// callers never block on logging back-pressure.
#[derive(Clone)]
pub struct EventLoggerHandle {
    tx: Sender<HarnessEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl EventLoggerHandle {
    /// Send an event to the logger thread. Non-blocking; a full channel
    /// drops the event and bumps the dropped-events counter.
    pub fn send(&self, event: HarnessEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }

    /// Number of events dropped due to channel back-pressure.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown of the logger thread.
    pub fn shutdown(&self) {
        let _ = self.tx.send(HarnessEvent::Shutdown);
    }
}

/// Options for building the event logger.
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// JSONL sink; `None` keeps events on stderr only.
    pub jsonl: Option<JsonlConfig>,
    /// Bounded channel capacity (0 falls back to 1024).
    pub channel_capacity: usize,
}

/// Spawn the logger thread and return a handle plus its join handle.
pub fn spawn_logger(config: LoggerConfig) -> Result<(EventLoggerHandle, thread::JoinHandle<()>)> {
    let capacity = if config.channel_capacity == 0 {
        1024
    } else {
        config.channel_capacity
    };
    let (tx, rx) = bounded::<HarnessEvent>(capacity);
    let dropped = Arc::new(AtomicU64::new(0));

    let handle = EventLoggerHandle {
        tx,
        dropped_events: Arc::clone(&dropped),
    };

    let join = thread::Builder::new()
        .name("gosoak-logger".to_string())
        .spawn(move || {
            logger_thread_main(&rx, config.jsonl);
        })
        .map_err(|e| SoakError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<HarnessEvent>, jsonl: Option<JsonlConfig>) {
    let mut writer = jsonl.map(JsonlWriter::open);

    while let Ok(event) = rx.recv() {
        if matches!(event, HarnessEvent::Shutdown) {
            break;
        }
        if let Some(line) = event.render_human() {
            eprintln!("{line}");
        }
        if let (Some(w), Some(entry)) = (writer.as_mut(), event.to_entry()) {
            w.write_entry(&entry);
        }
    }
}
