//! JSONL event log: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object, assembled in memory and
//! written with a single `write_all` so a tailing process never sees a
//! partial line. Degradation chain: primary file, then stderr with a
//! `[GSK-JSONL]` prefix, then silent discard — the harness must never
//! abort because its log file went away.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Event types matching the harness state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStart,
    PrepareFailed,
    ExecStart,
    ExecFailed,
    BudgetRemaining,
    TargetExhausted,
    RunFinish,
    Error,
}

/// A single JSONL entry — all fields optional except `ts`, `event`,
/// `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventType,
    /// Severity level.
    pub severity: Severity,
    /// Import path of the target involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_path: Option<String>,
    /// Run seed (run_start only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Worker pool size (run_start only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Discovered target count (run_start only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<usize>,
    /// Rendered configuration of an execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Repetitions left after an execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps_remaining: Option<u32>,
    /// Time budget left after an execution, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_ms: Option<u64>,
    /// Total executions across the run (run_finish only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executions: Option<u64>,
    /// Run duration in seconds (run_finish only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
    /// Captured stdout of a failed execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Captured stderr of a failed execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// GSK error code, when the event carries a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            import_path: None,
            seed: None,
            workers: None,
            targets: None,
            config: None,
            reps_remaining: None,
            time_remaining_ms: None,
            executions: None,
            uptime_secs: None,
            stdout: None,
            stderr: None,
            error_code: None,
            error_message: None,
        }
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Log file path.
    pub path: PathBuf,
    /// Maximum file size before rotation (bytes).
    pub max_size_bytes: u64,
    /// Number of rotated files to keep.
    pub max_rotated_files: u32,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("gosoak.jsonl"),
            max_size_bytes: 50 * 1024 * 1024,
            max_rotated_files: 5,
        }
    }
}

/// Append-only JSONL writer with rotation and stderr fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the log file, degrading to stderr on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        w.try_open();
        w
    }

    fn try_open(&mut self) {
        if let Some(parent) = self.config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            let _ = fs::create_dir_all(parent);
        }
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)
        {
            Ok(file) => {
                self.bytes_written = file.metadata().map(|m| m.len()).unwrap_or(0);
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Normal;
            }
            Err(e) => {
                eprintln!(
                    "[GSK-JSONL] cannot open {}: {e}; logging to stderr",
                    self.config.path.display()
                );
                self.state = WriterState::Stderr;
            }
        }
    }

    /// Write a single entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let Ok(mut line) = serde_json::to_string(entry) else {
            return;
        };
        line.push('\n');

        match self.state {
            WriterState::Normal => {
                self.maybe_rotate();
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).and_then(|()| w.flush()).is_ok() {
                        self.bytes_written += line.len() as u64;
                        return;
                    }
                    self.writer = None;
                    self.state = WriterState::Stderr;
                }
                eprint!("[GSK-JSONL] {line}");
            }
            WriterState::Stderr => eprint!("[GSK-JSONL] {line}"),
            WriterState::Discard => {}
        }
    }

    /// Whether the writer is still on its primary file.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state == WriterState::Normal
    }

    fn maybe_rotate(&mut self) {
        if self.bytes_written < self.config.max_size_bytes {
            return;
        }
        self.writer = None;

        // Shift gosoak.jsonl.N-1 -> gosoak.jsonl.N, oldest dropped.
        let path = &self.config.path;
        for i in (1..self.config.max_rotated_files).rev() {
            let from = rotated_name(path, i);
            let to = rotated_name(path, i + 1);
            let _ = rename(&from, &to);
        }
        let _ = rename(path, rotated_name(path, 1));

        self.bytes_written = 0;
        self.try_open();
    }
}

fn rotated_name(path: &std::path::Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
