//! Runtime-tuning knobs and the sampled execution configuration.
//!
//! Every knob is a closed enum with a total sampling function: the value
//! space has exactly the listed cases, so there is no "impossible"
//! fallback to defend at runtime. Constraints between knobs (reclamation
//! disabled forces short mode and suppresses CPU shards and benchmarks)
//! are applied when the configuration is rendered into env/argv, keeping
//! the raw draws observable.

use rand::Rng;
use serde::Serialize;

use crate::discovery::target::TestTarget;

/// GOMAXPROCS: cap on OS threads executing user code simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParallelismLimit {
    /// Leave the runtime default in place.
    Unset,
    /// Serialize everything onto one proc.
    One,
    /// Minimal real parallelism.
    Two,
    /// A uniformly drawn limit in `[1, 1024]`.
    Random(u32),
}

impl ParallelismLimit {
    /// Draw one of the four cases uniformly.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        match rng.random_range(0..4) {
            0 => Self::Unset,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Random(rng.random_range(1..=1024)),
        }
    }

    /// Render as an environment pair, if set.
    #[must_use]
    pub fn env(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Unset => None,
            Self::One => Some(("GOMAXPROCS", "1".to_string())),
            Self::Two => Some(("GOMAXPROCS", "2".to_string())),
            Self::Random(n) => Some(("GOMAXPROCS", n.to_string())),
        }
    }
}

/// GOGC: the garbage-collection target percentage, including `off`.
///
/// Disabling collection cascades: runs without reclamation must use short
/// mode and must not multiply across CPU shards or run benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReclamationMode {
    /// Runtime default (collection active at the default ratio).
    Unset,
    /// Collection disabled entirely (`GOGC=off`).
    Disabled,
    /// Collect on almost every allocation (`GOGC=1`).
    Eager,
    /// The explicit default ratio (`GOGC=100`).
    DefaultRatio,
    /// A uniformly drawn ratio in `[1, 100]`.
    Ratio(u8),
}

impl ReclamationMode {
    /// Draw one of the five cases uniformly.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        match rng.random_range(0..5) {
            0 => Self::Unset,
            1 => Self::Disabled,
            2 => Self::Eager,
            3 => Self::DefaultRatio,
            _ => Self::Ratio(rng.random_range(1..=100)),
        }
    }

    /// Whether collection runs at all under this mode.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Render as an environment pair, if set.
    #[must_use]
    pub fn env(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Unset => None,
            Self::Disabled => Some(("GOGC", "off".to_string())),
            Self::Eager => Some(("GOGC", "1".to_string())),
            Self::DefaultRatio => Some(("GOGC", "100".to_string())),
            Self::Ratio(n) => Some(("GOGC", n.to_string())),
        }
    }
}

/// GOGCTRACE: per-collection event tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReclamationTrace {
    /// Leave unset.
    Unset,
    /// Explicitly off.
    Off,
    /// Trace every collection to stderr.
    On,
}

impl ReclamationTrace {
    /// Draw one of the three cases uniformly.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        match rng.random_range(0..3) {
            0 => Self::Unset,
            1 => Self::Off,
            _ => Self::On,
        }
    }

    /// Render as an environment pair, if set.
    #[must_use]
    pub fn env(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Unset => None,
            Self::Off => Some(("GOGCTRACE", "0".to_string())),
            Self::On => Some(("GOGCTRACE", "1".to_string())),
        }
    }
}

/// GOTRACEBACK: stack-unwind verbosity on crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrashVerbosity {
    /// Leave unset.
    Unset,
    /// Suppress goroutine dumps.
    Level0,
    /// Current goroutine only.
    Level1,
    /// All goroutines with runtime frames.
    Level2,
    /// Dump and abort into a core file.
    Crash,
}

impl CrashVerbosity {
    /// Draw one of the five cases uniformly.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        match rng.random_range(0..5) {
            0 => Self::Unset,
            1 => Self::Level0,
            2 => Self::Level1,
            3 => Self::Level2,
            _ => Self::Crash,
        }
    }

    /// Render as an environment pair, if set.
    #[must_use]
    pub fn env(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Unset => None,
            Self::Level0 => Some(("GOTRACEBACK", "0".to_string())),
            Self::Level1 => Some(("GOTRACEBACK", "1".to_string())),
            Self::Level2 => Some(("GOTRACEBACK", "2".to_string())),
            Self::Crash => Some(("GOTRACEBACK", "crash".to_string())),
        }
    }
}

/// Which operator-toggled modifier features are available this run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ModifierFeatures {
    /// `--sudo`: allow the privilege-elevation prefix.
    pub sudo: bool,
    /// `--strace`: allow the syscall-tracing prefix.
    pub strace: bool,
}

/// One randomly sampled, internally consistent execution configuration.
///
/// Ephemeral: built immediately before an execution, rendered into
/// env/argv, then discarded. The boolean fields hold the raw coin flips;
/// gating rules are applied in [`env_vars`](Self::env_vars) and
/// [`args`](Self::args).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionConfig {
    /// GOMAXPROCS knob.
    pub parallelism: ParallelismLimit,
    /// GOGC knob.
    pub reclamation: ReclamationMode,
    /// GOGCTRACE knob.
    pub trace: ReclamationTrace,
    /// GOTRACEBACK knob.
    pub traceback: CrashVerbosity,
    /// `-test.cpu` shard list; empty means no shard argument.
    pub cpu_shards: Vec<u16>,
    /// `-test.short` coin (forced on when reclamation is disabled).
    pub short: bool,
    /// `-test.v` coin.
    pub verbose: bool,
    /// `-test.bench=.` coin (suppressed when reclamation is disabled).
    pub bench: bool,
    /// `sudo -E` coin (applied only when the feature is enabled).
    pub sudo: bool,
    /// `strace` coin (applied only when the feature is enabled).
    pub strace: bool,
}

impl ExecutionConfig {
    /// Whether memory reclamation runs at all for this execution.
    #[must_use]
    pub const fn reclamation_active(&self) -> bool {
        self.reclamation.is_active()
    }

    /// Render the sampled knobs into environment pairs.
    #[must_use]
    pub fn env_vars(&self) -> Vec<(String, String)> {
        [
            self.parallelism.env(),
            self.reclamation.env(),
            self.trace.env(),
            self.traceback.env(),
        ]
        .into_iter()
        .flatten()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Render the full argument vector for one execution of `target`.
    ///
    /// Order: optional `sudo -E`, optional `strace -f -q -o/dev/null`,
    /// the test binary, then the test flags. CPU shards and benchmarks
    /// are unsafe to combine with disabled reclamation and are omitted
    /// there; short mode becomes unconditional instead.
    #[must_use]
    pub fn args(&self, target: &TestTarget, features: ModifierFeatures) -> Vec<String> {
        let active = self.reclamation_active();
        let mut args = Vec::new();

        if features.sudo && self.sudo {
            args.push("sudo".to_string());
            args.push("-E".to_string());
        }
        if features.strace && self.strace {
            args.push("strace".to_string());
            args.push("-f".to_string());
            args.push("-q".to_string());
            args.push("-o/dev/null".to_string());
        }

        args.push(target.test_binary().to_string_lossy().into_owned());

        if active && !self.cpu_shards.is_empty() {
            let shards: Vec<String> = self.cpu_shards.iter().map(ToString::to_string).collect();
            args.push(format!("-test.cpu={}", shards.join(",")));
        }
        if active {
            if self.short {
                args.push("-test.short".to_string());
            }
        } else {
            args.push("-test.short".to_string());
        }
        if self.verbose {
            args.push("-test.v".to_string());
        }
        if active && self.bench {
            args.push("-test.bench=.".to_string());
        }

        args
    }

    /// One-line summary for the execution-started log event.
    #[must_use]
    pub fn summary(&self, target: &TestTarget, features: ModifierFeatures) -> String {
        let env: Vec<String> = self
            .env_vars()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!(
            "[{}] {}",
            env.join(" "),
            self.args(target, features).join(" ")
        )
    }
}
