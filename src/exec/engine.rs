//! Process execution engine: spawn, capture, report.
//!
//! Spawned processes get a cleared environment plus the immutable base
//! env resolved at construction, then any per-execution extras. A spawn
//! failure is an `Err`; a nonzero exit is a normal `ExecOutput` with
//! `success == false`.

use std::path::Path;
use std::process::Command;

use crate::core::errors::{Result, SoakError};

/// Captured result of one spawned process.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Trimmed stdout (lossy UTF-8).
    pub stdout: String,
    /// Trimmed stderr (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Raw exit code when the process exited normally.
    pub status: Option<i32>,
}

/// The process-spawning seam.
///
/// Workers, the toolchain and the discovery oracle all run through this
/// trait, so tests can substitute a scripted engine and never fork.
pub trait ExecutionEngine: Send + Sync {
    /// Run `argv` in `dir` with the base env plus `extra_env`, blocking
    /// until exit, and capture both output streams.
    fn run(&self, dir: &Path, extra_env: &[(String, String)], argv: &[String])
    -> Result<ExecOutput>;
}

/// Real engine backed by `std::process::Command`.
pub struct ProcessEngine {
    base_env: Vec<(String, String)>,
}

impl ProcessEngine {
    /// Build an engine with the given immutable base environment.
    #[must_use]
    pub fn new(base_env: Vec<(String, String)>) -> Self {
        Self { base_env }
    }

    /// The base environment every spawned process receives.
    #[must_use]
    pub fn base_env(&self) -> &[(String, String)] {
        &self.base_env
    }
}

impl ExecutionEngine for ProcessEngine {
    fn run(
        &self,
        dir: &Path,
        extra_env: &[(String, String)],
        argv: &[String],
    ) -> Result<ExecOutput> {
        let program = argv.first().ok_or_else(|| SoakError::Runtime {
            details: "empty argv passed to execution engine".to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(&argv[1..])
            .current_dir(dir)
            .env_clear()
            .envs(self.base_env.iter().map(|(k, v)| (k, v)))
            .envs(extra_env.iter().map(|(k, v)| (k, v)));

        let output = cmd.output().map_err(|source| SoakError::Spawn {
            program: program.clone(),
            source,
        })?;

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            success: output.status.success(),
            status: output.status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ProcessEngine {
        ProcessEngine::new(vec![(
            "PATH".to_string(),
            std::env::var("PATH").unwrap_or_default(),
        )])
    }

    #[test]
    fn empty_argv_is_a_runtime_error() {
        let err = engine().run(Path::new("."), &[], &[]).unwrap_err();
        assert_eq!(err.code(), "GSK-3900");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = engine()
            .run(
                Path::new("."),
                &[],
                &["gosoak-no-such-program".to_string()],
            )
            .unwrap_err();
        assert_eq!(err.code(), "GSK-3001");
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_and_exit_status() {
        let out = engine()
            .run(
                Path::new("."),
                &[],
                &["sh".to_string(), "-c".to_string(), "echo hello".to_string()],
            )
            .expect("sh must spawn");
        assert!(out.success);
        assert_eq!(out.status, Some(0));
        assert_eq!(out.stdout, "hello");
        assert!(out.stderr.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_not_an_err() {
        let out = engine()
            .run(
                Path::new("."),
                &[],
                &[
                    "sh".to_string(),
                    "-c".to_string(),
                    "echo boom >&2; exit 3".to_string(),
                ],
            )
            .expect("sh must spawn");
        assert!(!out.success);
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stderr, "boom");
    }

    #[cfg(unix)]
    #[test]
    fn extra_env_reaches_the_child() {
        let out = engine()
            .run(
                Path::new("."),
                &[("GOGC".to_string(), "off".to_string())],
                &[
                    "sh".to_string(),
                    "-c".to_string(),
                    "printf %s \"$GOGC\"".to_string(),
                ],
            )
            .expect("sh must spawn");
        assert_eq!(out.stdout, "off");
    }

    #[cfg(unix)]
    #[test]
    fn environment_is_cleared_to_the_base_set() {
        let out = engine()
            .run(
                Path::new("."),
                &[],
                &[
                    "sh".to_string(),
                    "-c".to_string(),
                    "printf %s \"${HOME:-unset}\"".to_string(),
                ],
            )
            .expect("sh must spawn");
        assert_eq!(out.stdout, "unset");
    }
}
