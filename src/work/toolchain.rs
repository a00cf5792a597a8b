//! Build and revision collaborators, run through the execution engine.

use std::sync::Arc;

use crate::core::errors::{Result, SoakError};
use crate::discovery::target::TestTarget;
use crate::exec::engine::ExecutionEngine;

/// Build + source-control seam consumed by work-unit preparation.
pub trait Toolchain: Send + Sync {
    /// Make sure a usable test binary exists for `target`.
    ///
    /// Skips the build when the artifact is already present and a
    /// rebuild was not forced.
    fn ensure_test_binary(&self, target: &TestTarget, force_rebuild: bool, race: bool)
    -> Result<()>;

    /// Resolve the source-control revision identifier for `target`.
    fn resolve_revision(&self, target: &TestTarget) -> Result<String>;
}

/// Real toolchain: `go test -c` for builds, a configurable command for
/// revision lookup (default `git rev-parse HEAD`).
pub struct GoToolchain {
    engine: Arc<dyn ExecutionEngine>,
    revision_command: Vec<String>,
}

impl GoToolchain {
    /// Build a toolchain over the given engine.
    #[must_use]
    pub fn new(engine: Arc<dyn ExecutionEngine>, revision_command: Vec<String>) -> Self {
        Self {
            engine,
            revision_command,
        }
    }
}

impl Toolchain for GoToolchain {
    fn ensure_test_binary(
        &self,
        target: &TestTarget,
        force_rebuild: bool,
        race: bool,
    ) -> Result<()> {
        if !force_rebuild && target.test_binary().exists() {
            return Ok(());
        }

        let mut argv = vec!["go".to_string(), "test".to_string(), "-c".to_string()];
        if race {
            argv.push("-race".to_string());
        }

        let out = self.engine.run(&target.dir, &[], &argv)?;
        if !out.success {
            return Err(SoakError::Build {
                import_path: target.import_path.clone(),
                details: out.stderr,
            });
        }
        Ok(())
    }

    fn resolve_revision(&self, target: &TestTarget) -> Result<String> {
        let out = self.engine.run(&target.dir, &[], &self.revision_command)?;
        if !out.success {
            return Err(SoakError::Revision {
                import_path: target.import_path.clone(),
                details: out.stderr,
            });
        }
        Ok(out.stdout.trim().to_string())
    }
}
