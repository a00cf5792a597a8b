//! Target discovery via `go list -json`.
//!
//! The oracle shells out to the Go toolchain and parses the concatenated
//! JSON object stream it prints. Packages without test files are dropped;
//! a stale package aborts the whole run before any work starts.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::errors::{Result, SoakError};
use crate::discovery::target::TestTarget;
use crate::exec::engine::ExecutionEngine;

/// Discovery seam: turn a selector into the set of soakable targets.
pub trait TargetOracle: Send + Sync {
    /// List targets matching `selector` (e.g. `std`, `./...`).
    fn list_targets(&self, selector: &str) -> Result<Vec<TestTarget>>;
}

/// The subset of `go list -json` output the harness consumes.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawPackage {
    dir: String,
    import_path: String,
    stale: bool,
    test_go_files: Vec<String>,
    #[serde(rename = "XTestGoFiles")]
    x_test_go_files: Vec<String>,
}

/// Oracle backed by the real `go list` command.
pub struct GoListOracle {
    engine: Arc<dyn ExecutionEngine>,
}

impl GoListOracle {
    /// Build an oracle running through the given engine.
    #[must_use]
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self { engine }
    }

    /// Parse a concatenated `go list -json` stream into targets.
    fn parse_stream(stream: &str) -> Result<Vec<TestTarget>> {
        let mut targets = Vec::new();
        for raw in serde_json::Deserializer::from_str(stream).into_iter::<RawPackage>() {
            let pkg = raw.map_err(|e| SoakError::Discovery {
                details: format!("malformed go list output: {e}"),
            })?;

            if pkg.stale {
                return Err(SoakError::StaleTarget {
                    import_path: pkg.import_path,
                });
            }

            // Packages without tests have nothing to soak.
            if pkg.test_go_files.is_empty() && pkg.x_test_go_files.is_empty() {
                continue;
            }

            targets.push(TestTarget {
                dir: pkg.dir.into(),
                import_path: pkg.import_path,
                has_tests: true,
                stale: false,
            });
        }
        Ok(targets)
    }
}

impl TargetOracle for GoListOracle {
    fn list_targets(&self, selector: &str) -> Result<Vec<TestTarget>> {
        let argv = vec![
            "go".to_string(),
            "list".to_string(),
            "-json".to_string(),
            selector.to_string(),
        ];
        let out = self.engine.run(Path::new("."), &[], &argv)?;
        if !out.success {
            return Err(SoakError::Discovery {
                details: format!("go list exited nonzero: {}", out.stderr),
            });
        }
        Self::parse_stream(&out.stdout)
    }
}
