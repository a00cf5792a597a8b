//! The test-target record produced by discovery.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One discoverable test subject: a package directory with a compiled
/// test binary next to it.
///
/// Targets are produced once at startup and never mutated by the harness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestTarget {
    /// Package source directory; the build and every execution run here.
    pub dir: PathBuf,
    /// Import path identifying the package (e.g. `net/http`).
    pub import_path: String,
    /// Whether the package declares any test files.
    pub has_tests: bool,
    /// Whether the installed package is out of date. A stale target is a
    /// fatal precondition violation for the whole run.
    pub stale: bool,
}

impl TestTarget {
    /// Path of the compiled test binary: `<dir>/<base(import_path)>.test`.
    #[must_use]
    pub fn test_binary(&self) -> PathBuf {
        let base = self
            .import_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.import_path);
        self.dir.join(format!("{base}.test"))
    }

    /// Convenience constructor used by tests and the `sample` subcommand.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>, import_path: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            import_path: import_path.into(),
            has_tests: true,
            stale: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_uses_last_path_segment() {
        let target = TestTarget::new("/go/src/net/http", "net/http");
        assert_eq!(
            target.test_binary(),
            PathBuf::from("/go/src/net/http/http.test")
        );
    }

    #[test]
    fn test_binary_for_single_segment_path() {
        let target = TestTarget::new("/go/src/regexp", "regexp");
        assert_eq!(
            target.test_binary(),
            PathBuf::from("/go/src/regexp/regexp.test")
        );
    }
}
