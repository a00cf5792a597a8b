//! GSK-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SoakError>;

/// Top-level error type for the soak harness.
#[derive(Debug, Error)]
pub enum SoakError {
    #[error("[GSK-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[GSK-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[GSK-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[GSK-2001] target discovery failure: {details}")]
    Discovery { details: String },

    #[error("[GSK-2002] stale target {import_path}: rebuild the package list before soaking")]
    StaleTarget { import_path: String },

    #[error("[GSK-2003] revision lookup failure for {import_path}: {details}")]
    Revision {
        import_path: String,
        details: String,
    },

    #[error("[GSK-2004] test binary build failure for {import_path}: {details}")]
    Build {
        import_path: String,
        details: String,
    },

    #[error("[GSK-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[GSK-3001] failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[GSK-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[GSK-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[GSK-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SoakError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "GSK-1001",
            Self::MissingConfig { .. } => "GSK-1002",
            Self::ConfigParse { .. } => "GSK-1003",
            Self::Discovery { .. } => "GSK-2001",
            Self::StaleTarget { .. } => "GSK-2002",
            Self::Revision { .. } => "GSK-2003",
            Self::Build { .. } => "GSK-2004",
            Self::Serialization { .. } => "GSK-2101",
            Self::Spawn { .. } => "GSK-3001",
            Self::Io { .. } => "GSK-3002",
            Self::ChannelClosed { .. } => "GSK-3003",
            Self::Runtime { .. } => "GSK-3900",
        }
    }

    /// Whether a later round might succeed where this one failed.
    ///
    /// Preparation failures (revision, build) are retryable: the owning
    /// feeder re-offers the unit on its next round. Configuration and
    /// discovery failures are terminal for the run.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Revision { .. }
                | Self::Build { .. }
                | Self::Spawn { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SoakError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SoakError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_errors() -> Vec<SoakError> {
        vec![
            SoakError::InvalidConfig {
                details: String::new(),
            },
            SoakError::MissingConfig {
                path: PathBuf::new(),
            },
            SoakError::ConfigParse {
                context: "",
                details: String::new(),
            },
            SoakError::Discovery {
                details: String::new(),
            },
            SoakError::StaleTarget {
                import_path: String::new(),
            },
            SoakError::Revision {
                import_path: String::new(),
                details: String::new(),
            },
            SoakError::Build {
                import_path: String::new(),
                details: String::new(),
            },
            SoakError::Serialization {
                context: "",
                details: String::new(),
            },
            SoakError::Spawn {
                program: String::new(),
                source: std::io::Error::other("test"),
            },
            SoakError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            SoakError::ChannelClosed { component: "" },
            SoakError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_errors();
        let codes: Vec<&str> = errors.iter().map(SoakError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_gsk_prefix() {
        for err in &all_errors() {
            assert!(
                err.code().starts_with("GSK-"),
                "code {} must start with GSK-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = SoakError::Build {
            import_path: "net/http".to_string(),
            details: "compile error".to_string(),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("GSK-2004"),
            "display should contain error code: {msg}"
        );
        assert!(
            msg.contains("net/http"),
            "display should contain import path: {msg}"
        );
    }

    #[test]
    fn preparation_failures_are_retryable() {
        assert!(
            SoakError::Build {
                import_path: String::new(),
                details: String::new(),
            }
            .is_retryable()
        );
        assert!(
            SoakError::Revision {
                import_path: String::new(),
                details: String::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn fatal_failures_are_not_retryable() {
        assert!(
            !SoakError::StaleTarget {
                import_path: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !SoakError::Discovery {
                details: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !SoakError::InvalidConfig {
                details: String::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = SoakError::io(
            "/tmp/pkg.test",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "GSK-3002");
        assert!(err.to_string().contains("/tmp/pkg.test"));
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: SoakError = toml_err.into();
        assert_eq!(err.code(), "GSK-1003");
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SoakError = json_err.into();
        assert_eq!(err.code(), "GSK-2101");
    }
}
