//! Configuration system: TOML file + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SoakError};

/// Full harness configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub env: EnvConfig,
    pub targets: TargetsConfig,
    pub revision: RevisionConfig,
    pub logging: LoggingConfig,
}

/// Environment handed to every spawned process.
///
/// Spawned processes do NOT inherit the harness environment; they get
/// exactly `TMPDIR`, `PATH` and `GOPATH`, resolved here once at startup.
/// `None` fields fall back to the harness's own environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EnvConfig {
    pub tmpdir: Option<PathBuf>,
    pub path: Option<String>,
    pub gopath: Option<String>,
}

impl EnvConfig {
    /// Resolve the immutable base environment for spawned processes.
    #[must_use]
    pub fn base_env(&self) -> Vec<(String, String)> {
        let tmpdir = self
            .tmpdir
            .clone()
            .unwrap_or_else(env::temp_dir)
            .to_string_lossy()
            .into_owned();
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| env::var("PATH").unwrap_or_default());
        let gopath = self
            .gopath
            .clone()
            .unwrap_or_else(|| env::var("GOPATH").unwrap_or_default());
        vec![
            ("TMPDIR".to_string(), tmpdir),
            ("PATH".to_string(), path),
            ("GOPATH".to_string(), gopath),
        ]
    }
}

/// Target-set tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetsConfig {
    /// Import paths whose tests are too slow to multiply across CPU shards.
    pub slow: Vec<String>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            slow: vec![
                "archive/zip".to_string(),
                "math/big".to_string(),
                "net".to_string(),
                "net/http".to_string(),
                "regexp".to_string(),
            ],
        }
    }
}

/// Source-control revision lookup, run once per target in its directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RevisionConfig {
    pub command: Vec<String>,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "git".to_string(),
                "rev-parse".to_string(),
                "HEAD".to_string(),
            ],
        }
    }
}

/// Event log sinks and back-pressure tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Optional JSONL event log path. `None` keeps events on stderr only.
    pub jsonl_log: Option<PathBuf>,
    /// Bounded logger channel capacity; events beyond it are dropped.
    pub channel_capacity: usize,
    /// Maximum JSONL file size before rotation (bytes).
    pub jsonl_max_size_bytes: u64,
    /// Number of rotated JSONL files to keep.
    pub jsonl_max_rotated_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_log: None,
            channel_capacity: 1024,
            jsonl_max_size_bytes: 50 * 1024 * 1024,
            jsonl_max_rotated_files: 5,
        }
    }
}

/// Default config file location: `~/.config/gosoak/config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".config/gosoak/config.toml")
}

impl Config {
    /// Load configuration.
    ///
    /// An explicitly-given path must exist. The default path is optional:
    /// when absent the built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path(), false),
        };

        if !path.exists() {
            if required {
                return Err(SoakError::MissingConfig { path });
            }
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path).map_err(|source| SoakError::io(&path, source))?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.revision.command.is_empty() {
            return Err(SoakError::InvalidConfig {
                details: "revision.command must name at least a program".to_string(),
            });
        }
        if self.logging.channel_capacity == 0 {
            return Err(SoakError::InvalidConfig {
                details: "logging.channel_capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
