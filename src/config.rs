//! Benchmark configuration loaded from TOML
//!
//! ```toml
//! object_size = 10
//! reclaim_interval = 10
//! arena_capacity = 100
//! strategy = "arena"
//! iterations = 100000000
//! payload = "abcdefghi"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use crate::allocator::StrategyKind;
use crate::errors::{BenchError, ConfigError};
use crate::logging::{parse_level, LogConfig, LogFormat, LogOutput};
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Bytes per object.
    #[serde(default = "default_object_size")]
    pub object_size: usize,

    /// Objects per reclamation cycle.
    #[serde(default = "default_reclaim_interval")]
    pub reclaim_interval: usize,

    /// Bytes per arena. Defaults to `object_size * reclaim_interval`.
    #[serde(default)]
    pub arena_capacity: Option<usize>,

    #[serde(default)]
    pub strategy: StrategyKind,

    /// Objects requested over the whole run.
    #[serde(default = "default_iterations")]
    pub iterations: u64,

    #[serde(default)]
    pub payload: Payload,

    /// Independent contexts run side by side, one per thread.
    #[serde(default = "default_threads")]
    pub threads: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub json: bool,

    /// Directory for rolling log files; logs go to stderr when unset.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_object_size() -> usize { 10 }
fn default_reclaim_interval() -> usize { 10 }
fn default_iterations() -> u64 { 100_000_000 }
fn default_threads() -> usize { 1 }

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            object_size: default_object_size(),
            reclaim_interval: default_reclaim_interval(),
            arena_capacity: None,
            strategy: StrategyKind::default(),
            iterations: default_iterations(),
            payload: Payload::default(),
            threads: default_threads(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let content = fs::read_to_string(path).map_err(|source| BenchError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self::parse(&content)?)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Effective arena capacity in bytes.
    pub fn arena_capacity(&self) -> usize {
        self.arena_capacity
            .unwrap_or_else(|| self.object_size.saturating_mul(self.reclaim_interval))
    }

    /// Whether a full cycle fits in one arena.
    ///
    /// An undersized arena is accepted so the out-of-space path can be
    /// exercised, but such a run will fail part-way through a cycle.
    pub fn batching_is_sound(&self) -> bool {
        self.object_size
            .checked_mul(self.reclaim_interval)
            .map_or(false, |needed| needed <= self.arena_capacity())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.object_size == 0 {
            return Err(ConfigError::ZeroObjectSize);
        }
        if self.reclaim_interval == 0 {
            return Err(ConfigError::ZeroReclaimInterval);
        }
        if let Some(level) = &self.logging.level {
            if parse_level(level).is_none() {
                return Err(ConfigError::UnknownLogLevel(level.clone()));
            }
        }
        if self.payload.len() > self.object_size {
            return Err(ConfigError::PayloadTooLarge {
                payload: self.payload.len(),
                object_size: self.object_size,
            });
        }
        Ok(())
    }

    /// Logging settings from the `[logging]` section layered over the
    /// environment.
    pub fn log_config(&self) -> Result<LogConfig, ConfigError> {
        let mut config = LogConfig::from_env()?;

        if let Some(name) = &self.logging.level {
            config.level =
                parse_level(name).ok_or_else(|| ConfigError::UnknownLogLevel(name.clone()))?;
        }
        if self.logging.json {
            config.format = LogFormat::Json;
        }
        if let Some(directory) = &self.logging.directory {
            config.output = LogOutput::File {
                directory: directory.clone(),
                prefix: "tlab-bench".to_string(),
            };
        }

        Ok(config)
    }
}
