//! Configuration management for dnacomp
//!
//! Settings are layered with figment (see [`core`]): embedded defaults, user
//! and repository config files, `DNACOMP_*` environment variables and finally
//! command-line overrides.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::files::{DEFAULT_OUTPUT_PREFIX, InputFilter};
use crate::parallel::{CoordinatorConfig, PoolConfig};
use crate::strand::{DEFAULT_INVALID_MARKER, StrandProcessor};

pub mod core;

/// Main configuration structure for dnacomp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DnacompConfig {
    /// Where strands are read from
    pub input: InputConfig,

    /// Where complements are written
    pub output: OutputConfig,

    /// Worker pool sizing and shutdown timeouts
    pub pool: PoolSettings,

    /// Log verbosity
    pub logging: LoggingConfig,
}

/// Input discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory whose files are processed
    pub directory: PathBuf,

    /// File name globs to process (empty = all files)
    pub include: Vec<String>,

    /// File name globs to skip
    pub exclude: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one output file per input
    pub directory: PathBuf,

    /// Prepended to the input file name
    pub prefix: String,

    /// Prepended to strands that cannot be complemented
    pub invalid_marker: String,
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum number of worker threads (0 = no limit)
    pub max_threads: usize,

    /// Idle time before a worker retires (milliseconds)
    pub keep_alive_ms: u64,

    /// Graceful wait before cancelling running tasks (seconds)
    pub graceful_timeout_secs: u64,

    /// Wait after cancelling before giving up (seconds)
    pub forced_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when neither RUST_LOG nor -v/-q is given
    pub level: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("arquivosDNA"),
            include: vec![],
            exclude: vec![],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("arquivosDNAComplementary"),
            prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            invalid_marker: DEFAULT_INVALID_MARKER.to_string(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_threads: 0,
            keep_alive_ms: 60_000,
            graceful_timeout_secs: 60,
            forced_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl DnacompConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pool.graceful_timeout_secs == 0 {
            anyhow::bail!("pool.graceful_timeout_secs cannot be 0");
        }
        if self.pool.forced_timeout_secs == 0 {
            anyhow::bail!("pool.forced_timeout_secs cannot be 0");
        }
        if self.pool.keep_alive_ms == 0 {
            anyhow::bail!("pool.keep_alive_ms cannot be 0");
        }
        if self.output.prefix.is_empty() {
            // An empty prefix would overwrite inputs when both directories match
            anyhow::bail!("output.prefix cannot be empty");
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            anyhow::bail!("logging.level '{}' is not a valid level", self.logging.level);
        }

        Ok(())
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            pool: PoolConfig {
                max_threads: self.pool.max_threads,
                keep_alive: Duration::from_millis(self.pool.keep_alive_ms),
                ..PoolConfig::default()
            },
            graceful_timeout: Duration::from_secs(self.pool.graceful_timeout_secs),
            forced_timeout: Duration::from_secs(self.pool.forced_timeout_secs),
        }
    }

    pub fn input_filter(&self) -> InputFilter {
        InputFilter {
            include: self.input.include.clone(),
            exclude: self.input.exclude.clone(),
        }
    }

    pub fn processor(&self) -> StrandProcessor {
        StrandProcessor::new(self.output.invalid_marker.clone())
    }
}
