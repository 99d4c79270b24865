//! Coordinator configuration and validation.
//!
//! Configuration is loaded from TOML with per-field defaults. The knobs
//! here size the streaming buffers the coordinator hands to its query
//! processors and the private channels used on the destructive path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shard coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum points a passthrough processor buffers before flushing a
    /// series fragment downstream.
    #[serde(default = "default_passthrough_batch_size")]
    pub passthrough_batch_size: usize,

    /// Buffer cap for passthrough processors serving delete, drop-series
    /// and single-point queries.
    #[serde(default = "default_destructive_batch_size")]
    pub destructive_batch_size: usize,

    /// Capacity of the private response channel that collects local results
    /// of a destructive query before they are drained to the caller.
    /// Destructive queries emit few responses; the local stream must fit
    /// here in full because it is drained only after the remote streams.
    #[serde(default = "default_local_response_capacity")]
    pub local_response_capacity: usize,

    /// Capacity of each per-replica response channel on the destructive
    /// path. Streams are drained serially in replica order, so a small
    /// capacity only throttles the producer.
    #[serde(default = "default_remote_response_capacity")]
    pub remote_response_capacity: usize,
}

fn default_passthrough_batch_size() -> usize {
    1_000
}

fn default_destructive_batch_size() -> usize {
    10_000
}

fn default_local_response_capacity() -> usize {
    64
}

fn default_remote_response_capacity() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            passthrough_batch_size: default_passthrough_batch_size(),
            destructive_batch_size: default_destructive_batch_size(),
            local_response_capacity: default_local_response_capacity(),
            remote_response_capacity: default_remote_response_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        if self.passthrough_batch_size == 0 {
            anyhow::bail!("passthrough_batch_size must be > 0");
        }
        if self.destructive_batch_size == 0 {
            anyhow::bail!("destructive_batch_size must be > 0");
        }
        if self.local_response_capacity == 0 {
            anyhow::bail!("local_response_capacity must be > 0");
        }
        if self.remote_response_capacity == 0 {
            anyhow::bail!("remote_response_capacity must be > 0");
        }
        Ok(())
    }
}
