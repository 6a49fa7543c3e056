//! Configuration structures for the cache client, set engine and stores

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};

/// Store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory store configuration
    #[cfg(feature = "memory")]
    Memory(MemoryConfig),
}

/// Configuration for the in-memory store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of live items before the least recently used is evicted
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Largest value accepted for a single item, in bytes
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_value_bytes: default_max_value_bytes(),
        }
    }
}

impl MemoryConfig {
    /// Check the configuration for values the store cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config("max_entries must be greater than zero".to_string()));
        }
        if self.max_value_bytes == 0 {
            return Err(CacheError::Config(
                "max_value_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Client-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Expiration applied when a caller does not pass one (0 = never expires)
    #[serde(default)]
    pub expiration_secs: u32,

    /// Delta-log set settings
    #[serde(default)]
    pub set: SetConfig,
}

impl CacheConfig {
    /// Resolve an optional per-call expiration against the default
    pub fn ttl(&self, ttl: Option<u32>) -> u32 {
        ttl.unwrap_or(self.expiration_secs)
    }

    /// Check the configuration for values the client cannot honour
    pub fn validate(&self) -> Result<()> {
        self.set.validate()
    }
}

/// Delta-log set settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetConfig {
    /// Upper bound on append/create rounds before giving up
    #[serde(default = "default_max_append_attempts")]
    pub max_append_attempts: u32,

    /// Live/total ratio below which a read compacts the log
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: f64,
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            max_append_attempts: default_max_append_attempts(),
            compaction_threshold: default_compaction_threshold(),
        }
    }
}

impl SetConfig {
    /// Check the configuration for values the set engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.max_append_attempts == 0 {
            return Err(CacheError::Config(
                "max_append_attempts must be at least 1".to_string(),
            ));
        }
        if !(self.compaction_threshold > 0.0 && self.compaction_threshold <= 1.0) {
            return Err(CacheError::Config(format!(
                "compaction_threshold must be in (0, 1], got {}",
                self.compaction_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for the observable store layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable event streaming
    #[serde(default = "default_true")]
    pub enable_events: bool,

    /// Maximum event buffer size
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_events: true,
            max_buffer_size: default_max_buffer_size(),
        }
    }
}

// Default value functions
fn default_max_entries() -> usize {
    65_536
}

fn default_max_value_bytes() -> usize {
    1024 * 1024 // 1MB, memcached's default item size
}

fn default_max_append_attempts() -> u32 {
    5
}

fn default_compaction_threshold() -> f64 {
    0.95
}

fn default_max_buffer_size() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}
