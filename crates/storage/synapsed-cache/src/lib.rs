//! Synapsed Cache - memcached-style cache client with delta-log sets
//!
//! A set lives in one cache entry as an append-only log of signed, base64
//! encoded members. Writers only append, so concurrent inserts and removes
//! need no coordination beyond the store's atomic append, add and
//! compare-and-swap. Readers replay the log and opportunistically compact it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use synapsed_cache::prelude::*;
//!
//! # async fn demo() -> synapsed_cache::Result<()> {
//! let store = Arc::new(MemoryStore::default());
//! let client = CacheClient::new(store, CacheConfig::default())?;
//!
//! client.set_insert("online", &["alice", "bob"], None).await?;
//! client.set_remove("online", &["alice"], None).await?;
//! assert!(client.set_contains("online", b"bob").await?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod append;
pub mod backends;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod observable;
pub mod set;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use append::Applied;
pub use client::CacheClient;
pub use config::{CacheConfig, MemoryConfig, MonitoringConfig, SetConfig, StoreConfig};
pub use error::{CacheError, Result};
pub use observable::{ObservableStore, StoreEvent, StoreOp};
pub use set::{CompactionOutcome, DeltaSet, SetReport};
pub use traits::CacheStore;
pub use types::{AddOutcome, CasOutcome, CasToken, UpdateOutcome};

use std::sync::Arc;

/// Builder for constructing a store with optional layers
pub struct StoreBuilder {
    config: StoreConfig,
    monitoring_config: Option<MonitoringConfig>,
}

impl StoreBuilder {
    /// Create a new store builder with the given configuration
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            monitoring_config: None,
        }
    }

    /// Wrap the store in an observable layer
    pub fn with_monitoring(mut self, config: MonitoringConfig) -> Self {
        self.monitoring_config = Some(config);
        self
    }

    /// Build the store with all configured layers
    pub fn build(self) -> Result<Arc<dyn CacheStore>> {
        let store: Arc<dyn CacheStore> = match self.config {
            #[cfg(feature = "memory")]
            StoreConfig::Memory(cfg) => {
                cfg.validate()?;
                Arc::new(backends::memory::MemoryStore::new(cfg))
            }

            #[allow(unreachable_patterns)]
            _ => {
                return Err(CacheError::Config(
                    "Store backend not enabled in features".to_string(),
                ))
            }
        };

        match self.monitoring_config {
            Some(monitoring) => Ok(Arc::new(ObservableStore::new(store, monitoring))),
            None => Ok(store),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "memory")]
    pub use crate::backends::MemoryStore;
    pub use crate::{
        config::{CacheConfig, MemoryConfig, SetConfig, StoreConfig},
        error::{CacheError, Result},
        traits::CacheStore,
        Applied, CacheClient, CompactionOutcome, DeltaSet, StoreBuilder,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_rejects_invalid_memory_config() {
        let result = StoreBuilder::new(StoreConfig::Memory(MemoryConfig {
            max_entries: 0,
            ..MemoryConfig::default()
        }))
        .build();
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[tokio::test]
    async fn test_builder_with_monitoring() {
        let store = StoreBuilder::new(StoreConfig::Memory(MemoryConfig::default()))
            .with_monitoring(MonitoringConfig::default())
            .build()
            .unwrap();

        let client = CacheClient::new(store, CacheConfig::default()).unwrap();
        client.set_insert("s", &["x"], None).await.unwrap();
        assert_eq!(client.set_items("s").await.unwrap().len(), 1);
    }
}
