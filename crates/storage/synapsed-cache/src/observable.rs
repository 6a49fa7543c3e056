//! Observable store for monitoring the primitives issued against a store
//!
//! Every call on the wrapped store is announced on a broadcast channel before
//! it is forwarded, which lets operators (and tests) see exactly which
//! round trips a set operation produced.

use crate::config::MonitoringConfig;
use crate::error::Result;
use crate::traits::CacheStore;
use crate::types::{AddOutcome, CasOutcome, CasToken, UpdateOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

/// Store event for observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    /// Primitive that was issued
    pub op: StoreOp,
    /// Key the primitive targeted
    pub key: String,
    /// Timestamp in milliseconds
    pub timestamp_ms: u64,
}

/// Store primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    /// Read with CAS token
    Gets,
    /// Plain read
    Get,
    /// Unconditional write
    Set,
    /// Create-if-absent
    Add,
    /// Overwrite-if-present
    Replace,
    /// Suffix write
    Append,
    /// Prefix write
    Prepend,
    /// Optimistic rewrite
    CompareAndSwap,
    /// Removal
    Delete,
    /// Counter increment
    Increment,
    /// Counter decrement
    Decrement,
}

/// Observable store wrapper
pub struct ObservableStore<S: CacheStore + ?Sized> {
    inner: Arc<S>,
    event_sender: broadcast::Sender<StoreEvent>,
    config: MonitoringConfig,
}

impl<S: CacheStore + ?Sized> ObservableStore<S> {
    /// Create a new observable store
    pub fn new(store: Arc<S>, config: MonitoringConfig) -> Self {
        let (event_sender, _) = broadcast::channel(config.max_buffer_size.max(1));
        Self {
            inner: store,
            event_sender,
            config,
        }
    }

    /// Subscribe to store events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_sender.subscribe()
    }

    /// The wrapped store
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    fn emit(&self, op: StoreOp, key: &str) {
        if !self.config.enable_events {
            return;
        }
        // no receivers is fine
        let _ = self.event_sender.send(StoreEvent {
            op,
            key: key.to_string(),
            timestamp_ms: now_ms(),
        });
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[async_trait]
impl<S: CacheStore + ?Sized> CacheStore for ObservableStore<S> {
    async fn gets(&self, key: &str) -> Result<Option<(Bytes, CasToken)>> {
        self.emit(StoreOp::Gets, key);
        self.inner.gets(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.emit(StoreOp::Get, key);
        self.inner.get(key).await
    }

    async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Bytes>> {
        for key in keys {
            self.emit(StoreOp::Get, key);
        }
        self.inner.get_multi(keys).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: u32) -> Result<()> {
        self.emit(StoreOp::Set, key);
        self.inner.set(key, value, ttl).await
    }

    async fn add(&self, key: &str, value: &[u8], ttl: u32) -> Result<AddOutcome> {
        self.emit(StoreOp::Add, key);
        self.inner.add(key, value, ttl).await
    }

    async fn replace(&self, key: &str, value: &[u8], ttl: u32) -> Result<UpdateOutcome> {
        self.emit(StoreOp::Replace, key);
        self.inner.replace(key, value, ttl).await
    }

    async fn append(&self, key: &str, suffix: &[u8]) -> Result<UpdateOutcome> {
        self.emit(StoreOp::Append, key);
        self.inner.append(key, suffix).await
    }

    async fn prepend(&self, key: &str, prefix: &[u8]) -> Result<UpdateOutcome> {
        self.emit(StoreOp::Prepend, key);
        self.inner.prepend(key, prefix).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        cas: CasToken,
        value: &[u8],
        ttl: u32,
    ) -> Result<CasOutcome> {
        self.emit(StoreOp::CompareAndSwap, key);
        self.inner.compare_and_swap(key, cas, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.emit(StoreOp::Delete, key);
        self.inner.delete(key).await
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.emit(StoreOp::Increment, key);
        self.inner.increment(key, delta).await
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.emit(StoreOp::Decrement, key);
        self.inner.decrement(key, delta).await
    }
}
