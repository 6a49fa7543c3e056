//! Common test utilities and fixtures for synapsed-cache

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use synapsed_cache::backends::MemoryStore;
use synapsed_cache::error::NetworkError;
use synapsed_cache::{
    AddOutcome, CacheConfig, CacheError, CacheStore, CasOutcome, CasToken, DeltaSet,
    MonitoringConfig, ObservableStore, Result, StoreEvent, StoreOp, UpdateOutcome,
};
use tokio::sync::broadcast;

static TRACING: Once = Once::new();

/// Route tracing output through the test harness
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "synapsed_cache=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Build a member set from string literals
pub fn members(items: &[&str]) -> HashSet<Bytes> {
    items.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
}

/// Misbehaviour injected by [`FaultyStore`]
#[derive(Debug, Clone)]
pub enum Fault {
    /// Append always misses and add always finds the key
    PersistentContention,
    /// On the first add, another writer creates the key with this value first
    RivalCreatesFirst(Vec<u8>),
    /// Before each compare-and-swap, another writer appends this value
    AppendBeforeCas(Vec<u8>),
    /// Before each compare-and-swap, another writer deletes the key
    DeleteBeforeCas,
    /// Compare-and-swap fails with a network error
    CasUnreachable,
    /// Reads fail with a network error
    ReadsUnreachable,
}

/// Memory store with one injected fault
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
    rival_done: AtomicBool,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self::over(MemoryStore::default(), fault)
    }

    pub fn over(inner: MemoryStore, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            rival_done: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

fn unreachable_error() -> CacheError {
    CacheError::Network(NetworkError::Unreachable("127.0.0.1:11211".to_string()))
}

#[async_trait]
impl CacheStore for FaultyStore {
    async fn gets(&self, key: &str) -> Result<Option<(Bytes, CasToken)>> {
        if matches!(self.fault, Fault::ReadsUnreachable) {
            return Err(unreachable_error());
        }
        self.inner.gets(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: u32) -> Result<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn add(&self, key: &str, value: &[u8], ttl: u32) -> Result<AddOutcome> {
        match &self.fault {
            Fault::PersistentContention => return Ok(AddOutcome::Exists),
            Fault::RivalCreatesFirst(rival) if !self.rival_done.swap(true, Ordering::SeqCst) => {
                self.inner.add(key, rival, ttl).await?;
            }
            _ => {}
        }
        self.inner.add(key, value, ttl).await
    }

    async fn replace(&self, key: &str, value: &[u8], ttl: u32) -> Result<UpdateOutcome> {
        self.inner.replace(key, value, ttl).await
    }

    async fn append(&self, key: &str, suffix: &[u8]) -> Result<UpdateOutcome> {
        if matches!(self.fault, Fault::PersistentContention) {
            return Ok(UpdateOutcome::NotFound);
        }
        self.inner.append(key, suffix).await
    }

    async fn prepend(&self, key: &str, prefix: &[u8]) -> Result<UpdateOutcome> {
        self.inner.prepend(key, prefix).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        cas: CasToken,
        value: &[u8],
        ttl: u32,
    ) -> Result<CasOutcome> {
        match &self.fault {
            Fault::AppendBeforeCas(rival) => {
                self.inner.append(key, rival).await?;
            }
            Fault::DeleteBeforeCas => {
                self.inner.delete(key).await?;
            }
            Fault::CasUnreachable => return Err(unreachable_error()),
            _ => {}
        }
        self.inner.compare_and_swap(key, cas, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.inner.increment(key, delta).await
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.inner.decrement(key, delta).await
    }
}

/// A set handle over an observable store, plus a receiver for its events
pub struct ObservedSet<S: CacheStore> {
    pub set: DeltaSet<ObservableStore<S>>,
    pub events: broadcast::Receiver<StoreEvent>,
}

impl<S: CacheStore> ObservedSet<S> {
    pub fn new(store: S, config: CacheConfig) -> Self {
        let observable = ObservableStore::new(Arc::new(store), MonitoringConfig::default());
        let events = observable.subscribe();
        let set = DeltaSet::new(Arc::new(observable), config).expect("Set config should be valid");
        Self { set, events }
    }

    /// Primitives issued since the last drain
    pub fn drain(&mut self) -> Vec<StoreOp> {
        let mut ops = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            ops.push(event.op);
        }
        ops
    }

    /// How many times `op` was issued since the last drain
    pub fn count(&mut self, op: StoreOp) -> usize {
        self.drain().into_iter().filter(|o| *o == op).count()
    }
}
