//! In-memory store backend for testing, development and embedding
//!
//! Items follow memcached semantics: every write assigns a fresh CAS version,
//! expired items vanish lazily on access, and once `max_entries` is reached the
//! least recently used item is evicted. TTLs are always relative to now.

use crate::config::MemoryConfig;
use crate::error::{CacheError, Result};
use crate::traits::CacheStore;
use crate::types::{validate_key, AddOutcome, CasOutcome, CasToken, UpdateOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Reads that found a live item
    pub get_hits: u64,
    /// Reads that found nothing
    pub get_misses: u64,
    /// Successful writes of any kind
    pub writes: u64,
    /// Items dropped to make room
    pub evictions: u64,
    /// Items currently held, including expired ones not yet reclaimed
    pub items: u64,
}

#[derive(Debug)]
struct Item {
    value: Vec<u8>,
    cas: u64,
    expires_at: Option<Instant>,
}

impl Item {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
struct Inner {
    items: LruCache<String, Item>,
    next_cas: u64,
    stats: StoreStats,
}

impl Inner {
    fn next_cas(&mut self) -> u64 {
        self.next_cas += 1;
        self.next_cas
    }

    /// Live item for `key`, reclaiming it first if it has expired
    fn live(&mut self, key: &str) -> Option<&mut Item> {
        let now = Instant::now();
        if self.items.peek(key).is_some_and(|item| item.is_expired(now)) {
            self.items.pop(key);
            self.stats.items = self.items.len() as u64;
            return None;
        }
        self.items.get_mut(key)
    }

    fn store(&mut self, key: &str, value: Vec<u8>, ttl: u32) -> u64 {
        let cas = self.next_cas();
        let item = Item {
            value,
            cas,
            expires_at: expiry(ttl),
        };
        if let Some((displaced, _)) = self.items.push(key.to_string(), item) {
            if displaced != key {
                debug!(key = %displaced, "Evicted least recently used item");
                self.stats.evictions += 1;
            }
        }
        self.stats.writes += 1;
        self.stats.items = self.items.len() as u64;
        cas
    }

    fn touch_write(&mut self, key: &str, value: Vec<u8>) {
        let cas = self.next_cas();
        if let Some(item) = self.items.get_mut(key) {
            item.value = value;
            item.cas = cas;
            self.stats.writes += 1;
        }
    }
}

fn expiry(ttl: u32) -> Option<Instant> {
    (ttl > 0).then(|| Instant::now() + Duration::from_secs(u64::from(ttl)))
}

fn parse_counter(value: &[u8]) -> Result<u64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            CacheError::InvalidValue("cannot increment or decrement non-numeric value".to_string())
        })
}

/// In-memory store implementation
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    config: MemoryConfig,
}

impl MemoryStore {
    /// Create a new memory store; a zero `max_entries` is treated as one
    pub fn new(config: MemoryConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: LruCache::new(capacity),
                next_cas: 0,
                stats: StoreStats::default(),
            })),
            config,
        }
    }

    /// Create with a maximum item count and default limits otherwise
    pub fn with_capacity(max_entries: usize) -> Self {
        Self::new(MemoryConfig {
            max_entries,
            ..MemoryConfig::default()
        })
    }

    /// Snapshot of the store statistics
    pub fn stats(&self) -> StoreStats {
        self.lock().stats.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock()
    }

    fn check(&self, key: &str, len: usize) -> Result<()> {
        validate_key(key)?;
        if len > self.config.max_value_bytes {
            return Err(CacheError::ValueTooLarge {
                size: len,
                max: self.config.max_value_bytes,
            });
        }
        Ok(())
    }

    fn concat(&self, key: &str, bytes: &[u8], at_end: bool) -> Result<UpdateOutcome> {
        validate_key(key)?;
        let mut inner = self.lock();
        let Some(item) = inner.live(key) else {
            return Ok(UpdateOutcome::NotFound);
        };
        let size = item.value.len() + bytes.len();
        if size > self.config.max_value_bytes {
            return Err(CacheError::ValueTooLarge {
                size,
                max: self.config.max_value_bytes,
            });
        }
        let mut value = Vec::with_capacity(size);
        if at_end {
            value.extend_from_slice(&item.value);
            value.extend_from_slice(bytes);
        } else {
            value.extend_from_slice(bytes);
            value.extend_from_slice(&item.value);
        }
        inner.touch_write(key, value);
        Ok(UpdateOutcome::Stored)
    }

    fn adjust(&self, key: &str, delta: u64, increment: bool) -> Result<Option<u64>> {
        validate_key(key)?;
        let mut inner = self.lock();
        let Some(item) = inner.live(key) else {
            return Ok(None);
        };
        let current = parse_counter(&item.value)?;
        let next = if increment {
            current.wrapping_add(delta)
        } else {
            current.saturating_sub(delta)
        };
        inner.touch_write(key, next.to_string().into_bytes());
        Ok(Some(next))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn gets(&self, key: &str) -> Result<Option<(Bytes, CasToken)>> {
        validate_key(key)?;
        let mut inner = self.lock();
        let found = inner
            .live(key)
            .map(|item| (Bytes::copy_from_slice(&item.value), CasToken(item.cas)));
        if found.is_some() {
            inner.stats.get_hits += 1;
        } else {
            inner.stats.get_misses += 1;
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: u32) -> Result<()> {
        self.check(key, value.len())?;
        self.lock().store(key, value.to_vec(), ttl);
        Ok(())
    }

    async fn add(&self, key: &str, value: &[u8], ttl: u32) -> Result<AddOutcome> {
        self.check(key, value.len())?;
        let mut inner = self.lock();
        if inner.live(key).is_some() {
            return Ok(AddOutcome::Exists);
        }
        inner.store(key, value.to_vec(), ttl);
        Ok(AddOutcome::Stored)
    }

    async fn replace(&self, key: &str, value: &[u8], ttl: u32) -> Result<UpdateOutcome> {
        self.check(key, value.len())?;
        let mut inner = self.lock();
        if inner.live(key).is_none() {
            return Ok(UpdateOutcome::NotFound);
        }
        inner.store(key, value.to_vec(), ttl);
        Ok(UpdateOutcome::Stored)
    }

    async fn append(&self, key: &str, suffix: &[u8]) -> Result<UpdateOutcome> {
        self.concat(key, suffix, true)
    }

    async fn prepend(&self, key: &str, prefix: &[u8]) -> Result<UpdateOutcome> {
        self.concat(key, prefix, false)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        cas: CasToken,
        value: &[u8],
        ttl: u32,
    ) -> Result<CasOutcome> {
        self.check(key, value.len())?;
        let mut inner = self.lock();
        let current = match inner.live(key) {
            Some(item) => item.cas,
            None => return Ok(CasOutcome::NotFound),
        };
        if current != cas.0 {
            return Ok(CasOutcome::Conflict);
        }
        inner.store(key, value.to_vec(), ttl);
        Ok(CasOutcome::Swapped)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let mut inner = self.lock();
        let existed = inner.live(key).is_some();
        if existed {
            inner.items.pop(key);
            inner.stats.items = inner.items.len() as u64;
        }
        Ok(existed)
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.adjust(key, delta, true)
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.adjust(key, delta, false)
    }
}
