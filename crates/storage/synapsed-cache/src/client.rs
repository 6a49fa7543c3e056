//! Cache client facade
//!
//! Plain key-value calls are passed straight to the store with the configured
//! default expiration filled in; set calls go through [`DeltaSet`].

use crate::append::{append_or_add, Applied};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::set::{DeltaSet, SetReport};
use crate::traits::CacheStore;
use crate::types::{AddOutcome, UpdateOutcome};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Client over an injected store handle
pub struct CacheClient<S: CacheStore + ?Sized> {
    store: Arc<S>,
    sets: DeltaSet<S>,
}

impl<S: CacheStore + ?Sized> Clone for CacheClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sets: self.sets.clone(),
        }
    }
}

impl<S: CacheStore + ?Sized> CacheClient<S> {
    /// Create a client, rejecting configurations the set engine cannot honour
    pub fn new(store: Arc<S>, config: CacheConfig) -> Result<Self> {
        Ok(Self {
            sets: DeltaSet::new(Arc::clone(&store), config)?,
            store,
        })
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Set operations sharing this client's store and configuration
    pub fn sets(&self) -> &DeltaSet<S> {
        &self.sets
    }

    fn ttl(&self, ttl: Option<u32>) -> u32 {
        self.sets.config().ttl(ttl)
    }

    /// Get a value
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.store.get(key).await
    }

    /// Get several values; absent keys are left out
    pub async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Bytes>> {
        self.store.get_multi(keys).await
    }

    /// Store a value even if the key exists
    pub async fn set(&self, key: &str, value: &[u8], ttl: Option<u32>) -> Result<()> {
        self.store.set(key, value, self.ttl(ttl)).await
    }

    /// Store several values even if their keys exist
    pub async fn set_many(&self, items: &[(&str, &[u8])], ttl: Option<u32>) -> Result<()> {
        let ttl = self.ttl(ttl);
        for (key, value) in items {
            self.store.set(key, value, ttl).await?;
        }
        Ok(())
    }

    /// Store a value only if the key does not exist
    pub async fn add(&self, key: &str, value: &[u8], ttl: Option<u32>) -> Result<AddOutcome> {
        self.store.add(key, value, self.ttl(ttl)).await
    }

    /// Store several values, each only if its key does not exist
    pub async fn add_many(
        &self,
        items: &[(&str, &[u8])],
        ttl: Option<u32>,
    ) -> Result<Vec<AddOutcome>> {
        let ttl = self.ttl(ttl);
        let mut outcomes = Vec::with_capacity(items.len());
        for (key, value) in items {
            outcomes.push(self.store.add(key, value, ttl).await?);
        }
        Ok(outcomes)
    }

    /// Store a value only if the key exists
    pub async fn replace(&self, key: &str, value: &[u8], ttl: Option<u32>) -> Result<UpdateOutcome> {
        self.store.replace(key, value, self.ttl(ttl)).await
    }

    /// Overwrite several values, each only if its key exists
    pub async fn replace_many(
        &self,
        items: &[(&str, &[u8])],
        ttl: Option<u32>,
    ) -> Result<Vec<UpdateOutcome>> {
        let ttl = self.ttl(ttl);
        let mut outcomes = Vec::with_capacity(items.len());
        for (key, value) in items {
            outcomes.push(self.store.replace(key, value, ttl).await?);
        }
        Ok(outcomes)
    }

    /// Delete a key, returning whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete(key).await
    }

    /// Delete several keys, returning how many existed
    pub async fn delete_many(&self, keys: &[&str]) -> Result<usize> {
        let mut deleted = 0;
        for key in keys {
            if self.store.delete(key).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Increment a counter if it exists
    pub async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.store.increment(key, delta).await
    }

    /// Decrement a counter if it exists
    pub async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.store.decrement(key, delta).await
    }

    /// Append to a value if the key exists
    pub async fn append(&self, key: &str, suffix: &[u8]) -> Result<UpdateOutcome> {
        self.store.append(key, suffix).await
    }

    /// Prepend to a value if the key exists
    pub async fn prepend(&self, key: &str, prefix: &[u8]) -> Result<UpdateOutcome> {
        self.store.prepend(key, prefix).await
    }

    /// Append to a value, creating the key if it does not exist
    pub async fn append_or_add(&self, key: &str, value: &[u8], ttl: Option<u32>) -> Result<Applied> {
        let attempts = self.sets.config().set.max_append_attempts;
        append_or_add(self.store.as_ref(), key, value, self.ttl(ttl), attempts).await
    }

    /// Add members to the set at `key`
    pub async fn set_insert<M>(&self, key: &str, members: &[M], ttl: Option<u32>) -> Result<Applied>
    where
        M: AsRef<[u8]> + Sync,
    {
        self.sets.insert(key, members, ttl).await
    }

    /// Remove members from the set at `key`
    pub async fn set_remove<M>(&self, key: &str, members: &[M], ttl: Option<u32>) -> Result<Applied>
    where
        M: AsRef<[u8]> + Sync,
    {
        self.sets.remove(key, members, ttl).await
    }

    /// Members of the set at `key`
    pub async fn set_items(&self, key: &str) -> Result<HashSet<Bytes>> {
        self.sets.members(key).await
    }

    /// Members of the set at `key` plus log statistics
    pub async fn set_report(&self, key: &str) -> Result<SetReport> {
        self.sets.read(key).await
    }

    /// Whether `member` belongs to the set at `key`
    pub async fn set_contains(&self, key: &str, member: &[u8]) -> Result<bool> {
        self.sets.contains(key, member).await
    }
}
