//! Store adapter trait that the cache client and set engine are written against

use crate::error::Result;
use crate::types::{AddOutcome, CasOutcome, CasToken, UpdateOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

/// Atomic single-key primitives of a memcached-style store.
///
/// Every method targets one key and must be atomic at the store level; callers
/// never lock. `ttl` is in seconds and `0` means the item never expires.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value together with its CAS token
    async fn gets(&self, key: &str) -> Result<Option<(Bytes, CasToken)>>;

    /// Get a value
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.gets(key).await?.map(|(value, _)| value))
    }

    /// Get every present key among `keys`; absent keys are left out of the map
    async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Bytes>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key).await? {
                found.insert((*key).to_string(), value);
            }
        }
        Ok(found)
    }

    /// Store a value unconditionally
    async fn set(&self, key: &str, value: &[u8], ttl: u32) -> Result<()>;

    /// Store a value only if the key is absent
    async fn add(&self, key: &str, value: &[u8], ttl: u32) -> Result<AddOutcome>;

    /// Store a value only if the key exists
    async fn replace(&self, key: &str, value: &[u8], ttl: u32) -> Result<UpdateOutcome>;

    /// Atomically append bytes to an existing value
    async fn append(&self, key: &str, suffix: &[u8]) -> Result<UpdateOutcome>;

    /// Atomically prepend bytes to an existing value
    async fn prepend(&self, key: &str, prefix: &[u8]) -> Result<UpdateOutcome>;

    /// Replace a value only if it is unchanged since `cas` was issued
    async fn compare_and_swap(
        &self,
        key: &str,
        cas: CasToken,
        value: &[u8],
        ttl: u32,
    ) -> Result<CasOutcome>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Add `delta` to a decimal counter; `None` if the key is absent
    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>>;

    /// Subtract `delta` from a decimal counter, saturating at zero; `None` if the key is absent
    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>>;
}
