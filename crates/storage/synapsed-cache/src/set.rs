//! Delta-log sets stored inside a single cache entry
//!
//! Mutations only ever append encoded records. Reads replay the whole log and,
//! when too many records are dead, try once to swap the log for its compacted
//! form under the CAS token of the read. Losing that race is harmless: the
//! membership returned comes from the replay, not from the rewrite.

use crate::append::{append_or_add, Applied};
use crate::codec::{encode_batch, encode_compacted, parse_log, replay, Sign};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::traits::CacheStore;
use crate::types::{CasOutcome, CasToken};
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to the log during a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// The key was absent or the log was dense enough
    NotNeeded,
    /// The log was replaced by its compacted form
    Compacted,
    /// Another writer changed the log after the read
    Conflict,
    /// The key disappeared after the read
    Vanished,
    /// The store failed the rewrite; the error was logged and dropped
    Failed,
}

/// Result of reading a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetReport {
    /// Current members
    pub members: HashSet<Bytes>,
    /// Records in the log as read, including overridden ones
    pub total_ops: usize,
    /// Tokens skipped as undecodable
    pub malformed: usize,
    /// Compaction attempted by this read
    pub compaction: CompactionOutcome,
}

impl SetReport {
    fn empty() -> Self {
        Self {
            members: HashSet::new(),
            total_ops: 0,
            malformed: 0,
            compaction: CompactionOutcome::NotNeeded,
        }
    }
}

/// Handle for delta-log sets kept in a store
pub struct DeltaSet<S: CacheStore + ?Sized> {
    store: Arc<S>,
    config: CacheConfig,
}

impl<S: CacheStore + ?Sized> Clone for DeltaSet<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: CacheStore + ?Sized> DeltaSet<S> {
    /// Create a set handle over `store`, rejecting settings the engine cannot honour
    pub fn new(store: Arc<S>, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Settings in effect
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Add `members` to the set at `key`
    pub async fn insert<M>(&self, key: &str, members: &[M], ttl: Option<u32>) -> Result<Applied>
    where
        M: AsRef<[u8]> + Sync,
    {
        self.apply(key, encode_batch(members, Sign::Insert), ttl).await
    }

    /// Remove `members` from the set at `key`
    pub async fn remove<M>(&self, key: &str, members: &[M], ttl: Option<u32>) -> Result<Applied>
    where
        M: AsRef<[u8]> + Sync,
    {
        self.apply(key, encode_batch(members, Sign::Remove), ttl).await
    }

    /// Add a single member
    pub async fn insert_member(&self, key: &str, member: &[u8], ttl: Option<u32>) -> Result<Applied> {
        self.insert(key, &[member], ttl).await
    }

    /// Remove a single member
    pub async fn remove_member(&self, key: &str, member: &[u8], ttl: Option<u32>) -> Result<Applied> {
        self.remove(key, &[member], ttl).await
    }

    /// Current members of the set at `key`
    pub async fn members(&self, key: &str) -> Result<HashSet<Bytes>> {
        Ok(self.read(key).await?.members)
    }

    /// Whether `member` is currently in the set at `key`
    pub async fn contains(&self, key: &str, member: &[u8]) -> Result<bool> {
        Ok(self.members(key).await?.contains(member))
    }

    /// Replay the set at `key`, compacting the log if it has become sparse
    pub async fn read(&self, key: &str) -> Result<SetReport> {
        let Some((raw, token)) = self.store.gets(key).await? else {
            return Ok(SetReport::empty());
        };

        let parsed = parse_log(&raw);
        let replayed = replay(&parsed.records);
        let threshold = self.config.set.compaction_threshold;

        let compaction = match replayed.density() {
            Some(density) if density < threshold => {
                debug!(
                    key,
                    live = replayed.members.len(),
                    total = replayed.total_ops,
                    density,
                    "Compacting sparse set log"
                );
                self.compact(key, token, &replayed.members).await
            }
            _ => CompactionOutcome::NotNeeded,
        };

        Ok(SetReport {
            members: replayed.members,
            total_ops: replayed.total_ops,
            malformed: parsed.malformed,
            compaction,
        })
    }

    async fn apply(&self, key: &str, fragment: String, ttl: Option<u32>) -> Result<Applied> {
        append_or_add(
            self.store.as_ref(),
            key,
            fragment.as_bytes(),
            self.config.ttl(ttl),
            self.config.set.max_append_attempts,
        )
        .await
    }

    async fn compact(
        &self,
        key: &str,
        token: CasToken,
        members: &HashSet<Bytes>,
    ) -> CompactionOutcome {
        let compacted = encode_compacted(members);
        let ttl = self.config.expiration_secs;
        match self
            .store
            .compare_and_swap(key, token, compacted.as_bytes(), ttl)
            .await
        {
            Ok(CasOutcome::Swapped) => CompactionOutcome::Compacted,
            Ok(CasOutcome::Conflict) => {
                debug!(key, "Set log changed since read, leaving it as is");
                CompactionOutcome::Conflict
            }
            Ok(CasOutcome::NotFound) => {
                debug!(key, "Set log vanished before compaction");
                CompactionOutcome::Vanished
            }
            Err(error) => {
                warn!(key, %error, "Compaction rewrite failed");
                CompactionOutcome::Failed
            }
        }
    }
}
