//! Append-or-create protocol
//!
//! Appending to a missing key fails and creating an existing key fails, so a
//! durable append is a small loop: append, else create, else some other writer
//! created the key in between and the append is retried. The loop is bounded;
//! running out of rounds leaves the store untouched and reports
//! [`CacheError::RaceExhausted`].

use crate::error::{CacheError, Result};
use crate::traits::CacheStore;
use crate::types::{AddOutcome, UpdateOutcome};
use tracing::{debug, warn};

/// How a fragment ended up in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Appended to an existing value in round `attempts`
    Appended {
        /// Rounds used, starting at 1
        attempts: u32,
    },
    /// Created the key in round `attempts`
    Created {
        /// Rounds used, starting at 1
        attempts: u32,
    },
    /// Nothing to write
    Empty,
}

impl Applied {
    /// Rounds used to apply the fragment
    pub fn attempts(&self) -> u32 {
        match self {
            Applied::Appended { attempts } | Applied::Created { attempts } => *attempts,
            Applied::Empty => 0,
        }
    }
}

/// Append `fragment` to `key`, creating the key with `ttl` if it does not exist.
///
/// `ttl` only applies when this call creates the key; appends keep the
/// existing expiration. Store errors abort immediately and are not retried.
pub async fn append_or_add<S>(
    store: &S,
    key: &str,
    fragment: &[u8],
    ttl: u32,
    max_attempts: u32,
) -> Result<Applied>
where
    S: CacheStore + ?Sized,
{
    if fragment.is_empty() {
        return Ok(Applied::Empty);
    }

    for attempt in 1..=max_attempts {
        match store.append(key, fragment).await? {
            UpdateOutcome::Stored => return Ok(Applied::Appended { attempts: attempt }),
            UpdateOutcome::NotFound => {
                debug!(key, attempt, "Append missed, trying to create");
            }
        }

        match store.add(key, fragment, ttl).await? {
            AddOutcome::Stored => return Ok(Applied::Created { attempts: attempt }),
            AddOutcome::Exists => {
                debug!(key, attempt, "Key created concurrently, retrying append");
            }
        }
    }

    warn!(key, attempts = max_attempts, "Giving up on append-or-create race");
    Err(CacheError::RaceExhausted {
        key: key.to_string(),
        attempts: max_attempts,
    })
}
