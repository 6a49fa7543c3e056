//! Type definitions shared by stores and the set engine

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};

/// Longest key memcached accepts
pub const MAX_KEY_LENGTH: usize = 250;

/// Opaque version marker returned alongside a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CasToken(pub u64);

/// Result of a create-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The key was absent and now holds the value
    Stored,
    /// The key already existed; nothing was written
    Exists,
}

/// Result of a write that requires the key to exist (replace, append, prepend)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The existing item was updated
    Stored,
    /// The key was absent; nothing was written
    NotFound,
}

/// Result of a compare-and-swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The token matched and the value was replaced
    Swapped,
    /// The item changed since the token was issued
    Conflict,
    /// The item no longer exists
    NotFound,
}

/// Check a key against memcached's rules: 1..=250 bytes, no whitespace or control characters
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key is {} bytes, limit is {MAX_KEY_LENGTH}",
            key.len()
        )));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CacheError::InvalidKey(format!(
            "key {key:?} contains whitespace or control characters"
        )));
    }
    Ok(())
}
