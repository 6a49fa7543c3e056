//! Error types for the cache client

use thiserror::Error;

/// Type alias for Results using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Network-related error (for remote stores)
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The append-or-create loop ran out of attempts
    #[error("Append-or-create race not resolved for key {key} after {attempts} attempts")]
    RaceExhausted {
        /// Key the fragment was destined for
        key: String,
        /// Number of append/create rounds performed
        attempts: u32,
    },

    /// Invalid key format
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid value format
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Value exceeds the store's item size limit
    #[error("Value too large: {size} bytes exceeds limit of {max} bytes")]
    ValueTooLarge {
        /// Size of the rejected value in bytes
        size: usize,
        /// Configured maximum in bytes
        max: usize,
    },

    /// Other error with custom message
    #[error("{0}")]
    Other(String),
}

/// Network-related errors for remote stores
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Server not reachable
    #[error("Server unreachable: {0}")]
    Unreachable(String),
}

impl CacheError {
    /// Check if the whole operation may succeed when retried by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Network(_) | CacheError::RaceExhausted { .. })
    }

    /// Check if the error is the append-or-create bound being exceeded
    pub fn is_race_exhausted(&self) -> bool {
        matches!(self, CacheError::RaceExhausted { .. })
    }

    /// Check if the error was caused by the caller's input
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidKey(_)
                | CacheError::InvalidValue(_)
                | CacheError::ValueTooLarge { .. }
        )
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
