//! Store backend implementations

#[cfg(feature = "memory")]
pub mod memory;

// Re-export backend implementations
#[cfg(feature = "memory")]
pub use memory::{MemoryStore, StoreStats};
