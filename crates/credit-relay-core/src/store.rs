//! # Key-Value Store
//!
//! Abstraction over the shared store that holds idempotency flags.
//!
//! The only operation the pipeline relies on for correctness is
//! [`KeyValueStore::set_if_absent`], which must be atomic across every process
//! sharing the store.

use async_trait::async_trait;
use std::time::Duration;

/// Errors returned by key-value store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Key-value store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Key-value store rejected command: {message}")]
    CommandFailed { message: String },
}

impl StoreError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::CommandFailed { .. } => false,
        }
    }
}

/// Interface for the shared key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically store `value` under `key` with expiry `ttl` unless the key exists.
    ///
    /// Returns `true` if the value was stored, `false` if the key was already present.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
