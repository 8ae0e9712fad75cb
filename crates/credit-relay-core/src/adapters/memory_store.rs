//! # In-Memory Key-Value Store
//!
//! Process-local [`KeyValueStore`] for tests and single-instance development.
//! Expiry is evaluated lazily on access.

use crate::store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe in-memory key-value store
///
/// A single mutex guards check-and-insert, which makes `set_if_absent` atomic
/// within the process. Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`, if present and not expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| entry.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.get(key) {
            if existing.expires_at > now {
                return Ok(false);
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
