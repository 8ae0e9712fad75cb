//! # Idempotency Guard
//!
//! Admits each event id at most once per TTL window using a single atomic
//! set-if-absent on the shared store.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::store::{KeyValueStore, StoreError};

/// Prefix of every idempotency key.
pub const IDEMPOTENCY_KEY_PREFIX: &str = "starkbank-event-id";

/// Value stored under an idempotency key. Only presence matters.
pub const IDEMPOTENCY_SENTINEL: &str = "1";

/// Store key for `event_id`.
pub fn idempotency_key(event_id: &str) -> String {
    format!("{}:{}", IDEMPOTENCY_KEY_PREFIX, event_id)
}

/// Guards event processing against duplicate deliveries
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn KeyValueStore>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Mark `event_id` as seen for `ttl`.
    ///
    /// Returns `true` on first sighting within the window and `false` for a
    /// duplicate. Issues exactly one store command.
    ///
    /// # Errors
    ///
    /// Returns the store error when the store cannot be reached; the event must
    /// then be treated as failed, not as new or duplicate.
    pub async fn admit(&self, event_id: &str, ttl: Duration) -> Result<bool, StoreError> {
        let key = idempotency_key(event_id);
        let admitted = self
            .store
            .set_if_absent(&key, IDEMPOTENCY_SENTINEL, ttl)
            .await?;

        debug!(event_id = %event_id, admitted, ttl_secs = ttl.as_secs(), "Idempotency check");
        Ok(admitted)
    }

    /// Forget `event_id` so a redelivery is admitted again.
    ///
    /// Best-effort: a failure is logged and otherwise ignored, leaving the key
    /// to expire with its TTL.
    pub async fn release(&self, event_id: &str) {
        let key = idempotency_key(event_id);
        if let Err(e) = self.store.delete(&key).await {
            warn!(
                event_id = %event_id,
                error = %e,
                "Failed to release idempotency key, redelivery blocked until expiry"
            );
        }
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
