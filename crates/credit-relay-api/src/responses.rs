//! Response types and health checking for the API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use credit_relay_core::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Response Types
// ============================================================================

/// Webhook processing response
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, HealthCheckResult>,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, HealthCheckResult>,
}

// ============================================================================
// Supporting Types
// ============================================================================

/// Health check result for individual components
#[derive(Debug, Serialize, Clone)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub message: String,
    pub duration_ms: u64,
}

/// Overall health status
#[derive(Debug)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub checks: HashMap<String, HealthCheckResult>,
}

// ============================================================================
// Trait Definitions
// ============================================================================

/// Interface for system health monitoring
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Liveness: the process can serve requests
    async fn check_basic_health(&self) -> HealthStatus;

    /// Readiness: dependencies needed to process webhooks are reachable
    async fn check_readiness(&self) -> HealthStatus;
}

// ============================================================================
// Implementations
// ============================================================================

fn service_check() -> HealthCheckResult {
    HealthCheckResult {
        healthy: true,
        message: "Service is running".to_string(),
        duration_ms: 0,
    }
}

/// Health checker that reports ready once the idempotency store answers a ping
pub struct StoreHealthChecker {
    store: Arc<dyn KeyValueStore>,
}

impl StoreHealthChecker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthChecker for StoreHealthChecker {
    async fn check_basic_health(&self) -> HealthStatus {
        let mut checks = HashMap::new();
        checks.insert("service".to_string(), service_check());

        HealthStatus {
            is_healthy: true,
            checks,
        }
    }

    async fn check_readiness(&self) -> HealthStatus {
        let start = std::time::Instant::now();
        let result = self.store.ping().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let store_check = match result {
            Ok(()) => HealthCheckResult {
                healthy: true,
                message: "Key-value store reachable".to_string(),
                duration_ms,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                message: e.to_string(),
                duration_ms,
            },
        };

        let is_healthy = store_check.healthy;
        let mut checks = HashMap::new();
        checks.insert("service".to_string(), service_check());
        checks.insert("key_value_store".to_string(), store_check);

        HealthStatus { is_healthy, checks }
    }
}
