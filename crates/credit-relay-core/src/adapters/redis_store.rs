//! # Redis Key-Value Store
//!
//! [`KeyValueStore`] backed by Redis. `set_if_absent` maps to
//! `SET key value NX EX ttl`, which Redis executes atomically, so every
//! replica of the service shares one idempotency window.

use crate::store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Upper bound for establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis connection parameters
#[derive(Clone)]
pub struct RedisStoreConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

// Security: Don't expose the password in debug output
impl fmt::Debug for RedisStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "password",
                &self.password.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl RedisStoreConfig {
    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                password: self.password.clone().filter(|p| !p.is_empty()),
                ..Default::default()
            },
        }
    }
}

/// Redis-backed key-value store
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    endpoint: String,
}

impl RedisStore {
    /// Create a store for `config`. No connection is made until first use.
    pub fn new(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(config.connection_info()).map_err(|e| StoreError::Unavailable {
                message: format!("Failed to create Redis client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}:{}", config.host, config.port),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        let connect = self.client.get_multiplexed_async_connection();
        match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
            Ok(Ok(connection)) => Ok(connection),
            Ok(Err(e)) => Err(StoreError::Unavailable {
                message: format!("Failed to connect to Redis at {}: {}", self.endpoint, e),
            }),
            Err(_) => Err(StoreError::Unavailable {
                message: format!("Timed out connecting to Redis at {}", self.endpoint),
            }),
        }
    }
}

fn command_error(command: &str, error: redis::RedisError) -> StoreError {
    if error.is_io_error() || error.is_timeout() || error.is_connection_dropped() {
        StoreError::Unavailable {
            message: format!("Redis {} failed: {}", command, error),
        }
    } else {
        StoreError::CommandFailed {
            message: format!("Redis {} failed: {}", command, error),
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.get_connection().await?;

        // EX rejects 0, so sub-second TTLs round up.
        let ttl_secs = ttl.as_secs().max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| command_error("SET NX", e))?;

        let stored = reply.is_some();
        debug!(key = %key, stored, ttl_secs, "Redis SET NX");
        Ok(stored)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;

        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| command_error("DEL", e))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| command_error("PING", e))?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "redis_store_tests.rs"]
mod tests;
