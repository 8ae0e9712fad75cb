//! # Infrastructure Adapters
//!
//! Implementations of the key-value store and payment provider interfaces.

pub mod memory_store;
pub mod redis_store;
pub mod starkbank_provider;

pub use memory_store::InMemoryStore;
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use starkbank_provider::StarkBankProvider;
