//! # Credit Relay Core
//!
//! Core business logic for the Credit Relay webhook receiver.
//!
//! This crate contains the pipeline that turns a Stark Bank webhook delivery
//! into at most one outbound transfer: signature verification, idempotent
//! admission of events, classification of invoice logs and the transfer
//! decision itself.
//!
//! ## Architecture
//!
//! The pipeline depends only on trait abstractions:
//! - [`provider::PaymentProviderClient`] for everything that talks to Stark Bank
//! - [`store::KeyValueStore`] for the shared idempotency flag
//!
//! Production implementations (Stark Bank HTTP, Redis) and in-memory ones live
//! in [`adapters`] and are injected at startup.
//!
//! ## Usage
//!
//! ```rust
//! use credit_relay_core::idempotency::idempotency_key;
//!
//! assert_eq!(idempotency_key("5021499834105856"), "starkbank-event-id:5021499834105856");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod adapters;
pub mod classifier;
pub mod idempotency;
pub mod provider;
pub mod store;
pub mod transfer;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::{EventClassifier, InvoiceLog, InvoiceLogStatus};
pub use idempotency::IdempotencyGuard;
pub use provider::{
    InvoiceRecord, PaymentProviderClient, ProviderError, TransferRequest, VerifiedEvent,
};
pub use store::{KeyValueStore, StoreError};
pub use transfer::{DestinationAccount, TransferDispatcher};
pub use webhook::{
    InboundEvent, InvoiceWebhookProcessor, WebhookError, WebhookOutcome, WebhookProcessor,
};

/// High-level error categorization for retry and alerting decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Temporary failures that should be retried
    Transient,
    /// Permanent failures that won't succeed on retry
    Permanent,
    /// Security-related failures requiring immediate attention
    Security,
    /// Configuration errors preventing startup
    Configuration,
}

impl ErrorCategory {
    /// Stable label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Security => "security",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
