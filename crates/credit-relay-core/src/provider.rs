//! # Payment Provider
//!
//! Types and interface for the payment provider the relay talks to.
//!
//! [`PaymentProviderClient`] covers the three provider calls the pipeline
//! needs: verifying and decoding a webhook delivery, looking up how much was
//! paid for an invoice, and creating a transfer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ErrorCategory;

/// A webhook event whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEvent {
    pub id: String,
    pub subscription: String,
    pub log_type: String,
    pub invoice: Option<InvoiceRecord>,
    pub workspace_id: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// Invoice data carried by an invoice log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: String,
    /// Nominal amount in cents
    pub amount: i64,
    /// Fee charged by the provider in cents
    pub fee: i64,
}

/// A transfer to be created by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in cents
    pub amount: i64,
    pub tax_id: String,
    pub name: String,
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,
    pub account_type: String,
    pub tags: Option<Vec<String>>,
}

/// Errors returned by payment provider implementations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid digital signature")]
    InvalidSignature,

    #[error("Malformed event: {message}")]
    MalformedEvent { message: String },

    #[error("Provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("Provider rejected request: {message}")]
    Rejected { message: String },
}

impl ProviderError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::InvalidSignature => false,
            Self::MalformedEvent { .. } => false,
            Self::Rejected { .. } => false,
        }
    }

    /// Get error category for monitoring
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSignature => ErrorCategory::Security,
            Self::Unavailable { .. } => ErrorCategory::Transient,
            Self::MalformedEvent { .. } => ErrorCategory::Permanent,
            Self::Rejected { .. } => ErrorCategory::Permanent,
        }
    }
}

/// Interface to the payment provider
#[async_trait]
pub trait PaymentProviderClient: Send + Sync {
    /// Verify `signature` over the exact `body` bytes and decode the event.
    ///
    /// Fails with [`ProviderError::InvalidSignature`] when the body does not
    /// match the signature.
    async fn verify_and_parse(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<VerifiedEvent, ProviderError>;

    /// Amount actually paid for `invoice_id`, in cents.
    async fn lookup_payment(&self, invoice_id: &str) -> Result<i64, ProviderError>;

    /// Create a single transfer and return its provider id.
    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, ProviderError>;
}
