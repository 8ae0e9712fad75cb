//! # Webhook Processing Module
//!
//! Sequences a Stark Bank webhook delivery through the pipeline:
//!
//! 1. body present
//! 2. `Digital-Signature` header present
//! 3. signature valid
//! 4. event admitted by the idempotency guard
//! 5. event is an invoice log
//! 6. invoice log is `credited`
//! 7. transfer dispatched
//!
//! Each early exit is a [`WebhookOutcome`] that carries its HTTP status and
//! messages. Store and provider failures are returned as [`WebhookError`] so the
//! caller can let the provider redeliver.

use crate::classifier::EventClassifier;
use crate::idempotency::IdempotencyGuard;
use crate::provider::{PaymentProviderClient, ProviderError};
use crate::store::{KeyValueStore, StoreError};
use crate::transfer::{DestinationAccount, TransferDispatcher};
use crate::ErrorCategory;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Header carrying the Base64 signature of the body.
pub const SIGNATURE_HEADER: &str = "Digital-Signature";

/// Default lifetime of idempotency flags.
pub const DEFAULT_EVENT_TTL: Duration = Duration::from_secs(86_400);

// ============================================================================
// Core Types
// ============================================================================

/// Raw webhook delivery as received over HTTP
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub body: Option<Bytes>,
    pub headers: HashMap<String, String>,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    /// Create new inbound event
    pub fn new(body: Option<Bytes>, headers: HashMap<String, String>) -> Self {
        Self {
            body,
            headers,
            received_at: Utc::now(),
        }
    }

    /// Body bytes; an empty body counts as absent.
    pub fn body(&self) -> Option<&[u8]> {
        self.body
            .as_deref()
            .filter(|body| !body.is_empty())
    }

    /// `Digital-Signature` header value, matched case-insensitively.
    ///
    /// Blank values count as absent.
    pub fn signature(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(SIGNATURE_HEADER))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Terminal result of processing one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    MissingBody,
    MissingSignatureHeader,
    InvalidSignature,
    DuplicateEvent {
        event_id: String,
    },
    UnrelatedEvent {
        event_id: String,
    },
    NonCreditedEvent {
        event_id: String,
        invoice_id: String,
        log_type: String,
    },
    TransferCreated {
        event_id: String,
        transfer_id: String,
    },
}

impl WebhookOutcome {
    /// HTTP status returned to the provider.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingBody => 400,
            Self::MissingSignatureHeader | Self::InvalidSignature => 401,
            Self::DuplicateEvent { .. }
            | Self::UnrelatedEvent { .. }
            | Self::NonCreditedEvent { .. }
            | Self::TransferCreated { .. } => 200,
        }
    }

    /// Message returned in the response body.
    pub fn response_message(&self) -> &'static str {
        match self {
            Self::MissingBody => "Request must contain body",
            Self::MissingSignatureHeader => {
                "Digital-Signature not provided on headers, can not confirm webhook authenticity"
            }
            Self::InvalidSignature => "Invalid Digital-Signature",
            Self::DuplicateEvent { .. }
            | Self::UnrelatedEvent { .. }
            | Self::NonCreditedEvent { .. }
            | Self::TransferCreated { .. } => "Ok",
        }
    }

    /// Message written to the service log.
    pub fn log_message(&self) -> String {
        match self {
            Self::MissingBody => "Received a request without body".to_string(),
            Self::MissingSignatureHeader => {
                "Received a request without Digital-Signature on headers".to_string()
            }
            Self::InvalidSignature => {
                "Received a request with invalid Digital-Signature headers".to_string()
            }
            Self::DuplicateEvent { event_id } => format!(
                "Event with id {} was already processed or is being processed",
                event_id
            ),
            Self::UnrelatedEvent { .. } => "Received event was not related with invoice".to_string(),
            Self::NonCreditedEvent {
                invoice_id,
                log_type,
                ..
            } => format!(
                "Received event for invoice with id {} is type {} instead of credited",
                invoice_id, log_type
            ),
            Self::TransferCreated { transfer_id, .. } => {
                format!("Created transfer with id {}", transfer_id)
            }
        }
    }

    /// Stable label used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingBody => "missing_body",
            Self::MissingSignatureHeader => "missing_signature_header",
            Self::InvalidSignature => "invalid_signature",
            Self::DuplicateEvent { .. } => "duplicate_event",
            Self::UnrelatedEvent { .. } => "unrelated_event",
            Self::NonCreditedEvent { .. } => "non_credited_event",
            Self::TransferCreated { .. } => "transfer_created",
        }
    }

    /// Id of the verified event, once the signature has been checked.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::MissingBody | Self::MissingSignatureHeader | Self::InvalidSignature => None,
            Self::DuplicateEvent { event_id }
            | Self::UnrelatedEvent { event_id }
            | Self::NonCreditedEvent { event_id, .. }
            | Self::TransferCreated { event_id, .. } => Some(event_id),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Hard failures while processing a delivery
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Idempotency store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Payment provider failed: {0}")]
    Provider(#[from] ProviderError),
}

impl WebhookError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(store_error) => store_error.is_transient(),
            Self::Provider(provider_error) => provider_error.is_transient(),
        }
    }

    /// Get error category for monitoring
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::Store(store_error) => {
                if store_error.is_transient() {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Permanent
                }
            }
            Self::Provider(provider_error) => provider_error.error_category(),
        }
    }
}

// ============================================================================
// Processor
// ============================================================================

/// Interface for processing webhook deliveries
#[async_trait]
pub trait WebhookProcessor: Send + Sync {
    /// Process one delivery through the pipeline
    async fn process_webhook(&self, event: InboundEvent) -> Result<WebhookOutcome, WebhookError>;
}

/// Pipeline relaying credited invoices as transfers
///
/// The idempotency mark is set right after signature verification. If a hard
/// failure happens before a transfer is attempted the mark is released so the
/// redelivery is processed; once the transfer call has been made the mark is
/// kept even on failure.
pub struct InvoiceWebhookProcessor {
    provider: Arc<dyn PaymentProviderClient>,
    guard: IdempotencyGuard,
    classifier: EventClassifier,
    dispatcher: TransferDispatcher,
    event_ttl: Duration,
}

impl InvoiceWebhookProcessor {
    /// Create new processor
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use credit_relay_core::adapters::InMemoryStore;
    /// use credit_relay_core::{DestinationAccount, InvoiceWebhookProcessor, PaymentProviderClient};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # fn example(provider: Arc<dyn PaymentProviderClient>, destination: DestinationAccount) {
    /// let processor = InvoiceWebhookProcessor::new(
    ///     provider,
    ///     Arc::new(InMemoryStore::new()),
    ///     destination,
    ///     Some("credit-relay".to_string()),
    ///     Duration::from_secs(86_400),
    /// );
    /// # }
    /// ```
    pub fn new(
        provider: Arc<dyn PaymentProviderClient>,
        store: Arc<dyn KeyValueStore>,
        destination: DestinationAccount,
        transfer_tag: Option<String>,
        event_ttl: Duration,
    ) -> Self {
        Self {
            guard: IdempotencyGuard::new(store),
            classifier: EventClassifier::new(provider.clone()),
            dispatcher: TransferDispatcher::new(provider.clone(), destination, transfer_tag),
            provider,
            event_ttl,
        }
    }

    pub fn event_ttl(&self) -> Duration {
        self.event_ttl
    }
}

#[async_trait]
impl WebhookProcessor for InvoiceWebhookProcessor {
    #[instrument(skip(self, event), fields(received_at = %event.received_at))]
    async fn process_webhook(&self, event: InboundEvent) -> Result<WebhookOutcome, WebhookError> {
        let Some(body) = event.body() else {
            return Ok(WebhookOutcome::MissingBody);
        };

        let Some(signature) = event.signature() else {
            return Ok(WebhookOutcome::MissingSignatureHeader);
        };

        let verified = match self.provider.verify_and_parse(body, signature).await {
            Ok(verified) => verified,
            Err(ProviderError::InvalidSignature) => {
                warn!(body_len = body.len(), "Webhook signature rejected");
                return Ok(WebhookOutcome::InvalidSignature);
            }
            Err(e) => return Err(e.into()),
        };

        let event_id = verified.id.clone();
        info!(
            event_id = %event_id,
            subscription = %verified.subscription,
            log_type = %verified.log_type,
            "Webhook signature validated"
        );

        if !self.guard.admit(&event_id, self.event_ttl).await? {
            return Ok(WebhookOutcome::DuplicateEvent { event_id });
        }

        let invoice_log = match self.classifier.classify(&verified).await {
            Ok(invoice_log) => invoice_log,
            Err(e) => {
                self.guard.release(&event_id).await;
                return Err(e.into());
            }
        };

        let Some(invoice_log) = invoice_log else {
            return Ok(WebhookOutcome::UnrelatedEvent { event_id });
        };

        let Some(paid_amount) = invoice_log.paid_amount() else {
            return Ok(WebhookOutcome::NonCreditedEvent {
                event_id,
                log_type: invoice_log.log_type().to_string(),
                invoice_id: invoice_log.invoice_id,
            });
        };

        let request = match self
            .dispatcher
            .build_request(paid_amount, invoice_log.invoice_fee)
        {
            Ok(request) => request,
            Err(e) => {
                self.guard.release(&event_id).await;
                return Err(e.into());
            }
        };

        match self.dispatcher.send(&request).await {
            Ok(transfer_id) => Ok(WebhookOutcome::TransferCreated {
                event_id,
                transfer_id,
            }),
            Err(e) => {
                error!(
                    event_id = %event_id,
                    invoice_id = %invoice_log.invoice_id,
                    paid_amount,
                    invoice_fee = invoice_log.invoice_fee,
                    error = %e,
                    "Transfer creation failed, event stays marked as processed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
