//! # Event Classifier
//!
//! Decides whether a verified event is an invoice log and, for credited
//! invoices, fetches the amount actually paid.

use std::sync::Arc;

use tracing::debug;

use crate::provider::{PaymentProviderClient, ProviderError, VerifiedEvent};

/// Subscription name of invoice events.
pub const INVOICE_SUBSCRIPTION: &str = "invoice";

/// Log type of an invoice that has been paid and credited.
pub const CREDITED_LOG_TYPE: &str = "credited";

/// Status part of an [`InvoiceLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceLogStatus {
    /// Invoice credited; carries the amount paid in cents.
    Credited { paid_amount: i64 },
    /// Any other invoice log type (`created`, `paid`, `overdue`, ...).
    NotCredited { log_type: String },
}

/// An invoice event reduced to what the transfer decision needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLog {
    pub invoice_id: String,
    pub invoice_fee: i64,
    pub status: InvoiceLogStatus,
}

impl InvoiceLog {
    pub fn log_type(&self) -> &str {
        match &self.status {
            InvoiceLogStatus::Credited { .. } => CREDITED_LOG_TYPE,
            InvoiceLogStatus::NotCredited { log_type } => log_type,
        }
    }

    /// Amount paid, present only for credited invoices.
    pub fn paid_amount(&self) -> Option<i64> {
        match self.status {
            InvoiceLogStatus::Credited { paid_amount } => Some(paid_amount),
            InvoiceLogStatus::NotCredited { .. } => None,
        }
    }
}

/// Classifies verified events
#[derive(Clone)]
pub struct EventClassifier {
    provider: Arc<dyn PaymentProviderClient>,
}

impl EventClassifier {
    pub fn new(provider: Arc<dyn PaymentProviderClient>) -> Self {
        Self { provider }
    }

    /// Classify `event`.
    ///
    /// Returns `None` for non-invoice subscriptions. Only credited invoice logs
    /// cause a provider call (the payment lookup).
    ///
    /// # Errors
    ///
    /// - [`ProviderError::MalformedEvent`] for an invoice event without invoice data
    /// - any error of the payment lookup
    pub async fn classify(&self, event: &VerifiedEvent) -> Result<Option<InvoiceLog>, ProviderError> {
        if event.subscription != INVOICE_SUBSCRIPTION {
            debug!(
                event_id = %event.id,
                subscription = %event.subscription,
                "Event is not an invoice event"
            );
            return Ok(None);
        }

        let invoice = event
            .invoice
            .as_ref()
            .ok_or_else(|| ProviderError::MalformedEvent {
                message: format!("invoice event {} has no invoice", event.id),
            })?;

        let status = if event.log_type == CREDITED_LOG_TYPE {
            let paid_amount = self.provider.lookup_payment(&invoice.id).await?;
            InvoiceLogStatus::Credited { paid_amount }
        } else {
            InvoiceLogStatus::NotCredited {
                log_type: event.log_type.clone(),
            }
        };

        Ok(Some(InvoiceLog {
            invoice_id: invoice.id.clone(),
            invoice_fee: invoice.fee,
            status,
        }))
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
