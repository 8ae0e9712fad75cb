//! # Transfer Dispatcher
//!
//! Forwards the net amount of a credited invoice to the configured destination
//! account.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::provider::{PaymentProviderClient, ProviderError, TransferRequest};

/// Bank account receiving relayed credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationAccount {
    /// CPF or CNPJ of the account holder
    pub tax_id: String,
    pub name: String,
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,
    pub account_type: String,
}

/// Creates transfers to the destination account
#[derive(Clone)]
pub struct TransferDispatcher {
    provider: Arc<dyn PaymentProviderClient>,
    destination: DestinationAccount,
    tag: Option<String>,
}

impl TransferDispatcher {
    pub fn new(
        provider: Arc<dyn PaymentProviderClient>,
        destination: DestinationAccount,
        tag: Option<String>,
    ) -> Self {
        Self {
            provider,
            destination,
            tag,
        }
    }

    /// Request to be sent for a credit of `paid_amount` with `invoice_fee`.
    ///
    /// The amount is `paid_amount - invoice_fee` in cents; no rounding or
    /// sign check is applied.
    ///
    /// # Errors
    ///
    /// [`ProviderError::MalformedEvent`] when the subtraction overflows.
    pub fn build_request(
        &self,
        paid_amount: i64,
        invoice_fee: i64,
    ) -> Result<TransferRequest, ProviderError> {
        let amount =
            paid_amount
                .checked_sub(invoice_fee)
                .ok_or_else(|| ProviderError::MalformedEvent {
                    message: format!(
                        "net amount of payment {} minus fee {} overflows",
                        paid_amount, invoice_fee
                    ),
                })?;

        Ok(TransferRequest {
            amount,
            tax_id: self.destination.tax_id.clone(),
            name: self.destination.name.clone(),
            bank_code: self.destination.bank_code.clone(),
            branch_code: self.destination.branch_code.clone(),
            account_number: self.destination.account_number.clone(),
            account_type: self.destination.account_type.clone(),
            tags: self.tag.clone().map(|tag| vec![tag]),
        })
    }

    /// Create exactly one transfer and return its id.
    pub async fn dispatch(&self, paid_amount: i64, invoice_fee: i64) -> Result<String, ProviderError> {
        let request = self.build_request(paid_amount, invoice_fee)?;
        self.send(&request).await
    }

    /// Submit a prepared request to the provider.
    pub async fn send(&self, request: &TransferRequest) -> Result<String, ProviderError> {
        let transfer_id = self.provider.create_transfer(request).await?;

        info!(
            transfer_id = %transfer_id,
            amount = request.amount,
            bank_code = %request.bank_code,
            "Transfer created"
        );

        Ok(transfer_id)
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
