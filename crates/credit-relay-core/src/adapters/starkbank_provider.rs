//! # Stark Bank Provider
//!
//! [`PaymentProviderClient`] backed by the Stark Bank API through
//! [`starkbank_sdk::StarkBankClient`].

use crate::provider::{
    InvoiceRecord, PaymentProviderClient, ProviderError, TransferRequest, VerifiedEvent,
};
use async_trait::async_trait;
use starkbank_sdk::{Event, StarkBankClient, StarkBankError, Transfer};
use tracing::instrument;

/// Payment provider talking to Stark Bank
#[derive(Clone)]
pub struct StarkBankProvider {
    client: StarkBankClient,
}

impl StarkBankProvider {
    pub fn new(client: StarkBankClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &StarkBankClient {
        &self.client
    }
}

impl From<StarkBankError> for ProviderError {
    fn from(error: StarkBankError) -> Self {
        match error {
            StarkBankError::InvalidSignature => Self::InvalidSignature,
            StarkBankError::Json(e) => Self::MalformedEvent {
                message: e.to_string(),
            },
            other if other.is_transient() => Self::Unavailable {
                message: other.to_string(),
            },
            other => Self::Rejected {
                message: other.to_string(),
            },
        }
    }
}

impl From<Event> for VerifiedEvent {
    fn from(event: Event) -> Self {
        Self {
            invoice: event.log.invoice.map(|invoice| InvoiceRecord {
                id: invoice.id,
                amount: invoice.amount,
                fee: invoice.fee,
            }),
            id: event.id,
            subscription: event.subscription,
            log_type: event.log.log_type,
            workspace_id: event.workspace_id,
            created: event.created,
        }
    }
}

fn to_transfer(request: &TransferRequest) -> Transfer {
    Transfer {
        amount: request.amount,
        tax_id: request.tax_id.clone(),
        name: request.name.clone(),
        bank_code: request.bank_code.clone(),
        branch_code: request.branch_code.clone(),
        account_number: request.account_number.clone(),
        account_type: Some(request.account_type.clone()),
        tags: request.tags.clone(),
        id: None,
        status: None,
        fee: None,
    }
}

#[async_trait]
impl PaymentProviderClient for StarkBankProvider {
    async fn verify_and_parse(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<VerifiedEvent, ProviderError> {
        // The signature covers text content; bytes that are not UTF-8 cannot match.
        let content = std::str::from_utf8(body).map_err(|_| ProviderError::InvalidSignature)?;

        let event = self.client.parse_event(content, signature).await?;
        Ok(event.into())
    }

    #[instrument(skip(self))]
    async fn lookup_payment(&self, invoice_id: &str) -> Result<i64, ProviderError> {
        let payment = self.client.get_invoice_payment(invoice_id).await?;
        Ok(payment.amount)
    }

    #[instrument(skip(self, request), fields(amount = request.amount))]
    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, ProviderError> {
        let created = self.client.create_transfers(&[to_transfer(request)]).await?;

        created
            .into_iter()
            .next()
            .and_then(|transfer| transfer.id)
            .ok_or_else(|| ProviderError::Rejected {
                message: "transfer created without id".to_string(),
            })
    }
}

#[cfg(test)]
#[path = "starkbank_provider_tests.rs"]
mod tests;
