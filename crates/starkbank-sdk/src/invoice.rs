//! Invoice payment lookup.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::StarkBankClient;
use crate::error::StarkBankError;

/// Payment information of a paid invoice.
///
/// Only `amount` is guaranteed; the payer fields depend on the payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayment {
    /// Amount paid, in cents
    pub amount: i64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub tax_id: Option<String>,

    #[serde(default)]
    pub bank_code: Option<String>,

    #[serde(default)]
    pub branch_code: Option<String>,

    #[serde(default)]
    pub account_number: Option<String>,

    #[serde(default)]
    pub account_type: Option<String>,

    #[serde(default)]
    pub end_to_end_id: Option<String>,

    /// Payment method, e.g. `pix`
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoicePaymentResponse {
    payment: InvoicePayment,
}

impl StarkBankClient {
    /// Fetch the payment information of the invoice `invoice_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StarkBankError::InputErrors`] for unknown or unpaid invoices,
    /// and transport/API errors otherwise.
    #[instrument(skip(self))]
    pub async fn get_invoice_payment(
        &self,
        invoice_id: &str,
    ) -> Result<InvoicePayment, StarkBankError> {
        let path = format!("invoice/{}/payment", invoice_id);
        let response: InvoicePaymentResponse = self.get_json(&path, &[]).await?;
        Ok(response.payment)
    }
}

#[cfg(test)]
#[path = "invoice_tests.rs"]
mod tests;
