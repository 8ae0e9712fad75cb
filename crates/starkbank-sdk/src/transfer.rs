//! Transfer creation.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::client::StarkBankClient;
use crate::error::StarkBankError;

/// An outgoing transfer.
///
/// Fields the API assigns (`id`, `status`, `fee`) are `None` on requests and
/// populated on responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Amount in cents
    pub amount: i64,
    pub tax_id: String,
    pub name: String,
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,

    /// `checking`, `savings`, `salary` or `payment`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<i64>,
}

#[derive(Debug, Serialize)]
struct TransferBatch<'a> {
    transfers: &'a [Transfer],
}

#[derive(Debug, Deserialize)]
struct TransferBatchResponse {
    transfers: Vec<Transfer>,
}

impl StarkBankClient {
    /// Create `transfers` in a single request.
    ///
    /// Returns the created transfers in request order, with `id` populated.
    ///
    /// # Errors
    ///
    /// Returns [`StarkBankError::MissingData`] if `transfers` is empty or the
    /// response holds none, [`StarkBankError::InputErrors`] if the API rejects
    /// any of them.
    #[instrument(skip(self, transfers), fields(count = transfers.len()))]
    pub async fn create_transfers(
        &self,
        transfers: &[Transfer],
    ) -> Result<Vec<Transfer>, StarkBankError> {
        if transfers.is_empty() {
            return Err(StarkBankError::MissingData {
                field: "transfers".to_string(),
            });
        }

        let response: TransferBatchResponse = self
            .post_json("transfer", &TransferBatch { transfers })
            .await?;

        if response.transfers.is_empty() {
            return Err(StarkBankError::MissingData {
                field: "transfers".to_string(),
            });
        }

        info!(created = response.transfers.len(), "Transfers created");
        Ok(response.transfers)
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
