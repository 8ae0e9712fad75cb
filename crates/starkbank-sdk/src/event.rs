//! Webhook events and digital-signature verification.
//!
//! Stark Bank signs every webhook body with its own secp256k1 key and sends
//! the Base64 DER signature in the `Digital-Signature` header. The public key
//! is fetched from `GET /public-key` and cached on the client; when a
//! signature fails against the cached key the key is fetched once more before
//! the event is rejected, so key rotation does not drop valid deliveries.

use crate::client::StarkBankClient;
use crate::error::StarkBankError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use k256::pkcs8::DecodePublicKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// A webhook event as delivered by Stark Bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub subscription: String,
    pub log: EventLog,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_delivered: Option<bool>,
}

/// The log entry carried by an event.
///
/// Only invoice subscriptions populate `invoice`; logs of other
/// subscriptions keep just their type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub log_type: String,
    #[serde(default)]
    pub invoice: Option<InvoiceSnapshot>,
}

/// Invoice state embedded in an invoice log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSnapshot {
    pub id: String,
    pub amount: i64,
    pub fee: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EventContent {
    event: Event,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyList {
    public_keys: Vec<PublicKeyRecord>,
}

#[derive(Debug, Deserialize)]
struct PublicKeyRecord {
    content: String,
}

impl StarkBankClient {
    /// Verify `content` against `signature` and decode the event it carries.
    ///
    /// # Errors
    ///
    /// - [`StarkBankError::InvalidSignature`] when the signature is not valid
    ///   Base64 DER or does not match the content under the current public key
    /// - [`StarkBankError::Json`] when verified content is not an event
    /// - transport/API errors while fetching the public key
    #[instrument(skip(self, content, signature), fields(content_len = content.len()))]
    pub async fn parse_event(&self, content: &str, signature: &str) -> Result<Event, StarkBankError> {
        self.verify_event_signature(content, signature).await?;

        let parsed: EventContent = serde_json::from_str(content)?;
        debug!(event_id = %parsed.event.id, "Parsed verified event");
        Ok(parsed.event)
    }

    async fn verify_event_signature(
        &self,
        content: &str,
        signature: &str,
    ) -> Result<(), StarkBankError> {
        let signature = decode_signature(signature).ok_or(StarkBankError::InvalidSignature)?;

        let key = self.event_public_key(false).await?;
        if verify_content(&key, content, &signature) {
            return Ok(());
        }

        warn!("Event signature did not match cached public key, refreshing key");
        let key = self.event_public_key(true).await?;
        if verify_content(&key, content, &signature) {
            return Ok(());
        }

        Err(StarkBankError::InvalidSignature)
    }

    async fn event_public_key(&self, refresh: bool) -> Result<VerifyingKey, StarkBankError> {
        if !refresh {
            if let Some(key) = self.public_key_cache().read().await.as_ref() {
                return Ok(key.clone());
            }
        }

        let list: PublicKeyList = self
            .get_json("public-key", &[("limit", "1".to_string())])
            .await?;
        let record = list
            .public_keys
            .into_iter()
            .next()
            .ok_or_else(|| StarkBankError::MissingData {
                field: "publicKeys".to_string(),
            })?;
        let key = parse_public_key(&record.content)?;

        *self.public_key_cache().write().await = Some(key.clone());
        Ok(key)
    }
}

/// Decode a `PUBLIC KEY` PEM block into a secp256k1 verifying key.
pub fn parse_public_key(pem: &str) -> Result<VerifyingKey, StarkBankError> {
    let der = crate::auth::decode_pem_block(pem, "PUBLIC KEY")
        .map_err(|message| StarkBankError::InvalidPublicKey { message })?;

    VerifyingKey::from_public_key_der(&der).map_err(|e| StarkBankError::InvalidPublicKey {
        message: e.to_string(),
    })
}

fn decode_signature(signature: &str) -> Option<Signature> {
    let der = STANDARD.decode(signature.trim()).ok()?;
    let signature = Signature::from_der(&der).ok()?;
    // Signatures from the API are not guaranteed to be low-S.
    Some(signature.normalize_s().unwrap_or(signature))
}

fn verify_content(key: &VerifyingKey, content: &str, signature: &Signature) -> bool {
    key.verify(content.as_bytes(), signature).is_ok()
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
