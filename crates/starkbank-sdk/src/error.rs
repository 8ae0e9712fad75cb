//! Error types for Stark Bank SDK operations.
//!
//! Errors carry enough classification for callers to decide whether a failed
//! call is worth redelivering: see [`StarkBankError::is_transient`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single entry of the `errors` array returned by the API on 400 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Wire shape of an API error body.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

/// Errors returned by [`StarkBankClient`](crate::StarkBankClient) operations.
#[derive(Debug, Error)]
pub enum StarkBankError {
    /// The event content does not match its digital signature (non-retryable).
    #[error("Invalid digital signature")]
    InvalidSignature,

    /// The API rejected the request input (HTTP 400, non-retryable).
    #[error("Input errors: {}", join_details(.0))]
    InputErrors(Vec<ErrorDetail>),

    /// The API failed while handling the request (HTTP 500).
    #[error("Stark Bank internal server error")]
    InternalServerError,

    /// Any other non-success HTTP status.
    #[error("Unexpected response: {status} - {message}")]
    UnexpectedResponse { status: u16, message: String },

    /// The project private key could not be decoded.
    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// The public key served by the API could not be decoded.
    #[error("Invalid public key: {message}")]
    InvalidPublicKey { message: String },

    /// A successful response did not contain the expected data.
    #[error("Missing data in response: {field}")]
    MissingData { field: String },

    /// The HTTP client could not be constructed.
    #[error("Client configuration error: {message}")]
    Configuration { message: String },

    /// Failed to parse a JSON payload.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failure (connect, TLS, timeout).
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StarkBankError {
    /// Check if this error represents a transient condition that may succeed if retried.
    ///
    /// Transient conditions are server-side failures (5xx), rate limiting (429)
    /// and transport errors. Signature, input and key errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InternalServerError => true,
            Self::UnexpectedResponse { status, .. } => *status >= 500 || *status == 429,
            Self::Http(_) => true,
            Self::InvalidSignature => false,
            Self::InputErrors(_) => false,
            Self::InvalidPrivateKey { .. } => false,
            Self::InvalidPublicKey { .. } => false,
            Self::MissingData { .. } => false,
            Self::Configuration { .. } => false,
            Self::Json(_) => false,
        }
    }
}

fn join_details(details: &[ErrorDetail]) -> String {
    details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
