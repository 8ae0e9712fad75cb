//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use credit_relay_core::WebhookError;
use tracing::error;

/// Seconds the provider is asked to wait before redelivering after a transient failure.
pub const RETRY_AFTER_SECONDS: u64 = 60;

/// Webhook handler errors with HTTP status code mapping
///
/// Client-side problems (missing body, bad signature) are not errors here:
/// they are regular outcomes of the processor with their own status codes.
/// This type covers the hard failures where the provider should redeliver:
///
/// - `503 Service Unavailable` with `Retry-After` when the failure is
///   transient (key-value store or provider temporarily unreachable)
/// - `500 Internal Server Error` otherwise
///
/// Error details are logged server-side; the response body stays generic.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    #[error("Processing failed: {0}")]
    ProcessingFailed(#[from] WebhookError),
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            Self::ProcessingFailed(ref e) => {
                error!(
                    error = %e,
                    category = %e.error_category(),
                    transient = e.is_transient(),
                    "Webhook processing failed"
                );
                if e.is_transient() {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Service temporarily unavailable",
                        Some(RETRY_AFTER_SECONDS),
                    )
                } else {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error",
                        None,
                    )
                }
            }
        };

        let body = serde_json::json!({
            "message": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut response = (status, Json(body)).into_response();

        if let Some(retry_seconds) = retry_after {
            if let Ok(header_value) = retry_seconds.to_string().parse() {
                response.headers_mut().insert("Retry-After", header_value);
            }
        }

        response
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Dependency initialization failed: {message}")]
    DependencyFailed { message: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to read env file {path}: {message}")]
    EnvFile { path: String, message: String },
}
