//! Stark Bank API client for authenticated operations.
//!
//! [`StarkBankClient`] signs every request with the project credentials and
//! maps API error responses to [`StarkBankError`]. Resource-specific
//! operations live next to their types in [`crate::event`],
//! [`crate::invoice`] and [`crate::transfer`].

use std::sync::Arc;
use std::time::Duration;

use k256::ecdsa::VerifyingKey;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::auth::Project;
use crate::error::{ErrorBody, StarkBankError};

/// Configuration for Stark Bank API client behavior.
///
/// # Examples
///
/// ```
/// use starkbank_sdk::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(5))
///     .with_api_url("http://localhost:9999/v2");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for API requests
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// Value of the `Accept-Language` header
    pub language: String,
    /// Base URL override; defaults to the project's environment URL
    pub api_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "starkbank-sdk-rust/0.1.0".to_string(),
            timeout: Duration::from_secs(15),
            language: "en-US".to_string(),
            api_url: None,
        }
    }
}

impl ClientConfig {
    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the API base URL (used against mock servers).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }
}

/// Stark Bank API client.
///
/// Cheap to clone: credentials, the HTTP connection pool and the cached
/// event-signing public key are shared between clones.
#[derive(Clone)]
pub struct StarkBankClient {
    project: Arc<Project>,
    http_client: reqwest::Client,
    config: ClientConfig,
    api_url: String,
    public_key: Arc<RwLock<Option<VerifyingKey>>>,
}

impl StarkBankClient {
    /// Create a new builder for a client authenticating as `project`.
    pub fn builder(project: Project) -> StarkBankClientBuilder {
        StarkBankClientBuilder::new(project)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the project this client authenticates as.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Base URL requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub(crate) fn public_key_cache(&self) -> &RwLock<Option<VerifyingKey>> {
        &self.public_key
    }

    /// Authenticated GET returning the decoded JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StarkBankError> {
        self.send(Method::GET, path, query, None).await
    }

    /// Authenticated POST of `body` as JSON returning the decoded JSON body.
    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StarkBankError> {
        let payload = serde_json::to_string(body)?;
        self.send(Method::POST, path, &[], Some(payload)).await
    }

    #[instrument(skip(self, query, body), fields(api_url = %self.api_url))]
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
    ) -> Result<T, StarkBankError> {
        let url = format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        // The signature covers the exact body bytes, so it must be built from
        // the same string that goes on the wire.
        let payload = body.unwrap_or_default();
        let access = self.project.access_headers(&payload);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header("Access-Id", access.access_id)
            .header("Access-Time", access.access_time)
            .header("Access-Signature", access.access_signature)
            .header("Accept-Language", &self.config.language)
            .header("Content-Type", "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }
        if !payload.is_empty() {
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status();

        debug!(method = %method, status = status.as_u16(), "Stark Bank API responded");

        if status.is_success() {
            let text = response.text().await?;
            return Ok(serde_json::from_str(&text)?);
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        Err(map_error_response(status, &text))
    }
}

/// Translate a non-success API response into a [`StarkBankError`].
pub(crate) fn map_error_response(status: StatusCode, body: &str) -> StarkBankError {
    match status {
        StatusCode::BAD_REQUEST => match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => StarkBankError::InputErrors(parsed.errors),
            _ => StarkBankError::UnexpectedResponse {
                status: status.as_u16(),
                message: body.to_string(),
            },
        },
        StatusCode::INTERNAL_SERVER_ERROR => StarkBankError::InternalServerError,
        _ => StarkBankError::UnexpectedResponse {
            status: status.as_u16(),
            message: body.to_string(),
        },
    }
}

/// Builder for constructing [`StarkBankClient`] instances.
#[derive(Debug)]
pub struct StarkBankClientBuilder {
    project: Project,
    config: ClientConfig,
}

impl StarkBankClientBuilder {
    /// Create a new builder with the default configuration.
    pub fn new(project: Project) -> Self {
        Self {
            project,
            config: ClientConfig::default(),
        }
    }

    /// Replace the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`StarkBankError::Configuration`] if the HTTP client cannot be
    /// created (for example when the TLS backend fails to initialize).
    pub fn build(self) -> Result<StarkBankClient, StarkBankError> {
        let http_client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| StarkBankError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let api_url = self
            .config
            .api_url
            .clone()
            .unwrap_or_else(|| self.project.environment().api_url().to_string());

        Ok(StarkBankClient {
            project: Arc::new(self.project),
            http_client,
            config: self.config,
            api_url,
            public_key: Arc::new(RwLock::new(None)),
        })
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
