//! Configuration types for the HTTP service
//!
//! Settings are flat keys named after their environment variables
//! (`STARKBANK_PROJECT_ID`, `REDIS_HOST`, ...). They are read, later sources
//! winning, from:
//!
//! 1. `.env` in the working directory (optional, `KEY=value` lines, quoted
//!    values may span lines)
//! 2. the YAML file named by `CREDIT_RELAY_CONFIG_FILE` (optional)
//! 3. process environment variables
//!
//! Keys are matched case-insensitively in every source.

use crate::errors::ConfigError;
use credit_relay_core::adapters::RedisStoreConfig;
use credit_relay_core::DestinationAccount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable naming an optional YAML settings file.
pub const CONFIG_FILE_ENV: &str = "CREDIT_RELAY_CONFIG_FILE";

/// Dotenv file read from the working directory.
pub const DOTENV_FILE: &str = ".env";

/// Secret configuration value, wiped from memory on drop
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the secret value. Avoid logging the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Security: Don't expose secret values in debug output
impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path of the webhook endpoint
    pub webhook_path: String,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            webhook_path: "/webhook".to_string(),
            shutdown_timeout_seconds: 30,
        }
    }
}

/// All settings of the relay
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// `sandbox` or `production`
    #[serde(default = "default_starkbank_environment")]
    pub starkbank_environment: String,
    #[serde(default)]
    pub starkbank_project_id: Option<String>,
    #[serde(default)]
    pub starkbank_private_key_content: Option<SecretString>,

    #[serde(default)]
    pub transfer_destination_cpf_cnpj: Option<String>,
    #[serde(default)]
    pub transfer_destination_name: Option<String>,
    #[serde(default)]
    pub transfer_destination_bank_code: Option<String>,
    #[serde(default)]
    pub transfer_destination_branch: Option<String>,
    #[serde(default)]
    pub transfer_destination_account: Option<String>,
    #[serde(default)]
    pub transfer_destination_account_type: Option<String>,
    /// Tag attached to every created transfer
    #[serde(default)]
    pub transfers_tag: Option<String>,

    #[serde(default = "default_redis_host")]
    pub redis_host: String,
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,
    #[serde(default)]
    pub redis_password: Option<SecretString>,

    /// Idempotency window in seconds
    #[serde(default = "default_duplicated_event_validation_exp")]
    pub duplicated_event_validation_exp: u64,

    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,
}

fn default_starkbank_environment() -> String {
    "sandbox".to_string()
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_duplicated_event_validation_exp() -> u64 {
    86_400
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_shutdown_timeout_seconds() -> u64 {
    30
}

impl RelaySettings {
    /// Load settings from the `.env` file, the optional YAML file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var(CONFIG_FILE_ENV)
            .ok()
            .filter(|path| !path.is_empty());

        Self::load_from(Path::new(DOTENV_FILE), config_file.as_deref().map(Path::new))
    }

    /// Load settings from explicit file locations; the environment still wins.
    ///
    /// A missing dotenv file is skipped, a missing `config_file` is an error.
    pub fn load_from(dotenv_path: &Path, config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        // File sources go in as defaults with lowercased keys so that
        // `STARKBANK_PROJECT_ID` lines reach the same fields as the environment.
        for (key, value) in read_dotenv(dotenv_path)? {
            builder = builder.set_default(key.to_lowercase(), value)?;
        }

        if let Some(path) = config_file {
            let file_values: HashMap<String, config::Value> = config::Config::builder()
                .add_source(
                    config::File::from(path)
                        .required(true)
                        .format(config::FileFormat::Yaml),
                )
                .build()?
                .try_deserialize()?;

            for (key, value) in file_values {
                builder = builder.set_default(key.to_lowercase(), value)?;
            }
        }

        let settings: Self = builder
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Check that every required setting is present and usable.
    ///
    /// Reports the first problem found, naming the environment variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.starkbank_environment.trim().to_lowercase().as_str() {
            "sandbox" | "production" => {}
            other => {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "STARKBANK_ENVIRONMENT must be sandbox or production, got '{}'",
                        other
                    ),
                })
            }
        }

        require("STARKBANK_PROJECT_ID", &self.starkbank_project_id)?;
        if self
            .starkbank_private_key_content
            .as_ref()
            .map_or(true, SecretString::is_empty)
        {
            return Err(ConfigError::Missing {
                key: "STARKBANK_PRIVATE_KEY_CONTENT".to_string(),
            });
        }

        self.destination()?;

        if self.redis_host.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "REDIS_HOST".to_string(),
            });
        }

        if self.duplicated_event_validation_exp == 0 {
            return Err(ConfigError::Invalid {
                message: "DUPLICATED_EVENT_VALIDATION_EXP must be greater than zero".to_string(),
            });
        }

        if !self.webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!("WEBHOOK_PATH must start with '/', got '{}'", self.webhook_path),
            });
        }

        Ok(())
    }

    /// Destination account of relayed transfers.
    pub fn destination(&self) -> Result<DestinationAccount, ConfigError> {
        Ok(DestinationAccount {
            tax_id: require("TRANSFER_DESTINATION_CPF_CNPJ", &self.transfer_destination_cpf_cnpj)?,
            name: require("TRANSFER_DESTINATION_NAME", &self.transfer_destination_name)?,
            bank_code: require(
                "TRANSFER_DESTINATION_BANK_CODE",
                &self.transfer_destination_bank_code,
            )?,
            branch_code: require("TRANSFER_DESTINATION_BRANCH", &self.transfer_destination_branch)?,
            account_number: require(
                "TRANSFER_DESTINATION_ACCOUNT",
                &self.transfer_destination_account,
            )?,
            account_type: require(
                "TRANSFER_DESTINATION_ACCOUNT_TYPE",
                &self.transfer_destination_account_type,
            )?,
        })
    }

    /// Configured transfer tag; blank counts as unset.
    pub fn transfer_tag(&self) -> Option<String> {
        self.transfers_tag
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
    }

    pub fn event_ttl(&self) -> Duration {
        Duration::from_secs(self.duplicated_event_validation_exp)
    }

    pub fn redis_config(&self) -> RedisStoreConfig {
        RedisStoreConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            password: self
                .redis_password
                .as_ref()
                .map(|p| p.expose_secret().to_string()),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            host: self.server_host.clone(),
            port: self.server_port,
            webhook_path: self.webhook_path.clone(),
            shutdown_timeout_seconds: self.shutdown_timeout_seconds,
        }
    }
}

/// Entries of a dotenv file; an absent file has none.
fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let env_file_error = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(Vec::new()),
        Err(e) => return Err(env_file_error(e)),
    };

    entries
        .map(|entry| entry.map_err(env_file_error))
        .collect()
}

fn require(key: &str, value: &Option<String>) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
