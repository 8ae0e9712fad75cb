//! # Credit Relay Service
//!
//! Binary entry point for the Credit Relay HTTP service.
//!
//! This executable:
//! - Loads settings from `.env`, an optional YAML file and the environment
//! - Initializes structured logging
//! - Builds the Stark Bank client, the Redis idempotency store and the
//!   webhook processor
//! - Starts the HTTP server from credit-relay-api
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 configuration error,
//! 4 dependency initialization failure.

use credit_relay_api::{
    start_server, ConfigError, RelaySettings, ServiceError, StoreHealthChecker,
};
use credit_relay_core::adapters::{RedisStore, StarkBankProvider};
use credit_relay_core::{InvoiceWebhookProcessor, KeyValueStore};
use starkbank_sdk::{Environment, Project, StarkBankClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting JSON log output when set to `json`.
const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[tokio::main]
async fn main() {
    let settings = RelaySettings::load();

    let loglevel = settings
        .as_ref()
        .map(|s| s.loglevel.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&loglevel);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Credit Relay Service");

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = settings.validate() {
        error!(error = %e, "Configuration is invalid; aborting");
        std::process::exit(3);
    }

    let (processor, store) = match build_dependencies(&settings) {
        Ok(deps) => deps,
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies; aborting");
            std::process::exit(exit_code(&e));
        }
    };

    // A Redis outage at startup is not fatal; /ready reports it until it recovers.
    if let Err(e) = store.ping().await {
        error!(error = %e, "Idempotency store is not reachable yet");
    }

    let health_checker = Arc::new(StoreHealthChecker::new(store));

    if let Err(e) = start_server(settings.service_config(), processor, health_checker).await {
        error!(error = %e, "HTTP server failed");
        std::process::exit(exit_code(&e));
    }
}

// ============================================================================
// Private helpers
// ============================================================================

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured `LOGLEVEL`.
fn init_tracing(loglevel: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},tower_http={level}",
            level = loglevel.trim().to_lowercase()
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the webhook processor and the idempotency store it shares with the
/// readiness check.
fn build_dependencies(
    settings: &RelaySettings,
) -> Result<(Arc<InvoiceWebhookProcessor>, Arc<dyn KeyValueStore>), ServiceError> {
    let environment: Environment =
        settings
            .starkbank_environment
            .parse()
            .map_err(|e: starkbank_sdk::StarkBankError| {
                ServiceError::Configuration(ConfigError::Invalid {
                    message: e.to_string(),
                })
            })?;

    let project_id = settings
        .starkbank_project_id
        .as_deref()
        .ok_or_else(|| ConfigError::Missing {
            key: "STARKBANK_PROJECT_ID".to_string(),
        })?;

    let private_key = settings
        .starkbank_private_key_content
        .as_ref()
        .ok_or_else(|| ConfigError::Missing {
            key: "STARKBANK_PRIVATE_KEY_CONTENT".to_string(),
        })?;

    let project = Project::new(environment, project_id.trim(), private_key.expose_secret())
        .map_err(|e| {
            ServiceError::Configuration(ConfigError::Invalid {
                message: format!("STARKBANK_PRIVATE_KEY_CONTENT: {}", e),
            })
        })?;

    let client = StarkBankClient::builder(project)
        .build()
        .map_err(|e| ServiceError::DependencyFailed {
            message: format!("Stark Bank client: {}", e),
        })?;

    info!(environment = %environment, project_id = %project_id, "Stark Bank client ready");

    let redis_config = settings.redis_config();
    let store: Arc<dyn KeyValueStore> =
        Arc::new(
            RedisStore::new(&redis_config).map_err(|e| ServiceError::DependencyFailed {
                message: format!("Redis store: {}", e),
            })?,
        );

    info!(
        endpoint = %format!("{}:{}", redis_config.host, redis_config.port),
        ttl_seconds = settings.duplicated_event_validation_exp,
        "Idempotency store configured"
    );

    let destination = settings.destination()?;
    let processor = Arc::new(InvoiceWebhookProcessor::new(
        Arc::new(StarkBankProvider::new(client)),
        store.clone(),
        destination,
        settings.transfer_tag(),
        settings.event_ttl(),
    ));

    Ok((processor, store))
}

fn exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::BindFailed { .. } => 1,
        ServiceError::ServerFailed { .. } => 2,
        ServiceError::Configuration(_) => 3,
        ServiceError::DependencyFailed { .. } => 4,
    }
}
