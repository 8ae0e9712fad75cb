//! # Credit Relay HTTP Service
//!
//! HTTP server receiving Stark Bank webhooks and running them through the
//! Credit Relay pipeline.
//!
//! This service provides:
//! - Webhook endpoint (`POST /webhook` by default) answering with `{"message": ...}`
//! - Liveness (`GET /health`) and readiness (`GET /ready`) endpoints
//! - Prometheus metrics (`GET /metrics`)

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use chrono::Utc;
use credit_relay_core::{InboundEvent, WebhookOutcome, WebhookProcessor};
use prometheus::TextEncoder;
use std::future::IntoFuture;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

mod config;
mod errors;
mod metrics;
mod responses;

pub use config::{RelaySettings, SecretString, ServiceConfig, CONFIG_FILE_ENV, DOTENV_FILE};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError, RETRY_AFTER_SECONDS};
pub use metrics::ServiceMetrics;
pub use responses::{
    HealthCheckResult, HealthChecker, HealthResponse, HealthStatus, ReadinessResponse,
    StoreHealthChecker, WebhookResponse,
};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Webhook processor for Stark Bank deliveries
    pub webhook_processor: Arc<dyn WebhookProcessor>,

    /// Health checker for liveness and readiness
    pub health_checker: Arc<dyn HealthChecker>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        webhook_processor: Arc<dyn WebhookProcessor>,
        health_checker: Arc<dyn HealthChecker>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            webhook_processor,
            health_checker,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes =
        Router::new().route(&state.config.webhook_path, post(handle_webhook));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server and run until SIGINT/SIGTERM
///
/// After the signal, in-flight requests get `shutdown_timeout_seconds` to
/// finish before the server stops regardless.
pub async fn start_server(
    config: ServiceConfig,
    webhook_processor: Arc<dyn WebhookProcessor>,
    health_checker: Arc<dyn HealthChecker>,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let state = AppState::new(config.clone(), webhook_processor, health_checker, metrics);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.clone(),
                message: e.to_string(),
            })?;

    info!(address = %addr, webhook_path = %config.webhook_path, "Starting HTTP server");

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_seconds);
    let shutdown_started = Arc::new(Notify::new());

    let signal_notifier = shutdown_started.clone();
    let shutdown_signal = async move {
        wait_for_shutdown_signal().await;
        info!(
            timeout_seconds = shutdown_timeout.as_secs(),
            "Initiating graceful shutdown"
        );
        signal_notifier.notify_one();
    };

    let drain_deadline = async move {
        shutdown_started.notified().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out, dropping in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle Stark Bank webhook deliveries
///
/// Every processor outcome becomes `{"message": <response message>}` with the
/// outcome's status code, and its log message is written at INFO (WARN for
/// rejected signatures). Hard failures become 503/500 so the provider
/// redelivers.
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), WebhookHandlerError> {
    let start = std::time::Instant::now();

    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = if body.is_empty() { None } else { Some(body) };
    let request = InboundEvent::new(body, header_map);

    let outcome = match state.webhook_processor.process_webhook(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.metrics.record_failure(&e, start.elapsed());
            return Err(e.into());
        }
    };

    state.metrics.record_outcome(&outcome, start.elapsed());

    let log_message = outcome.log_message();
    if matches!(outcome, WebhookOutcome::InvalidSignature) {
        warn!(outcome = outcome.as_str(), "{}", log_message);
    } else {
        info!(
            outcome = outcome.as_str(),
            event_id = outcome.event_id().unwrap_or(""),
            "{}",
            log_message
        );
    }

    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    Ok((
        status,
        Json(WebhookResponse {
            message: outcome.response_message().to_string(),
        }),
    ))
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let status = state.health_checker.check_basic_health().await;

    let code = if status.is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: if status.is_healthy {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            timestamp: Utc::now(),
            checks: status.checks,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check for load balancers
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let status = state.health_checker.check_readiness().await;

    let code = if status.is_healthy {
        StatusCode::OK
    } else {
        warn!("Readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(ReadinessResponse {
            ready: status.is_healthy,
            timestamp: Utc::now(),
            checks: status.checks,
        }),
    )
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(_state): State<AppState>) -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode_to_string(&metric_families)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` or generates one, and echoes it in
/// the response headers.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
