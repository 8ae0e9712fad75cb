//! Metrics collection for the API service.

use credit_relay_core::{WebhookError, WebhookOutcome};
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::Arc;

/// Service metrics for observability
///
/// Registered with the default Prometheus registry, so only one instance may
/// exist per process.
#[derive(Debug)]
pub struct ServiceMetrics {
    pub webhook_requests_total: IntCounter,
    pub webhook_duration_seconds: Histogram,
    pub webhook_outcomes_total: IntCounterVec,
    pub webhook_failures_total: IntCounterVec,
    pub transfers_created_total: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        use prometheus::{register_histogram, register_int_counter, register_int_counter_vec};

        Ok(Arc::new(Self {
            webhook_requests_total: register_int_counter!(
                "webhook_requests_total",
                "Total webhook requests received"
            )?,
            webhook_duration_seconds: register_histogram!(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
                vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]
            )?,
            webhook_outcomes_total: register_int_counter_vec!(
                "webhook_outcomes_total",
                "Processed webhooks by outcome",
                &["outcome"]
            )?,
            webhook_failures_total: register_int_counter_vec!(
                "webhook_failures_total",
                "Webhook processing failures by error category",
                &["category"]
            )?,
            transfers_created_total: register_int_counter!(
                "transfers_created_total",
                "Transfers created for credited invoices"
            )?,
        }))
    }

    pub fn record_outcome(&self, outcome: &WebhookOutcome, duration: std::time::Duration) {
        self.webhook_requests_total.inc();
        self.webhook_duration_seconds.observe(duration.as_secs_f64());
        self.webhook_outcomes_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        if matches!(outcome, WebhookOutcome::TransferCreated { .. }) {
            self.transfers_created_total.inc();
        }
    }

    pub fn record_failure(&self, error: &WebhookError, duration: std::time::Duration) {
        self.webhook_requests_total.inc();
        self.webhook_duration_seconds.observe(duration.as_secs_f64());
        self.webhook_failures_total
            .with_label_values(&[error.error_category().as_str()])
            .inc();
    }
}
