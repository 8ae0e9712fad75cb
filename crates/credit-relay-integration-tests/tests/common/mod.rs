//! Common test utilities for Credit Relay integration tests
//!
//! This module provides:
//! - A mock Stark Bank API (wiremock) that signs events with a known key
//! - A fully wired router: real processor, Stark Bank provider and in-memory store
//! - Builders for signed webhook requests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use credit_relay_api::{create_router, AppState, ServiceConfig, ServiceMetrics, StoreHealthChecker};
use credit_relay_core::{
    adapters::{InMemoryStore, StarkBankProvider},
    DestinationAccount, InvoiceWebhookProcessor,
};
use k256::ecdsa::SigningKey;
use k256::pkcs8::{EncodePublicKey, LineEnding};
use serde_json::{json, Value};
use starkbank_sdk::{ClientConfig, Environment, PrivateKey, Project, StarkBankClient};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const EVENT_ID: &str = "5021499834105856";
pub const INVOICE_ID: &str = "5155165527080960";
pub const TRANSFER_ID: &str = "5738709764800512";
pub const PAID_AMOUNT: i64 = 10100;
pub const INVOICE_FEE: i64 = 100;
pub const TRANSFER_TAG: &str = "credit-relay";

// ============================================================================
// Keys
// ============================================================================

/// Key the mock API signs events with.
fn api_secret_key() -> k256::SecretKey {
    k256::SecretKey::from_slice(&[0x42; 32]).unwrap()
}

/// Key the relay authenticates its own requests with.
fn project_private_key_pem() -> String {
    k256::SecretKey::from_slice(&[0x17; 32])
        .unwrap()
        .to_sec1_pem(LineEnding::LF)
        .unwrap()
        .to_string()
}

pub fn sign(content: &str) -> String {
    PrivateKey::from_signing_key(SigningKey::from(&api_secret_key())).sign_base64(content)
}

// ============================================================================
// Event builders
// ============================================================================

pub fn invoice_event(event_id: &str, log_type: &str) -> String {
    json!({
        "event": {
            "id": event_id,
            "subscription": "invoice",
            "workspaceId": "4717893458444288",
            "created": "2024-03-01T12:00:00.000000+00:00",
            "isDelivered": false,
            "log": {
                "id": "6273489012345678",
                "type": log_type,
                "invoice": {
                    "id": INVOICE_ID,
                    "amount": PAID_AMOUNT,
                    "fee": INVOICE_FEE,
                    "status": "paid",
                    "name": "Iron Bank S.A.",
                    "taxId": "20.018.183/0001-80"
                }
            }
        }
    })
    .to_string()
}

pub fn transfer_event(event_id: &str) -> String {
    json!({
        "event": {
            "id": event_id,
            "subscription": "transfer",
            "workspaceId": "4717893458444288",
            "created": "2024-03-01T12:00:00.000000+00:00",
            "isDelivered": false,
            "log": {
                "id": "6273489012349999",
                "type": "success",
                "transfer": {"id": TRANSFER_ID, "amount": 10000}
            }
        }
    })
    .to_string()
}

pub fn webhook_request(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Digital-Signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn signed_request(body: &str) -> Request<Body> {
    webhook_request(body, Some(&sign(body)))
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Mock Stark Bank API
// ============================================================================

pub async fn mount_public_key(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/public-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "publicKeys": [{
                "content": api_secret_key().public_key().to_public_key_pem(LineEnding::LF).unwrap()
            }]
        })))
        .mount(server)
        .await;
}

pub fn payment_response(amount: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "payment": {
            "amount": amount,
            "name": "Iron Bank S.A.",
            "taxId": "20.018.183/0001-80",
            "method": "pix"
        }
    }))
}

pub fn transfer_created_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "message": "Transfer(s) successfully created",
        "transfers": [{
            "id": TRANSFER_ID,
            "amount": PAID_AMOUNT - INVOICE_FEE,
            "taxId": "20.018.183/0001-80",
            "name": "Stark Bank S.A.",
            "bankCode": "20018183",
            "branchCode": "0001",
            "accountNumber": "6341320293482496",
            "accountType": "payment",
            "tags": [TRANSFER_TAG],
            "status": "created",
            "fee": 0
        }]
    }))
}

pub fn server_error_response() -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({
        "errors": [{"code": "internalServerError", "message": "Houston, we have a problem."}]
    }))
}

/// Bodies of every transfer batch the relay posted.
pub async fn posted_transfers(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/v2/transfer")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ============================================================================
// Wired application
// ============================================================================

/// Prometheus rejects duplicate registrations in the global registry, so the
/// metrics are created once per test binary.
static TEST_METRICS: OnceLock<Arc<ServiceMetrics>> = OnceLock::new();

fn test_metrics() -> Arc<ServiceMetrics> {
    TEST_METRICS
        .get_or_init(|| ServiceMetrics::new().expect("ServiceMetrics::new must succeed in tests"))
        .clone()
}

pub fn destination() -> DestinationAccount {
    DestinationAccount {
        tax_id: "20.018.183/0001-80".to_string(),
        name: "Stark Bank S.A.".to_string(),
        bank_code: "20018183".to_string(),
        branch_code: "0001".to_string(),
        account_number: "6341320293482496".to_string(),
        account_type: "payment".to_string(),
    }
}

/// Relay wired against a mock Stark Bank API.
pub struct TestRelay {
    pub server: MockServer,
    pub store: Arc<InMemoryStore>,
    pub app: Router,
}

impl TestRelay {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        mount_public_key(&server).await;

        let project = Project::new(Environment::Sandbox, "5656565656565656", &project_private_key_pem())
            .unwrap();
        let client = StarkBankClient::builder(project)
            .config(ClientConfig::default().with_api_url(format!("{}/v2", server.uri())))
            .build()
            .unwrap();

        let store = Arc::new(InMemoryStore::new());
        let processor = Arc::new(InvoiceWebhookProcessor::new(
            Arc::new(StarkBankProvider::new(client)),
            store.clone(),
            destination(),
            Some(TRANSFER_TAG.to_string()),
            Duration::from_secs(86_400),
        ));

        let app = create_router(AppState::new(
            ServiceConfig::default(),
            processor,
            Arc::new(StoreHealthChecker::new(store.clone())),
            test_metrics(),
        ));

        Self { server, store, app }
    }
}
