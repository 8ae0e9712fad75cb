//! Tests for webhook event verification.

use super::*;
use crate::auth::{Environment, PrivateKey, Project};
use crate::client::ClientConfig;
use k256::ecdsa::SigningKey;
use k256::pkcs8::{EncodePublicKey, LineEnding};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Key the mock API signs events with.
fn api_secret_key(byte: u8) -> k256::SecretKey {
    k256::SecretKey::from_slice(&[byte; 32]).unwrap()
}

fn api_public_key_pem(byte: u8) -> String {
    api_secret_key(byte)
        .public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap()
}

fn sign_event(byte: u8, content: &str) -> String {
    PrivateKey::from_signing_key(SigningKey::from(&api_secret_key(byte))).sign_base64(content)
}

fn client_for(server: &MockServer) -> StarkBankClient {
    let pem = k256::SecretKey::from_slice(&[0x22; 32])
        .unwrap()
        .to_sec1_pem(LineEnding::LF)
        .unwrap();
    let project = Project::new(Environment::Sandbox, "1234567890", &pem).unwrap();
    StarkBankClient::builder(project)
        .config(ClientConfig::default().with_api_url(format!("{}/v2", server.uri())))
        .build()
        .unwrap()
}

async fn mount_public_key(server: &MockServer, byte: u8) {
    Mock::given(method("GET"))
        .and(path("/v2/public-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "publicKeys": [{"content": api_public_key_pem(byte)}]
        })))
        .mount(server)
        .await;
}

fn credited_event_content() -> String {
    json!({
        "event": {
            "id": "5021499834105856",
            "subscription": "invoice",
            "workspaceId": "4717893458444288",
            "created": "2024-03-01T12:00:00.000000+00:00",
            "isDelivered": false,
            "log": {
                "id": "6273489012345678",
                "type": "credited",
                "invoice": {
                    "id": "5155165527080960",
                    "amount": 10100,
                    "fee": 100,
                    "status": "paid",
                    "name": "Iron Bank S.A.",
                    "taxId": "20.018.183/0001-80",
                    "tags": ["scheduled"]
                }
            }
        }
    })
    .to_string()
}

mod parse_event {
    use super::*;

    #[tokio::test]
    async fn test_valid_signature_returns_event() {
        let server = MockServer::start().await;
        mount_public_key(&server, 0x33).await;
        let client = client_for(&server);

        let content = credited_event_content();
        let signature = sign_event(0x33, &content);

        let event = client.parse_event(&content, &signature).await.unwrap();

        assert_eq!(event.id, "5021499834105856");
        assert_eq!(event.subscription, "invoice");
        assert_eq!(event.log.log_type, "credited");
        let invoice = event.log.invoice.unwrap();
        assert_eq!(invoice.id, "5155165527080960");
        assert_eq!(invoice.amount, 10100);
        assert_eq!(invoice.fee, 100);
        assert_eq!(invoice.tax_id.as_deref(), Some("20.018.183/0001-80"));
    }

    #[tokio::test]
    async fn test_signature_for_other_content_is_rejected() {
        let server = MockServer::start().await;
        mount_public_key(&server, 0x33).await;
        let client = client_for(&server);

        let content = credited_event_content();
        let signature = sign_event(0x33, "{\"event\":{}}");

        let result = client.parse_event(&content, &signature).await;

        assert!(matches!(result, Err(StarkBankError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_non_base64_signature_is_rejected_without_fetching_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/public-key"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let client = client_for(&server);

        let result = client
            .parse_event(&credited_event_content(), "not-a-signature!")
            .await;

        assert!(matches!(result, Err(StarkBankError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_public_key_is_cached_between_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/public-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "publicKeys": [{"content": api_public_key_pem(0x33)}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server);

        let content = credited_event_content();
        let signature = sign_event(0x33, &content);

        client.parse_event(&content, &signature).await.unwrap();
        client.parse_event(&content, &signature).await.unwrap();
    }

    #[tokio::test]
    async fn test_rotated_key_is_refreshed_once() {
        let server = MockServer::start().await;
        mount_public_key(&server, 0x44).await;
        let client = client_for(&server);

        // Stale key left over from before rotation.
        *client.public_key_cache().write().await =
            Some(parse_public_key(&api_public_key_pem(0x33)).unwrap());

        let content = credited_event_content();
        let signature = sign_event(0x44, &content);

        let event = client.parse_event(&content, &signature).await.unwrap();
        assert_eq!(event.id, "5021499834105856");
    }

    #[tokio::test]
    async fn test_verified_content_that_is_not_an_event_fails_to_decode() {
        let server = MockServer::start().await;
        mount_public_key(&server, 0x33).await;
        let client = client_for(&server);

        let content = r#"{"hello":"world"}"#;
        let signature = sign_event(0x33, content);

        let result = client.parse_event(content, &signature).await;

        assert!(matches!(result, Err(StarkBankError::Json(_))));
    }

    #[tokio::test]
    async fn test_event_without_invoice_parses() {
        let server = MockServer::start().await;
        mount_public_key(&server, 0x33).await;
        let client = client_for(&server);

        let content = json!({
            "event": {
                "id": "1",
                "subscription": "transfer",
                "log": {"id": "2", "type": "success"}
            }
        })
        .to_string();
        let signature = sign_event(0x33, &content);

        let event = client.parse_event(&content, &signature).await.unwrap();
        assert_eq!(event.subscription, "transfer");
        assert!(event.log.invoice.is_none());
    }
}

mod public_key {
    use super::*;

    #[test]
    fn test_parse_public_key_accepts_spki_pem() {
        assert!(parse_public_key(&api_public_key_pem(0x33)).is_ok());
    }

    #[test]
    fn test_parse_public_key_rejects_private_key_pem() {
        let pem = api_secret_key(0x33).to_sec1_pem(LineEnding::LF).unwrap();
        let result = parse_public_key(&pem);
        assert!(matches!(
            result,
            Err(StarkBankError::InvalidPublicKey { .. })
        ));
    }
}
