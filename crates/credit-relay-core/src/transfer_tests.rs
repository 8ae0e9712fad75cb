//! Tests for the transfer dispatcher

use super::*;
use crate::test_support::{FakeProvider, Reply};

fn destination() -> DestinationAccount {
    DestinationAccount {
        tax_id: "20.018.183/0001-80".to_string(),
        name: "Stark Bank S.A.".to_string(),
        bank_code: "20018183".to_string(),
        branch_code: "0001".to_string(),
        account_number: "6341320293482496".to_string(),
        account_type: "payment".to_string(),
    }
}

#[tokio::test]
async fn test_dispatch_sends_net_amount_to_destination() {
    let provider = Arc::new(FakeProvider::new(None));
    let dispatcher = TransferDispatcher::new(provider.clone(), destination(), None);

    let id = dispatcher.dispatch(10100, 100).await.unwrap();

    assert_eq!(id, "5738709764800512");
    let sent = provider.sent_transfers();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount, 10000);
    assert_eq!(sent[0].tax_id, "20.018.183/0001-80");
    assert_eq!(sent[0].bank_code, "20018183");
    assert_eq!(sent[0].branch_code, "0001");
    assert_eq!(sent[0].account_number, "6341320293482496");
    assert_eq!(sent[0].account_type, "payment");
    assert_eq!(sent[0].tags, None);
}

#[tokio::test]
async fn test_configured_tag_becomes_single_tag() {
    let provider = Arc::new(FakeProvider::new(None));
    let dispatcher = TransferDispatcher::new(
        provider.clone(),
        destination(),
        Some("credit-relay".to_string()),
    );

    dispatcher.dispatch(500, 0).await.unwrap();

    assert_eq!(
        provider.sent_transfers()[0].tags,
        Some(vec!["credit-relay".to_string()])
    );
}

#[test]
fn test_fee_larger_than_payment_is_not_adjusted() {
    let provider = Arc::new(FakeProvider::new(None));
    let dispatcher = TransferDispatcher::new(provider, destination(), None);

    let request = dispatcher.build_request(100, 250).unwrap();

    assert_eq!(request.amount, -150);
}

#[tokio::test]
async fn test_overflowing_net_amount_is_rejected_before_provider_call() {
    let provider = Arc::new(FakeProvider::new(None));
    let dispatcher = TransferDispatcher::new(provider.clone(), destination(), None);

    let result = dispatcher.dispatch(i64::MIN, 1).await;

    assert!(matches!(result, Err(ProviderError::MalformedEvent { .. })));
    assert!(matches!(
        dispatcher.build_request(i64::MAX, -1),
        Err(ProviderError::MalformedEvent { .. })
    ));
    assert_eq!(provider.transfer_calls(), 0);
}

#[tokio::test]
async fn test_provider_rejection_propagates() {
    let provider = Arc::new(FakeProvider::new(None).with_transfer(Reply::Rejected));
    let dispatcher = TransferDispatcher::new(provider.clone(), destination(), None);

    let result = dispatcher.dispatch(100, 250).await;

    assert!(matches!(result, Err(ProviderError::Rejected { .. })));
    assert_eq!(provider.transfer_calls(), 1);
}
