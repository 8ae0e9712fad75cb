//! Fakes shared by the unit tests of this crate.

use crate::provider::{
    InvoiceRecord, PaymentProviderClient, ProviderError, TransferRequest, VerifiedEvent,
};
use crate::store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted result of a fake provider call.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Unavailable,
    Rejected,
}

impl<T: Clone> Reply<T> {
    fn into_result(self) -> Result<T, ProviderError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Unavailable => Err(ProviderError::Unavailable {
                message: "connection reset".to_string(),
            }),
            Self::Rejected => Err(ProviderError::Rejected {
                message: "invalidAmount: Amount must be positive".to_string(),
            }),
        }
    }
}

/// Provider fake that records every call.
///
/// `event: None` makes signature verification fail.
pub struct FakeProvider {
    pub event: Option<VerifiedEvent>,
    pub payment: Reply<i64>,
    pub transfer: Reply<String>,
    pub verify_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub transfers: Mutex<Vec<TransferRequest>>,
}

impl FakeProvider {
    pub fn new(event: Option<VerifiedEvent>) -> Self {
        Self {
            event,
            payment: Reply::Ok(10100),
            transfer: Reply::Ok("5738709764800512".to_string()),
            verify_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_payment(mut self, payment: Reply<i64>) -> Self {
        self.payment = payment;
        self
    }

    pub fn with_transfer(mut self, transfer: Reply<String>) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn transfer_calls(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }

    pub fn sent_transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProviderClient for FakeProvider {
    async fn verify_and_parse(
        &self,
        _body: &[u8],
        _signature: &str,
    ) -> Result<VerifiedEvent, ProviderError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.event.clone().ok_or(ProviderError::InvalidSignature)
    }

    async fn lookup_payment(&self, _invoice_id: &str) -> Result<i64, ProviderError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.payment.clone().into_result()
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, ProviderError> {
        self.transfers.lock().unwrap().push(request.clone());
        self.transfer.clone().into_result()
    }
}

/// Store fake that is always unreachable and counts calls.
#[derive(Default)]
pub struct UnreachableStore {
    pub calls: AtomicUsize,
}

impl UnreachableStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> StoreError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StoreError::Unavailable {
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl KeyValueStore for UnreachableStore {
    async fn set_if_absent(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<bool, StoreError> {
        Err(self.fail())
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(self.fail())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(self.fail())
    }
}

pub fn invoice_event(id: &str, log_type: &str) -> VerifiedEvent {
    VerifiedEvent {
        id: id.to_string(),
        subscription: "invoice".to_string(),
        log_type: log_type.to_string(),
        invoice: Some(InvoiceRecord {
            id: "5155165527080960".to_string(),
            amount: 10100,
            fee: 100,
        }),
        workspace_id: None,
        created: None,
    }
}

pub fn transfer_event(id: &str) -> VerifiedEvent {
    VerifiedEvent {
        id: id.to_string(),
        subscription: "transfer".to_string(),
        log_type: "success".to_string(),
        invoice: None,
        workspace_id: None,
        created: None,
    }
}
