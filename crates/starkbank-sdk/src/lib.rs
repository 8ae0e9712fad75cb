//! # Stark Bank SDK
//!
//! Minimal client for the Stark Bank v2 API used by Credit Relay.
//!
//! This SDK provides:
//! - Project credentials with ECDSA (secp256k1) request signing
//! - Webhook event parsing with digital-signature verification
//! - Invoice payment lookup
//! - Transfer creation
//!
//! Unlike the official SDKs there is no process-wide "current user": every
//! [`StarkBankClient`] owns the [`Project`] it authenticates as.
//!
//! # Examples
//!
//! ```rust,no_run
//! use starkbank_sdk::{Environment, Project, StarkBankClient};
//!
//! # async fn example(private_key_pem: &str) -> Result<(), starkbank_sdk::StarkBankError> {
//! let project = Project::new(Environment::Sandbox, "5656565656565656", private_key_pem)?;
//! let client = StarkBankClient::builder(project).build()?;
//!
//! let payment = client.get_invoice_payment("5807638394699776").await?;
//! println!("Invoice paid with {}", payment.amount);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod event;
pub mod invoice;
pub mod transfer;

pub use auth::{Environment, Project, PrivateKey};
pub use client::{ClientConfig, StarkBankClient, StarkBankClientBuilder};
pub use error::{ErrorDetail, StarkBankError};
pub use event::{Event, EventLog, InvoiceSnapshot};
pub use invoice::InvoicePayment;
pub use transfer::Transfer;
