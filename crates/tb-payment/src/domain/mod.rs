//! Payment domain: wire types and error taxonomy.

pub mod errors;
pub mod wire;

pub use errors::PaymentError;
pub use wire::{BillCode, BillTransaction, CreateBillRequest, TransactionStatus, WebhookPayload};
