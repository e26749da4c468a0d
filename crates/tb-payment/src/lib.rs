//! # Payment Subsystem
//!
//! ## Purpose
//!
//! Makes PAID happen exactly once per order, from either of two
//! untrusted triggers: an inbound gateway webhook or an active poll
//! initiated by user action ("check payment"). Both paths converge on
//! `PaymentReconciler::reconcile`, which re-fetches bill status from
//! the gateway and expresses the PAID transition as a CAS through the
//! order ledger. Losing that CAS is evidence of a prior reconciliation
//! racing with this one, so the loser still reports "paid".
//!
//! ## Failure semantics
//!
//! Gateway HTTP errors are transient: callers retry the same idempotent
//! reconcile call. No partial state is ever written before the gateway
//! responds.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  adapters/http.rs - HttpPaymentGateway (reqwest)     │
//! └──────────────────────────────────────────────────────┘
//!                     ↑ implements ↑
//! ┌──────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - PaymentGateway, MockGateway     │
//! └──────────────────────────────────────────────────────┘
//!                     ↑ uses ↑
//! ┌──────────────────────────────────────────────────────┐
//! │  domain/wire.rs   - bill / transaction wire types    │
//! │  domain/errors.rs - PaymentError                     │
//! │  service/reconciler.rs - PaymentReconciler           │
//! └──────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{GatewayConfig, HttpPaymentGateway};
pub use domain::{
    BillCode, BillTransaction, CreateBillRequest, PaymentError, TransactionStatus, WebhookPayload,
};
pub use ports::{MockGateway, PaymentGateway};
pub use service::{CheckoutConfig, PaymentReconciler};
