//! # Order Ledger Subsystem
//!
//! ## Purpose
//!
//! Owns the `Order` lifecycle. Every other component requests status
//! transitions through the ledger and never writes `Order.status`
//! directly; the ledger in turn expresses every transition as a
//! compare-and-swap against the store, so a refused swap always means
//! "someone else already did this".
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Unknown/inactive plans cannot be ordered | `OrderLedger::create_order` |
//! | One open trial-family order per user | `OrderLedger::create_order` |
//! | One trial ever per user | `OrderLedger::create_order` |
//! | Cancel only from PENDING | `OrderLedger::cancel` |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::StaticPlanCatalog;
pub use domain::LedgerError;
pub use ports::PlanCatalog;
pub use service::OrderLedger;
