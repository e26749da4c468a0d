//! Ledger application service.

pub mod ledger;

pub use ledger::OrderLedger;
