//! Payment error taxonomy.

use tb_order_ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced by the payment subsystem.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Gateway HTTP failure (timeout, connectivity, non-2xx).
    /// Transient; the same reconcile call is safe to retry.
    #[error("gateway request failed: {0}")]
    Gateway(String),

    /// The gateway answered 2xx but the body was not what the wire
    /// contract promises. Not retried; needs operator attention.
    #[error("gateway response malformed: {0}")]
    MalformedResponse(String),

    /// A webhook or poll referenced something no order maps to.
    #[error("no order for gateway reference: {0}")]
    UnknownReference(String),

    /// Ledger error, conflicts included.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PaymentError {
    /// True for failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}
