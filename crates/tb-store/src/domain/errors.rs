//! Store error taxonomy.
//!
//! Conflict variants (`StatusConflict`, `AccountStatusConflict`,
//! `DuplicateOrder`) are not application errors: a caller that loses a
//! CAS race interprets the conflict as "someone else already did this"
//! and continues idempotently. The helpers below exist so callers can
//! branch on that without matching every variant.

use shared_types::{AccountId, AccountStatus, OrderId, OrderStatus};
use thiserror::Error;

/// Errors surfaced by the state store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// No order row for this id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// No account row for this id.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Insert hit the unique constraint on `order_id`.
    #[error("duplicate order id: {0}")]
    DuplicateOrder(OrderId),

    /// CAS lost: the order's current status is not the expected one.
    #[error("order {order_id} status conflict: expected {expected}, found {actual}")]
    StatusConflict {
        /// Contested order.
        order_id: OrderId,
        /// Status the caller expected to swap from.
        expected: OrderStatus,
        /// Status actually found.
        actual: OrderStatus,
    },

    /// The requested transition is not in the legal machine at all.
    #[error("illegal order transition: {from} -> {to}")]
    IllegalTransition {
        /// Requested source status.
        from: OrderStatus,
        /// Requested target status.
        to: OrderStatus,
    },

    /// CAS lost on an account status swap.
    #[error("account {account_id} status conflict: expected {expected:?}, found {actual:?}")]
    AccountStatusConflict {
        /// Contested account.
        account_id: AccountId,
        /// Status the caller expected to swap from.
        expected: AccountStatus,
        /// Status actually found.
        actual: AccountStatus,
    },

    /// A device delta would push `active_devices` above the limit.
    /// Surfaced to the caller; mutates nothing.
    #[error("device limit {limit} exceeded on account {account_id}")]
    DeviceLimitExceeded {
        /// Account at its limit.
        account_id: AccountId,
        /// The configured ceiling.
        limit: u32,
    },

    /// No attempt row with this (order, attempt_no).
    #[error("attempt {attempt_no} for order {order_id} not found")]
    AttemptNotFound {
        /// Order being provisioned.
        order_id: OrderId,
        /// 1-based attempt counter.
        attempt_no: u32,
    },

    /// Backend failure (I/O, connectivity). Transient; retryable.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// True for CAS/unique-constraint collisions, which callers swallow
    /// as "already handled".
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateOrder(_)
                | Self::StatusConflict { .. }
                | Self::AccountStatusConflict { .. }
        )
    }

    /// True for failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}
