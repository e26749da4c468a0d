//! Ledger error taxonomy.

use shared_types::{OrderId, OrderStatus, PlanId};
use tb_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the order ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    /// The plan id names no catalog entry. Validation; not retried.
    #[error("unknown plan: {0}")]
    UnknownPlan(PlanId),

    /// The plan exists but is not orderable.
    #[error("plan is inactive: {0}")]
    InactivePlan(PlanId),

    /// An open order for the same user and plan family already exists
    /// and the plan forbids concurrency. Conflict; caller points the
    /// user at the existing order.
    #[error("open order {0} already exists for this plan family")]
    OpenOrderExists(OrderId),

    /// The user already consumed their one trial.
    #[error("trial already used by this user")]
    TrialAlreadyUsed,

    /// No order row for this id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requested operation is only legal from another status
    /// (e.g. cancel on a non-PENDING order).
    #[error("order {order_id} is {actual}, not {required}")]
    IllegalState {
        /// The order in question.
        order_id: OrderId,
        /// Status the operation requires.
        required: OrderStatus,
        /// Status actually found.
        actual: OrderStatus,
    },

    /// Catalog collaborator failure. Transient.
    #[error("plan catalog failure: {0}")]
    Catalog(String),

    /// Underlying store error, conflicts included.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// True for CAS/unique-constraint collisions, which callers swallow
    /// as "already handled".
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::OpenOrderExists(_) => true,
            Self::Store(e) => e.is_conflict(),
            _ => false,
        }
    }
}
