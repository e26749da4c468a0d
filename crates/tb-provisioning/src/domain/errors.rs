//! Provisioning error taxonomy.

use shared_types::{OrderId, OrderStatus, ServerId};
use tb_accounts::AccountError;
use tb_order_ledger::LedgerError;
use tb_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the provisioning subsystem.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// No order row for this id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Provisioning requires TERMS_ACCEPTED; this order is elsewhere.
    #[error("order {order_id} is {actual}, not ready for provisioning")]
    NotReady {
        /// The order in question.
        order_id: OrderId,
        /// Status actually found.
        actual: OrderStatus,
    },

    /// The order references a plan the catalog no longer knows.
    #[error("order {0} references an unknown plan")]
    UnknownPlan(OrderId),

    /// No online server has capacity. Transient; retry later.
    #[error("no server available")]
    NoServerAvailable,

    /// Another provision holds the server's lease. Transient.
    #[error("server {0} is leased by another provision")]
    ServerBusy(ServerId),

    /// Remote connectivity/timeout failure. Retried with backoff; the
    /// remote side effect may or may not have landed.
    #[error("transient remote failure: {0}")]
    RemoteTransient(String),

    /// Remote script/state corruption. Not retried; the order moves to
    /// FAILED and an operator is alerted.
    #[error("fatal remote failure: {0}")]
    RemoteFatal(String),

    /// An access link failed to parse back into its parts.
    #[error("malformed access link: {0}")]
    MalformedLink(String),

    /// Ledger error, conflicts included.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Registry error.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProvisioningError {
    /// True for failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NoServerAvailable | Self::ServerBusy(_) | Self::RemoteTransient(_)
        )
    }
}
