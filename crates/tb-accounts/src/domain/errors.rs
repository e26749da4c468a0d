//! Registry error taxonomy.

use shared_types::AccountId;
use tb_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the account registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccountError {
    /// No account row for this id.
    #[error("account not found: {0}")]
    NotFound(AccountId),

    /// A device delta would exceed the plan's cap. Surfaced to the
    /// caller, who decides whether to hard-block or warn; nothing is
    /// mutated.
    #[error("device limit {limit} exceeded on account {account_id}")]
    LimitExceeded {
        /// Account at its limit.
        account_id: AccountId,
        /// The configured ceiling.
        limit: u32,
    },

    /// Underlying store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}
