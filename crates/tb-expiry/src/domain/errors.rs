//! Expiry error taxonomy.

use tb_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the expiry monitor.
#[derive(Debug, Error)]
pub enum ExpiryError {
    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}
