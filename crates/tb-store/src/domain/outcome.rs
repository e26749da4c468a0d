//! Tri-state insert outcome.
//!
//! `insert_account` never pre-checks then inserts; it relies on the
//! unique constraint and reports which side of the race it landed on.
//! "Already exists" is a success signal to an idempotent caller, so it
//! is modeled as an outcome, not an error.

use shared_types::Account;

/// Result of a unique-constraint-guarded account insert.
#[derive(Clone, Debug, PartialEq)]
pub enum InsertOutcome {
    /// This call created the row.
    Inserted(Account),
    /// A row for the same `order_id` already existed; returned unchanged.
    Exists(Account),
}

impl InsertOutcome {
    /// The account, whichever side of the race we were on.
    pub fn into_account(self) -> Account {
        match self {
            Self::Inserted(a) | Self::Exists(a) => a,
        }
    }

    /// True when this call performed the insert.
    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}
