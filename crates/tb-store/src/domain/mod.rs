//! Store domain: error taxonomy and insert outcomes.

pub mod errors;
pub mod outcome;

pub use errors::StoreError;
pub use outcome::InsertOutcome;
