//! Expiry domain types.

pub mod errors;

pub use errors::ExpiryError;
