//! Registry domain: error taxonomy.

pub mod errors;

pub use errors::AccountError;
