//! Adapters implementing the ledger's outbound ports.

pub mod catalog;

pub use catalog::StaticPlanCatalog;
