//! Ports: outbound dependencies of the ledger.

pub mod outbound;

pub use outbound::PlanCatalog;
