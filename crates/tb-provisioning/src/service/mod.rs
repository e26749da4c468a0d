//! Services: per-server leases and the provisioning coordinator.

pub mod coordinator;
pub mod lease;

pub use coordinator::{ProvisionOutcome, ProvisioningCoordinator};
pub use lease::{ServerLease, ServerLeaseRegistry};
