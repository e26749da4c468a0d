//! Provisioning domain types.

pub mod errors;
pub mod identity;
pub mod link;
pub mod remote;
pub mod retry;

pub use errors::ProvisioningError;
pub use identity::{derive_credential, derive_username};
pub use link::AccessLink;
pub use remote::{ExitClass, ProvisionRequest, RemoteGrant, RemoteOutcome};
pub use retry::RetryPolicy;
