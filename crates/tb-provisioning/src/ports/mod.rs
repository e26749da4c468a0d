//! Ports: transport and server directory seams.

pub mod outbound;

pub use outbound::{MockBehavior, MockTransport, ProvisioningTransport, ServerDirectory};
