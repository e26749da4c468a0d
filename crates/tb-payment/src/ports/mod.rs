//! Ports: the gateway seam.

pub mod outbound;

pub use outbound::{MockGateway, PaymentGateway};
