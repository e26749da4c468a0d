//! Adapters implementing the gateway port.

pub mod http;

pub use http::{GatewayConfig, HttpPaymentGateway};
