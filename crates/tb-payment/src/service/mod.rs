//! Payment application services.

pub mod reconciler;

pub use reconciler::{CheckoutConfig, PaymentReconciler};
