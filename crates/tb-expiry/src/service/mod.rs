//! Services: the expiry monitor.

pub mod monitor;

pub use monitor::{ExpiryMonitor, SweepReport, DEFAULT_REMINDER_THRESHOLDS};
