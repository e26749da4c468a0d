//! # Expiry Subsystem
//!
//! ## Purpose
//!
//! Periodic sweep over accounts: lapsed ACTIVE accounts are CAS-swept
//! to EXPIRED, and accounts nearing expiry get at most one reminder
//! per threshold crossing. Both halves are idempotent — re-running a
//! sweep produces no additional state change and no duplicate events —
//! so the tick period is purely a freshness knob.
//!
//! Delivery of reminders is someone else's job: the monitor only
//! publishes [`shared_bus::CoreEvent`] milestones.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod service;

pub use domain::ExpiryError;
pub use service::{ExpiryMonitor, SweepReport, DEFAULT_REMINDER_THRESHOLDS};
