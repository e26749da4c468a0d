//! # Account Registry Subsystem
//!
//! ## Purpose
//!
//! Owns the `Account` lifecycle. Creation is idempotent on `order_id`
//! via the store's unique-constraint insert (never pre-check then
//! insert; that leaves a race window). Lookup discipline enforces the
//! business invariant of at most one ACTIVE, non-expired account per
//! user exposed to callers, while historical rows coexist for audit.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | One account per order, first write wins | `AccountRegistry::create_account` |
//! | Active lookup never returns expired rows | `AccountRegistry::get_active_account` |
//! | Devices never exceed the plan limit | `AccountRegistry::record_usage` |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod service;

pub use domain::AccountError;
pub use service::AccountRegistry;
