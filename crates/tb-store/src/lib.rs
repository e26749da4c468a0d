//! # State Store Subsystem
//!
//! ## Purpose
//!
//! Sole source of truth for orders, accounts, and the provisioning
//! attempt ledger. Every cross-component coordination point is expressed
//! here as a compare-and-swap on `Order.status` / `Account.status` or a
//! unique-constraint insert on `Account.order_id` — never as a
//! read-then-write without a guard. That discipline is what makes every
//! handler in the system safe to invoke concurrently or redundantly.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Order status moves only along the legal machine | `transition_order` validates via `OrderStatus::can_transition` |
//! | At most one Account per order | `insert_account` unique constraint on `order_id` |
//! | Reminder thresholds only descend | `mark_reminder` guard |
//! | Devices never exceed the limit | `record_usage` atomic check |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  adapters/ - MemoryStateStore, session store adapters  │
//! └────────────────────────────────────────────────────────┘
//!                      ↑ implements ↑
//! ┌────────────────────────────────────────────────────────┐
//! │  ports/state_store.rs - StateStore trait               │
//! │  ports/session.rs     - SessionStore trait             │
//! └────────────────────────────────────────────────────────┘
//!                      ↑ uses ↑
//! ┌────────────────────────────────────────────────────────┐
//! │  domain/errors.rs  - StoreError                        │
//! │  domain/outcome.rs - InsertOutcome tri-state           │
//! └────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{MemorySessionStore, MemoryStateStore, StoreBackedSessionStore};
pub use domain::{InsertOutcome, StoreError};
pub use ports::{Session, SessionStore, StateStore};
