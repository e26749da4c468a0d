//! # Shared Types Crate
//!
//! This crate contains all identifiers, persisted entities, and status
//! state machines shared across the Tollbooth subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types are defined here.
//! - **Exclusive Mutation**: entities carry their own transition oracles
//!   (`OrderStatus::can_transition`), but mutation only happens through
//!   the owning subsystem (the order ledger for `Order.status`, the
//!   account registry for `Account`).
//! - **No Floats in Money**: amounts are integer minor units end to end.

pub mod command;
pub mod entities;
pub mod ids;
pub mod money;
pub mod plan;
pub mod server;
pub mod time;

pub use command::{Command, CommandParseError};
pub use entities::{
    Account, AccountStatus, AttemptOutcome, Order, OrderStatus, ProvisioningAttempt,
};
pub use ids::{AccountId, OrderId, PlanId, ServerId, UserId};
pub use money::{Currency, Money};
pub use plan::{Plan, PlanType};
pub use server::{ServerProfile, ServerStatus};
pub use time::{MockTimeSource, SystemTimeSource, TimeSource};
