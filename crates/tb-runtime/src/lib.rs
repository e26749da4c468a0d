//! # Tollbooth Runtime
//!
//! Composition root: configuration, service wiring, the command
//! dispatcher, and the background tasks (provisioning retries, expiry
//! sweeps, unpaid-order expiry). The binary in `main.rs` is a thin
//! shell over these pieces.
//!
//! ## Module Structure
//!
//! - `container/` — [`RuntimeConfig`] and the [`ServiceContainer`]
//! - `dispatch`  — [`CommandDispatcher`] mapping commands to services
//! - `tasks`     — spawned background loops and the [`RetryScheduler`]

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod dispatch;
pub mod tasks;

pub use container::{ConfigError, RuntimeConfig, ServiceContainer, SessionBackend};
pub use dispatch::{CommandDispatcher, DispatchError, Reply, StaticScreen};
pub use tasks::RetryScheduler;
