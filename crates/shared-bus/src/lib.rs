//! # Shared Bus - Event Bus for Inter-Subsystem Notification
//!
//! Subsystems announce lifecycle milestones here (order paid, account
//! provisioned, expiry reminders, operator alerts); interested parties
//! subscribe. The external notifier that actually delivers messages to
//! users is a subscriber like any other and lives outside this core.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Reconciler / │                    │  Notifier /  │
//! │ Coordinator  │    publish()       │  Operator    │
//! │              │ ──────┐            │  console     │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Events are fire-and-forget: publishing never blocks the state
//! machine, and a slow subscriber lags rather than stalling the flow.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{CoreEvent, EventFilter, EventTopic, ReminderThreshold};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
