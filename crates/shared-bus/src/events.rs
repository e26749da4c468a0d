//! # Core Events
//!
//! Defines all event types that flow through the shared bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{AccountId, OrderId, ServerId, UserId};

/// Days-remaining threshold at which an expiry reminder fires.
///
/// Thresholds descend (7 → 3 → 1); each crossing is reported at most
/// once per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderThreshold(pub u32);

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoreEvent {
    /// An order's payment was confirmed against the gateway.
    OrderPaid {
        /// The paid order.
        order_id: OrderId,
        /// Buyer, for notification routing.
        user_id: UserId,
        /// When the PENDING→PAID transition landed.
        paid_at: DateTime<Utc>,
    },

    /// A remote credential exists and the account row is written.
    AccountProvisioned {
        /// Source order.
        order_id: OrderId,
        /// Newly registered account.
        account_id: AccountId,
        /// Buyer.
        user_id: UserId,
        /// Node the credential lives on.
        server_id: ServerId,
        /// End of the validity window.
        expires_at: DateTime<Utc>,
    },

    /// An order reached FAILED and needs operator attention.
    OrderFailed {
        /// The failed order.
        order_id: OrderId,
        /// Why provisioning gave up.
        reason: String,
    },

    /// An account crossed a pre-expiry reminder threshold.
    ExpiryReminderDue {
        /// Account nearing expiry.
        account_id: AccountId,
        /// Buyer.
        user_id: UserId,
        /// Which threshold was crossed.
        threshold: ReminderThreshold,
        /// End of the validity window.
        expires_at: DateTime<Utc>,
    },

    /// An account's validity window elapsed and it was swept to EXPIRED.
    AccountExpired {
        /// The expired account.
        account_id: AccountId,
        /// Former owner.
        user_id: UserId,
    },
}

impl CoreEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::OrderPaid { .. } => EventTopic::Payments,
            Self::AccountProvisioned { .. } => EventTopic::Provisioning,
            Self::OrderFailed { .. } => EventTopic::OperatorAlerts,
            Self::ExpiryReminderDue { .. } | Self::AccountExpired { .. } => EventTopic::Expiry,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Payment reconciliation milestones.
    Payments,
    /// Provisioning completions.
    Provisioning,
    /// Expiry sweeps and reminders.
    Expiry,
    /// Failures requiring a human.
    OperatorAlerts,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &CoreEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
