//! Persisted entities and their status state machines.
//!
//! The order state machine is the backbone of the whole system:
//!
//! ```text
//! PENDING ──→ PAID ──→ TERMS_ACCEPTED ──→ PROVISIONED
//!    │          │              │
//!    │          └──────┬───────┘
//!    ├──→ CANCELLED    └──→ FAILED
//!    └──→ EXPIRED
//! ```
//!
//! Transitions are monotonic: no path ever reverses. Every downstream
//! action is expressed as a compare-and-swap against this machine, and a
//! CAS refusal means "someone else already did this", never an error.

use crate::ids::{AccountId, OrderId, PlanId, ServerId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment.
    #[default]
    Pending,
    /// Gateway confirmed payment.
    Paid,
    /// Buyer accepted the usage terms; eligible for provisioning.
    TermsAccepted,
    /// Remote credential exists and the account row is written.
    Provisioned,
    /// Buyer abandoned the order before paying.
    Cancelled,
    /// Provisioning gave up (attempt ceiling or fatal remote state).
    Failed,
    /// Order lapsed unpaid.
    Expired,
}

impl OrderStatus {
    /// The single transition oracle. Every store-level CAS validates
    /// against this before writing.
    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (from, to),
            (Pending, Paid)
                | (Paid, TermsAccepted)
                | (TermsAccepted, Provisioned)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Paid, Failed)
                | (TermsAccepted, Failed)
        )
    }

    /// Open orders block a second concurrent order for plan families
    /// that forbid it.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Paid | Self::TermsAccepted)
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Provisioned | Self::Cancelled | Self::Failed | Self::Expired)
    }

    /// True once payment has been observed, whatever happened after.
    /// A reconciler racing a webhook treats any of these as "paid".
    pub fn at_or_beyond_paid(&self) -> bool {
        matches!(self, Self::Paid | Self::TermsAccepted | Self::Provisioned)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::TermsAccepted => "terms_accepted",
            Self::Provisioned => "provisioned",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// A purchase intent for a plan, tracked through payment and
/// provisioning. Owned and exclusively mutated by the order ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Globally unique, generated before any external call.
    pub order_id: OrderId,
    /// Buyer.
    pub user_id: UserId,
    /// Catalog entry purchased.
    pub plan_id: PlanId,
    /// Exact amount due.
    pub amount: Money,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Gateway bill code, once a bill exists.
    pub gateway_reference: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Set exactly once on the PENDING→PAID transition.
    pub paid_at: Option<DateTime<Utc>>,
    /// Set exactly once on the TERMS_ACCEPTED→PROVISIONED transition.
    pub provisioned_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A fresh PENDING order.
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        plan_id: PlanId,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            user_id,
            plan_id,
            amount,
            status: OrderStatus::Pending,
            gateway_reference: None,
            created_at,
            paid_at: None,
            provisioned_at: None,
        }
    }
}

/// Account lifecycle status. Accounts are never deleted, only
/// status-transitioned, to preserve audit history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Live credential.
    #[default]
    Active,
    /// Validity window elapsed.
    Expired,
    /// Operator-suspended.
    Suspended,
    /// Locked pending investigation.
    Locked,
}

/// A provisioned, time-boxed VPN credential tied to exactly one order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Registry identifier.
    pub account_id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Remote node the credential lives on.
    pub server_id: ServerId,
    /// The order that created this account (1:1, unique).
    pub order_id: OrderId,
    /// Remote username, derived deterministically from `order_id` so
    /// that a re-invoked provisioning targets the same remote identity.
    pub username: String,
    /// Credential UUID injected into the remote config.
    pub credential_uuid: Uuid,
    /// Public endpoint the node reported when the credential landed.
    /// Access links render from these, not from the fleet directory:
    /// the node, not our inventory, knows where it listens.
    pub access_domain: String,
    /// Listening port reported alongside `access_domain`.
    pub access_port: u16,
    /// Current status.
    pub status: AccountStatus,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
    /// Maximum simultaneous devices.
    pub device_limit: u32,
    /// Currently attached devices.
    pub active_devices: u32,
    /// Monotonic usage counter in bytes.
    pub data_used: u64,
    /// Smallest days-remaining threshold already reminded about.
    /// Descends 7 → 3 → 1; the descent is what makes the reminder
    /// sweep idempotent.
    pub last_reminder_threshold: Option<u32>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Days until expiry, clamped at zero.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days().max(0)
    }

    /// True when the validity window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Outcome of a single provisioning attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Recorded before the remote call; the crash-recovery anchor.
    InFlight,
    /// Remote effect landed and the account row is written.
    Succeeded,
    /// Transient remote failure; the order stays TERMS_ACCEPTED and a
    /// retry is scheduled.
    FailedRetryable,
    /// Unrecoverable remote state; the order moves to FAILED.
    FailedFatal,
}

/// Internal ledger row distinguishing "crashed mid-provision" from
/// "never attempted" and from "remote succeeded but the account write
/// crashed".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningAttempt {
    /// Order being provisioned.
    pub order_id: OrderId,
    /// 1-based attempt counter.
    pub attempt_no: u32,
    /// When the attempt was anchored.
    pub started_at: DateTime<Utc>,
    /// Current outcome.
    pub outcome: AttemptOutcome,
    /// Raw remote output, kept for operator diagnosis.
    pub remote_output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use chrono::Duration;

    fn order() -> Order {
        Order::new(
            OrderId::new("ORD-20250201-AAAAAA"),
            UserId(42),
            PlanId::new("premium-30"),
            Money::from_major(20, Currency::Myr),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_order_is_pending() {
        let o = order();
        assert_eq!(o.status, OrderStatus::Pending);
        assert!(o.paid_at.is_none());
        assert!(o.provisioned_at.is_none());
        assert!(o.gateway_reference.is_none());
    }

    #[test]
    fn test_happy_path_transitions() {
        use OrderStatus::*;
        assert!(OrderStatus::can_transition(Pending, Paid));
        assert!(OrderStatus::can_transition(Paid, TermsAccepted));
        assert!(OrderStatus::can_transition(TermsAccepted, Provisioned));
    }

    #[test]
    fn test_branch_transitions() {
        use OrderStatus::*;
        assert!(OrderStatus::can_transition(Pending, Cancelled));
        assert!(OrderStatus::can_transition(Pending, Expired));
        assert!(OrderStatus::can_transition(Paid, Failed));
        assert!(OrderStatus::can_transition(TermsAccepted, Failed));
    }

    #[test]
    fn test_no_transition_reverses() {
        use OrderStatus::*;
        let all = [Pending, Paid, TermsAccepted, Provisioned, Cancelled, Failed, Expired];
        // Forward rank along the happy path; branches are terminal.
        let rank = |s: OrderStatus| match s {
            Pending => 0,
            Paid => 1,
            TermsAccepted => 2,
            Provisioned | Cancelled | Failed | Expired => 3,
        };
        for from in all {
            for to in all {
                if OrderStatus::can_transition(from, to) {
                    assert!(rank(to) > rank(from), "{from} -> {to} must move forward");
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        use OrderStatus::*;
        let all = [Pending, Paid, TermsAccepted, Provisioned, Cancelled, Failed, Expired];
        for from in [Provisioned, Cancelled, Failed, Expired] {
            for to in all {
                assert!(!OrderStatus::can_transition(from, to));
            }
        }
    }

    #[test]
    fn test_at_or_beyond_paid() {
        use OrderStatus::*;
        assert!(!Pending.at_or_beyond_paid());
        assert!(Paid.at_or_beyond_paid());
        assert!(TermsAccepted.at_or_beyond_paid());
        assert!(Provisioned.at_or_beyond_paid());
        assert!(!Cancelled.at_or_beyond_paid());
    }

    #[test]
    fn test_account_expiry_helpers() {
        let now = Utc::now();
        let acct = Account {
            account_id: AccountId::new("ACC-1"),
            user_id: UserId(1),
            server_id: ServerId::new("sg-1"),
            order_id: OrderId::new("ORD-1"),
            username: "u-ord-1".into(),
            credential_uuid: Uuid::new_v4(),
            access_domain: "vpn1.example.com".into(),
            access_port: 443,
            status: AccountStatus::Active,
            expires_at: now + Duration::days(5),
            device_limit: 2,
            active_devices: 0,
            data_used: 0,
            last_reminder_threshold: None,
            created_at: now,
        };
        assert_eq!(acct.days_until_expiry(now), 5);
        assert!(!acct.is_expired(now));
        assert!(acct.is_expired(now + Duration::days(6)));
    }
}
