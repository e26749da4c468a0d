//! The state store port.
//!
//! All components read and write through this trait; no component holds
//! a cached row across a suspension point without revalidating status
//! first. The required backing-store guarantees are a unique constraint
//! on `Order.order_id`, a unique constraint on `Account.order_id`, and
//! indexed lookup by (`user_id`, status, `expires_at`).

use crate::domain::{InsertOutcome, StoreError};
use crate::ports::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{
    Account, AccountId, AccountStatus, AttemptOutcome, Order, OrderId, OrderStatus,
    ProvisioningAttempt, UserId,
};

/// Durable persistence for orders, accounts, and the attempt ledger.
#[async_trait]
pub trait StateStore: Send + Sync {
    // --- Orders ---

    /// Insert a fresh order. Fails with [`StoreError::DuplicateOrder`]
    /// if the id is taken.
    async fn insert_order(&self, order: Order) -> Result<(), StoreError>;

    /// Fetch an order by id.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders belonging to a user, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// Resolve a gateway external reference back to its order. This is
    /// the webhook mapping path.
    async fn order_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Record the gateway bill code on an order, once a bill exists.
    async fn set_gateway_reference(
        &self,
        order_id: &OrderId,
        reference: &str,
    ) -> Result<(), StoreError>;

    /// Compare-and-swap the order status.
    ///
    /// Validates (`from`, `to`) against the transition oracle, then
    /// swaps only if the current status equals `from`. Sets `paid_at`
    /// on a swap to PAID and `provisioned_at` on a swap to PROVISIONED.
    ///
    /// # Errors
    ///
    /// - [`StoreError::IllegalTransition`] if the pair is not in the machine
    /// - [`StoreError::StatusConflict`] if the CAS loses (caller treats
    ///   this as "already handled")
    async fn transition_order(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, StoreError>;

    /// PENDING orders created before `cutoff`, for the unpaid-order
    /// expiry sweep.
    async fn pending_orders_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError>;

    // --- Accounts ---

    /// Insert an account, guarded by the unique constraint on
    /// `order_id`. A duplicate insert returns the first-created row
    /// unchanged; last write does not win.
    async fn insert_account(&self, account: Account) -> Result<InsertOutcome, StoreError>;

    /// Fetch an account by id.
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// The account created by a given order, if any.
    async fn account_for_order(&self, order_id: &OrderId) -> Result<Option<Account>, StoreError>;

    /// The ACTIVE, non-expired account with the latest `expires_at` for
    /// a user. Never returns a row with `expires_at <= now`.
    async fn active_account_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError>;

    /// Atomically apply usage deltas.
    ///
    /// Counters are monotonic. Fails with
    /// [`StoreError::DeviceLimitExceeded`] if `device_delta` would push
    /// `active_devices` above `device_limit`; nothing is mutated in
    /// that case. A negative delta detaches devices, saturating at zero.
    async fn record_usage(
        &self,
        account_id: &AccountId,
        bytes_delta: u64,
        device_delta: i32,
    ) -> Result<Account, StoreError>;

    /// Compare-and-swap the account status.
    async fn transition_account(
        &self,
        account_id: &AccountId,
        from: AccountStatus,
        to: AccountStatus,
    ) -> Result<Account, StoreError>;

    /// Record a reminder threshold crossing.
    ///
    /// Returns `true` only when `threshold` is strictly below the
    /// previously recorded one (or none was recorded). Thresholds only
    /// descend; that is what makes the reminder sweep idempotent.
    async fn mark_reminder(
        &self,
        account_id: &AccountId,
        threshold: u32,
    ) -> Result<bool, StoreError>;

    /// ACTIVE accounts whose validity window ends at or before `instant`.
    async fn accounts_expiring_by(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Account>, StoreError>;

    /// All ACTIVE accounts, for the reminder scan.
    async fn active_accounts(&self) -> Result<Vec<Account>, StoreError>;

    // --- Provisioning attempt ledger ---

    /// Append an attempt row. Recorded as IN_FLIGHT before the remote
    /// call; this is the crash-recovery anchor.
    async fn record_attempt(&self, attempt: ProvisioningAttempt) -> Result<(), StoreError>;

    /// Settle an attempt's outcome and capture the raw remote output.
    async fn complete_attempt(
        &self,
        order_id: &OrderId,
        attempt_no: u32,
        outcome: AttemptOutcome,
        remote_output: Option<String>,
    ) -> Result<(), StoreError>;

    /// All attempts for an order, in attempt order.
    async fn attempts_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<ProvisioningAttempt>, StoreError>;

    /// Attempts still marked IN_FLIGHT across all orders. A non-empty
    /// result after restart means the process died mid-provision.
    async fn in_flight_attempts(&self) -> Result<Vec<ProvisioningAttempt>, StoreError>;

    // --- Sessions ---

    /// Persist a user's UI session.
    async fn put_session(&self, user_id: UserId, session: Session) -> Result<(), StoreError>;

    /// Fetch a user's UI session.
    async fn get_session(&self, user_id: UserId) -> Result<Option<Session>, StoreError>;

    /// Drop a user's UI session.
    async fn clear_session(&self, user_id: UserId) -> Result<(), StoreError>;
}
