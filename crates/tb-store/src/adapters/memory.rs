//! In-memory state store.
//!
//! A single `parking_lot::RwLock` over the whole table set gives every
//! operation the atomicity the port demands; no method holds the lock
//! across an await. A relational adapter would replace this file and
//! lean on real unique constraints and row-level CAS instead.

use crate::domain::{InsertOutcome, StoreError};
use crate::ports::session::Session;
use crate::ports::state_store::StateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::{
    Account, AccountId, AccountStatus, AttemptOutcome, Order, OrderId, OrderStatus,
    ProvisioningAttempt, UserId,
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    accounts: HashMap<AccountId, Account>,
    /// Unique constraint on `Account.order_id`.
    account_by_order: HashMap<OrderId, AccountId>,
    attempts: HashMap<OrderId, Vec<ProvisioningAttempt>>,
    sessions: HashMap<UserId, Session>,
}

/// In-memory [`StateStore`] adapter.
#[derive(Default)]
pub struct MemoryStateStore {
    tables: RwLock<Tables>,
}

impl MemoryStateStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of order rows. Test observability.
    pub fn order_count(&self) -> usize {
        self.tables.read().orders.len()
    }

    /// Number of account rows. Test observability.
    pub fn account_count(&self) -> usize {
        self.tables.read().accounts.len()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if t.orders.contains_key(&order.order_id) {
            return Err(StoreError::DuplicateOrder(order.order_id));
        }
        debug!(order_id = %order.order_id, "Order inserted");
        t.orders.insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.read().orders.get(order_id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let t = self.tables.read();
        let mut orders: Vec<Order> = t
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn order_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError> {
        let t = self.tables.read();
        Ok(t.orders
            .values()
            .find(|o| o.gateway_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn set_gateway_reference(
        &self,
        order_id: &OrderId,
        reference: &str,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let order = t
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
        order.gateway_reference = Some(reference.to_string());
        Ok(())
    }

    async fn transition_order(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        if !OrderStatus::can_transition(from, to) {
            return Err(StoreError::IllegalTransition { from, to });
        }

        let mut t = self.tables.write();
        let order = t
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;

        if order.status != from {
            return Err(StoreError::StatusConflict {
                order_id: order_id.clone(),
                expected: from,
                actual: order.status,
            });
        }

        order.status = to;
        match to {
            OrderStatus::Paid => order.paid_at = Some(now),
            OrderStatus::Provisioned => order.provisioned_at = Some(now),
            _ => {}
        }

        debug!(order_id = %order_id, %from, %to, "Order status swapped");
        Ok(order.clone())
    }

    async fn pending_orders_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let t = self.tables.read();
        Ok(t.orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending && o.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn insert_account(&self, account: Account) -> Result<InsertOutcome, StoreError> {
        let mut t = self.tables.write();

        // Unique constraint on order_id: first writer wins, the loser
        // gets the existing row back unchanged.
        if let Some(existing_id) = t.account_by_order.get(&account.order_id) {
            let existing = t
                .accounts
                .get(existing_id)
                .cloned()
                .ok_or_else(|| StoreError::Backend("dangling order index entry".into()))?;
            return Ok(InsertOutcome::Exists(existing));
        }

        t.account_by_order
            .insert(account.order_id.clone(), account.account_id.clone());
        t.accounts.insert(account.account_id.clone(), account.clone());
        debug!(account_id = %account.account_id, order_id = %account.order_id, "Account inserted");
        Ok(InsertOutcome::Inserted(account))
    }

    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.tables.read().accounts.get(account_id).cloned())
    }

    async fn account_for_order(&self, order_id: &OrderId) -> Result<Option<Account>, StoreError> {
        let t = self.tables.read();
        Ok(t.account_by_order
            .get(order_id)
            .and_then(|id| t.accounts.get(id))
            .cloned())
    }

    async fn active_account_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        let t = self.tables.read();
        Ok(t.accounts
            .values()
            .filter(|a| {
                a.user_id == user_id && a.status == AccountStatus::Active && a.expires_at > now
            })
            .max_by_key(|a| a.expires_at)
            .cloned())
    }

    async fn record_usage(
        &self,
        account_id: &AccountId,
        bytes_delta: u64,
        device_delta: i32,
    ) -> Result<Account, StoreError> {
        let mut t = self.tables.write();
        let account = t
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StoreError::AccountNotFound(account_id.clone()))?;

        // Check the ceiling before mutating anything.
        if device_delta > 0 {
            let proposed = account.active_devices.saturating_add(device_delta as u32);
            if proposed > account.device_limit {
                return Err(StoreError::DeviceLimitExceeded {
                    account_id: account_id.clone(),
                    limit: account.device_limit,
                });
            }
            account.active_devices = proposed;
        } else {
            account.active_devices = account
                .active_devices
                .saturating_sub(device_delta.unsigned_abs());
        }

        account.data_used = account.data_used.saturating_add(bytes_delta);
        Ok(account.clone())
    }

    async fn transition_account(
        &self,
        account_id: &AccountId,
        from: AccountStatus,
        to: AccountStatus,
    ) -> Result<Account, StoreError> {
        let mut t = self.tables.write();
        let account = t
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StoreError::AccountNotFound(account_id.clone()))?;

        if account.status != from {
            return Err(StoreError::AccountStatusConflict {
                account_id: account_id.clone(),
                expected: from,
                actual: account.status,
            });
        }

        account.status = to;
        debug!(account_id = %account_id, ?from, ?to, "Account status swapped");
        Ok(account.clone())
    }

    async fn mark_reminder(
        &self,
        account_id: &AccountId,
        threshold: u32,
    ) -> Result<bool, StoreError> {
        let mut t = self.tables.write();
        let account = t
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StoreError::AccountNotFound(account_id.clone()))?;

        // Thresholds only descend; an equal or higher one was already
        // reported.
        let first_crossing = match account.last_reminder_threshold {
            None => true,
            Some(prev) => threshold < prev,
        };
        if first_crossing {
            account.last_reminder_threshold = Some(threshold);
        }
        Ok(first_crossing)
    }

    async fn accounts_expiring_by(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Account>, StoreError> {
        let t = self.tables.read();
        Ok(t.accounts
            .values()
            .filter(|a| a.status == AccountStatus::Active && a.expires_at <= instant)
            .cloned()
            .collect())
    }

    async fn active_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let t = self.tables.read();
        Ok(t.accounts
            .values()
            .filter(|a| a.status == AccountStatus::Active)
            .cloned()
            .collect())
    }

    async fn record_attempt(&self, attempt: ProvisioningAttempt) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        t.attempts
            .entry(attempt.order_id.clone())
            .or_default()
            .push(attempt);
        Ok(())
    }

    async fn complete_attempt(
        &self,
        order_id: &OrderId,
        attempt_no: u32,
        outcome: AttemptOutcome,
        remote_output: Option<String>,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let attempt = t
            .attempts
            .get_mut(order_id)
            .and_then(|v| v.iter_mut().find(|a| a.attempt_no == attempt_no))
            .ok_or(StoreError::AttemptNotFound {
                order_id: order_id.clone(),
                attempt_no,
            })?;
        attempt.outcome = outcome;
        attempt.remote_output = remote_output;
        Ok(())
    }

    async fn attempts_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<ProvisioningAttempt>, StoreError> {
        Ok(self
            .tables
            .read()
            .attempts
            .get(order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn in_flight_attempts(&self) -> Result<Vec<ProvisioningAttempt>, StoreError> {
        let t = self.tables.read();
        Ok(t.attempts
            .values()
            .flatten()
            .filter(|a| a.outcome == AttemptOutcome::InFlight)
            .cloned()
            .collect())
    }

    async fn put_session(&self, user_id: UserId, session: Session) -> Result<(), StoreError> {
        self.tables.write().sessions.insert(user_id, session);
        Ok(())
    }

    async fn get_session(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.read().sessions.get(&user_id).cloned())
    }

    async fn clear_session(&self, user_id: UserId) -> Result<(), StoreError> {
        self.tables.write().sessions.remove(&user_id);
        Ok(())
    }
}
