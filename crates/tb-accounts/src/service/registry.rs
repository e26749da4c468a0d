//! The account registry service.

use crate::domain::AccountError;
use chrono::DateTime;
use chrono::Utc;
use shared_types::{
    Account, AccountId, AccountStatus, Order, ServerId, TimeSource, UserId,
};
use std::sync::Arc;
use tb_store::{StateStore, StoreError};
use tracing::{debug, info};
use uuid::Uuid;

/// Owns account creation, lookup, and usage accounting.
pub struct AccountRegistry {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn TimeSource>,
}

impl AccountRegistry {
    /// Wire the registry to its collaborators.
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn TimeSource>) -> Self {
        Self { store, clock }
    }

    /// Create the account for an order, or return the existing one.
    ///
    /// Idempotent on `order_id`: the insert is guarded by the store's
    /// unique constraint, so a duplicate call — even with a different
    /// `credential_uuid` — returns the first-created row unchanged.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_account(
        &self,
        order: &Order,
        username: &str,
        server_id: &ServerId,
        credential_uuid: Uuid,
        access_domain: &str,
        access_port: u16,
        device_limit: u32,
        expires_at: DateTime<Utc>,
    ) -> Result<Account, AccountError> {
        let candidate = Account {
            account_id: AccountId::generate(),
            user_id: order.user_id,
            server_id: server_id.clone(),
            order_id: order.order_id.clone(),
            username: username.to_string(),
            credential_uuid,
            access_domain: access_domain.to_string(),
            access_port,
            status: AccountStatus::Active,
            expires_at,
            device_limit,
            active_devices: 0,
            data_used: 0,
            last_reminder_threshold: None,
            created_at: self.clock.now(),
        };

        let outcome = self.store.insert_account(candidate).await?;
        if outcome.was_inserted() {
            let account = outcome.into_account();
            info!(
                account_id = %account.account_id,
                order_id = %order.order_id,
                server_id = %server_id,
                "Account created"
            );
            Ok(account)
        } else {
            let account = outcome.into_account();
            debug!(
                account_id = %account.account_id,
                order_id = %order.order_id,
                "Account already exists for order, returning existing row"
            );
            Ok(account)
        }
    }

    /// The ACTIVE account with the latest `expires_at` for a user.
    /// Never returns a row whose validity window has elapsed.
    pub async fn get_active_account(
        &self,
        user_id: UserId,
    ) -> Result<Option<Account>, AccountError> {
        let now = self.clock.now();
        Ok(self.store.active_account_for_user(user_id, now).await?)
    }

    /// Fetch an account, failing when it does not exist.
    pub async fn account(&self, account_id: &AccountId) -> Result<Account, AccountError> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(account_id.clone()))
    }

    /// The account created by an order, if provisioning completed.
    pub async fn account_for_order(
        &self,
        order_id: &shared_types::OrderId,
    ) -> Result<Option<Account>, AccountError> {
        Ok(self.store.account_for_order(order_id).await?)
    }

    /// Apply usage deltas. Counters are monotonic; a device delta that
    /// would breach `device_limit` fails with
    /// [`AccountError::LimitExceeded`] and mutates nothing.
    pub async fn record_usage(
        &self,
        account_id: &AccountId,
        bytes_delta: u64,
        device_delta: i32,
    ) -> Result<Account, AccountError> {
        match self
            .store
            .record_usage(account_id, bytes_delta, device_delta)
            .await
        {
            Ok(account) => Ok(account),
            Err(StoreError::DeviceLimitExceeded { account_id, limit }) => {
                Err(AccountError::LimitExceeded { account_id, limit })
            }
            Err(StoreError::AccountNotFound(id)) => Err(AccountError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}
