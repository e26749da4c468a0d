//! The expiry monitor service.

use crate::domain::ExpiryError;
use shared_bus::{CoreEvent, EventPublisher, ReminderThreshold};
use shared_types::{Account, AccountStatus, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tb_store::{StateStore, StoreError};
use tracing::{debug, info, warn};

/// Days-remaining thresholds at which reminders fire, descending.
pub const DEFAULT_REMINDER_THRESHOLDS: [u32; 3] = [7, 3, 1];

/// What one sweep did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Accounts CAS-swept ACTIVE → EXPIRED.
    pub expired: usize,
    /// Reminder events emitted.
    pub reminders: usize,
}

/// Sweeps lapsed accounts to EXPIRED and reports threshold crossings.
pub struct ExpiryMonitor {
    store: Arc<dyn StateStore>,
    bus: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    /// Descending; the smallest satisfied threshold is the one reported.
    thresholds: Vec<u32>,
}

impl ExpiryMonitor {
    /// Wire the monitor with the default 7/3/1 thresholds.
    pub fn new(
        store: Arc<dyn StateStore>,
        bus: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self::with_thresholds(store, bus, clock, DEFAULT_REMINDER_THRESHOLDS)
    }

    /// Wire the monitor with custom thresholds. Sorted descending
    /// internally; the order callers pass does not matter.
    pub fn with_thresholds(
        store: Arc<dyn StateStore>,
        bus: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
        thresholds: impl IntoIterator<Item = u32>,
    ) -> Self {
        let mut thresholds: Vec<u32> = thresholds.into_iter().collect();
        thresholds.sort_unstable_by(|a, b| b.cmp(a));
        thresholds.dedup();
        Self {
            store,
            bus,
            clock,
            thresholds,
        }
    }

    /// One full sweep: expire lapsed accounts, then report threshold
    /// crossings on the rest. Idempotent — the CAS absorbs racing
    /// sweeps and the store's descending-threshold record deduplicates
    /// reminders.
    pub async fn sweep(&self) -> Result<SweepReport, ExpiryError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for account in self.store.accounts_expiring_by(now).await? {
            match self
                .store
                .transition_account(
                    &account.account_id,
                    AccountStatus::Active,
                    AccountStatus::Expired,
                )
                .await
            {
                Ok(_) => {
                    info!(account_id = %account.account_id, "Account expired");
                    self.bus
                        .publish(CoreEvent::AccountExpired {
                            account_id: account.account_id.clone(),
                            user_id: account.user_id,
                        })
                        .await;
                    report.expired += 1;
                }
                Err(StoreError::AccountStatusConflict { .. }) => {
                    debug!(account_id = %account.account_id, "Account moved during sweep, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }

        for account in self.store.active_accounts().await? {
            if let Some(threshold) = self.crossed_threshold(&account) {
                if self.store.mark_reminder(&account.account_id, threshold).await? {
                    debug!(
                        account_id = %account.account_id,
                        threshold,
                        "Reminder threshold crossed"
                    );
                    self.bus
                        .publish(CoreEvent::ExpiryReminderDue {
                            account_id: account.account_id.clone(),
                            user_id: account.user_id,
                            threshold: ReminderThreshold(threshold),
                            expires_at: account.expires_at,
                        })
                        .await;
                    report.reminders += 1;
                }
            }
        }

        Ok(report)
    }

    /// The smallest threshold the account's days-remaining sits at or
    /// under, i.e. the most urgent crossing.
    fn crossed_threshold(&self, account: &Account) -> Option<u32> {
        let days = account.days_until_expiry(self.clock.now());
        self.thresholds
            .iter()
            .copied()
            .filter(|t| days <= i64::from(*t))
            .last()
    }

    /// Sweep forever on a fixed tick. Runs until the task is aborted.
    pub async fn run(&self, period: Duration) {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            match self.sweep().await {
                Ok(report) if report.expired > 0 || report.reminders > 0 => {
                    info!(
                        expired = report.expired,
                        reminders = report.reminders,
                        "Expiry sweep completed"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Expiry sweep failed, will retry next tick"),
            }
        }
    }
}
