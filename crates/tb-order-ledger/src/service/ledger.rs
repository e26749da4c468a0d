//! The order ledger service.

use crate::domain::LedgerError;
use crate::ports::outbound::PlanCatalog;
use chrono::Duration;
use shared_types::{Order, OrderId, OrderStatus, PlanId, PlanType, TimeSource, UserId};
use std::sync::Arc;
use tb_store::{StateStore, StoreError};
use tracing::{info, warn};

/// Owns order creation and every status transition.
pub struct OrderLedger {
    store: Arc<dyn StateStore>,
    catalog: Arc<dyn PlanCatalog>,
    clock: Arc<dyn TimeSource>,
}

impl OrderLedger {
    /// Wire the ledger to its collaborators.
    pub fn new(
        store: Arc<dyn StateStore>,
        catalog: Arc<dyn PlanCatalog>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
        }
    }

    /// Create a PENDING order for a plan.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownPlan`] / [`LedgerError::InactivePlan`]
    /// - [`LedgerError::OpenOrderExists`] when the plan family forbids
    ///   concurrent orders and one is already open
    /// - [`LedgerError::TrialAlreadyUsed`] when a trial was already
    ///   consumed by this user
    pub async fn create_order(
        &self,
        user_id: UserId,
        plan_id: &PlanId,
    ) -> Result<Order, LedgerError> {
        let plan = self
            .catalog
            .plan(plan_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownPlan(plan_id.clone()))?;
        if !plan.is_active {
            return Err(LedgerError::InactivePlan(plan_id.clone()));
        }

        if plan.forbids_concurrent_orders() || plan.is_trial() {
            self.check_family_rules(user_id, &plan.plan_type, &plan).await?;
        }

        let now = self.clock.now();
        let order = Order::new(
            OrderId::generate(now),
            user_id,
            plan_id.clone(),
            plan.price,
            now,
        );
        self.store.insert_order(order.clone()).await?;
        info!(order_id = %order.order_id, user_id = user_id.0, plan = %plan_id, "Order created");
        Ok(order)
    }

    /// Create an order for whichever plan is on sale for a family.
    /// The command boundary speaks in families, not catalog ids.
    pub async fn create_order_for_type(
        &self,
        user_id: UserId,
        plan_type: PlanType,
    ) -> Result<Order, LedgerError> {
        let plan = self
            .catalog
            .plan_for_type(plan_type)
            .await?
            .ok_or_else(|| LedgerError::UnknownPlan(PlanId::new(plan_type.token())))?;
        self.create_order(user_id, &plan.id).await
    }

    async fn check_family_rules(
        &self,
        user_id: UserId,
        family: &PlanType,
        plan: &shared_types::Plan,
    ) -> Result<(), LedgerError> {
        let history = self.store.orders_for_user(user_id).await?;
        for prior in &history {
            let Some(prior_plan) = self.catalog.plan(&prior.plan_id).await? else {
                // Plan removed from the catalog since; its family is
                // unknowable, so it cannot block anything.
                continue;
            };
            if prior_plan.plan_type != *family {
                continue;
            }
            if plan.forbids_concurrent_orders() && prior.status.is_open() {
                return Err(LedgerError::OpenOrderExists(prior.order_id.clone()));
            }
            if plan.is_trial() && prior.status.at_or_beyond_paid() {
                return Err(LedgerError::TrialAlreadyUsed);
            }
        }
        Ok(())
    }

    /// Fetch an order, failing when it does not exist.
    pub async fn order(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))
    }

    /// Compare-and-swap the order status. A
    /// [`StoreError::StatusConflict`] passes through untranslated so
    /// callers can recognize "already handled".
    pub async fn transition(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, LedgerError> {
        let now = self.clock.now();
        Ok(self.store.transition_order(order_id, from, to, now).await?)
    }

    /// Cancel an order. Only legal from PENDING.
    pub async fn cancel(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let result = self
            .transition(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await;
        match result {
            Err(LedgerError::Store(StoreError::StatusConflict { actual, .. })) => {
                Err(LedgerError::IllegalState {
                    order_id: order_id.clone(),
                    required: OrderStatus::Pending,
                    actual,
                })
            }
            other => other,
        }
    }

    /// Record the gateway bill code on an order.
    pub async fn attach_gateway_reference(
        &self,
        order_id: &OrderId,
        reference: &str,
    ) -> Result<(), LedgerError> {
        Ok(self.store.set_gateway_reference(order_id, reference).await?)
    }

    /// Resolve a gateway external reference back to its order.
    pub async fn order_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, LedgerError> {
        Ok(self.store.order_by_gateway_reference(reference).await?)
    }

    /// Expire PENDING orders older than `max_age`. Losing a CAS here
    /// means the buyer paid or cancelled while we swept; skip those.
    pub async fn expire_stale_pending(
        &self,
        max_age: Duration,
    ) -> Result<Vec<Order>, LedgerError> {
        let cutoff = self.clock.now() - max_age;
        let stale = self.store.pending_orders_created_before(cutoff).await?;

        let mut expired = Vec::new();
        for order in stale {
            match self
                .transition(&order.order_id, OrderStatus::Pending, OrderStatus::Expired)
                .await
            {
                Ok(o) => expired.push(o),
                Err(LedgerError::Store(StoreError::StatusConflict { .. })) => {
                    warn!(order_id = %order.order_id, "Order moved during expiry sweep, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::StaticPlanCatalog;
    use chrono::{TimeZone, Utc};
    use shared_types::MockTimeSource;
    use tb_store::MemoryStateStore;

    fn ledger() -> (OrderLedger, Arc<MemoryStateStore>, MockTimeSource) {
        let store = Arc::new(MemoryStateStore::new());
        let clock = MockTimeSource::new(Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap());
        let ledger = OrderLedger::new(
            store.clone(),
            Arc::new(StaticPlanCatalog::standard()),
            Arc::new(clock.clone()),
        );
        (ledger, store, clock)
    }

    #[tokio::test]
    async fn test_create_order_pending() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_order(UserId(1), &PlanId::new("premium-30"))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.order_id.as_str().starts_with("ORD-20260201-"));
        assert_eq!(order.amount.minor_units(), 2000);
    }

    #[tokio::test]
    async fn test_unknown_plan_rejected() {
        let (ledger, _, _) = ledger();
        let err = ledger
            .create_order(UserId(1), &PlanId::new("gold-90"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownPlan(_)));
    }

    #[tokio::test]
    async fn test_concurrent_trial_orders_blocked() {
        let (ledger, _, _) = ledger();
        let trial = PlanId::new("trial-3");

        let first = ledger.create_order(UserId(1), &trial).await.unwrap();
        let err = ledger.create_order(UserId(1), &trial).await.unwrap_err();
        assert_eq!(err, LedgerError::OpenOrderExists(first.order_id));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_paid_plans_may_stack() {
        let (ledger, _, _) = ledger();
        let premium = PlanId::new("premium-30");

        ledger.create_order(UserId(1), &premium).await.unwrap();
        // A second premium order is fine (renewal while one is open).
        ledger.create_order(UserId(1), &premium).await.unwrap();
    }

    #[tokio::test]
    async fn test_one_trial_ever() {
        let (ledger, _, _) = ledger();
        let trial = PlanId::new("trial-3");

        let first = ledger.create_order(UserId(1), &trial).await.unwrap();
        ledger
            .transition(&first.order_id, OrderStatus::Pending, OrderStatus::Paid)
            .await
            .unwrap();

        let err = ledger.create_order(UserId(1), &trial).await.unwrap_err();
        assert_eq!(err, LedgerError::TrialAlreadyUsed);
    }

    #[tokio::test]
    async fn test_cancelled_trial_may_retry() {
        let (ledger, _, _) = ledger();
        let trial = PlanId::new("trial-3");

        let first = ledger.create_order(UserId(1), &trial).await.unwrap();
        ledger.cancel(&first.order_id).await.unwrap();

        // The abandoned trial never consumed the entitlement.
        ledger.create_order(UserId(1), &trial).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_requires_pending() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_order(UserId(1), &PlanId::new("basic-30"))
            .await
            .unwrap();
        ledger
            .transition(&order.order_id, OrderStatus::Pending, OrderStatus::Paid)
            .await
            .unwrap();

        let err = ledger.cancel(&order.order_id).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::IllegalState {
                actual: OrderStatus::Paid,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_gateway_reference_roundtrip() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_order(UserId(1), &PlanId::new("basic-30"))
            .await
            .unwrap();

        ledger
            .attach_gateway_reference(&order.order_id, "bill-xyz")
            .await
            .unwrap();
        let found = ledger.order_by_gateway_reference("bill-xyz").await.unwrap();
        assert_eq!(found.unwrap().order_id, order.order_id);
    }

    #[tokio::test]
    async fn test_stale_pending_sweep() {
        let (ledger, _, clock) = ledger();
        let order = ledger
            .create_order(UserId(1), &PlanId::new("basic-30"))
            .await
            .unwrap();

        // Not stale yet.
        let expired = ledger.expire_stale_pending(Duration::hours(1)).await.unwrap();
        assert!(expired.is_empty());

        clock.advance(Duration::hours(2));
        let expired = ledger.expire_stale_pending(Duration::hours(1)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].status, OrderStatus::Expired);

        // Idempotent: nothing left to expire.
        let again = ledger.expire_stale_pending(Duration::hours(1)).await.unwrap();
        assert!(again.is_empty());

        let _ = order;
    }

    #[tokio::test]
    async fn test_create_for_family() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_order_for_type(UserId(5), PlanType::Premium)
            .await
            .unwrap();
        assert_eq!(order.plan_id, PlanId::new("premium-30"));
    }
}
