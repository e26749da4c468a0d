//! Payment reconciliation.
//!
//! Both untrusted triggers (inbound webhook, user-initiated poll)
//! converge on [`PaymentReconciler::reconcile`]: fetch the bill's
//! transactions from the gateway, and if it reports paid, CAS the order
//! PENDING→PAID through the ledger. A lost CAS means a prior
//! reconciliation already landed, so the call still reports paid.

use crate::domain::errors::PaymentError;
use crate::domain::wire::{BillCode, CreateBillRequest, TransactionStatus, WebhookPayload};
use crate::ports::outbound::PaymentGateway;
use shared_bus::{CoreEvent, EventPublisher};
use shared_types::{Order, OrderId, OrderStatus};
use std::sync::Arc;
use tb_order_ledger::{LedgerError, OrderLedger};
use tb_store::StoreError;
use tracing::{info, warn};

/// URLs stamped onto every created bill.
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// Where the payer lands after paying.
    pub return_url: String,
    /// Where the gateway posts payment notifications.
    pub callback_url: String,
}

/// Drives orders PENDING→PAID exactly once.
pub struct PaymentReconciler {
    ledger: Arc<OrderLedger>,
    gateway: Arc<dyn PaymentGateway>,
    bus: Arc<dyn EventPublisher>,
    checkout: CheckoutConfig,
}

impl PaymentReconciler {
    /// Wire the reconciler to its collaborators.
    pub fn new(
        ledger: Arc<OrderLedger>,
        gateway: Arc<dyn PaymentGateway>,
        bus: Arc<dyn EventPublisher>,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            ledger,
            gateway,
            bus,
            checkout,
        }
    }

    /// Create (or reuse) the gateway bill for an order.
    ///
    /// Idempotent: an order that already carries a gateway reference
    /// gets that bill back instead of a duplicate.
    pub async fn create_checkout(&self, order: &Order) -> Result<BillCode, PaymentError> {
        if let Some(existing) = &order.gateway_reference {
            return Ok(BillCode::new(existing.as_str()));
        }

        let request = CreateBillRequest::new(
            format!("VPN {}", order.plan_id),
            format!("Order {} ({})", order.order_id, order.amount),
            order.amount.minor_units(),
            order.order_id.as_str(),
            self.checkout.return_url.as_str(),
            self.checkout.callback_url.as_str(),
        );

        let bill_code = self.gateway.create_bill(request).await?;
        self.ledger
            .attach_gateway_reference(&order.order_id, bill_code.as_str())
            .await?;
        info!(order_id = %order.order_id, bill_code = %bill_code, "Checkout created");
        Ok(bill_code)
    }

    /// Reconcile an order against the gateway. Returns whether the
    /// order is paid.
    ///
    /// No state is written before the gateway responds; gateway errors
    /// are transient and the call is safe to repeat.
    pub async fn reconcile(&self, order_id: &OrderId) -> Result<bool, PaymentError> {
        let order = self.ledger.order(order_id).await?;

        // Payment already observed by an earlier reconciliation.
        if order.status.at_or_beyond_paid() {
            return Ok(true);
        }

        let Some(reference) = &order.gateway_reference else {
            // No bill yet; nothing the gateway could know about.
            return Ok(false);
        };

        let transactions = self
            .gateway
            .bill_transactions(&BillCode::new(reference.as_str()))
            .await?;
        let gateway_paid = transactions
            .iter()
            .any(|t| t.status == TransactionStatus::Paid);
        if !gateway_paid {
            return Ok(false);
        }

        match self
            .ledger
            .transition(order_id, OrderStatus::Pending, OrderStatus::Paid)
            .await
        {
            Ok(updated) => {
                info!(order_id = %order_id, "Order paid");
                if let Some(paid_at) = updated.paid_at {
                    self.bus
                        .publish(CoreEvent::OrderPaid {
                            order_id: updated.order_id.clone(),
                            user_id: updated.user_id,
                            paid_at,
                        })
                        .await;
                }
                Ok(true)
            }
            Err(LedgerError::Store(StoreError::StatusConflict { actual, .. })) => {
                if actual.at_or_beyond_paid() {
                    // A racing reconciliation won the CAS; same outcome.
                    Ok(true)
                } else {
                    // Payment arrived for a closed order; money without
                    // a deliverable needs a human.
                    warn!(order_id = %order_id, status = %actual, "Payment received for closed order");
                    Ok(false)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Handle an inbound gateway webhook.
    ///
    /// The payload is untrusted: its claimed status is ignored and the
    /// bill is re-fetched from the gateway inside `reconcile`.
    pub async fn handle_webhook(&self, payload: &WebhookPayload) -> Result<bool, PaymentError> {
        let claimed = payload.claimed_order_id();
        let order = match self.ledger.order(&claimed).await {
            Ok(order) => order,
            Err(LedgerError::OrderNotFound(_)) => self
                .ledger
                .order_by_gateway_reference(payload.billcode.as_str())
                .await?
                .ok_or_else(|| PaymentError::UnknownReference(payload.billcode.clone()))?,
            Err(e) => return Err(e.into()),
        };
        self.reconcile(&order.order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::MockGateway;
    use chrono::{TimeZone, Utc};
    use shared_bus::InMemoryEventBus;
    use shared_types::{MockTimeSource, PlanId, UserId};
    use tb_order_ledger::StaticPlanCatalog;
    use tb_store::MemoryStateStore;

    struct Fixture {
        reconciler: PaymentReconciler,
        ledger: Arc<OrderLedger>,
        gateway: Arc<MockGateway>,
        bus: Arc<InMemoryEventBus>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStateStore::new());
        let clock = MockTimeSource::new(Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap());
        let ledger = Arc::new(OrderLedger::new(
            store,
            Arc::new(StaticPlanCatalog::standard()),
            Arc::new(clock),
        ));
        let gateway = Arc::new(MockGateway::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = PaymentReconciler::new(
            ledger.clone(),
            gateway.clone(),
            bus.clone(),
            CheckoutConfig {
                return_url: "https://example.com/return".into(),
                callback_url: "https://example.com/hook".into(),
            },
        );
        Fixture {
            reconciler,
            ledger,
            gateway,
            bus,
        }
    }

    async fn checkout_order(fx: &Fixture) -> (OrderId, BillCode) {
        let order = fx
            .ledger
            .create_order(UserId(1), &PlanId::new("premium-30"))
            .await
            .unwrap();
        let bill = fx.reconciler.create_checkout(&order).await.unwrap();
        (order.order_id, bill)
    }

    #[tokio::test]
    async fn test_unpaid_reconcile_is_false() {
        let fx = fixture();
        let (order_id, _) = checkout_order(&fx).await;

        assert!(!fx.reconciler.reconcile(&order_id).await.unwrap());
        let order = fx.ledger.order(&order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_paid_reconcile_transitions_once() {
        let fx = fixture();
        let (order_id, bill) = checkout_order(&fx).await;
        fx.gateway.mark_paid(&bill);

        assert!(fx.reconciler.reconcile(&order_id).await.unwrap());
        let order = fx.ledger.order(&order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.paid_at.is_some());
        assert_eq!(fx.bus.events_published(), 1);

        // Second reconcile: still true, no second transition or event.
        assert!(fx.reconciler.reconcile(&order_id).await.unwrap());
        assert_eq!(fx.bus.events_published(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_both_report_paid() {
        let fx = fixture();
        let (order_id, bill) = checkout_order(&fx).await;
        fx.gateway.mark_paid(&bill);

        let (a, b) = tokio::join!(
            fx.reconciler.reconcile(&order_id),
            fx.reconciler.reconcile(&order_id)
        );
        assert!(a.unwrap());
        assert!(b.unwrap());

        let order = fx.ledger.order(&order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_checkout_is_idempotent() {
        let fx = fixture();
        let (order_id, bill) = checkout_order(&fx).await;

        let order = fx.ledger.order(&order_id).await.unwrap();
        let again = fx.reconciler.create_checkout(&order).await.unwrap();
        assert_eq!(again, bill);
        assert_eq!(fx.gateway.bill_count(), 1);
    }

    #[tokio::test]
    async fn test_gateway_error_is_transient_and_clean() {
        let fx = fixture();
        let (order_id, bill) = checkout_order(&fx).await;
        fx.gateway.mark_paid(&bill);

        fx.gateway.fail_next(1);
        let err = fx.reconciler.reconcile(&order_id).await.unwrap_err();
        assert!(err.is_transient());

        // No partial state was written; the retry lands cleanly.
        let order = fx.ledger.order(&order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(fx.reconciler.reconcile(&order_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_webhook_maps_reference_and_ignores_claimed_status() {
        let fx = fixture();
        let (order_id, bill) = checkout_order(&fx).await;

        // Webhook claims paid, but the gateway says otherwise; the
        // claim must not be believed.
        let payload = WebhookPayload {
            billcode: bill.as_str().to_string(),
            order_id: order_id.as_str().to_string(),
            status: "1".into(),
        };
        assert!(!fx.reconciler.handle_webhook(&payload).await.unwrap());

        fx.gateway.mark_paid(&bill);
        assert!(fx.reconciler.handle_webhook(&payload).await.unwrap());
    }

    #[tokio::test]
    async fn test_webhook_falls_back_to_bill_code() {
        let fx = fixture();
        let (order_id, bill) = checkout_order(&fx).await;
        fx.gateway.mark_paid(&bill);

        // Garbled order id, valid bill code.
        let payload = WebhookPayload {
            billcode: bill.as_str().to_string(),
            order_id: "ORD-GARBLED".into(),
            status: "1".into(),
        };
        assert!(fx.reconciler.handle_webhook(&payload).await.unwrap());
        let order = fx.ledger.order(&order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_webhook_unknown_reference_rejected() {
        let fx = fixture();
        let payload = WebhookPayload {
            billcode: "bill-unknown".into(),
            order_id: "ORD-UNKNOWN".into(),
            status: "1".into(),
        };
        let err = fx.reconciler.handle_webhook(&payload).await.unwrap_err();
        assert!(matches!(err, PaymentError::UnknownReference(_)));
    }

    #[tokio::test]
    async fn test_cancelled_order_payment_flagged_not_paid() {
        let fx = fixture();
        let (order_id, bill) = checkout_order(&fx).await;
        fx.ledger.cancel(&order_id).await.unwrap();
        fx.gateway.mark_paid(&bill);

        // Cancelled is not at-or-beyond-paid; the reconciler reports
        // unpaid and leaves the order terminal.
        assert!(!fx.reconciler.reconcile(&order_id).await.unwrap());
        let order = fx.ledger.order(&order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }
}
