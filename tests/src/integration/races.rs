//! Concurrent and duplicate triggers collapsing to a single outcome.
//!
//! Every inbound path can fire twice — webhook plus poll, a
//! double-tapped button, a retry racing the original — and the CAS
//! discipline on the order row is what keeps each effect singular.

use crate::integration::world;
use shared_bus::EventPublisher;
use shared_types::OrderStatus;
use tb_payment::WebhookPayload;
use tb_provisioning::{ProvisionOutcome, ServerDirectory};

#[tokio::test]
async fn test_webhook_and_poll_race_to_one_paid_transition() {
    let w = world();
    let (order, bill) = w.checkout(1, "premium-30").await;
    w.gateway.mark_paid(&bill);

    let payload = WebhookPayload {
        billcode: bill.as_str().to_string(),
        order_id: order.order_id.as_str().to_string(),
        status: "1".into(),
    };
    let (webhook, poll) = tokio::join!(
        w.reconciler.handle_webhook(&payload),
        w.reconciler.reconcile(&order.order_id)
    );
    assert!(webhook.unwrap());
    assert!(poll.unwrap());

    // One transition, one OrderPaid event.
    assert_eq!(
        w.ledger.order(&order.order_id).await.unwrap().status,
        OrderStatus::Paid
    );
    assert_eq!(w.bus.events_published(), 1);
}

#[tokio::test]
async fn test_duplicate_terms_acceptance_converges() {
    let w = world();
    let order = w.paid_order(1, "premium-30").await;

    let (a, b) = tokio::join!(
        w.coordinator.accept_terms(&order.order_id),
        w.coordinator.accept_terms(&order.order_id)
    );
    assert_eq!(a.unwrap().status, OrderStatus::TermsAccepted);
    assert_eq!(b.unwrap().status, OrderStatus::TermsAccepted);
}

#[tokio::test]
async fn test_repeated_provision_yields_one_account_one_remote_call() {
    let w = world();
    let order = w.terms_accepted_order(1, "premium-30").await;

    let first = w.coordinator.provision(&order.order_id).await.unwrap();
    let second = w.coordinator.provision(&order.order_id).await.unwrap();
    let third = w.coordinator.provision(&order.order_id).await.unwrap();

    let (
        ProvisionOutcome::Provisioned(a),
        ProvisionOutcome::Provisioned(b),
        ProvisionOutcome::Provisioned(c),
    ) = (first, second, third)
    else {
        panic!("expected every invocation to report the account");
    };
    assert_eq!(a.account_id, b.account_id);
    assert_eq!(b.account_id, c.account_id);

    // Only the first invocation reached the node; one account was
    // counted against its capacity.
    assert_eq!(w.transport.invocations().len(), 1);
    let server = w
        .directory
        .server(&a.server_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(server.active_accounts, 1);
}

#[tokio::test]
async fn test_repeated_reconcile_after_paid_stays_quiet() {
    let w = world();
    let order = w.paid_order(1, "basic-30").await;

    // Late webhook replays land on a PAID order without re-publishing.
    for _ in 0..3 {
        assert!(w.reconciler.reconcile(&order.order_id).await.unwrap());
    }
    assert_eq!(w.bus.events_published(), 1);
    assert_eq!(w.gateway.bill_count(), 1);
}
