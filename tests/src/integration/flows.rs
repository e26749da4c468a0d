//! Happy-path lifecycles driven end to end through the real services.

use crate::integration::{world, SERVER_HOSTNAME, SERVER_ID};
use shared_bus::{CoreEvent, EventFilter, EventTopic};
use shared_types::{AccountStatus, OrderStatus, PlanId, UserId};
use tb_order_ledger::LedgerError;
use tb_payment::WebhookPayload;
use tb_provisioning::{derive_credential, derive_username, AccessLink, ProvisionOutcome};

#[tokio::test]
async fn test_webhook_driven_purchase_to_live_account() {
    let w = world();
    let mut events = w.bus.subscribe(EventFilter::topics(vec![EventTopic::All]));

    let (order, bill) = w.checkout(1, "premium-30").await;
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!w.reconciler.reconcile(&order.order_id).await.unwrap());

    // The gateway settles the bill and notifies us.
    w.gateway.mark_paid(&bill);
    let payload = WebhookPayload {
        billcode: bill.as_str().to_string(),
        order_id: order.order_id.as_str().to_string(),
        status: "1".into(),
    };
    assert!(w.reconciler.handle_webhook(&payload).await.unwrap());

    let order = w.coordinator.accept_terms(&order.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::TermsAccepted);

    let outcome = w.coordinator.provision(&order.order_id).await.unwrap();
    let ProvisionOutcome::Provisioned(account) = outcome else {
        panic!("expected provisioned outcome");
    };

    // The account carries the deterministic identity and lives on the
    // single fleet node.
    assert_eq!(account.username, derive_username(&order.order_id));
    assert_eq!(account.credential_uuid, derive_credential(&order.order_id));
    assert_eq!(account.server_id.as_str(), SERVER_ID);
    assert_eq!(account.status, AccountStatus::Active);

    let order = w.ledger.order(&order.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Provisioned);

    // The account persists the endpoint the node reported in its grant,
    // and the access link renders from it.
    assert_eq!(account.access_domain, SERVER_HOSTNAME);
    assert_eq!(account.access_port, 8443);
    let link = AccessLink::new(
        account.credential_uuid,
        account.access_domain.as_str(),
        account.access_port,
        account.username.as_str(),
    );
    let rendered = link.render();
    assert!(rendered.starts_with("vless://"));
    assert!(rendered.contains(":8443"));
    assert_eq!(AccessLink::parse(&rendered).unwrap(), link);

    assert!(matches!(
        events.try_recv().unwrap(),
        Some(CoreEvent::OrderPaid { .. })
    ));
    assert!(matches!(
        events.try_recv().unwrap(),
        Some(CoreEvent::AccountProvisioned { .. })
    ));
    assert!(events.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn test_poll_driven_payment() {
    let w = world();
    let (order, bill) = w.checkout(1, "basic-30").await;

    // The buyer mashes "check payment" before paying.
    assert!(!w.reconciler.reconcile(&order.order_id).await.unwrap());
    assert!(!w.reconciler.reconcile(&order.order_id).await.unwrap());

    w.gateway.mark_paid(&bill);
    assert!(w.reconciler.reconcile(&order.order_id).await.unwrap());
    assert_eq!(
        w.ledger.order(&order.order_id).await.unwrap().status,
        OrderStatus::Paid
    );
}

#[tokio::test]
async fn test_trial_provisioned_then_never_again() {
    let w = world();
    let account = w.provisioned_account(7, "trial-3").await;
    assert_eq!(account.status, AccountStatus::Active);

    // The trial entitlement is consumed for good.
    let err = w
        .ledger
        .create_order(UserId(7), &PlanId::new("trial-3"))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::TrialAlreadyUsed);

    // A paid plan remains open to the same user.
    w.ledger
        .create_order(UserId(7), &PlanId::new("premium-30"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancelled_order_stays_closed_when_payment_arrives() {
    let w = world();
    let (order, bill) = w.checkout(1, "premium-30").await;
    w.ledger.cancel(&order.order_id).await.unwrap();

    // Money lands on a closed order; the reconciler must not
    // resurrect it.
    w.gateway.mark_paid(&bill);
    assert!(!w.reconciler.reconcile(&order.order_id).await.unwrap());
    assert_eq!(
        w.ledger.order(&order.order_id).await.unwrap().status,
        OrderStatus::Cancelled
    );
    assert!(w.transport.invocations().is_empty());
}

#[tokio::test]
async fn test_stale_pending_order_expires_and_cannot_provision() {
    let w = world();
    let (order, _) = w.checkout(1, "basic-30").await;

    w.clock.advance(chrono::Duration::hours(2));
    let expired = w
        .ledger
        .expire_stale_pending(chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);

    // Neither terms nor provisioning can follow an expired order.
    assert!(w.coordinator.accept_terms(&order.order_id).await.is_err());
    assert!(w.coordinator.provision(&order.order_id).await.is_err());
}
