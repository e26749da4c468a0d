//! Crash windows: the process dying at any point between the remote
//! side effect and the final order CAS must converge on exactly one
//! account once provisioning is re-driven.

use crate::integration::world;
use shared_types::{AttemptOutcome, OrderStatus, ProvisioningAttempt, TimeSource};
use tb_store::StateStore;
use tb_provisioning::{derive_credential, derive_username, MockBehavior, ProvisionOutcome};

#[tokio::test]
async fn test_timeout_that_landed_converges_on_same_identity() {
    let w = world();
    let order = w.terms_accepted_order(1, "premium-30").await;

    // The remote call times out but the credential lands anyway.
    w.transport.script([MockBehavior::TimeoutButLand]);
    let outcome = w.coordinator.provision(&order.order_id).await.unwrap();
    assert!(matches!(outcome, ProvisionOutcome::Retryable { .. }));

    // The retry targets the same derived username; the node answers
    // "already exists" and that reads as success.
    let outcome = w.coordinator.provision(&order.order_id).await.unwrap();
    let ProvisionOutcome::Provisioned(account) = outcome else {
        panic!("expected provisioned outcome");
    };
    assert_eq!(account.credential_uuid, derive_credential(&order.order_id));
    assert_eq!(w.transport.remote_users(), vec![derive_username(&order.order_id)]);
    assert_eq!(
        w.ledger.order(&order.order_id).await.unwrap().status,
        OrderStatus::Provisioned
    );
}

#[tokio::test]
async fn test_restart_settles_in_flight_attempt_and_reprovisions() {
    let w = world();
    let order = w.terms_accepted_order(1, "premium-30").await;

    // First pass: the call times out after the remote effect landed.
    w.transport.script([MockBehavior::TimeoutButLand]);
    assert!(matches!(
        w.coordinator.provision(&order.order_id).await.unwrap(),
        ProvisionOutcome::Retryable { .. }
    ));

    // Second pass dies mid-call: its attempt row stays IN_FLIGHT.
    w.store
        .record_attempt(ProvisioningAttempt {
            order_id: order.order_id.clone(),
            attempt_no: 2,
            started_at: w.clock.now(),
            outcome: AttemptOutcome::InFlight,
            remote_output: None,
        })
        .await
        .unwrap();

    // A new process starts over the same store.
    let coordinator = w.restarted_coordinator();
    let recovered = coordinator.recover_stale_attempts().await.unwrap();
    assert_eq!(recovered, vec![order.order_id.clone()]);
    assert!(w.store.in_flight_attempts().await.unwrap().is_empty());

    // The re-driven provision absorbs the already-present credential.
    let outcome = coordinator.provision(&order.order_id).await.unwrap();
    let ProvisionOutcome::Provisioned(account) = outcome else {
        panic!("expected provisioned outcome");
    };
    assert_eq!(account.username, derive_username(&order.order_id));

    let attempts = w.store.attempts_for_order(&order.order_id).await.unwrap();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[1].outcome, AttemptOutcome::FailedRetryable);
    assert_eq!(attempts[2].outcome, AttemptOutcome::Succeeded);
}

#[tokio::test]
async fn test_crash_between_account_insert_and_final_cas() {
    let w = world();
    let order = w.terms_accepted_order(1, "premium-30").await;

    // Simulate the narrowest window: the account row exists but the
    // order was never CAS'd to PROVISIONED.
    let existing = w
        .registry
        .create_account(
            &order,
            &derive_username(&order.order_id),
            &shared_types::ServerId::new(crate::integration::SERVER_ID),
            derive_credential(&order.order_id),
            crate::integration::SERVER_HOSTNAME,
            8443,
            2,
            w.clock.now() + chrono::Duration::days(30),
        )
        .await
        .unwrap();

    let outcome = w.coordinator.provision(&order.order_id).await.unwrap();
    let ProvisionOutcome::Provisioned(account) = outcome else {
        panic!("expected provisioned outcome");
    };

    // Finalized from the existing row, without touching the node.
    assert_eq!(account.account_id, existing.account_id);
    assert!(w.transport.invocations().is_empty());
    assert_eq!(
        w.ledger.order(&order.order_id).await.unwrap().status,
        OrderStatus::Provisioned
    );
}

#[tokio::test]
async fn test_exhausted_retries_fail_the_order_across_restarts() {
    let w = world();
    let order = w.terms_accepted_order(1, "premium-30").await;
    w.transport
        .script(vec![MockBehavior::Transient("node unreachable".into()); 5]);

    // Two attempts in the first process life.
    for _ in 0..2 {
        assert!(matches!(
            w.coordinator.provision(&order.order_id).await.unwrap(),
            ProvisionOutcome::Retryable { .. }
        ));
    }

    // The rest after a restart; the attempt ledger carries the count.
    let coordinator = w.restarted_coordinator();
    for _ in 0..2 {
        assert!(matches!(
            coordinator.provision(&order.order_id).await.unwrap(),
            ProvisionOutcome::Retryable { .. }
        ));
    }
    let outcome = coordinator.provision(&order.order_id).await.unwrap();
    assert!(matches!(outcome, ProvisionOutcome::Failed { .. }));
    assert_eq!(
        w.ledger.order(&order.order_id).await.unwrap().status,
        OrderStatus::Failed
    );
}
