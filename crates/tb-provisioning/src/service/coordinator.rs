//! The provisioning coordinator.
//!
//! Drives one order from TERMS_ACCEPTED to PROVISIONED against a
//! remote node whose mutation cannot be rolled back. The attempt
//! ledger, deterministic identity, per-server lease, and idempotent
//! account insert together make `provision` safe to re-invoke at any
//! point after any crash.

use crate::domain::errors::ProvisioningError;
use crate::domain::identity::{derive_credential, derive_username};
use crate::domain::remote::{ProvisionRequest, RemoteGrant, RemoteOutcome};
use crate::domain::retry::RetryPolicy;
use crate::ports::{ProvisioningTransport, ServerDirectory};
use crate::service::lease::ServerLeaseRegistry;
use chrono::Duration as ChronoDuration;
use shared_bus::{CoreEvent, EventPublisher};
use shared_types::{
    Account, AttemptOutcome, Order, OrderId, OrderStatus, ProvisioningAttempt, TimeSource,
};
use std::sync::Arc;
use std::time::Duration;
use tb_accounts::AccountRegistry;
use tb_order_ledger::{LedgerError, OrderLedger, PlanCatalog};
use tb_store::{StateStore, StoreError};
use tracing::{debug, error, info, warn};

/// Access port assumed when the remote answers "already exists" and no
/// grant is available to read the real one from.
const FALLBACK_ACCESS_PORT: u16 = 443;

/// What one `provision` invocation decided.
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// The account exists and the order is PROVISIONED.
    Provisioned(Account),
    /// Transient failure; re-invoke after `delay`.
    Retryable {
        /// The attempt that just failed.
        attempt_no: u32,
        /// Backoff before the next invocation.
        delay: Duration,
    },
    /// The order moved to FAILED and an operator was alerted.
    Failed {
        /// Why provisioning gave up.
        reason: String,
    },
}

/// Coordinates terms acceptance, server selection, the remote call,
/// and account registration.
pub struct ProvisioningCoordinator {
    store: Arc<dyn StateStore>,
    ledger: Arc<OrderLedger>,
    registry: Arc<AccountRegistry>,
    catalog: Arc<dyn PlanCatalog>,
    directory: Arc<dyn ServerDirectory>,
    transport: Arc<dyn ProvisioningTransport>,
    leases: ServerLeaseRegistry,
    bus: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    policy: RetryPolicy,
}

impl ProvisioningCoordinator {
    /// Wire the coordinator to its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn StateStore>,
        ledger: Arc<OrderLedger>,
        registry: Arc<AccountRegistry>,
        catalog: Arc<dyn PlanCatalog>,
        directory: Arc<dyn ServerDirectory>,
        transport: Arc<dyn ProvisioningTransport>,
        leases: ServerLeaseRegistry,
        bus: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            ledger,
            registry,
            catalog,
            directory,
            transport,
            leases,
            bus,
            clock,
            policy,
        }
    }

    /// Record the buyer's terms acceptance: PAID → TERMS_ACCEPTED.
    ///
    /// Losing the CAS to a state at or beyond TERMS_ACCEPTED means a
    /// duplicate submission; the current order is returned unchanged.
    pub async fn accept_terms(&self, order_id: &OrderId) -> Result<Order, ProvisioningError> {
        match self
            .ledger
            .transition(order_id, OrderStatus::Paid, OrderStatus::TermsAccepted)
            .await
        {
            Ok(order) => {
                info!(order_id = %order_id, "Terms accepted");
                Ok(order)
            }
            Err(LedgerError::Store(StoreError::StatusConflict { actual, .. }))
                if matches!(
                    actual,
                    OrderStatus::TermsAccepted | OrderStatus::Provisioned
                ) =>
            {
                debug!(order_id = %order_id, %actual, "Terms already accepted");
                Ok(self.ledger.order(order_id).await?)
            }
            Err(LedgerError::Store(StoreError::StatusConflict { actual, .. })) => {
                Err(ProvisioningError::NotReady {
                    order_id: order_id.clone(),
                    actual,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Provision the order's credential on a remote node.
    ///
    /// Safe to re-invoke: a PROVISIONED order returns its existing
    /// account, a dangling account row (crash between insert and the
    /// final CAS) is finalized without touching the remote, and a
    /// remote "already exists" is read as success.
    pub async fn provision(&self, order_id: &OrderId) -> Result<ProvisionOutcome, ProvisioningError> {
        let order = self.ledger.order(order_id).await?;

        match order.status {
            OrderStatus::TermsAccepted => {}
            OrderStatus::Provisioned => {
                let account = self
                    .registry
                    .account_for_order(order_id)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Backend(format!("provisioned order {order_id} has no account"))
                    })?;
                return Ok(ProvisionOutcome::Provisioned(account));
            }
            actual => {
                return Err(ProvisioningError::NotReady {
                    order_id: order_id.clone(),
                    actual,
                })
            }
        }

        let plan = self
            .catalog
            .plan(&order.plan_id)
            .await?
            .ok_or_else(|| ProvisioningError::UnknownPlan(order_id.clone()))?;

        // Crash window: remote effect landed and the account row was
        // written, but the process died before the final CAS.
        if let Some(account) = self.registry.account_for_order(order_id).await? {
            debug!(order_id = %order_id, "Account already written, finalizing order only");
            return Ok(ProvisionOutcome::Provisioned(
                self.finalize(&order, account).await?,
            ));
        }

        let prior_attempts = u32::try_from(
            self.store.attempts_for_order(order_id).await?.len(),
        )
        .unwrap_or(u32::MAX);
        if self.policy.exhausted(prior_attempts) {
            return self
                .fail_order(&order, "provisioning retry budget exhausted")
                .await;
        }
        let attempt_no = prior_attempts + 1;

        let server = self
            .directory
            .pick_server()
            .await?
            .ok_or(ProvisioningError::NoServerAvailable)?;

        // Serialize mutation of this node's config file.
        let _lease = self
            .leases
            .try_acquire(&server.server_id)
            .ok_or_else(|| ProvisioningError::ServerBusy(server.server_id.clone()))?;

        let username = derive_username(order_id);
        let credential_uuid = derive_credential(order_id);
        let now = self.clock.now();

        // Anchor the attempt before the remote call; this row is what
        // lets a restart tell "crashed mid-provision" from "never ran".
        self.store
            .record_attempt(ProvisioningAttempt {
                order_id: order_id.clone(),
                attempt_no,
                started_at: now,
                outcome: AttemptOutcome::InFlight,
                remote_output: None,
            })
            .await?;

        info!(
            order_id = %order_id,
            attempt_no,
            server_id = %server.server_id,
            username = %username,
            "Provisioning attempt started"
        );

        let request = ProvisionRequest {
            server: server.clone(),
            username: username.clone(),
            credential_uuid,
            duration_days: plan.duration_days,
        };

        match self.transport.provision(&request).await {
            Ok(outcome) => {
                let (expires_at, endpoint, output) = match &outcome {
                    // The node reports where it listens; access links
                    // render from this grant, not from our inventory.
                    RemoteOutcome::Created(RemoteGrant {
                        domain,
                        port,
                        expires_at,
                    }) => (
                        *expires_at,
                        (domain.clone(), *port),
                        format!("DOMAIN={domain} PORT={port} EXP={}", expires_at.date_naive()),
                    ),
                    // No grant to read from; the earlier attempt's was
                    // lost with the crash, so fall back to the fleet
                    // profile and the standard TLS port.
                    RemoteOutcome::AlreadyExists => (
                        now + ChronoDuration::days(i64::from(plan.duration_days)),
                        (server.hostname.clone(), FALLBACK_ACCESS_PORT),
                        "already exists".to_string(),
                    ),
                };

                self.store
                    .complete_attempt(
                        order_id,
                        attempt_no,
                        AttemptOutcome::Succeeded,
                        Some(output),
                    )
                    .await?;

                let account = self
                    .registry
                    .create_account(
                        &order,
                        &username,
                        &server.server_id,
                        credential_uuid,
                        &endpoint.0,
                        endpoint.1,
                        plan.device_limit,
                        expires_at,
                    )
                    .await?;
                self.directory.record_account_added(&server.server_id).await?;

                Ok(ProvisionOutcome::Provisioned(
                    self.finalize(&order, account).await?,
                ))
            }
            Err(e) if e.is_transient() => {
                warn!(order_id = %order_id, attempt_no, error = %e, "Transient provisioning failure");
                self.store
                    .complete_attempt(
                        order_id,
                        attempt_no,
                        AttemptOutcome::FailedRetryable,
                        Some(e.to_string()),
                    )
                    .await?;

                if self.policy.exhausted(attempt_no) {
                    self.fail_order(&order, "provisioning retry budget exhausted")
                        .await
                } else {
                    Ok(ProvisionOutcome::Retryable {
                        attempt_no,
                        delay: self.policy.delay_for(attempt_no),
                    })
                }
            }
            Err(e) => {
                error!(order_id = %order_id, attempt_no, error = %e, "Fatal provisioning failure");
                self.store
                    .complete_attempt(
                        order_id,
                        attempt_no,
                        AttemptOutcome::FailedFatal,
                        Some(e.to_string()),
                    )
                    .await?;
                self.fail_order(&order, &e.to_string()).await
            }
        }
    }

    /// Settle attempts left IN_FLIGHT by a dead process.
    ///
    /// Each is marked FAILED_RETRYABLE; the affected order ids are
    /// returned so the caller can schedule fresh provisions. The remote
    /// effect may have landed, which is exactly what the deterministic
    /// identity and the already-exists reading absorb.
    pub async fn recover_stale_attempts(&self) -> Result<Vec<OrderId>, ProvisioningError> {
        let stale = self.store.in_flight_attempts().await?;
        let mut orders = Vec::with_capacity(stale.len());
        for attempt in stale {
            warn!(
                order_id = %attempt.order_id,
                attempt_no = attempt.attempt_no,
                "Settling attempt interrupted by restart"
            );
            self.store
                .complete_attempt(
                    &attempt.order_id,
                    attempt.attempt_no,
                    AttemptOutcome::FailedRetryable,
                    Some("interrupted by process restart".into()),
                )
                .await?;
            orders.push(attempt.order_id);
        }
        Ok(orders)
    }

    /// CAS the order to PROVISIONED and announce the account. Losing
    /// the CAS means a racing provision already finalized; the account
    /// row is shared either way.
    async fn finalize(
        &self,
        order: &Order,
        account: Account,
    ) -> Result<Account, ProvisioningError> {
        match self
            .ledger
            .transition(
                &order.order_id,
                OrderStatus::TermsAccepted,
                OrderStatus::Provisioned,
            )
            .await
        {
            Ok(_) => {
                info!(
                    order_id = %order.order_id,
                    account_id = %account.account_id,
                    server_id = %account.server_id,
                    "Order provisioned"
                );
                self.bus
                    .publish(CoreEvent::AccountProvisioned {
                        order_id: order.order_id.clone(),
                        account_id: account.account_id.clone(),
                        user_id: account.user_id,
                        server_id: account.server_id.clone(),
                        expires_at: account.expires_at,
                    })
                    .await;
                Ok(account)
            }
            Err(LedgerError::Store(StoreError::StatusConflict { actual, .. }))
                if actual == OrderStatus::Provisioned =>
            {
                debug!(order_id = %order.order_id, "Order already finalized by a racing provision");
                Ok(account)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// CAS the order to FAILED and alert an operator.
    async fn fail_order(
        &self,
        order: &Order,
        reason: &str,
    ) -> Result<ProvisionOutcome, ProvisioningError> {
        match self
            .ledger
            .transition(&order.order_id, OrderStatus::TermsAccepted, OrderStatus::Failed)
            .await
        {
            Ok(_) | Err(LedgerError::Store(StoreError::StatusConflict { .. })) => {}
            Err(e) => return Err(e.into()),
        }
        error!(order_id = %order.order_id, reason, "Order failed");
        self.bus
            .publish(CoreEvent::OrderFailed {
                order_id: order.order_id.clone(),
                reason: reason.to_string(),
            })
            .await;
        Ok(ProvisionOutcome::Failed {
            reason: reason.to_string(),
        })
    }
}
