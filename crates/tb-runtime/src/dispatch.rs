//! # Command Dispatch
//!
//! The single entry point for user actions. A raw callback token is
//! decoded once into [`Command`] at the boundary; this dispatcher maps
//! each variant onto the owning service and returns a structured
//! [`Reply`] for the chat surface to render. Rendering itself (message
//! formatting, keyboards, QR images) lives outside this core.

use crate::tasks::RetryScheduler;
use shared_types::{
    Account, Command, Order, OrderId, Plan, PlanId, PlanType, TimeSource, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tb_accounts::{AccountError, AccountRegistry};
use tb_order_ledger::{LedgerError, OrderLedger, PlanCatalog};
use tb_payment::{PaymentError, PaymentReconciler};
use tb_provisioning::{
    AccessLink, ProvisionOutcome, ProvisioningCoordinator, ProvisioningError,
};
use tb_store::{Session, SessionStore, StoreError};
use thiserror::Error;
use tracing::info;

/// Delay before retrying a provision that failed before an attempt was
/// recorded (no server available, lease busy).
const PRE_ATTEMPT_RETRY_DELAY: Duration = Duration::from_secs(15);

/// Static screens with no data behind them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaticScreen {
    /// Main menu.
    Home,
    /// Support contact info.
    Support,
    /// Client setup guide.
    Guide,
}

/// Structured outcome of one dispatched command.
#[derive(Debug)]
pub enum Reply {
    /// A static screen.
    Screen(StaticScreen),
    /// Plans on sale.
    Menu {
        /// Orderable plans.
        plans: Vec<Plan>,
    },
    /// One plan, pre-checkout.
    PlanDetails(Plan),
    /// A bill is ready to pay.
    Checkout {
        /// The PENDING order.
        order: Order,
        /// Gateway bill code.
        bill_code: String,
        /// Where the buyer pays.
        payment_url: String,
    },
    /// Result of a payment poll.
    PaymentStatus {
        /// The polled order.
        order_id: OrderId,
        /// Whether the gateway reports it paid.
        paid: bool,
    },
    /// The order was cancelled.
    OrderCancelled(OrderId),
    /// Usage terms for a paid order.
    Rules {
        /// The paid order awaiting acceptance.
        order: Order,
    },
    /// Provisioning landed; the credential is live.
    Provisioned {
        /// The new account.
        account: Account,
        /// Rendered access link.
        link: String,
    },
    /// Provisioning is in progress and will be retried.
    ProvisioningPending {
        /// The order being provisioned.
        order_id: OrderId,
        /// When the next attempt runs.
        retry_in: Duration,
    },
    /// Provisioning gave up; an operator was alerted.
    ProvisioningFailed {
        /// The failed order.
        order_id: OrderId,
        /// Why.
        reason: String,
    },
    /// Account dashboard.
    Dashboard {
        /// The active account, if any.
        account: Option<Account>,
    },
    /// The access link, for copying or QR rendering.
    AccessConfig {
        /// Rendered access link.
        link: String,
        /// Whether the surface should render it as a QR image.
        as_qr: bool,
    },
}

/// Dispatch failures, surfaced to the user by the chat surface.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Commands that need an active account found none.
    #[error("no active account")]
    NoActiveAccount,

    /// Rules were requested for an order that is not paid yet.
    #[error("order {0} is not paid yet")]
    OrderNotPaid(OrderId),

    /// Ledger error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Payment error.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Provisioning error.
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// Registry error.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maps [`Command`] variants onto the owning services.
pub struct CommandDispatcher {
    catalog: Arc<dyn PlanCatalog>,
    ledger: Arc<OrderLedger>,
    reconciler: Arc<PaymentReconciler>,
    coordinator: Arc<ProvisioningCoordinator>,
    registry: Arc<AccountRegistry>,
    sessions: Arc<dyn SessionStore>,
    retries: RetryScheduler,
    clock: Arc<dyn TimeSource>,
    /// Gateway payment page base; the bill code is appended.
    pay_url_base: String,
}

impl CommandDispatcher {
    /// Wire the dispatcher to its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn PlanCatalog>,
        ledger: Arc<OrderLedger>,
        reconciler: Arc<PaymentReconciler>,
        coordinator: Arc<ProvisioningCoordinator>,
        registry: Arc<AccountRegistry>,
        sessions: Arc<dyn SessionStore>,
        retries: RetryScheduler,
        clock: Arc<dyn TimeSource>,
        pay_url_base: String,
    ) -> Self {
        Self {
            catalog,
            ledger,
            reconciler,
            coordinator,
            registry,
            sessions,
            retries,
            clock,
            pay_url_base,
        }
    }

    /// Dispatch one decoded command for one user.
    pub async fn dispatch(
        &self,
        user_id: UserId,
        command: Command,
    ) -> Result<Reply, DispatchError> {
        info!(user_id = user_id.0, ?command, "Dispatching command");
        match command {
            Command::Home => {
                self.sessions.clear(user_id).await?;
                Ok(Reply::Screen(StaticScreen::Home))
            }
            Command::Support => Ok(Reply::Screen(StaticScreen::Support)),
            Command::Guide => Ok(Reply::Screen(StaticScreen::Guide)),
            Command::Buy | Command::Renew => Ok(Reply::Menu {
                plans: self.catalog.active_plans().await?,
            }),
            Command::AccountDashboard => Ok(Reply::Dashboard {
                account: self.registry.get_active_account(user_id).await?,
            }),
            Command::SelectPlan(family) => self.select_plan(user_id, family).await,
            Command::Pay(family) => self.pay(user_id, family).await,
            Command::CheckPayment(order_id) => {
                let paid = self.reconciler.reconcile(&order_id).await?;
                Ok(Reply::PaymentStatus { order_id, paid })
            }
            Command::CancelOrder(order_id) => self.cancel(user_id, order_id).await,
            Command::ShowRules(order_id) => {
                let order = self.ledger.order(&order_id).await?;
                if !order.status.at_or_beyond_paid() {
                    return Err(DispatchError::OrderNotPaid(order_id));
                }
                Ok(Reply::Rules { order })
            }
            Command::AcceptTerms(order_id) => self.accept_and_provision(user_id, order_id).await,
            Command::CopyConfig => self.access_config(user_id, false).await,
            Command::QrConfig => self.access_config(user_id, true).await,
        }
    }

    async fn select_plan(
        &self,
        user_id: UserId,
        family: PlanType,
    ) -> Result<Reply, DispatchError> {
        let plan = self
            .catalog
            .plan_for_type(family)
            .await?
            .ok_or_else(|| LedgerError::UnknownPlan(PlanId::new(family.token())))?;
        self.touch_session(user_id, |s| s.selected_plan = Some(plan.id.clone()))
            .await?;
        Ok(Reply::PlanDetails(plan))
    }

    async fn pay(&self, user_id: UserId, family: PlanType) -> Result<Reply, DispatchError> {
        let order = self.ledger.create_order_for_type(user_id, family).await?;
        let bill_code = self.reconciler.create_checkout(&order).await?;
        // Re-read to pick up the attached gateway reference.
        let order = self.ledger.order(&order.order_id).await?;

        self.touch_session(user_id, |s| {
            s.focus_order = Some(order.order_id.clone());
            s.selected_plan = Some(order.plan_id.clone());
        })
        .await?;

        let payment_url = format!(
            "{}/{}",
            self.pay_url_base.trim_end_matches('/'),
            bill_code.as_str()
        );
        Ok(Reply::Checkout {
            order,
            bill_code: bill_code.as_str().to_string(),
            payment_url,
        })
    }

    async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<Reply, DispatchError> {
        self.ledger.cancel(&order_id).await?;
        self.touch_session(user_id, |s| {
            if s.focus_order.as_ref() == Some(&order_id) {
                s.focus_order = None;
            }
        })
        .await?;
        Ok(Reply::OrderCancelled(order_id))
    }

    async fn accept_and_provision(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Reply, DispatchError> {
        self.coordinator.accept_terms(&order_id).await?;

        match self.coordinator.provision(&order_id).await {
            Ok(ProvisionOutcome::Provisioned(account)) => {
                let link = render_link(&account);
                self.touch_session(user_id, |s| s.focus_order = None).await?;
                Ok(Reply::Provisioned { account, link })
            }
            Ok(ProvisionOutcome::Retryable { delay, .. }) => {
                self.retries.schedule(order_id.clone(), delay);
                Ok(Reply::ProvisioningPending {
                    order_id,
                    retry_in: delay,
                })
            }
            Ok(ProvisionOutcome::Failed { reason }) => {
                Ok(Reply::ProvisioningFailed { order_id, reason })
            }
            // Failed before an attempt was recorded; retry without
            // burning the user's flow.
            Err(e) if e.is_transient() => {
                self.retries
                    .schedule(order_id.clone(), PRE_ATTEMPT_RETRY_DELAY);
                Ok(Reply::ProvisioningPending {
                    order_id,
                    retry_in: PRE_ATTEMPT_RETRY_DELAY,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn access_config(&self, user_id: UserId, as_qr: bool) -> Result<Reply, DispatchError> {
        let account = self
            .registry
            .get_active_account(user_id)
            .await?
            .ok_or(DispatchError::NoActiveAccount)?;
        Ok(Reply::AccessConfig {
            link: render_link(&account),
            as_qr,
        })
    }

    async fn touch_session(
        &self,
        user_id: UserId,
        mutate: impl FnOnce(&mut Session),
    ) -> Result<(), DispatchError> {
        let mut session = self.sessions.get(user_id).await?.unwrap_or_default();
        mutate(&mut session);
        session.updated_at = Some(self.clock.now());
        self.sessions.put(user_id, session).await?;
        Ok(())
    }
}

/// Render an account's access link from the endpoint the node reported
/// at provisioning time. The fleet directory plays no part here: the
/// node said where it listens, and that is what the account stored.
fn render_link(account: &Account) -> String {
    AccessLink::new(
        account.credential_uuid,
        account.access_domain.clone(),
        account.access_port,
        account.username.clone(),
    )
    .render()
}
