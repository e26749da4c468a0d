//! Cross-subsystem integration tests.
//!
//! Each scenario wires the real services — ledger, reconciler,
//! coordinator, registry, expiry monitor — over one shared in-memory
//! store, a mock clock, and scripted doubles for the payment gateway
//! and the remote transport. Nothing here stubs a service; only the
//! process boundaries are faked.

pub mod expiry;
pub mod flows;
pub mod races;
pub mod recovery;

use chrono::Utc;
use shared_bus::InMemoryEventBus;
use shared_types::{
    Account, MockTimeSource, Order, OrderStatus, PlanId, ServerProfile, ServerStatus, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tb_accounts::AccountRegistry;
use tb_expiry::ExpiryMonitor;
use tb_order_ledger::{OrderLedger, StaticPlanCatalog};
use tb_payment::{BillCode, CheckoutConfig, MockGateway, PaymentReconciler};
use tb_provisioning::{
    MockTransport, ProvisionOutcome, ProvisioningCoordinator, RetryPolicy, ServerLeaseRegistry,
    StaticServerDirectory,
};
use tb_store::MemoryStateStore;

pub const SERVER_ID: &str = "sg-1";
pub const SERVER_HOSTNAME: &str = "sg-1.example.com";

/// The full service graph over one in-memory store.
pub struct World {
    pub store: Arc<MemoryStateStore>,
    pub clock: MockTimeSource,
    pub bus: Arc<InMemoryEventBus>,
    pub catalog: Arc<StaticPlanCatalog>,
    pub ledger: Arc<OrderLedger>,
    pub registry: Arc<AccountRegistry>,
    pub gateway: Arc<MockGateway>,
    pub reconciler: PaymentReconciler,
    pub transport: Arc<MockTransport>,
    pub directory: Arc<StaticServerDirectory>,
    pub coordinator: ProvisioningCoordinator,
    pub monitor: ExpiryMonitor,
}

fn server_profile(id: &str) -> ServerProfile {
    ServerProfile {
        server_id: shared_types::ServerId::new(id),
        hostname: format!("{id}.example.com"),
        ssh_user: "root".into(),
        ssh_port: 22,
        ssh_key_path: "/etc/keys/provision".into(),
        status: ServerStatus::Online,
        capacity: 100,
        active_accounts: 0,
    }
}

/// Wire everything over a fresh store and a single online server.
///
/// The transport's grants are stamped from wall time, so the mock
/// clock starts there too; tests advance it relative to that origin.
pub fn world() -> World {
    let store = Arc::new(MemoryStateStore::new());
    let clock = MockTimeSource::new(Utc::now());
    let bus = Arc::new(InMemoryEventBus::new());
    let catalog = Arc::new(StaticPlanCatalog::standard());
    let ledger = Arc::new(OrderLedger::new(
        store.clone(),
        catalog.clone(),
        Arc::new(clock.clone()),
    ));
    let registry = Arc::new(AccountRegistry::new(store.clone(), Arc::new(clock.clone())));
    let gateway = Arc::new(MockGateway::new());
    let reconciler = PaymentReconciler::new(
        ledger.clone(),
        gateway.clone(),
        bus.clone(),
        CheckoutConfig {
            return_url: "https://tollbooth.example/return".into(),
            callback_url: "https://tollbooth.example/hook".into(),
        },
    );
    let transport = Arc::new(MockTransport::new());
    let directory = Arc::new(StaticServerDirectory::new([server_profile(SERVER_ID)]));
    let coordinator = ProvisioningCoordinator::new(
        store.clone(),
        ledger.clone(),
        registry.clone(),
        catalog.clone(),
        directory.clone(),
        transport.clone(),
        ServerLeaseRegistry::new(Arc::new(clock.clone()), Duration::from_secs(120)),
        bus.clone(),
        Arc::new(clock.clone()),
        RetryPolicy::default(),
    );
    let monitor = ExpiryMonitor::new(store.clone(), bus.clone(), Arc::new(clock.clone()));
    World {
        store,
        clock,
        bus,
        catalog,
        ledger,
        registry,
        gateway,
        reconciler,
        transport,
        directory,
        coordinator,
        monitor,
    }
}

impl World {
    /// A coordinator as a restarted process would build it: same store
    /// and collaborators, fresh in-process lease table.
    pub fn restarted_coordinator(&self) -> ProvisioningCoordinator {
        ProvisioningCoordinator::new(
            self.store.clone(),
            self.ledger.clone(),
            self.registry.clone(),
            self.catalog.clone(),
            self.directory.clone(),
            self.transport.clone(),
            ServerLeaseRegistry::new(Arc::new(self.clock.clone()), Duration::from_secs(120)),
            self.bus.clone(),
            Arc::new(self.clock.clone()),
            RetryPolicy::default(),
        )
    }

    /// Create an order and its gateway bill.
    pub async fn checkout(&self, user: i64, plan: &str) -> (Order, BillCode) {
        let order = self
            .ledger
            .create_order(UserId(user), &PlanId::new(plan))
            .await
            .unwrap();
        let bill = self.reconciler.create_checkout(&order).await.unwrap();
        (order, bill)
    }

    /// Checkout, pay at the gateway, and reconcile to PAID.
    pub async fn paid_order(&self, user: i64, plan: &str) -> Order {
        let (order, bill) = self.checkout(user, plan).await;
        self.gateway.mark_paid(&bill);
        assert!(self.reconciler.reconcile(&order.order_id).await.unwrap());
        let order = self.ledger.order(&order.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        order
    }

    /// A paid order with terms accepted, ready to provision.
    pub async fn terms_accepted_order(&self, user: i64, plan: &str) -> Order {
        let order = self.paid_order(user, plan).await;
        self.coordinator.accept_terms(&order.order_id).await.unwrap()
    }

    /// Drive one order all the way to a live account.
    pub async fn provisioned_account(&self, user: i64, plan: &str) -> Account {
        let order = self.terms_accepted_order(user, plan).await;
        match self.coordinator.provision(&order.order_id).await.unwrap() {
            ProvisionOutcome::Provisioned(account) => account,
            other => panic!("expected provisioned outcome, got {other:?}"),
        }
    }
}
