//! # Service Container
//!
//! Constructs every service once, in dependency order, and hands out
//! shared handles. Everything downstream of the store and the bus is
//! stateless; the container is the only place that decides concrete
//! adapters (HTTP gateway, SSH transport, session backend).

pub mod config;

pub use config::{ConfigError, RuntimeConfig, SessionBackend};

use anyhow::{Context, Result};
use shared_bus::InMemoryEventBus;
use shared_types::{SystemTimeSource, TimeSource};
use std::sync::Arc;
use tb_accounts::AccountRegistry;
use tb_expiry::ExpiryMonitor;
use tb_order_ledger::{OrderLedger, StaticPlanCatalog};
use tb_payment::{HttpPaymentGateway, PaymentReconciler};
use tb_provisioning::{
    ProvisioningCoordinator, ServerLeaseRegistry, SshTransport, StaticServerDirectory,
};
use tb_store::{MemorySessionStore, MemoryStateStore, SessionStore, StoreBackedSessionStore};
use tracing::info;

/// All wired services, shared by the dispatcher and background tasks.
pub struct ServiceContainer {
    /// The validated configuration the container was built from.
    pub config: RuntimeConfig,
    /// Durable state.
    pub store: Arc<MemoryStateStore>,
    /// Milestone event bus.
    pub bus: Arc<InMemoryEventBus>,
    /// Wall clock, injected everywhere for testability.
    pub clock: Arc<dyn TimeSource>,
    /// Per-user UI sessions.
    pub sessions: Arc<dyn SessionStore>,
    /// Plan catalog.
    pub catalog: Arc<StaticPlanCatalog>,
    /// Order lifecycle owner.
    pub ledger: Arc<OrderLedger>,
    /// Account registry.
    pub registry: Arc<AccountRegistry>,
    /// Payment reconciliation.
    pub reconciler: Arc<PaymentReconciler>,
    /// Server fleet directory.
    pub directory: Arc<StaticServerDirectory>,
    /// Provisioning coordination.
    pub coordinator: Arc<ProvisioningCoordinator>,
    /// Expiry sweeps.
    pub monitor: Arc<ExpiryMonitor>,
}

impl ServiceContainer {
    /// Wire everything from a validated configuration.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let store = Arc::new(MemoryStateStore::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let sessions: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::Store => Arc::new(StoreBackedSessionStore::new(store.clone())),
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        };
        info!(backend = ?config.session_backend, "Session store selected");

        let catalog = Arc::new(StaticPlanCatalog::standard());
        let ledger = Arc::new(OrderLedger::new(
            store.clone(),
            catalog.clone(),
            clock.clone(),
        ));
        let registry = Arc::new(AccountRegistry::new(store.clone(), clock.clone()));

        let gateway = Arc::new(
            HttpPaymentGateway::new(config.gateway.clone())
                .context("failed to build payment gateway client")?,
        );
        let reconciler = Arc::new(PaymentReconciler::new(
            ledger.clone(),
            gateway,
            bus.clone(),
            config.checkout.clone(),
        ));

        let directory = Arc::new(StaticServerDirectory::new(config.servers.iter().cloned()));
        let transport = Arc::new(SshTransport::new(config.ssh.clone()));
        let coordinator = Arc::new(ProvisioningCoordinator::new(
            store.clone(),
            ledger.clone(),
            registry.clone(),
            catalog.clone(),
            directory.clone(),
            transport,
            ServerLeaseRegistry::new(clock.clone(), config.lease_ttl),
            bus.clone(),
            clock.clone(),
            config.retry,
        ));

        let monitor = Arc::new(ExpiryMonitor::new(
            store.clone(),
            bus.clone(),
            clock.clone(),
        ));

        info!(servers = config.servers.len(), "Service container wired");

        Ok(Self {
            config,
            store,
            bus,
            clock,
            sessions,
            catalog,
            ledger,
            registry,
            reconciler,
            directory,
            coordinator,
            monitor,
        })
    }
}
