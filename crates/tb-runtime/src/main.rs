//! Tollbooth binary entry point.
//!
//! Startup sequence:
//!
//! 1. Initialize telemetry
//! 2. Load and validate configuration
//! 3. Wire the service container
//! 4. Settle provisioning attempts left IN_FLIGHT by a prior crash and
//!    re-queue their orders
//! 5. Spawn background tasks (retry worker, expiry sweeper,
//!    unpaid-order expirer)
//! 6. Run until the shutdown signal

use anyhow::{Context, Result};
use shared_bus::EventPublisher;
use std::sync::Arc;
use std::time::Duration;
use tb_runtime::container::{RuntimeConfig, ServiceContainer};
use tb_runtime::dispatch::CommandDispatcher;
use tb_runtime::tasks::{
    spawn_expiry_sweeper, spawn_pending_order_expirer, spawn_retry_worker, RetryScheduler,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tollbooth_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

/// Tick for the unpaid-order expirer; coarse on purpose, an unpaid
/// order going stale is not time-critical.
const PENDING_EXPIRY_TICK: Duration = Duration::from_secs(300);

/// The running service with its background tasks.
struct TollboothRuntime {
    container: Arc<ServiceContainer>,
    dispatcher: Arc<CommandDispatcher>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TollboothRuntime {
    /// Wire, recover, and spawn everything.
    async fn start(config: RuntimeConfig) -> Result<Self> {
        let container = Arc::new(ServiceContainer::new(config)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (retries, retry_task) =
            spawn_retry_worker(container.coordinator.clone(), shutdown_rx.clone());

        // A prior process may have died mid-provision; settle those
        // attempts and queue the orders for a fresh pass.
        let recovered = container
            .coordinator
            .recover_stale_attempts()
            .await
            .context("failed to recover stale provisioning attempts")?;
        for order_id in recovered {
            info!(order_id = %order_id, "Re-queueing provision interrupted by restart");
            retries.schedule(order_id, Duration::from_secs(1));
        }

        let sweep_task = spawn_expiry_sweeper(
            container.monitor.clone(),
            container.config.sweep_period,
            shutdown_rx.clone(),
        );
        let pending_task = spawn_pending_order_expirer(
            container.ledger.clone(),
            PENDING_EXPIRY_TICK,
            container.config.pending_order_max_age,
            shutdown_rx,
        );

        let dispatcher = Arc::new(Self::build_dispatcher(&container, retries));

        info!("Tollbooth runtime started");
        Ok(Self {
            container,
            dispatcher,
            shutdown_tx,
            tasks: vec![retry_task, sweep_task, pending_task],
        })
    }

    fn build_dispatcher(
        container: &ServiceContainer,
        retries: RetryScheduler,
    ) -> CommandDispatcher {
        CommandDispatcher::new(
            container.catalog.clone(),
            container.ledger.clone(),
            container.reconciler.clone(),
            container.coordinator.clone(),
            container.registry.clone(),
            container.sessions.clone(),
            retries,
            container.clock.clone(),
            container.config.gateway.base_url.clone(),
        )
    }

    /// The dispatcher handle for inbound surfaces.
    #[allow(dead_code)]
    fn dispatcher(&self) -> Arc<CommandDispatcher> {
        self.dispatcher.clone()
    }

    /// Signal all tasks to stop and wait for them.
    async fn shutdown(self) {
        info!("Initiating graceful shutdown");
        if self.shutdown_tx.send(true).is_err() {
            error!("All shutdown receivers already gone");
        }
        for task in self.tasks {
            task.abort();
            let _ = task.await;
        }
        info!(
            events_published = self.container.bus.events_published(),
            "Shutdown complete"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("configuration error")?;
    let runtime = TollboothRuntime::start(config).await?;

    info!("Tollbooth is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    runtime.shutdown().await;
    Ok(())
}
