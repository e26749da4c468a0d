//! Background tasks: provisioning retries, expiry sweeps, and the
//! unpaid-order expirer.
//!
//! Every task is a plain spawned loop watching a shared shutdown
//! signal; none of them holds state the services do not already hold,
//! so killing and restarting a task is always safe.

use shared_types::OrderId;
use std::sync::Arc;
use std::time::Duration;
use tb_expiry::ExpiryMonitor;
use tb_order_ledger::OrderLedger;
use tb_provisioning::{ProvisionOutcome, ProvisioningCoordinator};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Fallback delay when a provision fails before an attempt was even
/// recorded (no server, lease busy).
const PRE_ATTEMPT_RETRY_DELAY: Duration = Duration::from_secs(15);

struct RetryJob {
    order_id: OrderId,
    delay: Duration,
}

/// Handle for scheduling deferred provisioning attempts.
#[derive(Clone)]
pub struct RetryScheduler {
    tx: mpsc::UnboundedSender<RetryJob>,
}

impl RetryScheduler {
    /// Queue a provision for `order_id` after `delay`.
    pub fn schedule(&self, order_id: OrderId, delay: Duration) {
        if self.tx.send(RetryJob { order_id, delay }).is_err() {
            // Worker gone; only reachable during shutdown.
            warn!("Retry worker is not running, dropping scheduled provision");
        }
    }
}

/// Spawn the provisioning retry worker.
///
/// Each job sleeps out its backoff and re-invokes the coordinator;
/// a further transient outcome re-queues itself with the next delay.
pub fn spawn_retry_worker(
    coordinator: Arc<ProvisioningCoordinator>,
    mut shutdown: watch::Receiver<bool>,
) -> (RetryScheduler, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<RetryJob>();
    let scheduler = RetryScheduler { tx };
    let requeue = scheduler.clone();

    let handle = tokio::spawn(async move {
        loop {
            let job = tokio::select! {
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
                _ = shutdown.changed() => {
                    info!("Retry worker shutting down");
                    break;
                }
            };

            let coordinator = coordinator.clone();
            let requeue = requeue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(job.delay).await;
                match coordinator.provision(&job.order_id).await {
                    Ok(ProvisionOutcome::Provisioned(account)) => {
                        info!(
                            order_id = %job.order_id,
                            account_id = %account.account_id,
                            "Deferred provision landed"
                        );
                    }
                    Ok(ProvisionOutcome::Retryable { attempt_no, delay }) => {
                        info!(
                            order_id = %job.order_id,
                            attempt_no,
                            delay_secs = delay.as_secs(),
                            "Provision still failing, re-queued"
                        );
                        requeue.schedule(job.order_id, delay);
                    }
                    Ok(ProvisionOutcome::Failed { reason }) => {
                        warn!(order_id = %job.order_id, reason, "Provision gave up");
                    }
                    Err(e) if e.is_transient() => {
                        requeue.schedule(job.order_id, PRE_ATTEMPT_RETRY_DELAY);
                    }
                    Err(e) => {
                        error!(order_id = %job.order_id, error = %e, "Deferred provision errored");
                    }
                }
            });
        }
    });

    (scheduler, handle)
}

/// Spawn the periodic expiry sweep.
pub fn spawn_expiry_sweeper(
    monitor: Arc<ExpiryMonitor>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = monitor.run(period) => {}
            _ = shutdown.changed() => {
                info!("Expiry sweeper shutting down");
            }
        }
    })
}

/// Spawn the unpaid-order expirer: PENDING orders older than `max_age`
/// are swept to EXPIRED once per tick.
pub fn spawn_pending_order_expirer(
    ledger: Arc<OrderLedger>,
    period: Duration,
    max_age: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.changed() => {
                    info!("Pending-order expirer shutting down");
                    break;
                }
            }
            match ledger.expire_stale_pending(max_age).await {
                Ok(expired) if !expired.is_empty() => {
                    info!(count = expired.len(), "Expired stale unpaid orders");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Stale-order sweep failed, will retry next tick"),
            }
        }
    })
}
