//! Outbound (driven) ports for the provisioning subsystem.

use crate::domain::errors::ProvisioningError;
use crate::domain::remote::{ProvisionRequest, RemoteGrant, RemoteOutcome};
use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;
use shared_types::{ServerId, ServerProfile};
use std::collections::{HashSet, VecDeque};

/// Executes the idempotent remote provisioning command over a secure
/// channel and parses its structured output.
#[async_trait]
pub trait ProvisioningTransport: Send + Sync {
    /// Provision one credential on the target node.
    ///
    /// The remote contract is idempotent by construction: if the
    /// username already exists, the call reports
    /// [`RemoteOutcome::AlreadyExists`] rather than an error.
    ///
    /// # Errors
    ///
    /// [`ProvisioningError::RemoteTransient`] on timeout/connectivity,
    /// [`ProvisioningError::RemoteFatal`] on script/state corruption.
    async fn provision(&self, request: &ProvisionRequest)
        -> Result<RemoteOutcome, ProvisioningError>;
}

/// Read-mostly directory of remote nodes.
#[async_trait]
pub trait ServerDirectory: Send + Sync {
    /// Pick the available node with the lowest utilization.
    async fn pick_server(&self) -> Result<Option<ServerProfile>, ProvisioningError>;

    /// Look up a node by id.
    async fn server(&self, server_id: &ServerId)
        -> Result<Option<ServerProfile>, ProvisioningError>;

    /// Bump a node's active-account count after a successful provision.
    async fn record_account_added(&self, server_id: &ServerId) -> Result<(), ProvisioningError>;
}

/// Scripted behavior for one [`MockTransport`] invocation.
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Succeed with the standard grant.
    Succeed,
    /// Fail as a timeout, but land the remote side effect anyway —
    /// the nasty case the attempt ledger exists for.
    TimeoutButLand,
    /// Fail transiently with no remote side effect.
    Transient(String),
    /// Fail fatally.
    Fatal(String),
}

/// In-memory transport double.
///
/// Tracks which usernames "exist remotely": a provision for a username
/// that already landed reports [`RemoteOutcome::AlreadyExists`], exactly
/// like the real remote script. Faults are scripted per-invocation with
/// [`MockTransport::script`]; once the script runs dry every call
/// succeeds.
#[derive(Default)]
pub struct MockTransport {
    remote_users: Mutex<HashSet<String>>,
    script: Mutex<VecDeque<MockBehavior>>,
    invocations: Mutex<Vec<String>>,
}

impl MockTransport {
    /// A transport with no scripted faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue behaviors for the next invocations, in order.
    pub fn script(&self, behaviors: impl IntoIterator<Item = MockBehavior>) {
        self.script.lock().extend(behaviors);
    }

    /// Usernames provisioned so far.
    pub fn remote_users(&self) -> Vec<String> {
        self.remote_users.lock().iter().cloned().collect()
    }

    /// Usernames passed to each invocation, in call order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().clone()
    }

    fn grant_for(request: &ProvisionRequest) -> RemoteGrant {
        let expires_at = chrono::Utc::now() + Duration::days(i64::from(request.duration_days));
        // A deliberately non-default port, so anything that assumes 443
        // instead of reading the grant fails loudly in tests.
        RemoteGrant {
            domain: request.server.hostname.clone(),
            port: 8443,
            expires_at,
        }
    }
}

#[async_trait]
impl ProvisioningTransport for MockTransport {
    async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<RemoteOutcome, ProvisioningError> {
        self.invocations.lock().push(request.username.clone());

        let behavior = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(MockBehavior::Succeed);

        match behavior {
            MockBehavior::Succeed => {
                if !self.remote_users.lock().insert(request.username.clone()) {
                    return Ok(RemoteOutcome::AlreadyExists);
                }
                Ok(RemoteOutcome::Created(Self::grant_for(request)))
            }
            MockBehavior::TimeoutButLand => {
                self.remote_users.lock().insert(request.username.clone());
                Err(ProvisioningError::RemoteTransient("timeout".into()))
            }
            MockBehavior::Transient(msg) => Err(ProvisioningError::RemoteTransient(msg)),
            MockBehavior::Fatal(msg) => Err(ProvisioningError::RemoteFatal(msg)),
        }
    }
}
