//! In-memory server directory.

use crate::domain::errors::ProvisioningError;
use crate::ports::ServerDirectory;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ServerId, ServerProfile};
use std::collections::HashMap;

/// Directory over a fixed fleet loaded at startup.
///
/// `pick_server` chooses the online node with the lowest utilization,
/// breaking ties by id so placement is stable across runs.
pub struct StaticServerDirectory {
    servers: RwLock<HashMap<ServerId, ServerProfile>>,
}

impl StaticServerDirectory {
    /// Build a directory over the given fleet.
    #[must_use]
    pub fn new(servers: impl IntoIterator<Item = ServerProfile>) -> Self {
        Self {
            servers: RwLock::new(
                servers
                    .into_iter()
                    .map(|s| (s.server_id.clone(), s))
                    .collect(),
            ),
        }
    }

    /// Number of nodes in the fleet.
    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    /// True when the fleet is empty.
    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }
}

#[async_trait]
impl ServerDirectory for StaticServerDirectory {
    async fn pick_server(&self) -> Result<Option<ServerProfile>, ProvisioningError> {
        let servers = self.servers.read();
        let mut candidates: Vec<&ServerProfile> =
            servers.values().filter(|s| s.is_available()).collect();
        candidates.sort_by(|a, b| {
            a.utilization()
                .partial_cmp(&b.utilization())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.server_id.cmp(&b.server_id))
        });
        Ok(candidates.first().map(|s| (*s).clone()))
    }

    async fn server(
        &self,
        server_id: &ServerId,
    ) -> Result<Option<ServerProfile>, ProvisioningError> {
        Ok(self.servers.read().get(server_id).cloned())
    }

    async fn record_account_added(
        &self,
        server_id: &ServerId,
    ) -> Result<(), ProvisioningError> {
        if let Some(server) = self.servers.write().get_mut(server_id) {
            server.active_accounts = server.active_accounts.saturating_add(1);
        }
        Ok(())
    }
}
